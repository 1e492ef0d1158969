use crate::constants::DEFAULT_MODE;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Projection of an entry returned by `stat`, `list` and handle `close`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub name: String,
    pub size: u64,
    pub modified: DateTime<Utc>,
    pub is_dir: bool,
}

impl FileInfo {
    #[must_use]
    pub const fn mode(&self) -> u32 {
        DEFAULT_MODE
    }
}
