use serde::{Deserialize, Serialize};

/// Builds the stored key of a dead property: `"{namespace}:{local}"`.
#[must_use]
pub fn prop_key(namespace: &str, local: &str) -> String {
    format!("{namespace}:{local}")
}

/// One instruction of a property patch. Values are opaque serialized blobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum PropPatch {
    Set { key: String, value: String },
    Remove { key: String },
}

impl PropPatch {
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Set { key, .. } | Self::Remove { key } => key,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropStatus {
    Set,
    Removed,
    /// A removal of a key that was not stored. Still a success.
    Absent,
}

/// Per-property outcome of a patch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropStat {
    pub key: String,
    pub status: PropStatus,
}
