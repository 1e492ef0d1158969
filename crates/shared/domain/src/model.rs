use crate::constants::{ROOT_NAME, ROOT_PARENT_ID, ROOT_PATH};
use crate::info::FileInfo;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The singleton path table: every live normalized path mapped to its entry id.
///
/// `version` is the compare-and-swap guard for every namespace mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    pub entries: BTreeMap<String, String>,
    pub version: u64,
}

impl Index {
    /// The first index: only `/`, at version 1.
    #[must_use]
    pub fn bootstrap(root_id: impl Into<String>) -> Self {
        Self { entries: BTreeMap::from([(ROOT_PATH.to_owned(), root_id.into())]), version: 1 }
    }

    #[must_use]
    pub fn get(&self, path: &str) -> Option<&str> {
        self.entries.get(path).map(String::as_str)
    }

    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    /// Candidate successor carrying `entries`, one version ahead of `self`.
    #[must_use]
    pub fn successor(&self, entries: BTreeMap<String, String>) -> Self {
        Self { entries, version: self.version + 1 }
    }

    /// Candidate successor with an unchanged path table.
    #[must_use]
    pub fn bumped(&self) -> Self {
        self.successor(self.entries.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Dir,
}

/// Metadata record for a single file or directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: String,
    pub parent_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    #[serde(default)]
    pub size: u64,
    #[serde(rename = "modify")]
    pub modified: DateTime<Utc>,
    pub version: u64,
    #[serde(default)]
    pub dead_props: BTreeMap<String, String>,
}

impl Entry {
    #[must_use]
    pub fn root(id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self::directory(id, ROOT_PARENT_ID, ROOT_NAME, now)
    }

    #[must_use]
    pub fn directory(
        id: impl Into<String>,
        parent_id: impl Into<String>,
        name: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            parent_id: parent_id.into(),
            name: name.into(),
            kind: EntryKind::Dir,
            size: 0,
            modified: now,
            version: 1,
            dead_props: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn file(
        id: impl Into<String>,
        parent_id: impl Into<String>,
        name: impl Into<String>,
        size: u64,
        now: DateTime<Utc>,
    ) -> Self {
        Self { kind: EntryKind::File, size, ..Self::directory(id, parent_id, name, now) }
    }

    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Dir
    }

    #[must_use]
    pub fn info(&self) -> FileInfo {
        FileInfo {
            name: self.name.clone(),
            size: if self.is_dir() { 0 } else { self.size },
            modified: self.modified,
            is_dir: self.is_dir(),
        }
    }
}
