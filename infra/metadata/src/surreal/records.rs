use crate::error::{MetadataError, MetadataErrorExt};
use chrono::{DateTime, Utc};
use loft_domain::{Entry, EntryKind, Index};
use std::collections::BTreeMap;
use surrealdb::types::SurrealValue;

/// Row of the `entry` table. Maps are stored as JSON strings, times as epoch millis.
#[derive(Debug, SurrealValue)]
pub(crate) struct EntryRecord {
    pub(crate) eid: String,
    pub(crate) parent_id: String,
    pub(crate) name: String,
    pub(crate) kind: String,
    pub(crate) size: i64,
    pub(crate) modify: i64,
    pub(crate) rev: i64,
    pub(crate) props: String,
}

/// Row of the singleton `ns_index` table.
#[derive(Debug, SurrealValue)]
pub(crate) struct IndexRecord {
    pub(crate) entries: String,
    pub(crate) rev: i64,
}

pub(crate) fn to_i64(value: u64, field: &'static str) -> Result<i64, MetadataError> {
    i64::try_from(value).map_err(|_| MetadataError::Validation {
        message: format!("{field} {value} exceeds the storable range").into(),
        context: None,
    })
}

fn to_u64(value: i64, field: &'static str) -> Result<u64, MetadataError> {
    u64::try_from(value).map_err(|_| MetadataError::Validation {
        message: format!("{field} {value} is negative").into(),
        context: None,
    })
}

impl TryFrom<&Entry> for EntryRecord {
    type Error = MetadataError;

    fn try_from(entry: &Entry) -> Result<Self, MetadataError> {
        Ok(Self {
            eid: entry.id.clone(),
            parent_id: entry.parent_id.clone(),
            name: entry.name.clone(),
            kind: match entry.kind {
                EntryKind::File => "file",
                EntryKind::Dir => "dir",
            }
            .to_owned(),
            size: to_i64(entry.size, "size")?,
            modify: entry.modified.timestamp_millis(),
            rev: to_i64(entry.version, "version")?,
            props: serde_json::to_string(&entry.dead_props).context("Encoding dead properties")?,
        })
    }
}

impl TryFrom<EntryRecord> for Entry {
    type Error = MetadataError;

    fn try_from(record: EntryRecord) -> Result<Self, MetadataError> {
        let kind = match record.kind.as_str() {
            "file" => EntryKind::File,
            "dir" => EntryKind::Dir,
            other => {
                return Err(MetadataError::Validation {
                    message: format!("unknown entry kind '{other}'").into(),
                    context: Some(record.eid.into()),
                });
            },
        };
        let modified: DateTime<Utc> =
            DateTime::from_timestamp_millis(record.modify).ok_or_else(|| MetadataError::Validation {
                message: format!("modify {} is out of range", record.modify).into(),
                context: None,
            })?;
        let dead_props: BTreeMap<String, String> =
            serde_json::from_str(&record.props).context("Decoding dead properties")?;

        Ok(Self {
            size: to_u64(record.size, "size")?,
            version: to_u64(record.rev, "version")?,
            id: record.eid,
            parent_id: record.parent_id,
            name: record.name,
            kind,
            modified,
            dead_props,
        })
    }
}

impl TryFrom<IndexRecord> for Index {
    type Error = MetadataError;

    fn try_from(record: IndexRecord) -> Result<Self, MetadataError> {
        Ok(Self {
            entries: serde_json::from_str(&record.entries).context("Decoding index entries")?,
            version: to_u64(record.rev, "index version")?,
        })
    }
}

pub(crate) fn encode_entries(index: &Index) -> Result<String, MetadataError> {
    serde_json::to_string(&index.entries).context("Encoding index entries")
}
