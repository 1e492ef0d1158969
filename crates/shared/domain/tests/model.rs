use chrono::Utc;
use loft_domain::constants::{DEFAULT_MODE, INDEX_ID, ROOT_PARENT_ID};
use loft_domain::props::prop_key;
use loft_domain::{Entry, EntryKind, Index, OpenFlags, PropPatch};
use serde_json::json;

#[test]
fn bootstrap_index_maps_root() {
    let index = Index::bootstrap("r00t");
    assert_eq!(index.version, 1);
    assert_eq!(index.get("/"), Some("r00t"));
    assert_eq!(INDEX_ID, "root");

    let next = index.bumped();
    assert_eq!(next.version, 2);
    assert_eq!(next.entries, index.entries);
}

#[test]
fn root_entry_uses_sentinel_parent() {
    let root = Entry::root("r00t", Utc::now());
    assert_eq!(root.parent_id, ROOT_PARENT_ID);
    assert_eq!(root.name, "/");
    assert!(root.is_dir());
    assert_eq!(root.version, 1);
}

#[test]
fn entry_serializes_with_wire_names() {
    let entry = Entry::file("f1", "d1", "readme.txt", 5, Utc::now());
    let value = serde_json::to_value(&entry).unwrap();

    assert_eq!(value["type"], json!("file"));
    assert!(value.get("modify").is_some());

    let back: Entry = serde_json::from_value(value).unwrap();
    assert_eq!(back.kind, EntryKind::File);
    assert_eq!(back, entry);
}

#[test]
fn info_projection_hides_directory_size() {
    let mut dir = Entry::directory("d1", "r00t", "docs", Utc::now());
    dir.size = 42;

    let info = dir.info();
    assert!(info.is_dir);
    assert_eq!(info.size, 0);
    assert_eq!(info.mode(), DEFAULT_MODE);
}

#[test]
fn open_flags_overwrite_rules() {
    assert!(OpenFlags::CREATE_OR_REPLACE.allows_overwrite());
    assert!(!OpenFlags::CREATE.allows_overwrite());
    assert!(!(OpenFlags::TRUNCATE | OpenFlags::EXCLUSIVE).allows_overwrite());
}

#[test]
fn prop_patch_keys() {
    let key = prop_key("DAV:", "displayname");
    assert_eq!(key, "DAV::displayname");

    let patch = PropPatch::Remove { key: key.clone() };
    assert_eq!(patch.key(), key);
}
