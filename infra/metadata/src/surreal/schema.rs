//! SurrealQL statements of the metadata schema and its conditional transactions.
//!
//! Guards compare the stored revision with `$expected` and `THROW` on mismatch,
//! which cancels the whole transaction.

pub(crate) const CONFLICT_MARKER: &str = "loft_version_conflict";

pub(crate) const DEFINE_SCHEMA: &str = "
DEFINE TABLE IF NOT EXISTS entry SCHEMALESS;
DEFINE INDEX IF NOT EXISTS entry_eid ON entry FIELDS eid UNIQUE;
DEFINE INDEX IF NOT EXISTS entry_parent ON entry FIELDS parent_id;
DEFINE TABLE IF NOT EXISTS ns_index SCHEMALESS;
DEFINE INDEX IF NOT EXISTS ns_index_singleton ON ns_index FIELDS singleton UNIQUE;
";

pub(crate) const SELECT_INDEX: &str =
    "SELECT entries, rev FROM ns_index WHERE singleton = $singleton";

pub(crate) const SELECT_ENTRY: &str =
    "SELECT eid, parent_id, name, kind, size, modify, rev, props FROM entry WHERE eid = $eid";

pub(crate) const SELECT_CHILDREN: &str = "SELECT eid, parent_id, name, kind, size, modify, rev, props FROM entry WHERE parent_id = $parent_id ORDER BY eid";

pub(crate) const COMMIT_ENTRY_AND_INDEX: &str = "
BEGIN TRANSACTION;
LET $current = (SELECT VALUE rev FROM ns_index WHERE singleton = $singleton)[0];
IF $current != $expected { THROW 'loft_version_conflict: index' };
LET $stored = (SELECT VALUE rev FROM entry WHERE eid = $eid)[0];
IF $stored != $entry_expected { THROW 'loft_version_conflict: entry' };
DELETE entry WHERE eid = $eid;
CREATE entry CONTENT $entry;
UPDATE ns_index SET entries = $entries, rev = $next WHERE singleton = $singleton;
COMMIT TRANSACTION;
";

pub(crate) const DELETE_ENTRIES_AND_INDEX: &str = "
BEGIN TRANSACTION;
LET $current = (SELECT VALUE rev FROM ns_index WHERE singleton = $singleton)[0];
IF $current != $expected { THROW 'loft_version_conflict: index' };
DELETE entry WHERE eid IN $ids;
UPDATE ns_index SET entries = $entries, rev = $next WHERE singleton = $singleton;
COMMIT TRANSACTION;
";

pub(crate) const UPDATE_ENTRY: &str = "
BEGIN TRANSACTION;
LET $stored = (SELECT VALUE rev FROM entry WHERE eid = $eid)[0];
IF $stored != $entry_expected { THROW 'loft_version_conflict: entry' };
DELETE entry WHERE eid = $eid;
CREATE entry CONTENT $entry;
COMMIT TRANSACTION;
";

pub(crate) const INITIALIZE: &str = "
BEGIN TRANSACTION;
IF (SELECT VALUE rev FROM ns_index WHERE singleton = $singleton)[0] != NONE { THROW 'loft_already_initialized' };
CREATE entry CONTENT $entry;
CREATE ns_index SET singleton = $singleton, entries = $entries, rev = $next;
COMMIT TRANSACTION;
";
