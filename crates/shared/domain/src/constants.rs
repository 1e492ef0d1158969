/// Well-known key of the singleton index record.
pub const INDEX_ID: &str = "root";

/// `parent_id` sentinel carried by the root directory entry.
pub const ROOT_PARENT_ID: &str = "root";

pub const ROOT_PATH: &str = "/";

pub const ROOT_NAME: &str = "/";

/// Permission bits reported for every entry. They are never enforced.
pub const DEFAULT_MODE: u32 = 0o777;
