//! # Domain Models
//!
//! Pure data types shared by the storage backends, the namespace engine and the CLI.
//! Keep it lean: no I/O, networking, or heavy logic, just data and simple helpers.

pub mod config;
pub mod constants;
pub mod flags;
pub mod info;
pub mod model;
pub mod props;

pub use flags::OpenFlags;
pub use info::FileInfo;
pub use model::{Entry, EntryKind, Index};
pub use props::{PropPatch, PropStat, PropStatus};
