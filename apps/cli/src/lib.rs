//! # Loft CLI
//!
//! `loft` drives a [`NamespaceEngine`](loft_namespace::NamespaceEngine) against the
//! stores named in the configuration: the local blob store under `storage.root`
//! and the metadata backend selected by `metadata.backend`.
//!
//! ```text
//! loft --config loft.toml mkdir /docs
//! loft --config loft.toml put report.pdf /docs/report.pdf
//! loft --config loft.toml mv /docs /archive
//! loft --config loft.toml ls /archive
//! ```

pub mod args;
mod backend;
mod commands;

pub use args::{Cli, Command};
pub use backend::run;
pub use commands::execute;
