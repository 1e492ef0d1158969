//! Command-line surface of `loft`. Every subcommand maps onto one engine operation.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "loft")]
#[command(author = env!("CARGO_PKG_AUTHORS"))]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(arg_required_else_help = true)]
#[command(about = "Operate a Loft namespace")]
pub struct Cli {
    /// Configuration file (TOML, JSON or YAML). Defaults to an optional `loft.*`
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
    /// Log at debug level regardless of the configured level
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Create a directory
    Mkdir { path: String },
    /// Upload a local file, creating or replacing the remote one
    Put {
        /// Local source, `-` for stdin
        local: PathBuf,
        remote: String,
    },
    /// Print a file to stdout
    Cat { path: String },
    /// List a directory
    Ls {
        #[arg(default_value = "/")]
        path: String,
    },
    /// Show the metadata of a path
    Stat { path: String },
    /// Remove a file or a whole directory tree
    Rm { path: String },
    /// Move a file or directory tree
    Mv { from: String, to: String },
    /// Set a dead property, e.g. `propset /doc DAV:displayname Report`
    Propset { path: String, key: String, value: String },
    /// Remove a dead property
    Propdel { path: String, key: String },
    /// Print the dead properties of a path
    Props { path: String },
    /// Delete blobs no path refers to
    Sweep {
        /// Minimum blob age in seconds, overrides `storage.orphan_grace_secs`
        #[arg(long)]
        grace_secs: Option<u64>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_global_flags_after_the_subcommand() {
        let cli = Cli::try_parse_from(["loft", "mv", "/a", "/b", "--config", "loft.toml", "-v"])
            .unwrap();

        assert_eq!(cli.command, Command::Mv { from: "/a".into(), to: "/b".into() });
        assert_eq!(cli.config.as_deref(), Some(std::path::Path::new("loft.toml")));
        assert!(cli.verbose);
    }

    #[test]
    fn ls_defaults_to_the_root() {
        let cli = Cli::try_parse_from(["loft", "ls"]).unwrap();
        assert_eq!(cli.command, Command::Ls { path: "/".into() });
    }

    #[test]
    fn sweep_grace_is_optional() {
        let cli = Cli::try_parse_from(["loft", "sweep", "--grace-secs", "0"]).unwrap();
        assert_eq!(cli.command, Command::Sweep { grace_secs: Some(0) });
    }

    #[test]
    fn put_requires_both_ends() {
        assert!(Cli::try_parse_from(["loft", "put", "local.txt"]).is_err());
    }
}
