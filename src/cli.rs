//! Command-line interface definitions for filecheck.
//!
//! The CLI definitions are shared between the main binary and build tools
//! (like xtask) for man page generation.
//!
//! Note: Field-level documentation is provided via clap attributes, so we
//! allow `missing_docs` for this module to avoid redundant documentation.

#![allow(missing_docs)]

use crate::config::{CheckOptions, UpdateOptions};
use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// Main CLI structure for filecheck.
#[derive(Parser)]
#[command(
    name = "filecheck",
    version = crate::VERSION,
    about = "Detect changed files using per-directory manifests",
    long_about = "Records the MD5 hash, size and timestamps of every file in a .filecheck \
                  manifest per directory, and reports what changed since"
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Print every directory visited and raise the log level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (default: ~/.config/filecheck/config.toml)
    #[arg(long, global = true, env = "FILECHECK_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// All available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Hash every file and write fresh manifests
    Generate {
        #[command(flatten)]
        walk: WalkArgs,
    },

    /// Compare files with their manifests without writing anything
    Check {
        #[command(flatten)]
        walk: WalkArgs,

        /// Show files that are the same
        #[arg(short = 's', long)]
        show_same_files: bool,

        #[command(flatten)]
        signals: SignalArgs,

        /// Ignore hash (contents)
        #[arg(short = 'H', long)]
        ignore_hash: bool,
    },

    /// Refresh manifests, re-hashing only entries that changed
    Update {
        #[command(flatten)]
        walk: WalkArgs,

        #[command(flatten)]
        signals: SignalArgs,
    },

    /// Generate shell completions
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Where to look.
#[derive(Args, Debug, Clone)]
pub struct WalkArgs {
    /// Directory to process
    #[arg(default_value = ".")]
    pub directory: PathBuf,

    /// Recurse into subdirectories
    #[arg(short, long)]
    pub recursive: bool,

    /// Follow symbolic links
    #[arg(short = 'l', long)]
    pub follow_links: bool,
}

/// Which cheap signals to compare.
#[derive(Args, Debug, Clone, Copy)]
#[allow(clippy::struct_excessive_bools)]
pub struct SignalArgs {
    /// Check access time
    #[arg(short = 'a', long)]
    pub check_atime: bool,

    /// Check creation time
    #[arg(short = 'c', long)]
    pub check_ctime: bool,

    /// Ignore modification time
    #[arg(short = 'M', long)]
    pub ignore_mtime: bool,

    /// Ignore size
    #[arg(short = 'S', long)]
    pub ignore_size: bool,
}

impl SignalArgs {
    /// Options for `check`.
    #[must_use]
    pub const fn check_options(self, show_same_files: bool, ignore_hash: bool) -> CheckOptions {
        CheckOptions {
            ignore_size: self.ignore_size,
            ignore_mtime: self.ignore_mtime,
            check_atime: self.check_atime,
            check_ctime: self.check_ctime,
            ignore_hash,
            show_same_files,
        }
    }

    /// Options for `update`.
    #[must_use]
    pub const fn update_options(self) -> UpdateOptions {
        UpdateOptions {
            ignore_size: self.ignore_size,
            ignore_mtime: self.ignore_mtime,
            check_atime: self.check_atime,
            check_ctime: self.check_ctime,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_check_flags() -> Result<(), clap::Error> {
        let cli = Cli::try_parse_from(["filecheck", "check", "data", "-r", "-s", "-a", "-M", "-H"])?;
        let Commands::Check {
            walk,
            show_same_files,
            signals,
            ignore_hash,
        } = cli.command
        else {
            panic!("expected check");
        };

        assert_eq!(walk.directory, PathBuf::from("data"));
        assert!(walk.recursive && !walk.follow_links);
        let options = signals.check_options(show_same_files, ignore_hash);
        assert_eq!(
            options,
            CheckOptions {
                ignore_size: false,
                ignore_mtime: true,
                check_atime: true,
                check_ctime: false,
                ignore_hash: true,
                show_same_files: true,
            }
        );
        Ok(())
    }

    #[test]
    fn test_directory_defaults_to_current() -> Result<(), clap::Error> {
        let cli = Cli::try_parse_from(["filecheck", "-v", "update", "-l", "-S"])?;
        assert!(cli.verbose);
        let Commands::Update { walk, signals } = cli.command else {
            panic!("expected update");
        };

        assert_eq!(walk.directory, PathBuf::from("."));
        assert!(walk.follow_links);
        assert!(signals.update_options().ignore_size);
        Ok(())
    }

    #[test]
    fn test_update_rejects_check_only_flags() {
        assert!(Cli::try_parse_from(["filecheck", "update", "-H"]).is_err());
        assert!(Cli::try_parse_from(["filecheck", "generate", "-a"]).is_err());
    }
}
