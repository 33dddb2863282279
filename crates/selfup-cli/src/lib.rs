//! selfup - application self-update from the command line
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
//!
//! Each stage of the update pipeline is exposed as a subcommand so a host
//! application (or a person debugging one) can drive them individually:
//!
//! ```text
//! selfup check                  # is the published version newer?
//! selfup download               # fetch the package for this platform
//! selfup unpack <archive>       # extract it, print the new executable
//! selfup install <target>       # copy the running app over <target>
//! selfup run <exe> [args..]     # start <exe> detached
//! selfup update                 # check, download, unpack, relaunch
//! ```
//!
//! The local application is described by a manifest file (`--manifest` or
//! `SELFUP_MANIFEST`) whose `manifestUrl` points at the published one.

pub mod cmd;
pub mod ui;

pub use selfup_core::USER_AGENT;

use clap::{Parser, Subcommand};
use selfup_schema::PlatformKey;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "selfup")]
#[command(author, version = env!("SELFUP_VERSION"), about = "selfup - application self-update")]
pub struct Cli {
    /// Manifest describing the installed application
    #[arg(long, global = true, env = "SELFUP_MANIFEST", default_value = "package.json")]
    pub manifest: PathBuf,

    /// Directory for downloads and unpacked packages
    #[arg(long, global = true, env = "SELFUP_TEMP_DIR")]
    pub temp_dir: Option<PathBuf>,

    /// Act as this platform instead of the host (e.g. win64)
    #[arg(long, global = true)]
    pub platform: Option<PlatformKey>,

    /// Show what would happen without making changes
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print the platform key of this host
    Platform,
    /// Check whether a newer version is published
    Check,
    /// Download the newest package for this platform
    Download,
    /// Extract a downloaded package and print the new executable
    Unpack {
        /// Package archive
        file: PathBuf,
    },
    /// Copy the running application over an older installation
    Install {
        /// Installation to replace
        target: PathBuf,
    },
    /// Start an application detached from this process
    Run {
        /// Executable, app bundle, or app directory
        exe: PathBuf,
        /// Arguments for the application
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Check, download, unpack, and relaunch into the new version
    Update,
}
