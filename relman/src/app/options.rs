//! Command line options

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};

use crate::logs::{LogFormat, LogLevel};

#[derive(Parser, Debug)]
#[command(name = "relman")]
#[command(about = "Create, validate and promote release manifests")]
#[command(version)]
pub struct Cli {
    /// Settings file (defaults to ./relman.json)
    #[arg(long, global = true, env = "RELMAN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Manifest directory (overrides the settings file)
    #[arg(long, global = true)]
    pub manifests_dir: Option<PathBuf>,

    /// Log level (overrides the settings file; RUST_LOG wins over both)
    #[arg(long, global = true)]
    pub log_level: Option<LogLevel>,

    /// Log line format on stderr (overrides the settings file)
    #[arg(long, global = true, value_enum)]
    pub log_format: Option<LogFormat>,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a draft manifest pinning the current component identities
    Create {
        /// Release version, e.g. 1.2.0
        version: String,

        /// Recorded as createdBy (defaults to settings, then $USER)
        #[arg(long)]
        created_by: Option<String>,

        /// Free-form release description
        #[arg(long, default_value = "")]
        description: String,
    },

    /// Validate a manifest file, or a stored manifest by version
    Validate {
        /// Path to a manifest file, or a stored version
        target: String,
    },

    /// Trigger promotion of a version to an environment
    Promote {
        version: String,

        /// Target environment: qa or prod
        environment: String,

        /// Confirm re-promotion to an environment that is already deployed
        #[arg(short, long)]
        yes: bool,

        /// Never prompt; an unconfirmed re-promotion is declined
        #[arg(long, conflicts_with = "yes")]
        no_input: bool,

        /// Run every gate but do not trigger the pipeline
        #[arg(long)]
        dry_run: bool,
    },

    /// Append a deployment, validation, approval or test fact
    Record {
        #[command(subcommand)]
        fact: RecordCommand,
    },

    /// List stored versions
    List,

    /// Show a summary of a stored manifest
    Show { version: String },

    /// Print build information
    Version,
}

#[derive(Subcommand, Debug)]
pub enum RecordCommand {
    /// A pipeline deployed the version
    Deployed {
        version: String,
        environment: String,

        /// Deployment time (RFC 3339, defaults to now)
        #[arg(long)]
        at: Option<DateTime<Utc>>,

        #[arg(long)]
        notes: Option<String>,
    },

    /// A deployed environment was signed off
    Validated {
        version: String,
        environment: String,

        #[arg(long)]
        by: String,

        #[arg(long)]
        notes: Option<String>,
    },

    /// The release was approved for production
    Approved {
        version: String,

        #[arg(long)]
        by: String,

        #[arg(long)]
        notes: Option<String>,
    },

    /// A required test suite passed
    Test { version: String, suite: String },
}
