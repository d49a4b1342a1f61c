use std::path::PathBuf;

use structopt::clap::AppSettings;
use structopt::StructOpt;

use crate::migrate::ident::ObjectKind;

#[derive(Debug, StructOpt)]
#[structopt(
name = "oramig",
version = env ! ("CARGO_PKG_VERSION"),
about = "Migrates Oracle stored objects (packages, functions, procedures and views) from versioned SQL sources, with DDL backups for undo and environment-aware source preparation.",
setting = AppSettings::ColoredHelp,
setting = AppSettings::VersionlessSubcommands,
)]
pub struct Args {
    /// Activate verbose mode
    #[structopt(short = "v", long = "verbose")]
    pub verbose: bool,

    /// Activate quiet mode
    #[structopt(short = "q", long = "quiet")]
    pub quiet: bool,

    /// Path to the configuration file
    #[structopt(short = "c", long = "config", default_value = "config.toml")]
    pub config: PathBuf,

    #[structopt(subcommand)]
    pub command: Command,
}

#[derive(Debug, StructOpt)]
pub enum Command {
    /// Render parameterized .install sources into their installable trees
    Prepare {
        /// Environment whose parameters are substituted
        #[structopt(short = "e", long = "env")]
        environment: Option<String>,

        /// List the files without writing anything
        #[structopt(long = "dry-run")]
        dry_run: bool,
    },

    /// Create stored objects from their source files
    Create {
        /// Object kind: package, function, procedure or view
        kind: ObjectKind,

        /// Object names, with or without the kind prefix
        #[structopt(required = true)]
        names: Vec<String>,
    },

    /// Update stored objects, backing up the live definitions first
    Update {
        /// Migration version the backups are keyed by
        #[structopt(short = "m", long = "version")]
        version: String,

        /// Object kind: package, function, procedure or view
        kind: ObjectKind,

        /// Object names, with or without the kind prefix
        #[structopt(required = true)]
        names: Vec<String>,
    },

    /// Restore stored objects from the definitions backed up under a version
    Undo {
        /// Migration version the backups were keyed by
        #[structopt(short = "m", long = "version")]
        version: String,

        /// Object kind: package, function, procedure or view
        kind: ObjectKind,

        /// Object names, with or without the kind prefix
        #[structopt(required = true)]
        names: Vec<String>,
    },

    /// Drop stored objects, without taking backups
    Drop {
        /// Object kind: package, function, procedure or view
        kind: ObjectKind,

        /// Object names, with or without the kind prefix
        #[structopt(required = true)]
        names: Vec<String>,
    },

    /// Drop tables together with their conventional sequences
    DropTable {
        /// Table names
        #[structopt(required = true)]
        tables: Vec<String>,
    },

    /// Recreate a conventional sequence above the column high-water mark
    RegenSeq {
        /// Table the sequence belongs to
        table: String,

        /// Identity column holding the current maximum
        column: String,
    },
}
