use thiserror::Error;

/// Errors surfaced by migration operations. Driver errors are carried as
/// plain text so callers see the ORA- message the server produced.
#[derive(Error, Debug)]
pub enum MigrateError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("source file not found: {directory}/{file}.sql (searched every configured migration path)")]
    FileNotFound { directory: String, file: String },

    #[error("identifier {name} is longer than {limit} characters")]
    IdentifierTooLong { name: String, limit: usize },

    #[error("no backup recorded for {object} under version {version}")]
    BackupMissing { version: String, object: String },

    #[error("unknown table: {0}")]
    UnknownTable(String),

    #[error("execution failed: {0}")]
    Execution(String),

    #[error("{failed} of {total} items failed")]
    Batch { failed: usize, total: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl From<oracle::Error> for MigrateError {
    fn from(err: oracle::Error) -> Self {
        MigrateError::Execution(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MigrateError>;
