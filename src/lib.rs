pub mod args;
pub mod common;
pub mod config;
pub mod connection;
pub mod error;
pub mod migrate;
pub mod prepare;

pub use error::{MigrateError, Result};
