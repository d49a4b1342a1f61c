use std::path::PathBuf;

use toml::Value;

use crate::error::{MigrateError, Result};
use crate::migrate::sequence::StartPolicy;

pub const DEFAULT_BACKUP_TABLE: &str = "migration_packages";

#[derive(Debug)]
pub struct Config {
    oracle: OracleConfig,
    migration: MigrationConfig,
    params: Value,
}

#[derive(Debug, Clone)]
pub struct OracleConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub service: String,
}

#[derive(Debug, Clone)]
pub struct MigrationConfig {
    /// Roots searched for object sources, in priority order.
    pub paths: Vec<PathBuf>,
    /// Default environment for parameter substitution. Empty means the
    /// flat top-level parameters apply.
    pub environment: String,
    pub backup_table: String,
    /// Optional ceiling on table name length. Schemas that must keep the
    /// derived SEQ_/TRG_ names within 30 characters set this to 23.
    pub table_name_limit: Option<usize>,
    pub sequence_start: StartPolicy,
}

impl Config {
    pub fn from_toml(config: Value) -> Result<Self> {
        let oracle = parse_oracle_config(
            config
                .get("oracle")
                .ok_or_else(|| MigrateError::Config("missing [oracle] section".to_string()))?,
        )?;
        let migration = parse_migration_config(
            config
                .get("migration")
                .ok_or_else(|| MigrateError::Config("missing [migration] section".to_string()))?,
        )?;
        let params = config
            .get("params")
            .cloned()
            .unwrap_or_else(|| Value::Table(toml::value::Table::new()));

        Ok(Config {
            oracle,
            migration,
            params,
        })
    }

    pub fn oracle(&self) -> &OracleConfig {
        &self.oracle
    }

    pub fn migration(&self) -> &MigrationConfig {
        &self.migration
    }

    pub fn params(&self) -> &Value {
        &self.params
    }
}

fn parse_oracle_config(config: &Value) -> Result<OracleConfig> {
    let host = config
        .get("host")
        .and_then(|value| value.as_str())
        .ok_or_else(|| MigrateError::Config("missing or invalid host".to_string()))?
        .to_string();

    let port = config
        .get("port")
        .and_then(|value| value.as_integer())
        .ok_or_else(|| MigrateError::Config("missing or invalid port".to_string()))?;
    let port = u16::try_from(port)
        .map_err(|_| MigrateError::Config(format!("port out of range: {}", port)))?;

    let username = config
        .get("username")
        .and_then(|value| value.as_str())
        .ok_or_else(|| MigrateError::Config("missing or invalid username".to_string()))?
        .to_string();

    let password = config
        .get("password")
        .and_then(|value| value.as_str())
        .ok_or_else(|| MigrateError::Config("missing or invalid password".to_string()))?
        .to_string();

    let service = config
        .get("service")
        .and_then(|value| value.as_str())
        .ok_or_else(|| MigrateError::Config("missing or invalid service name".to_string()))?
        .to_string();

    Ok(OracleConfig {
        host,
        port,
        username,
        password,
        service,
    })
}

fn parse_migration_config(config: &Value) -> Result<MigrationConfig> {
    let paths = config
        .get("paths")
        .and_then(|value| value.as_array())
        .ok_or_else(|| MigrateError::Config("missing or invalid migration paths".to_string()))?
        .iter()
        .filter_map(|value| value.as_str().map(PathBuf::from))
        .collect::<Vec<PathBuf>>();
    if paths.is_empty() {
        return Err(MigrateError::Config(
            "at least one migration path must be configured".to_string(),
        ));
    }

    let environment = config
        .get("environment")
        .and_then(|value| value.as_str())
        .unwrap_or_default()
        .to_string();

    let backup_table = config
        .get("backup_table")
        .and_then(|value| value.as_str())
        .unwrap_or(DEFAULT_BACKUP_TABLE)
        .to_string();

    let table_name_limit = match config.get("table_name_limit") {
        Some(value) => {
            let limit = value.as_integer().ok_or_else(|| {
                MigrateError::Config("invalid table_name_limit, expected an integer".to_string())
            })?;
            let limit = usize::try_from(limit).map_err(|_| {
                MigrateError::Config(format!("table_name_limit out of range: {}", limit))
            })?;
            Some(limit)
        }
        None => None,
    };

    let sequence_start = match config.get("sequence_start") {
        Some(value) => value
            .as_str()
            .ok_or_else(|| {
                MigrateError::Config("invalid sequence_start, expected a string".to_string())
            })?
            .parse::<StartPolicy>()?,
        None => StartPolicy::Fresh,
    };

    Ok(MigrationConfig {
        paths,
        environment,
        backup_table,
        table_name_limit,
        sequence_start,
    })
}
