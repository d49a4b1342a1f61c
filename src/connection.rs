use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use oracle::sql_type::ToSql;
use oracle::Connection;
use tokio::task;

use crate::config::OracleConfig;
use crate::error::{MigrateError, Result};

/// A value bound into an INSERT. Covers the three shapes the backup store
/// writes: text (including CLOB-sized DDL), integers and NULL.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(String),
    Number(i64),
    Null,
}

/// The statement surface migration operations run against. Everything the
/// engine does to a database goes through these methods, so tests can swap
/// in a scripted implementation.
#[async_trait]
pub trait SqlRunner: Send + Sync {
    /// Runs a statement for effect. DDL in Oracle commits implicitly.
    async fn execute(&self, sql: &str) -> Result<()>;

    /// Runs a query and returns the first column of the first row, or
    /// `None` when no row comes back or the value is SQL NULL.
    async fn query_scalar(&self, sql: &str) -> Result<Option<String>>;

    /// Like [`query_scalar`](Self::query_scalar), but guaranteed to observe
    /// the latest committed data. A replica-aware implementation overrides
    /// this to read through the primary.
    async fn query_scalar_on_primary(&self, sql: &str) -> Result<Option<String>> {
        self.query_scalar(sql).await
    }

    /// Inserts one row with bound parameters, in column order.
    async fn insert(&self, table: &str, row: &[(&str, SqlValue)]) -> Result<()>;

    fn quote_identifier(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    fn quote_value(&self, value: &str) -> String {
        format!("'{}'", value.replace('\'', "''"))
    }
}

#[async_trait]
pub trait DatabaseConnection: Sized {
    async fn new(config: &OracleConfig) -> Result<Self>;
}

/// A single Oracle session. The driver is blocking, so every call is moved
/// onto the blocking thread pool; the mutex serializes statements the same
/// way one server session would.
pub struct OracleConnection {
    conn: Arc<Mutex<Connection>>,
}

impl OracleConnection {
    async fn run_blocking<T, F>(&self, job: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> std::result::Result<T, oracle::Error> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        task::spawn_blocking(move || {
            let guard = conn.lock().expect("connection mutex poisoned");
            job(&guard)
        })
        .await
        .map_err(|err| MigrateError::Execution(format!("blocking task failed: {}", err)))?
        .map_err(MigrateError::from)
    }
}

#[async_trait]
impl DatabaseConnection for OracleConnection {
    async fn new(config: &OracleConfig) -> Result<Self> {
        let connect_string = format!("//{}:{}/{}", config.host, config.port, config.service);
        let username = config.username.clone();
        let password = config.password.clone();

        let conn = task::spawn_blocking(move || {
            Connection::connect(&username, &password, &connect_string)
        })
        .await
        .map_err(|err| MigrateError::Execution(format!("blocking task failed: {}", err)))?
        .map_err(|err| MigrateError::Execution(format!("failed to connect to Oracle: {}", err)))?;

        Ok(OracleConnection {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

#[async_trait]
impl SqlRunner for OracleConnection {
    async fn execute(&self, sql: &str) -> Result<()> {
        let sql = sql.to_string();
        self.run_blocking(move |conn| conn.execute(&sql, &[]).map(|_| ())).await
    }

    async fn query_scalar(&self, sql: &str) -> Result<Option<String>> {
        let sql = sql.to_string();
        self.run_blocking(move |conn| {
            let mut stmt = conn.statement(&sql).build()?;
            let mut rows = stmt.query(&[])?;
            match rows.next() {
                Some(row) => {
                    let value: Option<String> = row?.get(0)?;
                    Ok(value)
                }
                None => Ok(None),
            }
        })
        .await
    }

    async fn insert(&self, table: &str, row: &[(&str, SqlValue)]) -> Result<()> {
        let values: Vec<SqlValue> = row.iter().map(|(_, value)| value.clone()).collect();
        let columns = row
            .iter()
            .map(|(column, _)| self.quote_identifier(column))
            .collect::<Vec<String>>()
            .join(", ");
        let placeholders = (1..=row.len())
            .map(|position| format!(":{}", position))
            .collect::<Vec<String>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.quote_identifier(table),
            columns,
            placeholders
        );

        self.run_blocking(move |conn| {
            let null_text: Option<String> = None;
            let mut params: Vec<&dyn ToSql> = Vec::with_capacity(values.len());
            for value in &values {
                match value {
                    SqlValue::Text(text) => params.push(text),
                    SqlValue::Number(number) => params.push(number),
                    SqlValue::Null => params.push(&null_text),
                }
            }
            conn.execute(&sql, &params).map(|_| ())
        })
        .await
    }
}

/// Turns a counting query into a number. The scalar comes back as text
/// through [`SqlRunner::query_scalar`].
pub async fn query_count(runner: &dyn SqlRunner, sql: &str) -> Result<i64> {
    let value = runner
        .query_scalar(sql)
        .await?
        .unwrap_or_else(|| "0".to_string());
    value
        .trim()
        .parse::<i64>()
        .map_err(|_| MigrateError::Execution(format!("expected a numeric scalar, got: {}", value)))
}

pub struct DatabaseConnectionFactory<C: DatabaseConnection> {
    config: OracleConfig,
    connection_type: std::marker::PhantomData<C>,
}

impl<C: DatabaseConnection> DatabaseConnectionFactory<C> {
    pub fn new(config: OracleConfig) -> Self {
        DatabaseConnectionFactory {
            config,
            connection_type: std::marker::PhantomData,
        }
    }

    pub async fn create_connection(&self) -> Result<C> {
        C::new(&self.config).await
    }
}
