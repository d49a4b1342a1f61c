use std::fmt;
use std::str::FromStr;

use log::warn;

use crate::common::schema::ColumnDefinition;
use crate::connection::{query_count, SqlRunner};
use crate::error::{MigrateError, Result};

/// Column comment that marks a sequence-backed identity column, so the
/// emulation can be recognized when inspecting a schema later.
pub const AUTOINCREMENT_MARKER: &str = "_autoIncremented";

pub fn sequence_name(table: &str) -> String {
    format!("SEQ_{}_ID", table)
}

pub fn trigger_name(table: &str) -> String {
    format!("TRG_{}_ID", table)
}

/// Where a synthesized sequence starts counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartPolicy {
    /// Start at 1.
    Fresh,
    /// Start above the current column maximum.
    Continue,
}

impl FromStr for StartPolicy {
    type Err = MigrateError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "fresh" => Ok(StartPolicy::Fresh),
            "continue" => Ok(StartPolicy::Continue),
            other => Err(MigrateError::Config(format!(
                "unknown sequence start policy: {} (expected fresh or continue)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum MaxPolicy {
    NoMaxValue,
    MaxValue(i64),
}

#[derive(Debug, Clone, Copy)]
pub enum CachePolicy {
    NoCache,
    Cache(u32),
}

impl fmt::Display for MaxPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaxPolicy::NoMaxValue => write!(f, "NOMAXVALUE"),
            MaxPolicy::MaxValue(max) => write!(f, "MAXVALUE {}", max),
        }
    }
}

impl fmt::Display for CachePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CachePolicy::NoCache => write!(f, "NOCACHE"),
            CachePolicy::Cache(size) => write!(f, "CACHE {}", size),
        }
    }
}

/// General sequence DDL with explicit bounds and caching.
pub fn create_sequence_sql(
    name: &str,
    start: i64,
    increment: i64,
    max: MaxPolicy,
    cache: CachePolicy,
) -> String {
    format!(
        "CREATE SEQUENCE \"{}\" START WITH {} INCREMENT BY {} {} {}",
        name, start, increment, max, cache
    )
}

/// The fixed sequence shape backing an emulated identity column.
pub fn autoincrement_sequence_sql(table: &str, start: i64) -> String {
    format!(
        "CREATE SEQUENCE \"{}\" MINVALUE 1 START WITH {} INCREMENT BY 1 NOCACHE",
        sequence_name(table),
        start
    )
}

pub fn drop_sequence_sql(name: &str) -> String {
    format!("DROP SEQUENCE \"{}\"", name)
}

/// BEFORE INSERT trigger that fills the identity column from its sequence
/// when the inserted value is NULL. Explicit values pass through untouched.
pub fn autoincrement_trigger_sql(table: &str, column: &str) -> String {
    format!(
        "CREATE OR REPLACE TRIGGER \"{trigger}\"\n   \
         BEFORE INSERT ON \"{table}\"\n   \
         FOR EACH ROW\n\
         BEGIN\n   \
         IF INSERTING THEN\n      \
         IF :NEW.\"{column}\" IS NULL THEN\n         \
         SELECT {sequence}.NEXTVAL INTO :NEW.\"{column}\" FROM DUAL;\n      \
         END IF;\n   \
         END IF;\n\
         END;",
        trigger = trigger_name(table),
        table = table,
        column = column,
        sequence = sequence_name(table),
    )
}

/// Picks the identity column of a table definition. Only one emulated key
/// per table is supported; any further flagged columns are ignored.
pub fn autoincrement_column(columns: &[ColumnDefinition]) -> Option<&ColumnDefinition> {
    let mut marked = columns.iter().filter(|column| column.auto_increment);
    let first = marked.next();
    for ignored in marked {
        warn!(
            "Ignoring additional auto-increment column {} (one per table is supported)",
            ignored.name
        );
    }
    first
}

/// Resolves the first value a sequence should emit. `Continue` reads the
/// column high-water mark through the primary so a stale replica cannot
/// under-seed the sequence.
pub async fn resolve_start(
    runner: &dyn SqlRunner,
    policy: StartPolicy,
    table: &str,
    column: &str,
) -> Result<i64> {
    match policy {
        StartPolicy::Fresh => Ok(1),
        StartPolicy::Continue => {
            let sql = format!("SELECT MAX(\"{}\") FROM \"{}\"", column, table);
            match runner.query_scalar_on_primary(&sql).await? {
                Some(value) => {
                    let max = value.trim().parse::<i64>().map_err(|_| {
                        MigrateError::Execution(format!(
                            "non-numeric maximum for \"{}\".\"{}\": {}",
                            table, column, value
                        ))
                    })?;
                    Ok(max + 1)
                }
                None => Ok(1),
            }
        }
    }
}

pub async fn conventional_sequence_exists(runner: &dyn SqlRunner, table: &str) -> Result<bool> {
    let sql = format!(
        "SELECT COUNT(*) FROM user_sequences WHERE sequence_name = {}",
        runner.quote_value(&sequence_name(table))
    );
    Ok(query_count(runner, &sql).await? > 0)
}
