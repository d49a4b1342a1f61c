use std::sync::Arc;

use chrono::Utc;
use log::debug;

use crate::connection::{query_count, SqlRunner, SqlValue};
use crate::error::Result;
use crate::migrate::ident::ObjectKind;

/// One saved definition, keyed by migration version and object name. The
/// column set matches the historical backup table, so existing rows stay
/// readable: a `version` label, an epoch `apply_time`, the object name in
/// `package` and the captured DDL in `backup`.
#[derive(Debug, Clone)]
pub struct BackupRecord {
    pub version: String,
    pub apply_time: i64,
    pub object_name: String,
    pub backup_ddl: Option<String>,
}

impl BackupRecord {
    pub fn new(version: &str, object_name: &str, backup_ddl: Option<String>) -> Self {
        BackupRecord {
            version: version.to_string(),
            apply_time: Utc::now().timestamp(),
            object_name: object_name.to_string(),
            backup_ddl,
        }
    }
}

pub struct BackupStore {
    runner: Arc<dyn SqlRunner>,
    table: String,
}

impl BackupStore {
    pub fn new(runner: Arc<dyn SqlRunner>, table: &str) -> Self {
        BackupStore {
            runner,
            table: table.to_string(),
        }
    }

    /// Creates the backup table on first use. Column names are quoted
    /// lowercase, the layout the historical table was created with.
    pub async fn ensure_table(&self) -> Result<()> {
        let probe = format!(
            "SELECT COUNT(*) FROM user_tables WHERE table_name = {}",
            self.runner.quote_value(&self.table)
        );
        if query_count(self.runner.as_ref(), &probe).await? > 0 {
            return Ok(());
        }

        debug!("Creating backup table {}", self.table);
        let sql = format!(
            "CREATE TABLE {} ({} VARCHAR2(180 BYTE) NOT NULL, {} NUMBER(10, 0), {} VARCHAR2(50 BYTE), {} CLOB)",
            self.runner.quote_identifier(&self.table),
            self.runner.quote_identifier("version"),
            self.runner.quote_identifier("apply_time"),
            self.runner.quote_identifier("package"),
            self.runner.quote_identifier("backup"),
        );
        self.runner.execute(&sql).await
    }

    /// Captures the live DDL of an object through DBMS_METADATA. Capture
    /// failures are reported as "nothing to capture": the update must not
    /// be blocked by a missing object or metadata privileges, it only
    /// loses its undo point.
    pub async fn snapshot(&self, kind: ObjectKind, object_name: &str) -> Option<String> {
        let sql = format!(
            "SELECT DBMS_METADATA.GET_DDL('{}', '{}') FROM DUAL",
            kind.keyword(),
            object_name
        );
        match self.runner.query_scalar(&sql).await {
            Ok(ddl) => ddl,
            Err(err) => {
                debug!("DDL snapshot failed for {} {}: {}", kind, object_name, err);
                None
            }
        }
    }

    pub async fn insert(&self, record: &BackupRecord) -> Result<()> {
        let backup = match &record.backup_ddl {
            Some(ddl) => SqlValue::Text(ddl.clone()),
            None => SqlValue::Null,
        };
        self.runner
            .insert(
                &self.table,
                &[
                    ("version", SqlValue::Text(record.version.clone())),
                    ("apply_time", SqlValue::Number(record.apply_time)),
                    ("package", SqlValue::Text(record.object_name.clone())),
                    ("backup", backup),
                ],
            )
            .await
    }

    /// Returns the saved DDL for a version and object, `None` when no row
    /// exists or the row was stored without a capture.
    pub async fn fetch(&self, version: &str, object_name: &str) -> Result<Option<String>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = {} AND {} = {}",
            self.runner.quote_identifier("backup"),
            self.runner.quote_identifier(&self.table),
            self.runner.quote_identifier("version"),
            self.runner.quote_value(version),
            self.runner.quote_identifier("package"),
            self.runner.quote_value(object_name),
        );
        self.runner.query_scalar(&sql).await
    }

    pub async fn delete(&self, version: &str, object_name: &str) -> Result<()> {
        let sql = format!(
            "DELETE FROM {} WHERE {} = {} AND {} = {}",
            self.runner.quote_identifier(&self.table),
            self.runner.quote_identifier("version"),
            self.runner.quote_value(version),
            self.runner.quote_identifier("package"),
            self.runner.quote_value(object_name),
        );
        self.runner.execute(&sql).await
    }
}
