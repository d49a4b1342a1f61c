use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use log::{debug, error, info};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::common::schema::{build_create_table_sql, ColumnDefinition};
use crate::config::MigrationConfig;
use crate::connection::{query_count, SqlRunner};
use crate::error::{MigrateError, Result};
use crate::migrate::backup::{BackupRecord, BackupStore};
use crate::migrate::ident::{canonical_name, validate_table_name, ObjectKind, BODY_SUFFIX};
use crate::migrate::sequence;
use crate::migrate::sequence::StartPolicy;

/// Boundary between a package specification and its body inside a single
/// captured DDL blob. Oracle 12c+ emits an edition clause between OR
/// REPLACE and the object keyword.
static PACKAGE_BODY_BOUNDARY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"CREATE\s+OR\s+REPLACE\s+(?:EDITIONABLE\s+|NONEDITIONABLE\s+)?PACKAGE\s+BODY")
        .expect("package body pattern is valid")
});

/// What a batch run does to each named object.
#[derive(Debug, Clone)]
pub enum Operation {
    Create,
    Update { version: String },
    Undo { version: String },
    Drop,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self {
            Operation::Create => "create",
            Operation::Update { .. } => "update",
            Operation::Undo { .. } => "undo",
            Operation::Drop => "drop",
        };
        write!(f, "{}", verb)
    }
}

/// Applies stored object and table migrations against one schema. All
/// statements go through the [`SqlRunner`] it was built with.
pub struct ObjectMigrator {
    runner: Arc<dyn SqlRunner>,
    store: BackupStore,
    paths: Vec<PathBuf>,
    table_name_limit: Option<usize>,
    sequence_start: StartPolicy,
}

impl ObjectMigrator {
    pub fn new(runner: Arc<dyn SqlRunner>, config: &MigrationConfig) -> Result<Self> {
        if config.paths.is_empty() {
            return Err(MigrateError::Config(
                "at least one migration path must be configured".to_string(),
            ));
        }

        Ok(ObjectMigrator {
            store: BackupStore::new(Arc::clone(&runner), &config.backup_table),
            runner,
            paths: config.paths.clone(),
            table_name_limit: config.table_name_limit,
            sequence_start: config.sequence_start,
        })
    }

    /// Finds `<directory>/<file>.sql` under the configured migration paths,
    /// first hit wins. The content is trimmed so a trailing newline does
    /// not end up inside the executed statement.
    fn read_source(&self, kind: ObjectKind, file: &str) -> Result<String> {
        for path in &self.paths {
            let candidate = path.join(kind.directory()).join(format!("{}.sql", file));
            if candidate.is_file() {
                let content = fs::read_to_string(&candidate)?;
                return Ok(content.trim().to_string());
            }
        }

        Err(MigrateError::FileNotFound {
            directory: kind.directory().to_string(),
            file: file.to_string(),
        })
    }

    /// The statements that define an object, in execution order. Packages
    /// contribute two files, specification then body.
    fn read_object_sources(&self, kind: ObjectKind, canonical: &str) -> Result<Vec<String>> {
        let mut sources = vec![self.read_source(kind, canonical)?];
        if kind.has_body() {
            sources.push(self.read_source(kind, &format!("{}{}", canonical, BODY_SUFFIX))?);
        }
        Ok(sources)
    }

    pub async fn create_object(&self, kind: ObjectKind, name: &str) -> Result<()> {
        let canonical = canonical_name(kind, name);
        let sources = self.read_object_sources(kind, &canonical)?;

        info!("Creating {} {}", kind, canonical);
        for sql in &sources {
            self.runner.execute(sql).await?;
        }
        Ok(())
    }

    /// Replaces an object, saving the live definition under `version`
    /// first. Source files are resolved before anything is written, so a
    /// missing file cannot leave a backup row without an applied change.
    pub async fn update_object(&self, kind: ObjectKind, name: &str, version: &str) -> Result<()> {
        let canonical = canonical_name(kind, name);
        let sources = self.read_object_sources(kind, &canonical)?;

        self.store.ensure_table().await?;
        let backup = self.store.snapshot(kind, &canonical).await;
        if backup.is_none() {
            debug!("No definition captured for {} {}", kind, canonical);
        }
        self.store
            .insert(&BackupRecord::new(version, &canonical, backup))
            .await?;

        info!("Updating {} {}", kind, canonical);
        for sql in &sources {
            self.runner.execute(sql).await?;
        }
        Ok(())
    }

    /// Reinstates the definition saved under `version`. The backup row is
    /// deleted only after the restore ran, so a failed replay can be
    /// retried.
    pub async fn undo_object(&self, kind: ObjectKind, name: &str, version: &str) -> Result<()> {
        let canonical = canonical_name(kind, name);

        self.store.ensure_table().await?;
        let backup = match self.store.fetch(version, &canonical).await? {
            Some(ddl) if !ddl.trim().is_empty() => ddl,
            _ => {
                return Err(MigrateError::BackupMissing {
                    version: version.to_string(),
                    object: canonical,
                })
            }
        };

        info!("Restoring {} {} from version {}", kind, canonical, version);
        for sql in split_backup_statements(kind, &backup) {
            self.runner.execute(&sql).await?;
        }

        self.store.delete(version, &canonical).await
    }

    pub async fn drop_object(&self, kind: ObjectKind, name: &str) -> Result<()> {
        let canonical = canonical_name(kind, name);

        info!("Dropping {} {}", kind, canonical);
        self.runner
            .execute(&format!("DROP {} {}", kind.keyword(), canonical))
            .await
    }

    /// Runs one operation over a batch of names. A failed object is
    /// reported and the batch moves on; the summary error keeps the run
    /// from looking clean.
    pub async fn run_objects(
        &self,
        operation: &Operation,
        kind: ObjectKind,
        names: &[String],
    ) -> Result<()> {
        let total = names.len();
        let mut failed = 0;

        for name in names {
            let result = match operation {
                Operation::Create => self.create_object(kind, name).await,
                Operation::Update { version } => self.update_object(kind, name, version).await,
                Operation::Undo { version } => self.undo_object(kind, name, version).await,
                Operation::Drop => self.drop_object(kind, name).await,
            };

            if let Err(err) = result {
                error!("Failed to {} {} {}: {}", operation, kind, name, err);
                failed += 1;
            }
        }

        if failed > 0 {
            return Err(MigrateError::Batch { failed, total });
        }
        Ok(())
    }

    /// Creates a table, synthesizing sequence, trigger and marker comment
    /// for an auto-increment column. Statement order matters: the sequence
    /// must exist before the trigger referencing it compiles.
    pub async fn create_table(&self, name: &str, columns: &[ColumnDefinition]) -> Result<()> {
        let table = name.to_uppercase();
        validate_table_name(&table, self.table_name_limit)?;

        let columns: Vec<ColumnDefinition> = columns
            .iter()
            .map(|column| {
                let mut upped = column.clone();
                upped.name = column.name.to_uppercase();
                upped
            })
            .collect();

        let auto = sequence::autoincrement_column(&columns).cloned();

        info!("Creating table {}", table);

        if let Some(column) = &auto {
            let start = match sequence::resolve_start(
                self.runner.as_ref(),
                self.sequence_start,
                &table,
                &column.name,
            )
            .await
            {
                Ok(start) => start,
                // The continue policy ran against a table that does not
                // exist yet; the sequence starts fresh. Other read
                // failures surface.
                Err(err) if is_missing_table(&err) => {
                    debug!("{} does not exist yet, seeding from 1: {}", table, err);
                    1
                }
                Err(err) => return Err(err),
            };
            self.runner
                .execute(&sequence::autoincrement_sequence_sql(&table, start))
                .await?;
        }

        self.runner
            .execute(&build_create_table_sql(&table, &columns))
            .await?;

        if let Some(column) = &auto {
            self.runner
                .execute(&sequence::autoincrement_trigger_sql(&table, &column.name))
                .await?;
        }

        for column in &columns {
            let is_auto = auto
                .as_ref()
                .map(|picked| picked.name == column.name)
                .unwrap_or(false);
            // The marker comment wins over an authored comment; it is what
            // later identifies the column as sequence-backed.
            let comment = if is_auto {
                Some(sequence::AUTOINCREMENT_MARKER.to_string())
            } else {
                column.comment.clone()
            };
            if let Some(comment) = comment {
                let sql = format!(
                    "COMMENT ON COLUMN \"{}\".\"{}\" IS {}",
                    table,
                    column.name,
                    self.runner.quote_value(&comment)
                );
                self.runner.execute(&sql).await?;
            }
        }

        Ok(())
    }

    /// Drops a table together with its conventional sequence, when one
    /// exists. The trigger goes down with the table.
    pub async fn drop_table(&self, name: &str) -> Result<()> {
        let table = name.to_uppercase();

        let probe = format!(
            "SELECT COUNT(*) FROM user_tables WHERE table_name = {}",
            self.runner.quote_value(&table)
        );
        if query_count(self.runner.as_ref(), &probe).await? == 0 {
            return Err(MigrateError::UnknownTable(table));
        }

        if sequence::conventional_sequence_exists(self.runner.as_ref(), &table).await? {
            self.runner
                .execute(&sequence::drop_sequence_sql(&sequence::sequence_name(&table)))
                .await?;
        }

        info!("Dropping table {}", table);
        self.runner
            .execute(&format!("DROP TABLE \"{}\"", table))
            .await
    }

    pub async fn drop_tables(&self, names: &[String]) -> Result<()> {
        let total = names.len();
        let mut failed = 0;

        for name in names {
            if let Err(err) = self.drop_table(name).await {
                error!("Failed to drop table {}: {}", name, err);
                failed += 1;
            }
        }

        if failed > 0 {
            return Err(MigrateError::Batch { failed, total });
        }
        Ok(())
    }

    /// Recreates the conventional sequence of a table above the current
    /// column maximum. Used after bulk loads that inserted explicit keys
    /// past the sequence.
    pub async fn regenerate_sequence(&self, table: &str, column: &str) -> Result<()> {
        let table = table.to_uppercase();
        let column = column.to_uppercase();
        let name = sequence::sequence_name(&table);

        if sequence::conventional_sequence_exists(self.runner.as_ref(), &table).await? {
            self.runner
                .execute(&sequence::drop_sequence_sql(&name))
                .await?;
        }

        let start = sequence::resolve_start(
            self.runner.as_ref(),
            StartPolicy::Continue,
            &table,
            &column,
        )
        .await?;

        info!("Recreating sequence {} starting at {}", name, start);
        self.runner
            .execute(&sequence::autoincrement_sequence_sql(&table, start))
            .await
    }
}

/// ORA-00942 is the driver text for a query against a table that does
/// not exist. Start resolution during table creation tolerates exactly
/// this failure.
fn is_missing_table(err: &MigrateError) -> bool {
    matches!(err, MigrateError::Execution(message) if message.contains("ORA-00942"))
}

/// Splits a captured package backup into its specification and body. Other
/// kinds, and captures without a body, restore as a single statement.
fn split_backup_statements(kind: ObjectKind, backup: &str) -> Vec<String> {
    if kind.has_body() {
        if let Some(found) = PACKAGE_BODY_BOUNDARY.find(backup) {
            let head = backup[..found.start()].trim();
            let body = backup[found.start()..].trim();
            if head.is_empty() {
                return vec![body.to_string()];
            }
            return vec![head.to_string(), body.to_string()];
        }
    }

    vec![backup.trim().to_string()]
}

#[cfg(test)]
mod tests {
    use super::*;

    const PACKAGE_BACKUP: &str = "\n  CREATE OR REPLACE EDITIONABLE PACKAGE \"S\".\"PKG_REPORTS\" AS\n  PROCEDURE run;\nEND;\n\n  CREATE OR REPLACE EDITIONABLE PACKAGE BODY \"S\".\"PKG_REPORTS\" AS\n  PROCEDURE run IS BEGIN NULL; END;\nEND;\n";

    #[test]
    fn package_backup_splits_at_the_body() {
        let statements = split_backup_statements(ObjectKind::Package, PACKAGE_BACKUP);
        assert_eq!(statements.len(), 2);
        assert!(statements[0].starts_with("CREATE OR REPLACE EDITIONABLE PACKAGE \"S\".\"PKG_REPORTS\""));
        assert!(statements[1].starts_with("CREATE OR REPLACE EDITIONABLE PACKAGE BODY"));
        assert!(statements[0].ends_with("END;"));
        assert!(statements[1].ends_with("END;"));
    }

    #[test]
    fn headless_package_backup_stays_whole() {
        let backup = "CREATE OR REPLACE PACKAGE BODY PKG_X AS PROCEDURE p IS BEGIN NULL; END; END;";
        let statements = split_backup_statements(ObjectKind::Package, backup);
        assert_eq!(statements.len(), 1);
        assert_eq!(statements[0], backup);
    }

    #[test]
    fn non_package_backup_is_never_split() {
        let backup = "CREATE OR REPLACE FUNCTION FNC_X RETURN NUMBER IS BEGIN RETURN 1; END;";
        let statements = split_backup_statements(ObjectKind::View, backup);
        assert_eq!(statements, vec![backup.to_string()]);
    }

    #[test]
    fn body_match_tolerates_whitespace_and_editions() {
        let backup = "CREATE  OR\nREPLACE  PACKAGE PKG_Y AS END;\nCREATE OR REPLACE\n NONEDITIONABLE PACKAGE BODY PKG_Y AS END;";
        let statements = split_backup_statements(ObjectKind::Package, backup);
        assert_eq!(statements.len(), 2);
        assert!(statements[1].contains("NONEDITIONABLE PACKAGE BODY"));
    }
}
