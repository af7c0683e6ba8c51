//! Staged upserts into the SQLite listening-history store.

mod merge;
mod schema;

pub use merge::{MergeTable, StagedRow, ALBUMS_MERGE, ARTISTS_MERGE, PLAY_LOG_MERGE, TRACKS_MERGE};
pub use schema::{STAGING_TABLES, STORE_VERSIONED_SCHEMAS};

use crate::sqlite_persistence::BASE_DB_VERSION;
use crate::transform::Batch;
use anyhow::Context;
use chrono::NaiveDate;
use rusqlite::{params, Connection, ErrorCode};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to open store at {path:?}: {source}")]
    Connection {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    #[error("Constraint violation while merging {table}: {source}")]
    Constraint {
        table: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Store query failed while merging {table}: {source}")]
    Query {
        table: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Batch stopped after committing {completed:?}: {source}")]
    PartialBatch {
        completed: Vec<&'static str>,
        #[source]
        source: Box<LoadError>,
    },
}

impl LoadError {
    fn from_sqlite(table: &'static str, source: rusqlite::Error) -> Self {
        if source.sqlite_error_code() == Some(ErrorCode::ConstraintViolation) {
            LoadError::Constraint { table, source }
        } else {
            LoadError::Query { table, source }
        }
    }

    /// Target table whose merge failed, if the failure is tied to one.
    pub fn failed_table(&self) -> Option<&'static str> {
        match self {
            LoadError::Connection { .. } => None,
            LoadError::Constraint { table, .. } | LoadError::Query { table, .. } => Some(*table),
            LoadError::PartialBatch { source, .. } => source.failed_table(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableReport {
    pub table: &'static str,
    pub staged: usize,
    pub inserted: usize,
    pub refreshed: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub tables: Vec<TableReport>,
}

impl LoadReport {
    fn record(&mut self, outcome: Result<TableReport, LoadError>) -> Result<(), LoadError> {
        match outcome {
            Ok(table) => {
                self.tables.push(table);
                Ok(())
            }
            Err(err) if self.tables.is_empty() => Err(err),
            Err(err) => Err(LoadError::PartialBatch {
                completed: self.tables.iter().map(|t| t.table).collect(),
                source: Box::new(err),
            }),
        }
    }

    pub fn table(&self, name: &str) -> Option<&TableReport> {
        self.tables.iter().find(|t| t.table == name)
    }
}

pub struct MusicStore {
    conn: Connection,
}

impl MusicStore {
    /// Opens the store, creating the schema on a fresh file and validating
    /// it on an existing one.
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self, LoadError> {
        let path = db_path.as_ref();
        Self::open_inner(path).map_err(|err| LoadError::Connection {
            path: path.to_path_buf(),
            source: err.into(),
        })
    }

    fn open_inner(path: &Path) -> anyhow::Result<Self> {
        let is_new_db = !path.exists();

        let conn = Connection::open(path).context("Failed to open store database")?;
        conn.execute("PRAGMA foreign_keys = ON;", [])?;

        let latest = STORE_VERSIONED_SCHEMAS
            .last()
            .context("No store schema defined")?;

        if is_new_db {
            info!("Creating new store database at {:?}", path);
            latest.create(&conn)?;
        } else {
            let raw_version: i64 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
            let db_version = raw_version - BASE_DB_VERSION as i64;

            if db_version < 1 {
                anyhow::bail!(
                    "Store database version {} is invalid (expected >= 1)",
                    db_version
                );
            }

            let schema = STORE_VERSIONED_SCHEMAS
                .iter()
                .find(|s| s.version as i64 == db_version)
                .with_context(|| format!("Unknown store database version {}", db_version))?;
            schema.validate(&conn).with_context(|| {
                format!(
                    "Store database schema validation failed for version {}",
                    db_version
                )
            })?;
            debug!("Opened store database at {:?} (version {})", path, db_version);
        }

        for staging in STAGING_TABLES {
            staging
                .create_if_missing(&conn)
                .with_context(|| format!("Failed to create staging table {}", staging.name))?;
        }

        Ok(Self { conn })
    }

    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Sets the inclusive range of play dates the aggregation views cover.
    pub fn set_recap_window(&self, start: NaiveDate, end: NaiveDate) -> rusqlite::Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM recap_window", [])?;
        tx.execute(
            "INSERT INTO recap_window (week_start, week_end) VALUES (?1, ?2)",
            params![start.to_string(), end.to_string()],
        )?;
        tx.commit()
    }

    /// Merges a batch table by table: artists, albums, tracks, play log.
    ///
    /// Each table commits on its own. When a table fails, the ones before it
    /// stay committed, its own changes (staging included) are rolled back,
    /// and the rest are not touched.
    pub fn load(&mut self, batch: &Batch) -> Result<LoadReport, LoadError> {
        let mut report = LoadReport::default();
        report.record(self.merge(&ARTISTS_MERGE, &batch.artists))?;
        report.record(self.merge(&ALBUMS_MERGE, &batch.albums))?;
        report.record(self.merge(&TRACKS_MERGE, &batch.tracks))?;
        report.record(self.merge(&PLAY_LOG_MERGE, &batch.plays))?;
        Ok(report)
    }

    fn merge<R: StagedRow>(
        &mut self,
        merge: &MergeTable,
        rows: &[R],
    ) -> Result<TableReport, LoadError> {
        let table = merge.target.name;
        let fail = |source: rusqlite::Error| LoadError::from_sqlite(table, source);

        let tx = self.conn.transaction().map_err(fail)?;
        merge.staging.create_if_missing(&tx).map_err(fail)?;

        let mut staged = 0;
        {
            let mut stmt = tx.prepare(merge.stage_sql).map_err(fail)?;
            for row in rows {
                staged += row.stage(&mut stmt).map_err(fail)?;
            }
        }

        let inserted = tx.execute(merge.insert_missing_sql, []).map_err(fail)?;
        let refreshed = match merge.refresh_sql {
            Some(sql) => tx.execute(sql, []).map_err(fail)?,
            None => 0,
        };
        tx.execute(merge.clear_sql, []).map_err(fail)?;
        tx.commit().map_err(fail)?;

        debug!(
            "Merged {}: {} staged, {} inserted, {} refreshed",
            table, staged, inserted, refreshed
        );
        Ok(TableReport {
            table,
            staged,
            inserted,
            refreshed,
        })
    }
}
