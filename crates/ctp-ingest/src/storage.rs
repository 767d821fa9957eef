// Staging loader for bronze.raw_trials
//
// One dedicated connection, one transaction, one commit per run:
// - schema and table are created inside the same transaction as the inserts
// - rows already present (by nct_id) are left untouched
// - any failure rolls the whole batch back
//
// Inserts go out as multi-row statements of at most 500 rows to stay well
// under the PostgreSQL bind parameter limit (65,535).

use crate::config::DatabaseConfig;
use crate::error::{IngestError, Result};
use crate::models::FlatTrialRow;
use serde::Serialize;
use sqlx::{Connection, PgConnection, Postgres, QueryBuilder};
use tracing::{debug, info, instrument};

pub const STAGING_SCHEMA: &str = "bronze";
pub const STAGING_TABLE: &str = "raw_trials";

const INSERT_CHUNK_SIZE: usize = 500;

const CREATE_SCHEMA_SQL: &str = "CREATE SCHEMA IF NOT EXISTS bronze";

const CREATE_TABLE_SQL: &str = r#"
    CREATE TABLE IF NOT EXISTS bronze.raw_trials (
        nct_id TEXT PRIMARY KEY,
        brief_title TEXT,
        study_type TEXT,
        phase TEXT,
        overall_status TEXT,
        start_date TEXT,
        completion_date TEXT,
        conditions TEXT,
        interventions TEXT,
        countries TEXT
    )
"#;

/// Outcome of one load
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    pub attempted: usize,
    /// Rows actually written
    pub inserted: u64,
    /// Rows whose nct_id was already present
    pub skipped: u64,
}

/// Writes ingestion batches into the staging table
pub struct TrialStore {
    config: DatabaseConfig,
}

impl TrialStore {
    pub fn new(config: DatabaseConfig) -> Self {
        Self { config }
    }

    /// Open the single connection used for a load
    async fn connect(&self) -> Result<PgConnection> {
        let options = self.config.connect_options()?;
        let timeout = self.config.connect_timeout();

        match tokio::time::timeout(timeout, PgConnection::connect_with(&options)).await {
            Ok(conn) => Ok(conn?),
            Err(_) => Err(IngestError::Database(sqlx::Error::Io(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                format!("connecting to destination database timed out after {timeout:?}"),
            )))),
        }
    }

    /// Load a batch, committing once
    ///
    /// An empty batch is a no-op and does not open a connection. On error the
    /// connection is dropped, which rolls back the open transaction and closes
    /// the socket.
    #[instrument(skip_all, fields(rows = batch.len()))]
    pub async fn load(&self, batch: &[FlatTrialRow]) -> Result<LoadSummary> {
        if batch.is_empty() {
            info!("No new studies to insert");
            return Ok(LoadSummary::default());
        }

        let mut conn = self.connect().await?;
        let summary = load_batch(&mut conn, batch).await?;
        conn.close().await?;

        Ok(summary)
    }
}

/// Create `bronze` and `bronze.raw_trials` if missing; never alters them
pub async fn ensure_schema(conn: &mut PgConnection) -> Result<()> {
    sqlx::query(CREATE_SCHEMA_SQL).execute(&mut *conn).await?;
    sqlx::query(CREATE_TABLE_SQL).execute(&mut *conn).await?;
    Ok(())
}

/// Ensure the table and insert `batch` in a single transaction
pub async fn load_batch(conn: &mut PgConnection, batch: &[FlatTrialRow]) -> Result<LoadSummary> {
    let mut tx = conn.begin().await?;

    ensure_schema(&mut *tx).await?;

    let mut inserted = 0u64;
    for chunk in batch.chunks(INSERT_CHUNK_SIZE) {
        inserted += insert_chunk(&mut *tx, chunk).await?;
    }

    tx.commit().await?;

    let summary = LoadSummary {
        attempted: batch.len(),
        inserted,
        skipped: batch.len() as u64 - inserted,
    };

    info!(
        attempted = summary.attempted,
        inserted = summary.inserted,
        skipped = summary.skipped,
        "Loaded batch into {}.{}",
        STAGING_SCHEMA,
        STAGING_TABLE
    );

    Ok(summary)
}

async fn insert_chunk(conn: &mut PgConnection, rows: &[FlatTrialRow]) -> Result<u64> {
    let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new(
        r#"
        INSERT INTO bronze.raw_trials (
            nct_id, brief_title, study_type, phase, overall_status,
            start_date, completion_date, conditions, interventions, countries
        )
        "#,
    );

    query_builder.push_values(rows, |mut b, row| {
        b.push_bind(&row.nct_id)
            .push_bind(&row.brief_title)
            .push_bind(&row.study_type)
            .push_bind(&row.phase)
            .push_bind(&row.overall_status)
            .push_bind(&row.start_date)
            .push_bind(&row.completion_date)
            .push_bind(&row.conditions)
            .push_bind(&row.interventions)
            .push_bind(&row.countries);
    });

    query_builder.push(" ON CONFLICT (nct_id) DO NOTHING");

    let result = query_builder.build().execute(&mut *conn).await?;

    debug!(
        chunk = rows.len(),
        inserted = result.rows_affected(),
        "Inserted chunk"
    );

    Ok(result.rows_affected())
}
