//! One ingestion run: fetch, flatten, order, load
//!
//! Each stage runs only after the previous one has finished for the whole
//! batch. The first error ends the run; nothing is retried here.

use crate::client::RegistryClient;
use crate::config::IngestConfig;
use crate::error::Result;
use crate::models::{IngestionBatch, RawStudyRecord};
use crate::normalize::normalize_all;
use crate::ordering::order_for_load;
use crate::storage::{LoadSummary, TrialStore};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

/// What a completed run did
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub pages_fetched: usize,
    pub records_fetched: usize,
    pub load: LoadSummary,
}

impl fmt::Display for IngestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let elapsed = self.finished_at - self.started_at;
        write!(
            f,
            "Fetched {} studies in {} page(s); inserted {} new, skipped {} existing ({:.1}s, run {})",
            self.records_fetched,
            self.pages_fetched,
            self.load.inserted,
            self.load.skipped,
            elapsed.num_milliseconds() as f64 / 1000.0,
            self.run_id
        )
    }
}

/// Flatten raw studies and put them in load order
pub fn prepare_batch(studies: &[RawStudyRecord]) -> IngestionBatch {
    let mut batch = normalize_all(studies);
    order_for_load(&mut batch);
    batch
}

/// Runs ingestion against one registry and one destination
pub struct Ingestor {
    client: RegistryClient,
    store: TrialStore,
}

impl Ingestor {
    pub fn new(config: &IngestConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            client: RegistryClient::new(config.api.clone())?,
            store: TrialStore::new(config.database.clone()),
        })
    }

    /// Fetch and prepare a batch without loading it
    pub async fn collect(&self) -> Result<(IngestionBatch, usize)> {
        let outcome = self.client.fetch_studies().await?;
        let batch = prepare_batch(&outcome.studies);
        Ok((batch, outcome.pages_fetched))
    }

    /// Execute a full run
    pub async fn run(&self) -> Result<IngestReport> {
        let run_id = Uuid::new_v4();
        let span = info_span!("ingest_run", %run_id);

        async move {
            let started_at = Utc::now();
            info!(
                base_url = %self.client.config().base_url,
                limit = self.client.config().record_limit,
                "Fetching latest trials"
            );

            let (batch, pages_fetched) = self.collect().await?;
            let records_fetched = batch.len();

            let load = self.store.load(&batch).await?;

            let report = IngestReport {
                run_id,
                started_at,
                finished_at: Utc::now(),
                pages_fetched,
                records_fetched,
                load,
            };
            info!(
                records = report.records_fetched,
                inserted = report.load.inserted,
                skipped = report.load.skipped,
                "Ingestion run complete"
            );

            Ok(report)
        }
        .instrument(span)
        .await
    }
}
