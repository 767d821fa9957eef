//! Shared helpers for ctp-ingest integration tests
//!
//! - [`TestPostgres`]: a throwaway PostgreSQL container per test
//! - [`study`]: builds a registry study document with the fields the
//!   flattener reads
//! - [`studies_page`]: wraps studies in a registry page body
//!
//! Database tests are `#[ignore = "requires Docker"]`; run them with
//! `cargo test -- --ignored`.

#![allow(dead_code)]

use anyhow::{Context, Result};
use ctp_ingest::DatabaseConfig;
use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use testcontainers::{core::IntoContainerPort, runners::AsyncRunner, ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;
use tracing::{debug, info};

// ============================================================================
// PostgreSQL Test Container
// ============================================================================

/// PostgreSQL container plus a small pool for assertions
///
/// The loader under test opens its own connection from [`TestPostgres::database_config`].
pub struct TestPostgres {
    _container: ContainerAsync<Postgres>,
    pool: PgPool,
    host: String,
    port: u16,
}

impl TestPostgres {
    pub async fn start() -> Result<Self> {
        info!("Starting PostgreSQL test container...");

        let container = Postgres::default()
            .with_tag("16-alpine")
            .start()
            .await
            .context("Failed to start PostgreSQL container")?;

        let host = container
            .get_host()
            .await
            .context("Failed to get container host")?
            .to_string();
        let port = container
            .get_host_port_ipv4(5432.tcp())
            .await
            .context("Failed to get container port")?;

        let connection_string = format!("postgresql://postgres:postgres@{host}:{port}/postgres");
        debug!("PostgreSQL connection: {}", connection_string);

        let pool = PgPoolOptions::new()
            .max_connections(2)
            .acquire_timeout(Duration::from_secs(30))
            .connect(&connection_string)
            .await
            .context("Failed to connect to PostgreSQL")?;

        Ok(Self {
            _container: container,
            pool,
            host,
            port,
        })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Destination settings pointing at this container
    pub fn database_config(&self) -> DatabaseConfig {
        DatabaseConfig {
            url: None,
            host: self.host.clone(),
            port: self.port,
            name: "postgres".to_string(),
            user: "postgres".to_string(),
            password: "postgres".to_string(),
            connect_timeout_secs: 30,
        }
    }

    pub async fn count_rows(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM bronze.raw_trials")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count rows")?;
        Ok(count)
    }

    pub async fn table_exists(&self) -> Result<bool> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM information_schema.tables \
             WHERE table_schema = 'bronze' AND table_name = 'raw_trials')",
        )
        .fetch_one(&self.pool)
        .await
        .context("Failed to inspect information_schema")?;
        Ok(exists)
    }
}

// ============================================================================
// Registry fixtures
// ============================================================================

/// A study with identification, status and condition fields filled in
pub fn study(nct_id: &str, title: &str, start_date: Option<&str>) -> Value {
    let mut status = json!({"overallStatus": "RECRUITING"});
    if let Some(date) = start_date {
        status["startDateStruct"] = json!({"date": date});
    }

    json!({
        "protocolSection": {
            "identificationModule": {"nctId": nct_id, "briefTitle": title},
            "statusModule": status,
            "designModule": {"studyType": "INTERVENTIONAL", "phases": ["PHASE2"]},
            "conditionsModule": {"conditions": ["Asthma"]}
        }
    })
}

/// A registry page body
pub fn studies_page(studies: Vec<Value>, next_page_token: Option<&str>) -> Value {
    let mut page = json!({"studies": studies, "totalCount": 12345});
    if let Some(token) = next_page_token {
        page["nextPageToken"] = json!(token);
    }
    page
}

/// `count` numbered studies starting at `first`
pub fn numbered_studies(first: usize, count: usize) -> Vec<Value> {
    (first..first + count)
        .map(|n| study(&format!("NCT{n:08}"), &format!("Study {n}"), Some("2024-01")))
        .collect()
}

/// Initialize tracing for tests
pub fn init_test_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let _ = fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("info,ctp_ingest=debug,sqlx=warn,testcontainers=info")
        }))
        .with_test_writer()
        .try_init();
}
