//! Registry API client
//!
//! Walks the cursor-paginated studies endpoint until the record budget is
//! spent or the registry runs out of pages. Requests are issued one at a time;
//! each is bounded by the configured timeout and never retried.

use crate::config::ApiConfig;
use crate::error::{IngestError, Result};
use crate::models::{RawStudyRecord, StudiesPage};
use reqwest::Client;
use tracing::{debug, error, info, instrument};

/// Raw studies collected by one walk
#[derive(Debug, Clone, Default)]
pub struct FetchOutcome {
    pub studies: Vec<RawStudyRecord>,
    pub pages_fetched: usize,
    /// Registry-reported total, when the registry sent one
    pub total_available: Option<u64>,
}

/// Client for the studies search endpoint
pub struct RegistryClient {
    client: Client,
    config: ApiConfig,
}

impl RegistryClient {
    pub fn new(config: ApiConfig) -> Result<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("ctp-ingest/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Fetch up to the configured record limit
    pub async fn fetch_studies(&self) -> Result<FetchOutcome> {
        self.fetch_up_to(self.config.record_limit).await
    }

    /// Fetch at most `limit` studies
    ///
    /// Stops as soon as `limit` records are held, dropping the rest of the
    /// current page instead of requesting another one. Also stops on an empty
    /// page or a missing continuation cursor.
    #[instrument(skip(self), fields(page_size = self.config.page_size))]
    pub async fn fetch_up_to(&self, limit: usize) -> Result<FetchOutcome> {
        let mut outcome = FetchOutcome::default();
        let mut cursor: Option<String> = None;

        while outcome.studies.len() < limit {
            let page = self.fetch_page(cursor.as_deref()).await?;
            outcome.pages_fetched += 1;

            if let Some(total) = page.total_count {
                outcome.total_available = Some(total);
            }

            if page.studies.is_empty() {
                debug!("Registry returned an empty page, stopping");
                break;
            }

            let remaining = limit - outcome.studies.len();
            let page_len = page.studies.len();
            outcome.studies.extend(page.studies.into_iter().take(remaining));

            if page_len > remaining {
                debug!(
                    discarded = page_len - remaining,
                    "Record limit reached mid-page"
                );
            }

            cursor = page.next_page_token.filter(|token| !token.is_empty());
            if cursor.is_none() {
                debug!("No continuation cursor, registry exhausted");
                break;
            }
        }

        info!(
            records = outcome.studies.len(),
            pages = outcome.pages_fetched,
            total_available = ?outcome.total_available,
            "Fetched studies from registry"
        );

        Ok(outcome)
    }

    async fn fetch_page(&self, cursor: Option<&str>) -> Result<StudiesPage> {
        let mut request = self
            .client
            .get(&self.config.base_url)
            .query(&[("pageSize", self.config.page_size)])
            .query(&[("countTotal", "true")]);

        if let Some(token) = cursor {
            request = request.query(&[("pageToken", token)]);
        }

        let response = request.send().await?;
        let url = response.url().to_string();
        let status = response.status();
        info!(%url, "Requesting studies page");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), %url, %body, "Registry API error body");
            return Err(IngestError::Http {
                status: status.as_u16(),
                url,
                body,
            });
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes)
            .map_err(|e| IngestError::parse(format!("unexpected body from {url}: {e}")))
    }
}
