//! CTP Ingest Library
//!
//! Loads clinical-trial records from the ClinicalTrials.gov registry into the
//! `bronze.raw_trials` staging table: the first stage of the
//! ingest → cleanse → aggregate pipeline.
//!
//! # Stages
//!
//! - **Fetch** ([`client`]): walk the cursor-paginated studies endpoint up to a
//!   record limit
//! - **Flatten** ([`normalize`]): project each nested study onto a fixed row
//! - **Order** ([`ordering`]): latest start date first, undated last
//! - **Load** ([`storage`]): create-if-missing, insert, skip existing ids,
//!   commit once
//!
//! # Example
//!
//! ```no_run
//! use ctp_ingest::{IngestConfig, Ingestor};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> ctp_ingest::Result<()> {
//!     let config = IngestConfig::load()?;
//!     let report = Ingestor::new(&config)?.run().await?;
//!     println!("{report}");
//!     Ok(())
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod client;
pub mod config;
pub mod error;
pub mod ingest;
pub mod lookup;
pub mod models;
pub mod normalize;
pub mod ordering;
pub mod pipeline;
pub mod storage;

pub use config::{ApiConfig, DatabaseConfig, IngestConfig};
pub use error::{IngestError, Result};
pub use ingest::{prepare_batch, IngestReport, Ingestor};
pub use models::{FlatTrialRow, IngestionBatch, RawStudyRecord};
