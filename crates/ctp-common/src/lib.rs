//! CTP Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared plumbing for the clinical trials pipeline workspace members.
//!
//! - **Logging**: one place that builds the `tracing` subscriber for every
//!   binary, driven by environment variables or a builder.
//!
//! # Example
//!
//! ```no_run
//! use ctp_common::logging::{init_logging, LogConfig};
//! use tracing::info;
//!
//! fn main() -> anyhow::Result<()> {
//!     let _guard = init_logging(&LogConfig::from_env()?)?;
//!     info!("Pipeline step started");
//!     Ok(())
//! }
//! ```

pub mod logging;

pub use logging::{init_logging, LogConfig, LoggingGuard};
