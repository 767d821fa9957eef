//! Data models for registry ingestion

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One study exactly as returned by the registry
///
/// Only ever read through [`crate::lookup`]; never persisted.
pub type RawStudyRecord = Value;

/// Flattened rows produced by one run, in load order
pub type IngestionBatch = Vec<FlatTrialRow>;

/// One page of the studies search endpoint
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudiesPage {
    /// Absent and `null` both decode to an empty page
    #[serde(default, deserialize_with = "null_as_empty")]
    pub studies: Vec<RawStudyRecord>,

    /// Continuation cursor for the next page
    #[serde(default)]
    pub next_page_token: Option<String>,

    /// Only present when `countTotal=true` was requested
    #[serde(default)]
    pub total_count: Option<u64>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default())
}

/// A trial projected onto the `bronze.raw_trials` row shape
///
/// Field order matches the destination column order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct FlatTrialRow {
    /// Primary key at the destination. Missing only for malformed records,
    /// which the table's NOT NULL key then rejects.
    pub nct_id: Option<String>,
    pub brief_title: Option<String>,
    pub study_type: Option<String>,
    /// First listed phase only
    pub phase: Option<String>,
    pub overall_status: Option<String>,
    /// Partial ISO date ("2023-01" or "2023-01-15"), kept verbatim
    pub start_date: Option<String>,
    pub completion_date: Option<String>,
    /// `"; "`-joined, `None` when the source list is empty
    pub conditions: Option<String>,
    pub interventions: Option<String>,
    pub countries: Option<String>,
}
