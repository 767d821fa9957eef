//! Load ordering
//!
//! Trials with a known start date come first, latest date first. Trials
//! without one go last. Dates are compared as plain strings.

use crate::models::FlatTrialRow;
use std::cmp::Ordering;

/// Sort a whole batch into load order
///
/// Stable, so rows with equal start dates keep their fetch order, and
/// idempotent.
pub fn order_for_load(batch: &mut [FlatTrialRow]) {
    batch.sort_by(|a, b| compare_start_dates(a.start_date.as_deref(), b.start_date.as_deref()));
}

fn compare_start_dates(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.cmp(a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
