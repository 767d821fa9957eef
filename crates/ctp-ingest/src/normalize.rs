//! Study flattening
//!
//! Projects one nested registry study onto the fixed [`FlatTrialRow`] shape.
//! The projection is total: absent sections produce `None` fields, never an
//! error.
//!
//! Two quirks are kept because the cleansing stage reads the table as is:
//! only the first phase of a multi-phase trial survives, and an empty list
//! becomes `None` rather than an empty string.

use crate::lookup::{list_at, lookup, str_at};
use crate::models::{FlatTrialRow, RawStudyRecord};
use serde_json::Value;

/// Separator between entries of multi-valued columns
pub const LIST_DELIMITER: &str = "; ";

const IDENTIFICATION: &str = "identificationModule";
const STATUS: &str = "statusModule";
const DESIGN: &str = "designModule";

static ABSENT: Value = Value::Null;

/// Flatten one study
pub fn normalize_study(study: &RawStudyRecord) -> FlatTrialRow {
    FlatTrialRow {
        nct_id: text(study, &[IDENTIFICATION, "nctId"]),
        brief_title: text(study, &[IDENTIFICATION, "briefTitle"]),
        study_type: text(study, &[DESIGN, "studyType"]),
        phase: first_phase(study),
        overall_status: text(study, &[STATUS, "overallStatus"]),
        start_date: text(study, &[STATUS, "startDateStruct", "date"]),
        completion_date: text(study, &[STATUS, "completionDateStruct", "date"]),
        conditions: join_list(list(study, &["conditionsModule", "conditions"]), None),
        interventions: join_list(
            list(study, &["armsInterventionsModule", "interventions"]),
            Some("name"),
        ),
        countries: join_list(
            list(study, &["contactsLocationsModule", "locations"]),
            Some("country"),
        ),
    }
}

/// Flatten every study of a batch, keeping order
pub fn normalize_all(studies: &[RawStudyRecord]) -> Vec<FlatTrialRow> {
    studies.iter().map(normalize_study).collect()
}

fn protocol_section(study: &Value) -> &Value {
    lookup(study, &["protocolSection"]).unwrap_or(&ABSENT)
}

fn text(study: &Value, path: &[&str]) -> Option<String> {
    str_at(protocol_section(study), path).map(str::to_owned)
}

fn list<'a>(study: &'a Value, path: &[&str]) -> &'a [Value] {
    list_at(protocol_section(study), path)
}

fn first_phase(study: &Value) -> Option<String> {
    list(study, &[DESIGN, "phases"])
        .first()
        .and_then(Value::as_str)
        .map(str::to_owned)
}

/// Join a list into one column value
///
/// With `field` set, each element is an object projected through that key.
/// Elements that do not yield a string become empty segments, so the segment
/// count always equals the list length. An empty list yields `None`.
fn join_list(items: &[Value], field: Option<&str>) -> Option<String> {
    if items.is_empty() {
        return None;
    }

    let segments: Vec<&str> = items
        .iter()
        .map(|item| {
            let value = match field {
                Some(key) => str_at(item, &[key]),
                None => item.as_str(),
            };
            value.unwrap_or_default()
        })
        .collect();

    Some(segments.join(LIST_DELIMITER))
}
