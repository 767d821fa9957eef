//! Defaulting access into nested JSON documents
//!
//! A missing key, a `null`, or a non-object along the path all resolve to
//! "absent" instead of an error. Leaf helpers then turn absent into `None` or
//! an empty list.

use serde_json::Value;

/// Follow `path` through nested objects
///
/// Returns `None` if any step is missing, is not an object, or if the value
/// at the end is `null`.
pub fn lookup<'a>(root: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter()
        .try_fold(root, |node, key| node.as_object()?.get(*key))
        .filter(|value| !value.is_null())
}

/// String leaf at `path`; non-string leaves count as absent
pub fn str_at<'a>(root: &'a Value, path: &[&str]) -> Option<&'a str> {
    lookup(root, path)?.as_str()
}

/// Array at `path`, or an empty slice when absent or not an array
pub fn list_at<'a>(root: &'a Value, path: &[&str]) -> &'a [Value] {
    lookup(root, path)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}
