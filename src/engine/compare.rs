//! Asymmetric comparison of a desired body against a remote resource.
//!
//! Only keys present in the desired body are compared. Fields the user
//! left unspecified, and the server-side bookkeeping fields every
//! Intersight object carries, never cause an update.

use serde_json::{Map, Value};

use crate::intersight::{DesiredSpec, RemoteResource};

/// Returns true if every field of `desired` is matched by `actual`.
#[must_use]
pub fn spec_matches(desired: &DesiredSpec, actual: &RemoteResource) -> bool {
    objects_match(desired.as_map(), actual.as_map())
}

/// Deep, asymmetric value comparison.
///
/// Objects match when each desired key (except write-only secrets) exists
/// in `actual` with a matching value. Lists match element-wise and must
/// have the same length. Numbers compare by value, everything else by
/// equality.
#[must_use]
pub fn values_match(desired: &Value, actual: &Value) -> bool {
    match (desired, actual) {
        (Value::Object(desired), Value::Object(actual)) => objects_match(desired, actual),
        (Value::Array(desired), Value::Array(actual)) => {
            desired.len() == actual.len()
                && desired
                    .iter()
                    .zip(actual)
                    .all(|(d, a)| values_match(d, a))
        }
        (Value::Number(desired), Value::Number(actual)) => {
            desired == actual || desired.as_f64() == actual.as_f64()
        }
        _ => desired == actual,
    }
}

fn objects_match(desired: &Map<String, Value>, actual: &Map<String, Value>) -> bool {
    desired.iter().all(|(key, value)| {
        if is_write_only(key) {
            return true;
        }
        actual
            .get(key)
            .is_some_and(|current| values_match(value, current))
    })
}

/// Secrets are never echoed back by Intersight.
fn is_write_only(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    key.contains("password") || key.contains("passwd") || key.contains("pwd")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn desired(value: Value) -> DesiredSpec {
        match value {
            Value::Object(map) => DesiredSpec::from(map),
            _ => DesiredSpec::new(),
        }
    }

    fn remote(value: Value) -> RemoteResource {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_extra_remote_keys_are_ignored() {
        let d = desired(json!({"Name": "COS-MP", "Description": "pool"}));
        let r = remote(json!({
            "Moid": "m1",
            "ObjectType": "macpool.Pool",
            "Name": "COS-MP",
            "Description": "pool",
            "Size": 256
        }));
        assert!(spec_matches(&d, &r));
    }

    #[test]
    fn test_missing_remote_key_is_mismatch() {
        let d = desired(json!({"Name": "COS-MP", "Description": "pool"}));
        let r = remote(json!({"Name": "COS-MP"}));
        assert!(!spec_matches(&d, &r));
    }

    #[test]
    fn test_nested_reference_matches_expanded_remote() {
        let d = desired(json!({"Organization": {"Moid": "org-1"}}));
        let r = remote(json!({
            "Organization": {"ClassId": "mo.MoRef", "Moid": "org-1", "ObjectType": "organization.Organization"}
        }));
        assert!(spec_matches(&d, &r));
    }

    #[test]
    fn test_lists_compare_element_wise() {
        let d = desired(json!({"MacBlocks": [{"From": "00:25:B5:00:00:00", "To": "00:25:B5:00:00:FF"}]}));
        let same = remote(json!({
            "MacBlocks": [{"ClassId": "macpool.Block", "From": "00:25:B5:00:00:00", "To": "00:25:B5:00:00:FF", "Size": 256}]
        }));
        let longer = remote(json!({
            "MacBlocks": [
                {"From": "00:25:B5:00:00:00", "To": "00:25:B5:00:00:FF"},
                {"From": "00:25:B5:00:01:00", "To": "00:25:B5:00:01:FF"}
            ]
        }));
        let changed = remote(json!({"MacBlocks": [{"From": "00:25:B5:00:00:00", "To": "00:25:B5:00:00:0F"}]}));

        assert!(spec_matches(&d, &same));
        assert!(!spec_matches(&d, &longer));
        assert!(!spec_matches(&d, &changed));
    }

    #[test]
    fn test_write_only_keys_are_skipped() {
        let d = desired(json!({"Chap": {"UserId": "admin", "Password": "s3cret"}}));
        let r = remote(json!({"Chap": {"UserId": "admin", "IsPasswordSet": true}}));
        assert!(spec_matches(&d, &r));
    }

    #[test]
    fn test_numbers_compare_by_value() {
        assert!(values_match(&json!(30), &json!(30.0)));
        assert!(!values_match(&json!(30), &json!(31)));
        assert!(!values_match(&json!("30"), &json!(30)));
    }
}
