// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! Flat assertions used by the property, header and body steps. Unlike the
//! structural matcher these compare rendered text only.

use crate::{errors::StepError, pattern::render_value};
use regex::Regex;
use serde_json::{Map, Value};

/// Returns the value under `key`, or fails with `"<key> not found"`.
pub fn assert_has_key<'a>(key: &str, map: &'a Map<String, Value>) -> Result<&'a Value, StepError> {
    map.get(key).ok_or_else(|| StepError::KeyNotFound(key.to_owned()))
}

pub fn assert_equals(expected: &str, actual: &str) -> Result<(), StepError> {
    if expected == actual {
        return Ok(());
    }

    Err(StepError::NotEqual {
        expected: expected.to_owned(),
        actual: actual.to_owned(),
    })
}

/// Compares a JSON value with expected text, rendering strings unquoted.
pub fn assert_value_equals(expected: &str, actual: &Value) -> Result<(), StepError> {
    assert_equals(expected, &render_value(actual))
}

/// Succeeds when the regular expression `item` finds a match in `content`.
pub fn assert_contains(item: &str, content: &str) -> Result<(), StepError> {
    if Regex::new(item)?.is_match(content) {
        return Ok(());
    }

    Err(StepError::NotContained {
        item: item.to_owned(),
        content: content.to_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_key_is_reported_by_name() {
        let map = Map::new();

        assert_eq!(
            assert_has_key("content_type", &map).unwrap_err().to_string(),
            "content_type not found"
        );
    }

    #[test]
    fn values_are_compared_as_text() {
        assert!(assert_value_equals("2", &json!(2)).is_ok());
        assert!(assert_value_equals("acme", &json!("acme")).is_ok());
        assert_eq!(
            assert_value_equals("acme", &json!("other")).unwrap_err().to_string(),
            "other does not match expected \"acme\""
        );
    }

    #[test]
    fn contains_uses_regular_expressions() {
        assert!(assert_contains("order-[0-9]+", r#"{"ref": "order-42"}"#).is_ok());
        assert_eq!(
            assert_contains("refund", "payment").unwrap_err().to_string(),
            "refund not found in \"payment\""
        );
        assert!(matches!(
            assert_contains("(", "anything"),
            Err(StepError::InvalidRegex(_))
        ));
    }
}
