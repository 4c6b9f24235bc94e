// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Structural Matcher
//!
//! Compares an expected [`Pattern`] against an actual JSON value. Objects are
//! matched as closed structures: the key sets must be identical at every
//! level, then each expected entry is checked in pattern order. The first
//! failure ends the comparison.

use crate::{
    errors::{JsonSide, MatchError, StepError},
    pattern::Pattern,
};
use serde_json::{Map, Value};

/// Checks that `expected` and `actual` hold the same keys.
///
/// Missing keys are reported in expected order, extra keys in actual order.
/// `parent_path` names the nested object being compared, if any.
pub fn match_keys<'a, E, A>(
    expected: E,
    actual: A,
    parent_path: Option<&str>,
) -> Result<(), MatchError>
where
    E: IntoIterator<Item = &'a str>,
    A: IntoIterator<Item = &'a str>,
{
    let expected: Vec<&str> = expected.into_iter().collect();
    let actual: Vec<&str> = actual.into_iter().collect();

    let missing: Vec<String> = expected
        .iter()
        .filter(|key| !actual.contains(key))
        .map(|key| (*key).to_owned())
        .collect();
    let extra: Vec<String> = actual
        .iter()
        .filter(|key| !expected.contains(key))
        .map(|key| (*key).to_owned())
        .collect();

    if missing.is_empty() && extra.is_empty() {
        return Ok(());
    }

    Err(MatchError::KeySetMismatch {
        path: parent_path.map(str::to_owned),
        missing,
        extra,
    })
}

/// Checks every expected entry against the actual object.
///
/// Key-set equality is the caller's job (see [`match_keys`]); a key absent
/// from `actual` is still reported as missing rather than skipped.
pub fn match_values(
    expected: &[(String, Pattern)],
    actual: &Map<String, Value>,
    parent_path: Option<&str>,
) -> Result<(), MatchError> {
    for (key, pattern) in expected {
        let path = child_path(parent_path, key);
        let Some(value) = actual.get(key) else {
            return Err(MatchError::KeySetMismatch {
                path: parent_path.map(str::to_owned),
                missing: vec![key.clone()],
                extra: vec![],
            });
        };

        match_node(pattern, value, &path)?;
    }

    Ok(())
}

/// Matches a whole document: the root key sets first, then the values.
pub fn match_pattern(pattern: &Pattern, actual: &Value) -> Result<(), MatchError> {
    match_node(pattern, actual, "")
}

/// Parses both documents and matches them. The actual side is raw bytes and
/// must be valid UTF-8 JSON.
///
/// Parse failures are reported as [`StepError::MalformedJson`] so they are
/// never confused with a structural mismatch.
pub fn match_json(expected: &str, actual: &[u8]) -> Result<(), StepError> {
    let pattern = Pattern::parse(expected).map_err(|source| StepError::MalformedJson {
        side: JsonSide::Expected,
        source,
    })?;
    let value: Value = serde_json::from_slice(actual).map_err(|source| StepError::MalformedJson {
        side: JsonSide::Actual,
        source,
    })?;

    Ok(match_pattern(&pattern, &value)?)
}

fn match_node(pattern: &Pattern, actual: &Value, path: &str) -> Result<(), MatchError> {
    match pattern {
        Pattern::Placeholder(placeholder) => {
            if placeholder.accepts(actual) {
                Ok(())
            } else {
                Err(MatchError::TypedPlaceholderMismatch {
                    path: path.to_owned(),
                    placeholder: *placeholder,
                    actual: actual.clone(),
                })
            }
        }
        Pattern::Literal(expected) => {
            if expected == actual {
                Ok(())
            } else {
                Err(MatchError::LiteralMismatch {
                    path: path.to_owned(),
                    expected: expected.clone(),
                    actual: actual.clone(),
                })
            }
        }
        Pattern::Object(entries) => {
            let Value::Object(map) = actual else {
                return Err(not_a_container(path, actual));
            };

            match_keys(
                entries.iter().map(|(key, _)| key.as_str()),
                map.keys().map(String::as_str),
                parent(path),
            )?;
            match_values(entries, map, parent(path))
        }
        Pattern::Array(items) => {
            let Value::Array(values) = actual else {
                return Err(not_a_container(path, actual));
            };

            let expected_keys: Vec<String> = (0..items.len()).map(|i| i.to_string()).collect();
            let actual_keys: Vec<String> = (0..values.len()).map(|i| i.to_string()).collect();
            match_keys(
                expected_keys.iter().map(String::as_str),
                actual_keys.iter().map(String::as_str),
                parent(path),
            )?;

            items
                .iter()
                .zip(values)
                .enumerate()
                .try_for_each(|(i, (item, value))| match_node(item, value, &format!("{path}[{i}]")))
        }
    }
}

fn child_path(parent: Option<&str>, key: &str) -> String {
    match parent {
        Some(parent) => format!("{parent}.{key}"),
        None => key.to_owned(),
    }
}

/// The document root has no parent path.
fn parent(path: &str) -> Option<&str> {
    (!path.is_empty()).then_some(path)
}

fn not_a_container(path: &str, actual: &Value) -> MatchError {
    MatchError::NotAContainer {
        path: path.to_owned(),
        actual: actual.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::Placeholder;
    use serde_json::json;

    fn check(expected: Value, actual: Value) -> Result<(), MatchError> {
        match_pattern(&Pattern::from(expected), &actual)
    }

    #[test]
    fn identical_literals_match() {
        assert_eq!(
            check(
                json!({"a": 1, "b": "two", "c": true, "d": null}),
                json!({"d": null, "c": true, "b": "two", "a": 1})
            ),
            Ok(())
        );
    }

    #[test]
    fn match_keys_names_every_missing_and_extra_key() {
        let err = match_keys(["a", "b", "c"], ["b", "d", "e"], Some("root")).unwrap_err();

        assert_eq!(
            err,
            MatchError::KeySetMismatch {
                path: Some("root".to_owned()),
                missing: vec!["a".to_owned(), "c".to_owned()],
                extra: vec!["d".to_owned(), "e".to_owned()],
            }
        );
    }

    #[test]
    fn extra_actual_key_must_not_be_present() {
        let err = check(json!({"a": 1}), json!({"a": 1, "b": 2})).unwrap_err();

        assert_eq!(err.to_string(), "Keys \"b\" must not be present");
    }

    #[test]
    fn literal_mismatch_message() {
        let err = check(json!({"status": "ok"}), json!({"status": "error"})).unwrap_err();

        assert_eq!(err.to_string(), "The element 'error' is not equal to 'ok'");
    }

    #[test]
    fn literals_are_compared_without_coercion() {
        let err = check(json!({"count": 1}), json!({"count": "1"})).unwrap_err();

        assert!(matches!(err, MatchError::LiteralMismatch { .. }));
    }

    #[test]
    fn nested_object_with_placeholders() {
        let expected = json!({"user": {"id": "<uuid>", "name": "Alice"}});

        assert_eq!(
            check(expected.clone(), json!({"user": {"id": "a1b2", "name": "Alice"}})),
            Ok(())
        );

        let err = check(expected, json!({"user": {"id": "", "name": "Alice"}})).unwrap_err();
        assert_eq!(
            err,
            MatchError::TypedPlaceholderMismatch {
                path: "user.id".to_owned(),
                placeholder: Placeholder::Uuid,
                actual: json!(""),
            }
        );
    }

    #[test]
    fn nested_key_mismatch_carries_parent_path() {
        let err = check(
            json!({"user": {"profile": {"name": "<string>"}}}),
            json!({"user": {"profile": {"nick": "al"}}}),
        )
        .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Keys \"name\" are missing and keys \"nick\" must not be present in \"user.profile\""
        );
    }

    #[test]
    fn first_failure_follows_pattern_key_order() {
        let err = check(
            json!({"b": "<int>", "a": "<string>"}),
            json!({"a": "", "b": "x"}),
        )
        .unwrap_err();

        assert!(matches!(
            err,
            MatchError::TypedPlaceholderMismatch { ref path, .. } if path == "b"
        ));
    }

    #[test]
    fn arrays_are_matched_by_index() {
        assert_eq!(
            check(
                json!({"items": [{"sku": "<string>"}, "<int>"]}),
                json!({"items": [{"sku": "A-1"}, 3]})
            ),
            Ok(())
        );

        let err = check(json!({"items": [1, 2]}), json!({"items": [1, 2, 3]})).unwrap_err();
        assert_eq!(err.to_string(), "Keys \"2\" must not be present in \"items\"");

        let err = check(json!({"items": [1, 2]}), json!({"items": [1, 5]})).unwrap_err();
        assert!(matches!(
            err,
            MatchError::LiteralMismatch { ref path, .. } if path == "items[1]"
        ));
    }

    #[test]
    fn nested_pattern_against_scalar_is_not_a_container() {
        let err = check(json!({"user": {"id": 1}}), json!({"user": "bob"})).unwrap_err();

        assert_eq!(
            err,
            MatchError::NotAContainer {
                path: "user".to_owned(),
                actual: json!("bob"),
            }
        );
    }

    #[test]
    fn match_values_reports_keys_absent_from_actual() {
        let entries = vec![("id".to_owned(), Pattern::Placeholder(Placeholder::Int))];
        let err = match_values(&entries, &Map::new(), None).unwrap_err();

        assert_eq!(err.to_string(), "Keys \"id\" are missing");
    }

    #[test]
    fn repeated_comparisons_give_the_same_result() {
        let expected = Pattern::from(json!({"when": "<dateTime>"}));
        let actual = json!({"when": "2024-01-15T10:30:00Z"});

        let first = match_pattern(&expected, &actual);
        let second = match_pattern(&expected, &actual);

        assert!(first.is_err());
        assert_eq!(first, second);
    }

    #[test]
    fn match_json_separates_parse_errors() {
        assert!(matches!(
            match_json("{nope", b"{}"),
            Err(StepError::MalformedJson { side: JsonSide::Expected, .. })
        ));
        assert!(matches!(
            match_json("{}", b"not json"),
            Err(StepError::MalformedJson { side: JsonSide::Actual, .. })
        ));
        assert!(matches!(
            match_json(r#"{"a": "<int>"}"#, br#"{"a": "x"}"#),
            Err(StepError::Mismatch(MatchError::TypedPlaceholderMismatch { .. }))
        ));
        assert!(match_json(r#"{"a": "<date>"}"#, br#"{"a": "2024-01-15"}"#).is_ok());
    }

    #[test]
    fn invalid_utf8_body_is_malformed_not_matched() {
        let err = match_json(r#"{"a": "<string>"}"#, b"{\"a\": \"\xff\"}").unwrap_err();

        assert!(matches!(
            err,
            StepError::MalformedJson { side: JsonSide::Actual, .. }
        ));
    }
}
