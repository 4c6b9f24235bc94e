// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Error Types
//!
//! This module groups the three error families of the crate:
//!
//! - [`AmqpError`]: failures talking to the broker (connection, declaration,
//!   publishing, consuming) and invalid message properties.
//! - [`MatchError`]: the outcome of a failed structural comparison between an
//!   expected [`Pattern`](crate::pattern::Pattern) and an actual JSON value.
//! - [`StepError`]: what a test step reports to the runner. It wraps the two
//!   families above plus the flat assertions on message properties and body.

use crate::pattern::{render_value, Placeholder};
use serde_json::Value;
use thiserror::Error;

/// Represents errors that can occur during AMQP/RabbitMQ operations.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum AmqpError {
    /// Invalid or incomplete connection settings
    #[error("invalid configuration: {0}")]
    ConfigError(String),

    /// Error establishing a connection to the RabbitMQ server
    #[error("failure to connect")]
    ConnectionError,

    /// Error creating a channel from an established connection
    #[error("failure to create a channel")]
    ChannelError,

    /// Error declaring a queue with the given name
    #[error("failure to declare a queue `{0}`")]
    DeclareQueueError(String),

    /// Error purging a queue with the given name
    #[error("Could not purge queue {0}")]
    PurgeQueueError(String),

    /// Error publishing a message
    #[error("failure to publish")]
    PublishingError,

    /// A message property that cannot be sent over AMQP
    #[error("invalid message property `{0}`: {1}")]
    InvalidProperty(String, String),

    /// Error acknowledging a message
    #[error("failure to ack message")]
    AckMessageError,

    /// Error consuming a message
    #[error("failure to consume message `{0}`")]
    ConsumerError(String),
}

/// The ways an actual JSON value can fail to match an expected pattern.
///
/// Each variant carries the dotted path of the offending node so callers can
/// point at it; the `Display` output is the diagnostic shown to humans.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MatchError {
    /// Object (or array index) key sets differ at some nesting level.
    #[error("{}", describe_key_sets(.path, .missing, .extra))]
    KeySetMismatch {
        path: Option<String>,
        missing: Vec<String>,
        extra: Vec<String>,
    },

    /// The actual value fails the check implied by a placeholder token.
    #[error("The value is false: \"{path}\" does not match {placeholder} (got {})", render_json(.actual))]
    TypedPlaceholderMismatch {
        path: String,
        placeholder: Placeholder,
        actual: Value,
    },

    /// The actual scalar differs from the expected literal.
    #[error("The element '{}' is not equal to '{}'", render_value(.actual), render_value(.expected))]
    LiteralMismatch {
        path: String,
        expected: Value,
        actual: Value,
    },

    /// The pattern expects an object or array where the actual value is a scalar.
    #[error("The element \"{path}\" should be an object or an array (got {})", render_json(.actual))]
    NotAContainer { path: String, actual: Value },
}

/// Which side of a structural comparison could not be parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonSide {
    Expected,
    Actual,
}

impl std::fmt::Display for JsonSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JsonSide::Expected => f.write_str("expected"),
            JsonSide::Actual => f.write_str("actual"),
        }
    }
}

/// Failure of a single test step.
#[derive(Error, Debug)]
pub enum StepError {
    #[error(transparent)]
    Amqp(#[from] AmqpError),

    #[error(transparent)]
    Mismatch(#[from] MatchError),

    #[error("the {side} JSON could not be parsed: {source}")]
    MalformedJson {
        side: JsonSide,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0} not found")]
    KeyNotFound(String),

    #[error("{actual} does not match expected \"{expected}\"")]
    NotEqual { expected: String, actual: String },

    #[error("{item} not found in \"{content}\"")]
    NotContained { item: String, content: String },

    #[error("invalid regular expression: {0}")]
    InvalidRegex(#[from] regex::Error),

    #[error("invalid message properties: {0}")]
    InvalidProperties(String),

    #[error("There is {0} message(s) in the queue at this moment.")]
    UnexpectedMessageCount(u32),

    #[error("Could not consume message from queue {0}")]
    ConsumeFailed(String),

    #[error("no message has been consumed yet")]
    NoMessage,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn render_json(value: &Value) -> String {
    value.to_string()
}

fn describe_key_sets(path: &Option<String>, missing: &[String], extra: &[String]) -> String {
    let quote = |keys: &[String]| {
        keys.iter()
            .map(|key| format!("\"{key}\""))
            .collect::<Vec<_>>()
            .join(", ")
    };

    let mut clauses = Vec::with_capacity(2);
    if !missing.is_empty() {
        clauses.push(format!("keys {} are missing", quote(missing)));
    }
    if !extra.is_empty() {
        clauses.push(format!("keys {} must not be present", quote(extra)));
    }

    let mut message = clauses.join(" and ");
    if let Some(path) = path {
        message.push_str(&format!(" in \"{path}\""));
    }

    let mut chars = message.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn key_set_message_reports_missing_and_extra_keys() {
        let err = MatchError::KeySetMismatch {
            path: Some("user".to_owned()),
            missing: vec!["id".to_owned(), "name".to_owned()],
            extra: vec!["age".to_owned()],
        };

        assert_eq!(
            err.to_string(),
            "Keys \"id\", \"name\" are missing and keys \"age\" must not be present in \"user\""
        );
    }

    #[test]
    fn key_set_message_without_parent_path() {
        let err = MatchError::KeySetMismatch {
            path: None,
            missing: vec![],
            extra: vec!["b".to_owned()],
        };

        assert_eq!(err.to_string(), "Keys \"b\" must not be present");
    }

    #[test]
    fn literal_message_renders_strings_raw() {
        let err = MatchError::LiteralMismatch {
            path: "status".to_owned(),
            expected: json!("ok"),
            actual: json!("error"),
        };

        assert_eq!(err.to_string(), "The element 'error' is not equal to 'ok'");
    }

    #[test]
    fn placeholder_message_names_path_and_token() {
        let err = MatchError::TypedPlaceholderMismatch {
            path: "user.age".to_owned(),
            placeholder: Placeholder::Int,
            actual: json!("42"),
        };

        assert_eq!(
            err.to_string(),
            "The value is false: \"user.age\" does not match <int> (got \"42\")"
        );
    }

    #[test]
    fn step_errors_keep_the_original_wording() {
        assert_eq!(
            StepError::UnexpectedMessageCount(3).to_string(),
            "There is 3 message(s) in the queue at this moment."
        );
        assert_eq!(
            StepError::NotEqual {
                expected: "a".to_owned(),
                actual: "b".to_owned()
            }
            .to_string(),
            "b does not match expected \"a\""
        );
        assert_eq!(
            StepError::ConsumeFailed("orders".to_owned()).to_string(),
            "Could not consume message from queue orders"
        );
    }

    #[test]
    fn broker_errors_name_the_failing_resource() {
        assert_eq!(
            AmqpError::PurgeQueueError("orders".to_owned()).to_string(),
            "Could not purge queue orders"
        );
        assert_eq!(
            AmqpError::ConsumerError("orders".to_owned()).to_string(),
            "failure to consume message `orders`"
        );
        assert_eq!(
            StepError::from(AmqpError::AckMessageError).to_string(),
            "failure to ack message"
        );
    }
}
