// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Expected Patterns
//!
//! A [`Pattern`] is the expected side of a structural comparison. It is built
//! once from JSON: string leaves equal to one of the placeholder tokens
//! (`<int>`, `<string>`, `<uuid>`, `<dateTime>`, `<date>`, `<array>`) become
//! [`Pattern::Placeholder`], objects and arrays become nested patterns and
//! everything else is a literal compared with strict equality.

use regex::Regex;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::{fmt, str::FromStr, sync::LazyLock};

static DATE_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}T[0-9]{2}:[0-9]{2}:[0-9]{2}[+-][0-9]{2}:[0-9]{2}$")
        .expect("date-time regex is valid")
});

static DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}$").expect("date regex is valid"));

/// Typed placeholder accepted in place of an exact value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placeholder {
    /// `<int>`: a JSON integer.
    Int,
    /// `<string>`: a non-empty JSON string.
    String,
    /// `<uuid>`: any non-empty value. The format itself is not validated.
    Uuid,
    /// `<dateTime>`: `YYYY-MM-DDTHH:MM:SS±HH:MM`.
    DateTime,
    /// `<date>`: `YYYY-MM-DD`.
    Date,
    /// `<array>`: a non-empty array or object.
    Array,
}

impl Placeholder {
    pub const ALL: [Placeholder; 6] = [
        Placeholder::Int,
        Placeholder::String,
        Placeholder::Uuid,
        Placeholder::DateTime,
        Placeholder::Date,
        Placeholder::Array,
    ];

    /// The token as written in a pattern.
    pub fn token(self) -> &'static str {
        match self {
            Placeholder::Int => "<int>",
            Placeholder::String => "<string>",
            Placeholder::Uuid => "<uuid>",
            Placeholder::DateTime => "<dateTime>",
            Placeholder::Date => "<date>",
            Placeholder::Array => "<array>",
        }
    }

    /// Resolves a token, returning `None` for any other string.
    pub fn from_token(token: &str) -> Option<Placeholder> {
        Self::ALL.into_iter().find(|p| p.token() == token)
    }

    /// Whether `value` satisfies the type/shape/format this placeholder stands for.
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            Placeholder::Int => value.is_i64() || value.is_u64(),
            Placeholder::String => value.as_str().is_some_and(|s| !s.is_empty()),
            Placeholder::Uuid => !is_empty(value),
            Placeholder::DateTime => value.as_str().is_some_and(|s| DATE_TIME.is_match(s)),
            Placeholder::Date => value.as_str().is_some_and(|s| DATE.is_match(s)),
            Placeholder::Array => match value {
                Value::Array(items) => !items.is_empty(),
                Value::Object(map) => !map.is_empty(),
                _ => false,
            },
        }
    }
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Expected side of a structural comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    Placeholder(Placeholder),
    /// A scalar (string, number, bool or null) matched with strict equality.
    Literal(Value),
    /// Entries in the order they appear in the pattern text.
    Object(Vec<(String, Pattern)>),
    Array(Vec<Pattern>),
}

impl Pattern {
    /// Parses pattern text as JSON.
    pub fn parse(text: &str) -> Result<Pattern, serde_json::Error> {
        serde_json::from_str::<Value>(text).map(Pattern::from)
    }
}

impl From<Value> for Pattern {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => match Placeholder::from_token(&s) {
                Some(placeholder) => Pattern::Placeholder(placeholder),
                None => Pattern::Literal(Value::String(s)),
            },
            Value::Object(map) => Pattern::Object(
                map.into_iter()
                    .map(|(key, value)| (key, Pattern::from(value)))
                    .collect(),
            ),
            Value::Array(items) => Pattern::Array(items.into_iter().map(Pattern::from).collect()),
            scalar => Pattern::Literal(scalar),
        }
    }
}

impl FromStr for Pattern {
    type Err = serde_json::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Pattern::parse(s)
    }
}

impl<'de> Deserialize<'de> for Pattern {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Value::deserialize(deserializer).map(Pattern::from)
    }
}

/// `null`, `false`, zero, `""` and empty containers.
pub(crate) fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

/// Renders a value the way assertion messages show it: strings without
/// quotes, anything else as compact JSON.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
