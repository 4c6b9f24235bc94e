// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Message Fixture
//!
//! A [`Message`] is what assertion steps look at: the raw body plus the AMQP
//! properties as a JSON object. Property keys follow the AMQP names
//! (`content_type`, `message_id`, `type`, ...) and the `headers` property is
//! a nested object converted from the field table.

use lapin::{
    message::Delivery,
    protocol::basic::AMQPProperties,
    types::{AMQPValue, ShortString},
};
use serde_json::{Map, Number, Value};
use std::borrow::Cow;

/// Property holding the nested header table.
pub const HEADERS: &str = "headers";

/// A message body together with its properties and headers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Message {
    body: Vec<u8>,
    properties: Map<String, Value>,
}

impl Message {
    pub fn new(body: impl Into<Vec<u8>>, properties: Map<String, Value>) -> Message {
        Message {
            body: body.into(),
            properties,
        }
    }

    /// Builds the fixture from a received delivery.
    pub fn from_delivery(delivery: &Delivery) -> Message {
        Message::new(delivery.data.clone(), properties_to_json(&delivery.properties))
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// The body as text; invalid UTF-8 sequences are replaced.
    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    pub fn decoded_body(&self) -> Result<Value, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    pub fn properties(&self) -> &Map<String, Value> {
        &self.properties
    }

    pub fn headers(&self) -> Option<&Map<String, Value>> {
        self.properties.get(HEADERS).and_then(Value::as_object)
    }
}

/// Converts AMQP properties into the JSON object exposed by [`Message`].
///
/// Unset properties are left out.
pub fn properties_to_json(props: &AMQPProperties) -> Map<String, Value> {
    let mut map = Map::new();

    let strings = [
        ("content_type", props.content_type()),
        ("content_encoding", props.content_encoding()),
        ("correlation_id", props.correlation_id()),
        ("reply_to", props.reply_to()),
        ("expiration", props.expiration()),
        ("message_id", props.message_id()),
        ("type", props.kind()),
        ("user_id", props.user_id()),
        ("app_id", props.app_id()),
        ("cluster_id", props.cluster_id()),
    ];
    for (key, value) in strings {
        if let Some(value) = value {
            map.insert(key.to_owned(), short_string(value));
        }
    }

    if let Some(mode) = props.delivery_mode() {
        map.insert("delivery_mode".to_owned(), Value::from(*mode));
    }
    if let Some(priority) = props.priority() {
        map.insert("priority".to_owned(), Value::from(*priority));
    }
    if let Some(timestamp) = props.timestamp() {
        map.insert("timestamp".to_owned(), Value::from(*timestamp));
    }
    if let Some(headers) = props.headers() {
        let headers = headers
            .inner()
            .iter()
            .map(|(key, value)| (key.as_str().to_owned(), amqp_to_json(value)))
            .collect();
        map.insert(HEADERS.to_owned(), Value::Object(headers));
    }

    map
}

/// Converts a single AMQP field value into JSON.
///
/// Byte arrays become arrays of numbers, decimals become floats and void
/// becomes `null`.
pub fn amqp_to_json(value: &AMQPValue) -> Value {
    match value {
        AMQPValue::Boolean(v) => Value::Bool(*v),
        AMQPValue::ShortShortInt(v) => Value::from(*v),
        AMQPValue::ShortShortUInt(v) => Value::from(*v),
        AMQPValue::ShortInt(v) => Value::from(*v),
        AMQPValue::ShortUInt(v) => Value::from(*v),
        AMQPValue::LongInt(v) => Value::from(*v),
        AMQPValue::LongUInt(v) => Value::from(*v),
        AMQPValue::LongLongInt(v) => Value::from(*v),
        AMQPValue::Float(v) => float(f64::from(*v)),
        AMQPValue::Double(v) => float(*v),
        AMQPValue::DecimalValue(v) => float(f64::from(v.value) / 10f64.powi(i32::from(v.scale))),
        AMQPValue::ShortString(v) => short_string(v),
        AMQPValue::LongString(v) => Value::String(String::from_utf8_lossy(v.as_bytes()).into_owned()),
        AMQPValue::FieldArray(v) => Value::Array(v.as_slice().iter().map(amqp_to_json).collect()),
        AMQPValue::Timestamp(v) => Value::from(*v),
        AMQPValue::FieldTable(v) => Value::Object(
            v.inner()
                .iter()
                .map(|(key, value)| (key.as_str().to_owned(), amqp_to_json(value)))
                .collect(),
        ),
        AMQPValue::ByteArray(v) => Value::Array(v.as_slice().iter().map(|b| Value::from(*b)).collect()),
        AMQPValue::Void => Value::Null,
    }
}

fn short_string(value: &ShortString) -> Value {
    Value::String(value.as_str().to_owned())
}

fn float(value: f64) -> Value {
    Number::from_f64(value).map_or(Value::Null, Value::Number)
}
