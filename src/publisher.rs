// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Message Publisher
//!
//! [`MessagePublisher`] accumulates the body and properties set by earlier
//! steps and hands them to a [`Broker`] when a routing key is given. The
//! draft is cleared after every successful publish.
//!
//! This module also converts the JSON property object into
//! `lapin::BasicProperties`, the reverse of
//! [`properties_to_json`](crate::message::properties_to_json).

use crate::{broker::Broker, errors::AmqpError, message::Message};
use lapin::{
    types::{AMQPValue, FieldArray, FieldTable, LongString, ShortString},
    BasicProperties,
};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::debug;
use uuid::Uuid;

/// Pending message assembled by test steps.
#[derive(Debug, Default)]
pub struct MessagePublisher {
    body: Option<String>,
    properties: Map<String, Value>,
}

impl MessagePublisher {
    pub fn new() -> MessagePublisher {
        MessagePublisher::default()
    }

    /// Replaces the pending properties.
    pub fn set_message_properties(&mut self, properties: Map<String, Value>) {
        self.properties = properties;
    }

    pub fn set_message_body(&mut self, body: Option<String>) {
        self.body = body;
    }

    /// The message that would be published right now.
    pub fn message(&self) -> Message {
        Message::new(self.body.clone().unwrap_or_default(), self.properties.clone())
    }

    /// Publishes the pending message and resets the draft.
    pub async fn publish<B>(&mut self, broker: &B, routing_key: &str) -> Result<(), AmqpError>
    where
        B: Broker + ?Sized,
    {
        broker.publish(routing_key, &self.message()).await?;
        debug!(routing_key, "message published");

        self.body = None;
        self.properties = Map::new();
        Ok(())
    }
}

/// Builds AMQP properties from the JSON property object.
///
/// A random `message_id` is generated when none is given. Unknown keys and
/// values of the wrong type are rejected.
pub fn to_basic_properties(props: &Map<String, Value>) -> Result<BasicProperties, AmqpError> {
    let mut basic = BasicProperties::default();

    for (key, value) in props {
        basic = match key.as_str() {
            "content_type" => basic.with_content_type(short_string(key, value)?),
            "content_encoding" => basic.with_content_encoding(short_string(key, value)?),
            "correlation_id" => basic.with_correlation_id(short_string(key, value)?),
            "reply_to" => basic.with_reply_to(short_string(key, value)?),
            "expiration" => basic.with_expiration(short_string(key, value)?),
            "message_id" => basic.with_message_id(short_string(key, value)?),
            "type" => basic.with_type(short_string(key, value)?),
            "user_id" => basic.with_user_id(short_string(key, value)?),
            "app_id" => basic.with_app_id(short_string(key, value)?),
            "cluster_id" => basic.with_cluster_id(short_string(key, value)?),
            "delivery_mode" => basic.with_delivery_mode(octet(key, value)?),
            "priority" => basic.with_priority(octet(key, value)?),
            "timestamp" => basic.with_timestamp(value.as_u64().ok_or_else(|| {
                invalid(key, "expected an unsigned integer")
            })?),
            crate::message::HEADERS => {
                let headers = value
                    .as_object()
                    .ok_or_else(|| invalid(key, "expected a mapping"))?;
                basic.with_headers(field_table(headers))
            }
            _ => return Err(invalid(key, "unsupported property")),
        };
    }

    if !props.contains_key("message_id") {
        basic = basic.with_message_id(ShortString::from(Uuid::new_v4().to_string()));
    }

    Ok(basic)
}

/// Converts a JSON value into an AMQP field value.
///
/// Integers that fit `i64` become long-long ints, other numbers doubles.
pub fn json_to_amqp(value: &Value) -> AMQPValue {
    match value {
        Value::Null => AMQPValue::Void,
        Value::Bool(v) => AMQPValue::Boolean(*v),
        Value::Number(n) => match n.as_i64() {
            Some(v) => AMQPValue::LongLongInt(v),
            None => AMQPValue::Double(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => AMQPValue::LongString(LongString::from(s.as_str())),
        Value::Array(items) => {
            AMQPValue::FieldArray(FieldArray::from(items.iter().map(json_to_amqp).collect::<Vec<_>>()))
        }
        Value::Object(map) => AMQPValue::FieldTable(field_table(map)),
    }
}

fn field_table(map: &Map<String, Value>) -> FieldTable {
    let table: BTreeMap<ShortString, AMQPValue> = map
        .iter()
        .map(|(key, value)| (ShortString::from(key.as_str()), json_to_amqp(value)))
        .collect();
    FieldTable::from(table)
}

fn short_string(key: &str, value: &Value) -> Result<ShortString, AmqpError> {
    match value {
        Value::String(s) => Ok(ShortString::from(s.as_str())),
        Value::Number(n) => Ok(ShortString::from(n.to_string())),
        _ => Err(invalid(key, "expected a string")),
    }
}

fn octet(key: &str, value: &Value) -> Result<u8, AmqpError> {
    value
        .as_u64()
        .and_then(|v| u8::try_from(v).ok())
        .ok_or_else(|| invalid(key, "expected an integer between 0 and 255"))
}

fn invalid(key: &str, reason: &str) -> AmqpError {
    AmqpError::InvalidProperty(key.to_owned(), reason.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{broker::MockBroker, message::properties_to_json};
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn properties_survive_the_conversion() {
        let props = object(json!({
            "content_type": "application/json",
            "message_id": "m-1",
            "priority": 5,
            "type": "order.created",
            "headers": {"tenant": "acme", "retries": 2, "nested": {"ok": true}}
        }));

        let basic = to_basic_properties(&props).unwrap();

        assert_eq!(Value::Object(properties_to_json(&basic)), Value::Object(props));
    }

    #[test]
    fn message_id_is_generated_when_missing() {
        let basic = to_basic_properties(&Map::new()).unwrap();
        let id = basic.message_id().as_ref().map(|id| id.as_str().to_owned());

        assert!(id.is_some_and(|id| Uuid::parse_str(&id).is_ok()));
    }

    #[test]
    fn invalid_properties_are_rejected() {
        assert_eq!(
            to_basic_properties(&object(json!({"colour": "red"}))).unwrap_err(),
            AmqpError::InvalidProperty("colour".to_owned(), "unsupported property".to_owned())
        );
        assert!(matches!(
            to_basic_properties(&object(json!({"priority": 300}))),
            Err(AmqpError::InvalidProperty(key, _)) if key == "priority"
        ));
        assert!(matches!(
            to_basic_properties(&object(json!({"headers": "x"}))),
            Err(AmqpError::InvalidProperty(key, _)) if key == "headers"
        ));
    }

    #[test]
    fn json_numbers_map_to_amqp_numbers() {
        assert_eq!(json_to_amqp(&json!(7)), AMQPValue::LongLongInt(7));
        assert_eq!(json_to_amqp(&json!(0.5)), AMQPValue::Double(0.5));
        assert_eq!(json_to_amqp(&json!(null)), AMQPValue::Void);
    }

    #[tokio::test]
    async fn publish_sends_the_draft_and_resets_it() {
        let mut broker = MockBroker::new();
        broker
            .expect_publish()
            .withf(|key, message| {
                key == "orders" && message.body() == b"{\"id\":1}" && message.properties().contains_key("type")
            })
            .times(1)
            .returning(|_, _| Ok(()));
        broker
            .expect_publish()
            .withf(|key, message| key == "orders" && message.body().is_empty() && message.properties().is_empty())
            .times(1)
            .returning(|_, _| Ok(()));

        let mut publisher = MessagePublisher::new();
        publisher.set_message_body(Some("{\"id\":1}".to_owned()));
        publisher.set_message_properties(object(json!({"type": "order.created"})));

        publisher.publish(&broker, "orders").await.unwrap();
        publisher.publish(&broker, "orders").await.unwrap();
    }

    #[tokio::test]
    async fn failed_publish_keeps_the_draft() {
        let mut broker = MockBroker::new();
        broker
            .expect_publish()
            .returning(|_, _| Err(AmqpError::PublishingError));

        let mut publisher = MessagePublisher::new();
        publisher.set_message_body(Some("payload".to_owned()));

        assert_eq!(
            publisher.publish(&broker, "orders").await,
            Err(AmqpError::PublishingError)
        );
        assert_eq!(publisher.message().body(), b"payload");
    }
}
