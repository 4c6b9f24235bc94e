// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Step Context
//!
//! [`AmqpContext`] carries the state shared by the steps of one scenario: the
//! broker, the message being drafted for publishing and the last message
//! consumed. Each method backs one step phrase; a returned error fails the
//! step. Wiring the methods to phrases is left to the test runner.

use crate::{
    asserter::{assert_contains, assert_equals, assert_has_key, assert_value_equals},
    broker::Broker,
    consumer::ConsumeOptions,
    errors::{JsonSide, StepError},
    matcher::match_json,
    message::{Message, HEADERS},
    publisher::MessagePublisher,
};
use serde_json::{Map, Value};
use std::{io::Write, time::Duration};
use tracing::debug;

/// Scenario state for AMQP steps.
#[derive(Debug)]
pub struct AmqpContext<B> {
    broker: B,
    publisher: MessagePublisher,
    message: Option<Message>,
    consume_options: ConsumeOptions,
}

impl<B: Broker> AmqpContext<B> {
    pub fn new(broker: B) -> AmqpContext<B> {
        AmqpContext {
            broker,
            publisher: MessagePublisher::new(),
            message: None,
            consume_options: ConsumeOptions::default(),
        }
    }

    /// Overrides the budget used by [`consume_message`](Self::consume_message).
    pub fn with_consume_options(mut self, options: ConsumeOptions) -> Self {
        self.consume_options = options;
        self
    }

    pub fn broker(&self) -> &B {
        &self.broker
    }

    /// The last consumed message.
    pub fn message(&self) -> Result<&Message, StepError> {
        self.message.as_ref().ok_or(StepError::NoMessage)
    }

    /// `I purge queue :queue`
    pub async fn purge_queue(&self, queue: &str) -> Result<(), StepError> {
        let purged = self.broker.purge_queue(queue).await?;
        debug!(queue, purged, "queue purged");
        Ok(())
    }

    /// `I set message properties:` with a YAML mapping.
    pub fn set_message_properties(&mut self, yaml: &str) -> Result<(), StepError> {
        self.publisher.set_message_properties(parse_properties(yaml)?);
        Ok(())
    }

    /// `I set message body:`
    pub fn set_message_body(&mut self, body: &str) {
        self.publisher.set_message_body(Some(body.to_owned()));
    }

    /// `I publish message with routing key :routing_key`
    pub async fn publish_message(&mut self, routing_key: &str) -> Result<(), StepError> {
        Ok(self.publisher.publish(&self.broker, routing_key).await?)
    }

    /// `I wait :seconds second(s)`
    pub async fn wait(&self, seconds: u64) {
        tokio::time::sleep(Duration::from_secs(seconds)).await;
    }

    /// `I have :count message(s) in amqp :queue queue`
    pub async fn assert_message_count(&self, expected: u32, queue: &str) -> Result<(), StepError> {
        let count = self.broker.message_count(queue).await?;
        if count != expected {
            return Err(StepError::UnexpectedMessageCount(count));
        }

        Ok(())
    }

    /// `I have messages in amqp :queue queue`
    pub async fn assert_queue_has_messages(&self, queue: &str) -> Result<(), StepError> {
        match self.broker.message_count(queue).await? {
            0 => Err(StepError::UnexpectedMessageCount(0)),
            _ => Ok(()),
        }
    }

    /// `I consume a message from queue :queue`
    pub async fn consume_message(&mut self, queue: &str) -> Result<(), StepError> {
        match self.broker.consume(queue, &self.consume_options).await? {
            Some(message) => {
                self.message = Some(message);
                Ok(())
            }
            None => Err(StepError::ConsumeFailed(queue.to_owned())),
        }
    }

    /// `the message should have property :property equal to :value`
    pub fn assert_property_equals(&self, property: &str, value: &str) -> Result<(), StepError> {
        let actual = assert_has_key(property, self.message()?.properties())?;
        assert_value_equals(value, actual)
    }

    /// `the message should have header :header equal to :value`
    pub fn assert_header_equals(&self, header: &str, value: &str) -> Result<(), StepError> {
        let headers = assert_has_key(HEADERS, self.message()?.properties())?;
        let headers = headers
            .as_object()
            .ok_or_else(|| StepError::KeyNotFound(header.to_owned()))?;
        let actual = assert_has_key(header, headers)?;
        assert_value_equals(value, actual)
    }

    /// `the message body should contain :pattern` (regular expression)
    pub fn assert_body_contains(&self, pattern: &str) -> Result<(), StepError> {
        assert_contains(pattern, &self.message()?.body_text())
    }

    /// `the message body should be equal to :body`
    pub fn assert_body_equals(&self, body: &str) -> Result<(), StepError> {
        assert_equals(body, &self.message()?.body_text())
    }

    /// `the message body should be match to :pattern`
    ///
    /// Structural comparison with placeholder support, see
    /// [`match_json`](crate::matcher::match_json).
    pub fn assert_body_matches(&self, pattern: &str) -> Result<(), StepError> {
        match_json(pattern, self.message()?.body())
    }

    /// `the message body should have JSON node :node equal to :value`
    pub fn assert_json_node_equals(&self, node: &str, value: &str) -> Result<(), StepError> {
        let decoded = self
            .message()?
            .decoded_body()
            .map_err(|source| StepError::MalformedJson {
                side: JsonSide::Actual,
                source,
            })?;

        let empty = Map::new();
        let object = decoded.as_object().unwrap_or(&empty);
        let actual = assert_has_key(node, object)?;
        assert_value_equals(value, actual)
    }

    /// `print the message body`
    pub fn print_message_body<W: Write>(&self, out: &mut W) -> Result<(), StepError> {
        writeln!(out, "{}", self.message()?.body_text())?;
        Ok(())
    }

    /// `print the message properties`
    pub fn print_message_properties<W: Write>(&self, out: &mut W) -> Result<(), StepError> {
        let properties = Value::Object(self.message()?.properties().clone());
        writeln!(out, "{properties:#}")?;
        Ok(())
    }
}

/// Parses the YAML mapping given to `I set message properties:`.
///
/// An empty document means no properties.
pub fn parse_properties(yaml: &str) -> Result<Map<String, Value>, StepError> {
    if yaml.trim().is_empty() {
        return Ok(Map::new());
    }

    let value: Option<Value> =
        serde_yaml::from_str(yaml).map_err(|err| StepError::InvalidProperties(err.to_string()))?;

    match value {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(map)) => Ok(map),
        Some(_) => Err(StepError::InvalidProperties(
            "expected a mapping of property names to values".to_owned(),
        )),
    }
}
