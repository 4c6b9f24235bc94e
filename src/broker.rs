// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Broker Binding
//!
//! [`Broker`] is the seam between test steps and RabbitMQ: purge, count,
//! publish and a bounded consume. [`AmqpBroker`] implements it over a
//! `lapin` channel, declaring each queue on first use from a
//! [`QueueDefinition`] template (durable by default).

use crate::{
    channel::new_amqp_channel,
    config::AmqpConfig,
    consumer::{self, ConsumeOptions},
    errors::AmqpError,
    message::Message,
    publisher::to_basic_properties,
    queue::QueueDefinition,
};
use async_trait::async_trait;
use lapin::{
    options::{BasicPublishOptions, QueuePurgeOptions},
    types::FieldTable,
    Channel, Connection,
};
use std::{collections::HashSet, sync::Arc};
use tokio::sync::Mutex;
use tracing::{debug, error};

/// Broker operations used by test steps.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Broker: Send + Sync {
    /// Removes every ready message from `queue`, returning how many were dropped.
    async fn purge_queue(&self, queue: &str) -> Result<u32, AmqpError>;

    /// Number of ready messages in `queue`.
    async fn message_count(&self, queue: &str) -> Result<u32, AmqpError>;

    /// Publishes to the configured exchange and waits for the broker confirm.
    async fn publish(&self, routing_key: &str, message: &Message) -> Result<(), AmqpError>;

    /// Takes at most `options.max_messages` messages, returning the last one.
    async fn consume(
        &self,
        queue: &str,
        options: &ConsumeOptions,
    ) -> Result<Option<Message>, AmqpError>;
}

/// RabbitMQ implementation of [`Broker`].
#[derive(Debug)]
pub struct AmqpBroker {
    _connection: Arc<Connection>,
    channel: Arc<Channel>,
    exchange: String,
    queue_template: QueueDefinition,
    declared: Mutex<HashSet<String>>,
}

impl AmqpBroker {
    /// Connects with `cfg` and opens the broker channel.
    pub async fn connect(cfg: &AmqpConfig) -> Result<AmqpBroker, AmqpError> {
        let (connection, channel) = new_amqp_channel(cfg).await?;
        Ok(AmqpBroker::new(connection, channel, &cfg.exchange))
    }

    pub fn new(connection: Arc<Connection>, channel: Arc<Channel>, exchange: &str) -> AmqpBroker {
        AmqpBroker {
            _connection: connection,
            channel,
            exchange: exchange.to_owned(),
            queue_template: QueueDefinition::new("").durable(),
            declared: Mutex::new(HashSet::new()),
        }
    }

    /// Replaces the flags used when declaring queues.
    pub fn queue_template(mut self, template: QueueDefinition) -> Self {
        self.queue_template = template;
        self
    }

    /// Declares `queue` and returns its ready message count.
    async fn declare_queue(&self, queue: &str) -> Result<u32, AmqpError> {
        let def = self.queue_template.named(queue);
        debug!("declaring queue: {}", def.name());

        let declared = match self
            .channel
            .queue_declare(def.name(), def.declare_options(), FieldTable::default())
            .await
        {
            Err(err) => {
                error!(error = err.to_string(), queue, "error to declare the queue");
                Err(AmqpError::DeclareQueueError(queue.to_owned()))
            }
            Ok(q) => Ok(q),
        }?;

        self.declared.lock().await.insert(queue.to_owned());
        Ok(declared.message_count())
    }

    async fn ensure_declared(&self, queue: &str) -> Result<(), AmqpError> {
        if self.declared.lock().await.contains(queue) {
            return Ok(());
        }

        self.declare_queue(queue).await.map(|_| ())
    }
}

#[async_trait]
impl Broker for AmqpBroker {
    async fn purge_queue(&self, queue: &str) -> Result<u32, AmqpError> {
        self.ensure_declared(queue).await?;

        match self
            .channel
            .queue_purge(queue, QueuePurgeOptions { nowait: false })
            .await
        {
            Err(err) => {
                error!(error = err.to_string(), queue, "error to purge the queue");
                Err(AmqpError::PurgeQueueError(queue.to_owned()))
            }
            Ok(purged) => {
                debug!(queue, purged, "queue purged");
                Ok(purged)
            }
        }
    }

    async fn message_count(&self, queue: &str) -> Result<u32, AmqpError> {
        self.declare_queue(queue).await
    }

    async fn publish(&self, routing_key: &str, message: &Message) -> Result<(), AmqpError> {
        let properties = to_basic_properties(message.properties())?;

        let confirm = match self
            .channel
            .basic_publish(
                &self.exchange,
                routing_key,
                BasicPublishOptions {
                    immediate: false,
                    mandatory: false,
                },
                message.body(),
                properties,
            )
            .await
        {
            Err(err) => {
                error!(error = err.to_string(), "error publishing message");
                Err(AmqpError::PublishingError)
            }
            Ok(confirm) => Ok(confirm),
        }?;

        if let Err(err) = confirm.await {
            error!(error = err.to_string(), "error publishing message");
            return Err(AmqpError::PublishingError);
        }

        Ok(())
    }

    async fn consume(
        &self,
        queue: &str,
        options: &ConsumeOptions,
    ) -> Result<Option<Message>, AmqpError> {
        self.ensure_declared(queue).await?;
        consumer::consume(&self.channel, queue, options).await
    }
}
