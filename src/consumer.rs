// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Bounded Message Consumer
//!
//! Test steps never consume forever. [`consume`] polls a queue with
//! `basic.get`, acknowledges what it receives and stops once either
//! `max_messages` have been taken or `max_execution_time` has elapsed. The
//! last message received is returned; `None` means the budget ran out first.

use crate::{errors::AmqpError, message::Message};
use async_trait::async_trait;
use lapin::{
    message::Delivery,
    options::{BasicAckOptions, BasicGetOptions},
    Channel,
};
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, error};

/// Budget of a single consume step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsumeOptions {
    pub max_messages: usize,
    /// Values too large to add to the current instant mean no deadline.
    pub max_execution_time: Duration,
    /// Delay between two polls of an empty queue.
    pub poll_interval: Duration,
}

impl Default for ConsumeOptions {
    fn default() -> Self {
        ConsumeOptions {
            max_messages: 1,
            max_execution_time: Duration::from_secs(3),
            poll_interval: Duration::from_millis(50),
        }
    }
}

/// Single-message fetch and acknowledgement used by the consume loop.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub(crate) trait MessageSource: Send + Sync {
    /// Takes one message from `queue` without acknowledging it.
    async fn get(&self, queue: &str) -> Result<Option<Delivery>, lapin::Error>;

    async fn ack(&self, delivery: &Delivery) -> Result<(), lapin::Error>;
}

#[async_trait]
impl MessageSource for Channel {
    async fn get(&self, queue: &str) -> Result<Option<Delivery>, lapin::Error> {
        let got = self
            .basic_get(queue, BasicGetOptions { no_ack: false })
            .await?;
        Ok(got.map(|got| got.delivery))
    }

    async fn ack(&self, delivery: &Delivery) -> Result<(), lapin::Error> {
        delivery.ack(BasicAckOptions { multiple: false }).await
    }
}

/// Consumes at most `options.max_messages` messages from `queue`.
pub(crate) async fn consume(
    channel: &Channel,
    queue: &str,
    options: &ConsumeOptions,
) -> Result<Option<Message>, AmqpError> {
    consume_from(channel, queue, options).await
}

async fn consume_from<S: MessageSource + ?Sized>(
    source: &S,
    queue: &str,
    options: &ConsumeOptions,
) -> Result<Option<Message>, AmqpError> {
    let deadline = Instant::now().checked_add(options.max_execution_time);
    let mut received = 0;
    let mut last = None;

    while received < options.max_messages {
        let got = match source.get(queue).await {
            Err(err) => {
                error!(error = err.to_string(), queue, "error to get message");
                Err(AmqpError::ConsumerError(queue.to_owned()))
            }
            Ok(got) => Ok(got),
        }?;

        match got {
            Some(delivery) => {
                if let Err(err) = source.ack(&delivery).await {
                    error!(error = err.to_string(), "error whiling ack msg");
                    return Err(AmqpError::AckMessageError);
                }

                debug!(queue, "message received");
                last = Some(Message::from_delivery(&delivery));
                received += 1;
            }
            None => {
                let wait = match deadline {
                    Some(deadline) => {
                        let now = Instant::now();
                        if now >= deadline {
                            debug!(queue, received, "max execution time reached");
                            break;
                        }
                        options.poll_interval.min(deadline - now)
                    }
                    None => options.poll_interval,
                };
                sleep(wait).await;
            }
        }
    }

    Ok(last)
}
