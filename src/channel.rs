// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # AMQP Channel Management
//!
//! This module opens the connection to RabbitMQ described by an
//! [`AmqpConfig`] and creates the single channel the test broker works on.

use crate::{config::AmqpConfig, errors::AmqpError};
use lapin::{types::LongString, Channel, Connection, ConnectionProperties};
use std::sync::Arc;
use tracing::{debug, error};

/// Creates a new AMQP connection and channel.
///
/// The connection is named after `cfg.connection_name` so test runs are easy
/// to spot in the management UI. Both handles are wrapped in `Arc` for
/// sharing between the broker and its callers.
///
/// # Example
/// ```no_run
/// # async fn run() -> Result<(), rabbitmq_bdd::errors::AmqpError> {
/// use rabbitmq_bdd::{channel::new_amqp_channel, config::AmqpConfig};
///
/// let (conn, channel) = new_amqp_channel(&AmqpConfig::default()).await?;
/// # Ok(())
/// # }
/// ```
pub async fn new_amqp_channel(
    cfg: &AmqpConfig,
) -> Result<(Arc<Connection>, Arc<Channel>), AmqpError> {
    cfg.validate()?;

    debug!("creating amqp connection...");
    let options = ConnectionProperties::default()
        .with_connection_name(LongString::from(cfg.connection_name.clone()));

    let conn = match Connection::connect_uri(cfg.amqp_uri(), options).await {
        Ok(c) => Ok(c),
        Err(err) => {
            error!(error = err.to_string(), host = %cfg.host, "failure to connect");
            Err(AmqpError::ConnectionError {})
        }
    }?;
    debug!("amqp connected");

    debug!("creating amqp channel...");
    match conn.create_channel().await {
        Ok(c) => {
            debug!("channel created");
            Ok((Arc::new(conn), Arc::new(c)))
        }
        Err(err) => {
            error!(error = err.to_string(), "error to create the channel");
            Err(AmqpError::ChannelError {})
        }
    }
}
