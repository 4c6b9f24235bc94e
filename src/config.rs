// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Connection Settings
//!
//! [`AmqpConfig`] holds everything needed to reach the broker. Values are
//! layered with `figment`: built-in defaults, then an optional `amqp.yaml`
//! file in the working directory, then `AMQP_*` environment variables
//! (`AMQP_HOST`, `AMQP_PORT`, `AMQP_VHOST`, `AMQP_LOGIN`, `AMQP_PASSWORD`,
//! `AMQP_EXCHANGE`, `AMQP_CONNECTION_NAME`).

use crate::errors::AmqpError;
use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use lapin::uri::{AMQPAuthority, AMQPUri, AMQPUserInfo};
use serde::{Deserialize, Serialize};
use tracing::error;

/// Default configuration file looked up by [`AmqpConfig::load`].
pub const CONFIG_FILE: &str = "amqp.yaml";
/// Prefix of the environment variables read by [`AmqpConfig::load`].
pub const ENV_PREFIX: &str = "AMQP_";

/// Broker connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AmqpConfig {
    pub host: String,
    pub port: u16,
    pub vhost: String,
    pub login: String,
    pub password: String,
    /// Exchange messages are published to. Empty means the default exchange.
    pub exchange: String,
    pub connection_name: String,
}

impl Default for AmqpConfig {
    fn default() -> Self {
        AmqpConfig {
            host: "localhost".to_owned(),
            port: 5672,
            vhost: "/".to_owned(),
            login: "guest".to_owned(),
            password: "guest".to_owned(),
            exchange: String::new(),
            connection_name: "rabbitmq-bdd".to_owned(),
        }
    }
}

impl AmqpConfig {
    /// Loads the layered configuration from [`CONFIG_FILE`] and the environment.
    pub fn load() -> Result<AmqpConfig, AmqpError> {
        Self::from_figment(Self::figment())
    }

    /// The default provider stack, exposed so callers can merge extra layers.
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(AmqpConfig::default()))
            .merge(Yaml::file(CONFIG_FILE))
            .merge(Env::prefixed(ENV_PREFIX))
    }

    /// Extracts and validates a configuration from any provider stack.
    pub fn from_figment(figment: Figment) -> Result<AmqpConfig, AmqpError> {
        let cfg: AmqpConfig = figment.extract().map_err(|err| {
            error!(error = err.to_string(), "failure to load amqp configuration");
            AmqpError::ConfigError(err.to_string())
        })?;

        cfg.validate()?;
        Ok(cfg)
    }

    /// Rejects empty connection settings.
    pub fn validate(&self) -> Result<(), AmqpError> {
        let required = [
            ("host", &self.host),
            ("vhost", &self.vhost),
            ("login", &self.login),
            ("password", &self.password),
        ];

        match required.iter().find(|(_, value)| value.is_empty()) {
            Some((name, _)) => Err(AmqpError::ConfigError(format!("`{name}` cannot be empty"))),
            None => Ok(()),
        }
    }

    /// Connection URI for this configuration.
    ///
    /// Built field by field, so credentials and vhost are passed through
    /// verbatim with no percent-encoding.
    pub fn amqp_uri(&self) -> AMQPUri {
        AMQPUri {
            authority: AMQPAuthority {
                userinfo: AMQPUserInfo {
                    username: self.login.clone(),
                    password: self.password.clone(),
                },
                host: self.host.clone(),
                port: self.port,
            },
            vhost: self.vhost.clone(),
            ..AMQPUri::default()
        }
    }
}
