// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Queue Definitions
//!
//! Queues touched by test steps are declared on first use. A
//! [`QueueDefinition`] carries the declaration flags; the broker keeps one as
//! a template and stamps the queue name onto it.

use lapin::options::QueueDeclareOptions;

/// Declaration flags of a RabbitMQ queue, built with chained setters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueDefinition {
    pub(crate) name: String,
    pub(crate) durable: bool,
    pub(crate) delete: bool,
    pub(crate) exclusive: bool,
    pub(crate) passive: bool,
}

impl QueueDefinition {
    /// Creates a non-durable, non-exclusive definition for `name`.
    pub fn new(name: &str) -> QueueDefinition {
        QueueDefinition {
            name: name.to_owned(),
            durable: false,
            delete: false,
            exclusive: false,
            passive: false,
        }
    }

    /// Makes the queue durable, persisting across broker restarts.
    pub fn durable(mut self) -> Self {
        self.durable = true;
        self
    }

    /// Sets the queue to auto-delete when no longer used.
    pub fn delete(mut self) -> Self {
        self.delete = true;
        self
    }

    /// Makes the queue exclusive to the connection.
    pub fn exclusive(mut self) -> Self {
        self.exclusive = true;
        self
    }

    /// Only checks that the queue exists instead of creating it.
    pub fn passive(mut self) -> Self {
        self.passive = true;
        self
    }

    /// Same flags, different queue.
    pub fn named(&self, name: &str) -> QueueDefinition {
        QueueDefinition {
            name: name.to_owned(),
            ..self.clone()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn declare_options(&self) -> QueueDeclareOptions {
        QueueDeclareOptions {
            passive: self.passive,
            durable: self.durable,
            exclusive: self.exclusive,
            auto_delete: self.delete,
            nowait: false,
        }
    }
}
