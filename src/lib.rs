// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! AMQP steps for behaviour-driven tests: publish and consume RabbitMQ
//! messages and assert on their properties, headers and bodies, including a
//! structural JSON matcher with typed placeholders (`<int>`, `<string>`,
//! `<uuid>`, `<dateTime>`, `<date>`, `<array>`).

mod consumer;

pub mod asserter;
pub mod broker;
pub mod channel;
pub mod config;
pub mod context;
pub mod errors;
pub mod matcher;
pub mod message;
pub mod pattern;
pub mod publisher;
pub mod queue;

pub use consumer::ConsumeOptions;
