//! # Warren Bus
//!
//! An event bus facade bridging two delivery models:
//!
//! - **Commands** are dispatched synchronously to exactly one local
//!   handler through the in-process command bus and return its result.
//! - **Events** are published to a broker queue named after the event
//!   type and delivered asynchronously to every subscribed handler, in
//!   any process consuming that queue.
//!
//! Subscribing registers a handler *type* against an event *type*; when a
//! matching message arrives off the wire, the bus resolves the event name
//! back to the concrete types registered here, decodes the payload, and
//! invokes a fresh handler instance per message.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use serde::{Deserialize, Serialize};
//! use warren_broker::{AmqpBroker, AmqpConfig};
//! use warren_bus::EventBus;
//! use warren_core::{CommandBus, Event, EventHandler, HandlerError};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! struct FundsDeposited {
//!     account: String,
//!     amount: u64,
//! }
//!
//! impl Event for FundsDeposited {}
//!
//! #[derive(Default)]
//! struct BalanceProjector;
//!
//! #[async_trait::async_trait]
//! impl EventHandler<FundsDeposited> for BalanceProjector {
//!     async fn handle(&self, event: FundsDeposited) -> Result<(), HandlerError> {
//!         println!("{} credited to {}", event.amount, event.account);
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let broker = AmqpBroker::connect(AmqpConfig::new("amqp://localhost:5672")).await?;
//!     let bus = EventBus::new(Arc::new(broker), Arc::new(CommandBus::new()));
//!
//!     bus.subscribe::<FundsDeposited, BalanceProjector>()?;
//!     bus.publish(FundsDeposited { account: "acct-7".into(), amount: 42 }).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Delivery semantics
//!
//! At-most-once, end to end. Publishing does not wait for delivery
//! confirmation, consumed messages are acknowledged before handlers run,
//! and a failing handler is logged and skipped - never retried. Handlers
//! for one message run sequentially in registration order; different
//! event types are consumed by independent loops.

pub mod bus;
pub mod registry;

mod dispatch;

pub use bus::{EventBus, PublishError};
pub use registry::DuplicateHandlerError;
