//! # Warren Broker
//!
//! The broker seam the warren event bus publishes and consumes through.
//!
//! The [`Broker`] trait is deliberately narrow: declare a queue, hand it a
//! payload, or consume it as a lazy stream of deliveries. Delivery is
//! at-most-once - messages are acknowledged before handlers run, and a
//! successful publish means "handed to the broker", not "seen by a
//! consumer". Durability, retries, and topology management stay with the
//! broker itself.
//!
//! ## Backends
//!
//! - [`AmqpBroker`] - RabbitMQ via lapin (feature `amqp`, on by default)
//! - [`MemoryBroker`] - channel-backed, for tests and single-process runs
//!
//! ## Example
//!
//! ```rust,ignore
//! use warren_broker::{AmqpBroker, AmqpConfig, Broker};
//!
//! # async fn example() -> Result<(), warren_broker::BrokerError> {
//! let broker = AmqpBroker::connect(AmqpConfig::new("amqp://localhost:5672")).await?;
//! broker.declare_queue("FundsDeposited").await?;
//! broker.publish("FundsDeposited", br#"{"account":"acct-7","amount":42}"#).await?;
//! # Ok(())
//! # }
//! ```

pub mod broker;
pub mod config;
pub mod error;
pub mod memory;

#[cfg(feature = "amqp")]
pub mod amqp;

pub use broker::{Broker, Delivery, DeliveryStream};
pub use config::AmqpConfig;
pub use error::BrokerError;
pub use memory::MemoryBroker;

#[cfg(feature = "amqp")]
pub use amqp::AmqpBroker;
