//! The queue-oriented broker interface

use crate::error::BrokerError;
use async_trait::async_trait;
use futures_util::Stream;
use std::pin::Pin;

/// A single message as it arrives off a queue.
#[derive(Debug, Clone)]
pub struct Delivery {
    /// Routing key the message was published under; equals the queue name
    /// by construction.
    pub routing_key: String,
    /// Raw encoded payload.
    pub payload: Vec<u8>,
}

/// Lazy stream of deliveries from one queue.
pub type DeliveryStream = Pin<Box<dyn Stream<Item = Result<Delivery, BrokerError>> + Send>>;

/// Queue operations the bus needs from a broker.
///
/// Semantics are at-most-once: consumed messages are acknowledged before
/// any handler runs, and [`Broker::publish`] returns once the payload is
/// handed to the broker.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Ensure a queue exists. Idempotent; no durability or exclusivity
    /// flags are set.
    async fn declare_queue(&self, name: &str) -> Result<(), BrokerError>;

    /// Hand a payload to the broker for the given queue. Fire-and-forget:
    /// no delivery confirmation is awaited and no message properties are
    /// attached. Callers declare the queue first; a payload published to
    /// a queue that does not exist may be dropped by the backend.
    async fn publish(&self, queue: &str, payload: &[u8]) -> Result<(), BrokerError>;

    /// Begin consuming a queue, declaring it first if needed.
    async fn consume(&self, queue: &str) -> Result<DeliveryStream, BrokerError>;
}
