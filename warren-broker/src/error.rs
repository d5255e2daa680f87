//! Error types for broker operations

use thiserror::Error;

/// Errors surfaced by broker backends.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// Failed to reach or stay connected to the broker
    #[error("connection failed: {0}")]
    Connection(String),

    /// Failed to declare a queue
    #[error("queue declare failed: {0}")]
    Declare(String),

    /// Failed to hand a payload to the broker
    #[error("publish failed: {0}")]
    Publish(String),

    /// Failed to start or continue consuming a queue
    #[error("consume failed: {0}")]
    Consume(String),

    /// Channel is no longer usable
    #[error("channel closed: {0}")]
    ChannelClosed(String),

    /// The queue already has its one consumer
    #[error("queue '{0}' already has a consumer")]
    ConsumerExists(String),

    /// Any other broker-side failure
    #[error("broker error: {0}")]
    Broker(String),
}

#[cfg(feature = "amqp")]
impl From<lapin::Error> for BrokerError {
    fn from(err: lapin::Error) -> Self {
        match err.kind() {
            lapin::ErrorKind::IOError(_) => BrokerError::Connection(err.to_string()),
            lapin::ErrorKind::InvalidConnectionState(_) => BrokerError::Connection(err.to_string()),
            lapin::ErrorKind::InvalidChannelState(..) => BrokerError::ChannelClosed(err.to_string()),
            _ => BrokerError::Broker(err.to_string()),
        }
    }
}
