//! Configuration for the AMQP backend

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for [`AmqpBroker`](crate::AmqpBroker).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmqpConfig {
    /// AMQP connection URL.
    pub url: String,
    /// Time allowed for the initial connection handshake.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: Duration,
    /// Prefix for generated consumer tags.
    #[serde(default = "default_consumer_tag_prefix")]
    pub consumer_tag_prefix: String,
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_consumer_tag_prefix() -> String {
    "warren".to_string()
}

impl Default for AmqpConfig {
    fn default() -> Self {
        Self {
            url: "amqp://localhost:5672".to_string(),
            connect_timeout: default_connect_timeout(),
            consumer_tag_prefix: default_consumer_tag_prefix(),
        }
    }
}

impl AmqpConfig {
    /// Create a configuration with the given URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Set the connection timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the consumer tag prefix.
    pub fn with_consumer_tag_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.consumer_tag_prefix = prefix.into();
        self
    }
}
