//! In-memory broker for tests and single-process runs

use crate::broker::{Broker, Delivery, DeliveryStream};
use crate::error::BrokerError;
use async_trait::async_trait;
use dashmap::DashMap;
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

/// Channel-backed broker with one unbounded queue per name.
///
/// Mirrors the AMQP backend's contract: published payloads are buffered
/// until the queue's consumer drains them, routing keys equal queue
/// names, and each queue supports exactly one consumer.
#[derive(Default)]
pub struct MemoryBroker {
    queues: DashMap<String, MemoryQueue>,
}

struct MemoryQueue {
    tx: mpsc::UnboundedSender<Delivery>,
    // Taken by the queue's one consumer.
    rx: Option<mpsc::UnboundedReceiver<Delivery>>,
}

impl MemoryBroker {
    /// Create a broker with no queues.
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_queue(&self, name: &str) {
        self.queues.entry(name.to_string()).or_insert_with(|| {
            let (tx, rx) = mpsc::unbounded_channel();
            MemoryQueue { tx, rx: Some(rx) }
        });
    }
}

#[async_trait]
impl Broker for MemoryBroker {
    async fn declare_queue(&self, name: &str) -> Result<(), BrokerError> {
        self.ensure_queue(name);
        Ok(())
    }

    async fn publish(&self, queue: &str, payload: &[u8]) -> Result<(), BrokerError> {
        self.ensure_queue(queue);
        let delivery = Delivery {
            routing_key: queue.to_string(),
            payload: payload.to_vec(),
        };
        self.queues
            .get(queue)
            .ok_or_else(|| BrokerError::Publish(format!("queue '{queue}' missing")))?
            .tx
            .send(delivery)
            .map_err(|_| BrokerError::Publish(format!("queue '{queue}' is closed")))
    }

    async fn consume(&self, queue: &str) -> Result<DeliveryStream, BrokerError> {
        self.ensure_queue(queue);
        let rx = self
            .queues
            .get_mut(queue)
            .and_then(|mut entry| entry.rx.take())
            .ok_or_else(|| BrokerError::ConsumerExists(queue.to_string()))?;
        Ok(UnboundedReceiverStream::new(rx)
            .map(Ok::<_, BrokerError>)
            .boxed())
    }
}
