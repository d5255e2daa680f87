//! AMQP broker backend over lapin

use crate::broker::{Broker, Delivery, DeliveryStream};
use crate::config::AmqpConfig;
use crate::error::BrokerError;
use async_trait::async_trait;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use lapin::options::{BasicConsumeOptions, BasicPublishOptions, QueueDeclareOptions};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties};
use std::pin::Pin;
use std::task::{Context, Poll};
use tracing::{debug, info};
use uuid::Uuid;

/// RabbitMQ-backed broker.
///
/// Holds one connection for its lifetime. Declaring and publishing each
/// open a fresh, scoped channel per call; consuming opens a dedicated
/// channel that stays open as long as the returned stream is alive.
pub struct AmqpBroker {
    config: AmqpConfig,
    connection: Connection,
}

impl AmqpBroker {
    /// Connect to the broker at `config.url`.
    pub async fn connect(config: AmqpConfig) -> Result<Self, BrokerError> {
        info!(url = %config.url, "connecting to AMQP broker");

        let connection = tokio::time::timeout(
            config.connect_timeout,
            Connection::connect(&config.url, ConnectionProperties::default()),
        )
        .await
        .map_err(|_| {
            BrokerError::Connection(format!("timed out connecting to {}", config.url))
        })??;

        info!("connected to AMQP broker");
        Ok(Self { config, connection })
    }

    /// Whether the underlying connection is still open.
    pub fn is_connected(&self) -> bool {
        self.connection.status().connected()
    }

    /// Close the connection gracefully. Consumer streams end once their
    /// channels are torn down.
    pub async fn close(&self) -> Result<(), BrokerError> {
        info!("closing AMQP connection");
        self.connection
            .close(200, "shutdown")
            .await
            .map_err(|e| BrokerError::Connection(e.to_string()))
    }

    async fn open_channel(&self) -> Result<Channel, BrokerError> {
        Ok(self.connection.create_channel().await?)
    }

    async fn declare_on(channel: &Channel, queue: &str) -> Result<(), BrokerError> {
        channel
            .queue_declare(queue, QueueDeclareOptions::default(), FieldTable::default())
            .await
            .map_err(|e| BrokerError::Declare(e.to_string()))?;
        debug!(queue, "queue declared");
        Ok(())
    }
}

#[async_trait]
impl Broker for AmqpBroker {
    async fn declare_queue(&self, name: &str) -> Result<(), BrokerError> {
        let channel = self.open_channel().await?;
        Self::declare_on(&channel, name).await
    }

    async fn publish(&self, queue: &str, payload: &[u8]) -> Result<(), BrokerError> {
        // Fresh channel per call, released on every exit path. Default
        // exchange, queue name as routing key, no properties, no confirm
        // wait.
        let channel = self.open_channel().await?;
        channel
            .basic_publish(
                "",
                queue,
                BasicPublishOptions::default(),
                payload,
                BasicProperties::default(),
            )
            .await
            .map_err(|e| BrokerError::Publish(e.to_string()))?;

        debug!(queue, bytes = payload.len(), "published");
        Ok(())
    }

    async fn consume(&self, queue: &str) -> Result<DeliveryStream, BrokerError> {
        let channel = self.open_channel().await?;
        Self::declare_on(&channel, queue).await?;

        let tag = format!("{}-{}", self.config.consumer_tag_prefix, Uuid::new_v4());
        let consumer = channel
            .basic_consume(
                queue,
                &tag,
                // Auto-acknowledge: the message counts as delivered before
                // any handler runs.
                BasicConsumeOptions {
                    no_ack: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| BrokerError::Consume(e.to_string()))?;

        info!(queue, consumer_tag = %tag, "consumer started");

        let stream: DeliveryStream = Box::pin(AmqpDeliveries {
            inner: consumer.boxed(),
            _channel: channel,
        });
        Ok(stream)
    }
}

/// Delivery stream for one consumer; owns the channel so it stays open
/// for the life of the stream.
struct AmqpDeliveries {
    inner: BoxStream<'static, Result<lapin::message::Delivery, lapin::Error>>,
    _channel: Channel,
}

impl futures_util::Stream for AmqpDeliveries {
    type Item = Result<Delivery, BrokerError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        this.inner.poll_next_unpin(cx).map(|next| {
            next.map(|result| match result {
                Ok(delivery) => Ok(Delivery {
                    routing_key: delivery.routing_key.as_str().to_string(),
                    payload: delivery.data,
                }),
                Err(e) => Err(BrokerError::from(e)),
            })
        })
    }
}
