//! Consumer loops and per-message dispatch

use crate::registry::SubscriptionRegistry;
use futures_util::StreamExt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use warren_broker::{Broker, Delivery};

/// Consume `queue` until the broker stream ends, dispatching each
/// delivery through the registry. Runs for process lifetime; there is no
/// cancellation.
pub(crate) async fn consume_loop(
    broker: Arc<dyn Broker>,
    registry: Arc<SubscriptionRegistry>,
    queue: String,
) {
    let mut deliveries = match broker.consume(&queue).await {
        Ok(stream) => stream,
        Err(e) => {
            error!(queue = %queue, error = %e, "failed to start consumer");
            return;
        }
    };
    info!(queue = %queue, "consumer loop started");

    while let Some(next) = deliveries.next().await {
        match next {
            Ok(delivery) => dispatch(&registry, delivery).await,
            Err(e) => error!(queue = %queue, error = %e, "consumer stream error"),
        }
    }

    warn!(queue = %queue, "consumer stream ended");
}

/// Dispatch one delivery to every handler type registered for its routing
/// key, in registration order.
///
/// Each handler gets a fresh instance and its own decode of the payload,
/// and is awaited before the next handler runs. Decode and handler
/// failures are logged and skipped; one bad message never takes the
/// consume loop down.
async fn dispatch(registry: &SubscriptionRegistry, delivery: Delivery) {
    let Some(plan) = registry.plan(&delivery.routing_key) else {
        // Nothing subscribed under this name on this process.
        debug!(event = %delivery.routing_key, "no subscriptions, dropping message");
        return;
    };

    for (handler_name, factory) in plan.handlers {
        let handler = factory();
        let event = match (plan.decoder)(&delivery.payload) {
            Ok(event) => event,
            Err(e) => {
                error!(
                    event = %delivery.routing_key,
                    handler = handler_name,
                    error = %e,
                    "payload decode failed"
                );
                continue;
            }
        };
        if let Err(e) = handler.handle(event).await {
            error!(
                event = %delivery.routing_key,
                handler = handler_name,
                error = %e,
                "handler failed"
            );
        }
    }
}
