//! The event bus facade

use crate::dispatch;
use crate::registry::{DuplicateHandlerError, SubscriptionRegistry};
use dashmap::DashSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};
use warren_broker::{Broker, BrokerError};
use warren_core::{
    CodecError, Command, CommandBus, CommandError, Event, EventCodec, EventHandler, JsonCodec,
    short_type_name,
};

/// Errors surfaced by [`EventBus::publish`].
#[derive(Debug, Error)]
pub enum PublishError {
    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Broker(#[from] BrokerError),
}

/// Bridges two delivery models: synchronous local command dispatch
/// through the [`CommandBus`], and asynchronous cross-process event
/// delivery through a [`Broker`].
///
/// Construct one bus per process and share it; the subscription registry
/// and consumer loops belong to the instance, not to any global state.
///
/// ## Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use warren_broker::MemoryBroker;
/// use warren_bus::EventBus;
/// use warren_core::CommandBus;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let bus = EventBus::new(Arc::new(MemoryBroker::new()), Arc::new(CommandBus::new()));
/// bus.subscribe::<FundsDeposited, BalanceProjector>()?;
/// bus.publish(FundsDeposited { account: "acct-7".into(), amount: 42 }).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct EventBus<C: EventCodec = JsonCodec> {
    broker: Arc<dyn Broker>,
    mediator: Arc<CommandBus>,
    registry: Arc<SubscriptionRegistry>,
    codec: C,
    // Event names with a live consumer loop.
    consuming: Arc<DashSet<&'static str>>,
}

impl EventBus<JsonCodec> {
    /// Create a bus with the JSON codec.
    pub fn new(broker: Arc<dyn Broker>, mediator: Arc<CommandBus>) -> Self {
        Self::with_codec(broker, mediator, JsonCodec)
    }
}

impl<C: EventCodec> EventBus<C> {
    /// Create a bus with a custom codec.
    pub fn with_codec(broker: Arc<dyn Broker>, mediator: Arc<CommandBus>, codec: C) -> Self {
        Self {
            broker,
            mediator,
            registry: Arc::new(SubscriptionRegistry::default()),
            codec,
            consuming: Arc::new(DashSet::new()),
        }
    }

    /// Forward a command to its local handler and await the result.
    ///
    /// No validation, transformation, or retry happens here; whatever the
    /// mediator returns or raises propagates unchanged.
    pub async fn send_command<Cmd: Command>(&self, command: Cmd) -> Result<Cmd::Output, CommandError> {
        self.mediator.send(command).await
    }

    /// Publish an event to the queue named after its type.
    ///
    /// Fire-and-forget: a successful return means the broker accepted the
    /// payload, not that any consumer has processed it.
    pub async fn publish<E: Event>(&self, event: E) -> Result<(), PublishError> {
        let queue = E::name();
        self.broker.declare_queue(queue).await?;
        let payload = self.codec.encode(&event)?;
        debug!(event = queue, bytes = payload.len(), "publishing event");
        self.broker.publish(queue, &payload).await?;
        Ok(())
    }

    /// Register handler type `H` for event type `E` and ensure `E`'s
    /// queue is being consumed.
    ///
    /// A fresh `H` is default-constructed per delivered message. Fails
    /// with [`DuplicateHandlerError`] if `H` is already subscribed to
    /// `E`; the existing registration is untouched. Must be called from
    /// within a Tokio runtime.
    pub fn subscribe<E, H>(&self) -> Result<(), DuplicateHandlerError>
    where
        E: Event,
        H: EventHandler<E> + Default,
    {
        self.subscribe_with::<E, H, _>(H::default)
    }

    /// Like [`EventBus::subscribe`], constructing handlers with `make`
    /// instead of `Default`. Useful for handlers that share state with
    /// the rest of the application.
    pub fn subscribe_with<E, H, F>(&self, make: F) -> Result<(), DuplicateHandlerError>
    where
        E: Event,
        H: EventHandler<E>,
        F: Fn() -> H + Send + Sync + 'static,
    {
        self.registry
            .register::<E, H, _, _>(self.codec.clone(), make)?;
        info!(event = E::name(), handler = short_type_name::<H>(), "subscribed");
        self.ensure_consumer(E::name());
        Ok(())
    }

    /// Number of handler types currently subscribed to `E`.
    pub fn handler_count<E: Event>(&self) -> usize {
        self.registry.handler_count(E::name())
    }

    // One consumer loop per event name for the life of the process, no
    // matter how many handler types subscribe to it.
    fn ensure_consumer(&self, event_name: &'static str) {
        if self.consuming.insert(event_name) {
            let broker = Arc::clone(&self.broker);
            let registry = Arc::clone(&self.registry);
            tokio::spawn(dispatch::consume_loop(
                broker,
                registry,
                event_name.to_string(),
            ));
        }
    }
}
