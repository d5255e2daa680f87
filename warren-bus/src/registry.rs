//! Subscription bookkeeping: which handler types serve which event
//! names, and how to decode each event name's payload.

use async_trait::async_trait;
use dashmap::DashMap;
use std::any::{Any, TypeId};
use std::marker::PhantomData;
use std::sync::Arc;
use thiserror::Error;
use warren_core::{CodecError, Event, EventCodec, EventHandler, HandlerError, short_type_name};

/// Boxed event on its way from decode to a handler.
pub(crate) type BoxedEvent = Box<dyn Any + Send>;

/// Decode closure captured at subscribe time for one event type.
pub(crate) type EventDecoder = dyn Fn(&[u8]) -> Result<BoxedEvent, CodecError> + Send + Sync;

/// Builds a fresh erased handler per dispatched message.
pub(crate) type HandlerFactory = dyn Fn() -> Box<dyn ErasedEventHandler> + Send + Sync;

/// Type-erased event handler invoked by the dispatch loop.
#[async_trait]
pub(crate) trait ErasedEventHandler: Send + Sync {
    async fn handle(&self, event: BoxedEvent) -> Result<(), HandlerError>;
}

/// Adapter from a typed [`EventHandler`] to the erased form.
pub(crate) struct TypedHandler<E, H> {
    inner: H,
    _marker: PhantomData<fn(E)>,
}

impl<E, H> TypedHandler<E, H> {
    pub(crate) fn new(inner: H) -> Self {
        Self {
            inner,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<E: Event, H: EventHandler<E>> ErasedEventHandler for TypedHandler<E, H> {
    async fn handle(&self, event: BoxedEvent) -> Result<(), HandlerError> {
        match event.downcast::<E>() {
            Ok(event) => self.inner.handle(*event).await,
            Err(_) => Err(HandlerError::TypeMismatch {
                expected: E::name(),
            }),
        }
    }
}

/// Raised when a handler type is subscribed twice to the same event name.
#[derive(Debug, Error)]
#[error("handler {handler} is already registered for event '{event}'")]
pub struct DuplicateHandlerError {
    /// Unqualified name of the offending handler type.
    pub handler: &'static str,
    /// Wire name of the event.
    pub event: &'static str,
}

struct HandlerEntry {
    type_id: TypeId,
    type_name: &'static str,
    factory: Arc<HandlerFactory>,
}

/// Everything the dispatch loop needs to process one message, snapshotted
/// under a single registry lookup.
pub(crate) struct DispatchPlan {
    pub(crate) decoder: Arc<EventDecoder>,
    pub(crate) handlers: Vec<(&'static str, Arc<HandlerFactory>)>,
}

/// Append-only map from event names to handler factories and decoders.
///
/// Populated only through `register`, read concurrently by every consumer
/// loop. Lookups are atomic per entry: a reader sees the handler list
/// before or after a concurrent registration, never mid-update.
#[derive(Default)]
pub(crate) struct SubscriptionRegistry {
    handlers: DashMap<&'static str, Vec<HandlerEntry>>,
    decoders: DashMap<&'static str, Arc<EventDecoder>>,
}

impl SubscriptionRegistry {
    /// Register handler type `H` for event type `E`.
    ///
    /// The decoder for `E` is captured on first registration and reused
    /// for every later subscriber of the same event. A second
    /// registration of the same `H` under the same event name is rejected
    /// without mutating either map.
    pub(crate) fn register<E, H, C, F>(
        &self,
        codec: C,
        make: F,
    ) -> Result<(), DuplicateHandlerError>
    where
        E: Event,
        H: EventHandler<E>,
        C: EventCodec,
        F: Fn() -> H + Send + Sync + 'static,
    {
        let event_name = E::name();
        let type_id = TypeId::of::<H>();

        let mut entries = self.handlers.entry(event_name).or_default();
        if entries.iter().any(|entry| entry.type_id == type_id) {
            return Err(DuplicateHandlerError {
                handler: short_type_name::<H>(),
                event: event_name,
            });
        }

        self.decoders.entry(event_name).or_insert_with(|| {
            let decoder: Arc<EventDecoder> = Arc::new(move |payload: &[u8]| {
                codec
                    .decode::<E>(payload)
                    .map(|event| Box::new(event) as BoxedEvent)
            });
            decoder
        });

        let factory: Arc<HandlerFactory> =
            Arc::new(move || Box::new(TypedHandler::<E, H>::new(make())));
        entries.push(HandlerEntry {
            type_id,
            type_name: short_type_name::<H>(),
            factory,
        });
        Ok(())
    }

    /// Snapshot the dispatch plan for one routing key. `None` when nothing
    /// is subscribed under that name on this process.
    pub(crate) fn plan(&self, event_name: &str) -> Option<DispatchPlan> {
        let handlers: Vec<_> = self
            .handlers
            .get(event_name)?
            .iter()
            .map(|entry| (entry.type_name, Arc::clone(&entry.factory)))
            .collect();
        if handlers.is_empty() {
            return None;
        }
        let decoder = self.decoders.get(event_name).map(|d| Arc::clone(d.value()))?;
        Some(DispatchPlan { decoder, handlers })
    }

    /// Number of handler types registered for an event name.
    pub(crate) fn handler_count(&self, event_name: &str) -> usize {
        self.handlers
            .get(event_name)
            .map(|entries| entries.len())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use warren_core::JsonCodec;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct FundsDeposited {
        amount: u64,
    }

    impl Event for FundsDeposited {}

    #[derive(Default)]
    struct AuditHandler;

    #[async_trait]
    impl EventHandler<FundsDeposited> for AuditHandler {
        async fn handle(&self, _event: FundsDeposited) -> Result<(), HandlerError> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct NotifyHandler;

    #[async_trait]
    impl EventHandler<FundsDeposited> for NotifyHandler {
        async fn handle(&self, _event: FundsDeposited) -> Result<(), HandlerError> {
            Ok(())
        }
    }

    #[test]
    fn duplicate_handler_is_rejected_without_mutation() {
        let registry = SubscriptionRegistry::default();
        registry
            .register::<FundsDeposited, AuditHandler, _, _>(JsonCodec, AuditHandler::default)
            .unwrap();

        let err = registry
            .register::<FundsDeposited, AuditHandler, _, _>(JsonCodec, AuditHandler::default)
            .unwrap_err();

        assert_eq!(err.handler, "AuditHandler");
        assert_eq!(err.event, "FundsDeposited");
        assert_eq!(registry.handler_count("FundsDeposited"), 1);
    }

    #[test]
    fn handlers_keep_registration_order() {
        let registry = SubscriptionRegistry::default();
        registry
            .register::<FundsDeposited, AuditHandler, _, _>(JsonCodec, AuditHandler::default)
            .unwrap();
        registry
            .register::<FundsDeposited, NotifyHandler, _, _>(JsonCodec, NotifyHandler::default)
            .unwrap();

        let plan = registry.plan("FundsDeposited").unwrap();
        let names: Vec<_> = plan.handlers.iter().map(|(name, _)| *name).collect();
        assert_eq!(names, ["AuditHandler", "NotifyHandler"]);
    }

    #[test]
    fn decoder_registration_is_idempotent() {
        let registry = SubscriptionRegistry::default();
        registry
            .register::<FundsDeposited, AuditHandler, _, _>(JsonCodec, AuditHandler::default)
            .unwrap();
        registry
            .register::<FundsDeposited, NotifyHandler, _, _>(JsonCodec, NotifyHandler::default)
            .unwrap();

        assert_eq!(registry.decoders.len(), 1);
    }

    #[test]
    fn unknown_event_name_has_no_plan() {
        let registry = SubscriptionRegistry::default();
        assert!(registry.plan("NeverSubscribed").is_none());
        assert_eq!(registry.handler_count("NeverSubscribed"), 0);
    }

    #[test]
    fn decoder_produces_a_downcastable_event() {
        let registry = SubscriptionRegistry::default();
        registry
            .register::<FundsDeposited, AuditHandler, _, _>(JsonCodec, AuditHandler::default)
            .unwrap();

        let plan = registry.plan("FundsDeposited").unwrap();
        let boxed = (plan.decoder)(br#"{"amount":42}"#).unwrap();
        let event = boxed.downcast::<FundsDeposited>().unwrap();
        assert_eq!(event.amount, 42);
    }
}
