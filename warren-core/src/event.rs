//! Event definitions and traits

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// An immutable fact broadcast to zero or more subscribers.
///
/// Events cross process boundaries keyed by [`Event::name`], so the name
/// must be unique per event type across every service that shares the
/// broker. The default is the unqualified type name, which is what
/// subscribers in other processes derive for the same type.
pub trait Event: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Wire name of this event type; also the name of the queue its
    /// messages flow through.
    fn name() -> &'static str {
        short_type_name::<Self>()
    }
}

/// Last path segment of `std::any::type_name`, e.g. `FundsDeposited` for
/// `my_app::events::FundsDeposited`.
pub fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}

/// Handles one specific event type.
///
/// The dispatch engine constructs a fresh handler per delivered message,
/// so implementations should keep per-instance state cheap and put shared
/// state behind an `Arc` captured by the subscription's factory.
#[async_trait]
pub trait EventHandler<E: Event>: Send + Sync + 'static {
    /// Process one event. Errors are logged by the dispatch loop and do
    /// not stop delivery to other handlers.
    async fn handle(&self, event: E) -> Result<(), HandlerError>;
}

/// Event handler error
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("handler failed: {0}")]
    Failed(String),

    #[error("event type mismatch: expected {expected}")]
    TypeMismatch { expected: &'static str },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct FundsDeposited {
        account: String,
        amount: u64,
    }

    impl Event for FundsDeposited {}

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct FundsWithdrawn {
        amount: u64,
    }

    impl Event for FundsWithdrawn {
        fn name() -> &'static str {
            "funds.withdrawn"
        }
    }

    #[test]
    fn default_name_is_unqualified_type_name() {
        assert_eq!(FundsDeposited::name(), "FundsDeposited");
    }

    #[test]
    fn name_can_be_overridden() {
        assert_eq!(FundsWithdrawn::name(), "funds.withdrawn");
    }

    #[test]
    fn short_type_name_strips_module_path() {
        assert_eq!(short_type_name::<FundsDeposited>(), "FundsDeposited");
        assert_eq!(short_type_name::<u64>(), "u64");
    }
}
