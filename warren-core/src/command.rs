//! Command dispatch through the in-process command bus

use async_trait::async_trait;
use dashmap::DashMap;
use std::any::{Any, TypeId};
use std::marker::PhantomData;
use std::sync::Arc;
use thiserror::Error;

/// An instruction sent to exactly one local handler, expecting a result.
pub trait Command: Send + 'static {
    /// Result produced by the command's handler.
    type Output: Send + 'static;
}

/// Handles one specific command type.
///
/// Unlike event handlers, command handlers are registered as pre-built
/// instances: there is exactly one per command type.
#[async_trait]
pub trait CommandHandler<C: Command>: Send + Sync {
    /// Handle the command and produce its result.
    async fn handle(&self, command: C) -> Result<C::Output, CommandError>;
}

/// Command error
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("command execution failed: {0}")]
    ExecutionFailed(String),

    #[error("no handler registered for command")]
    HandlerNotFound,
}

#[async_trait]
trait DynCommandHandler: Send + Sync {
    async fn handle_dyn(
        &self,
        command: Box<dyn Any + Send>,
    ) -> Result<Box<dyn Any + Send>, CommandError>;
}

struct TypedCommandHandler<C: Command, H: CommandHandler<C>> {
    handler: H,
    _marker: PhantomData<fn(C)>,
}

#[async_trait]
impl<C: Command, H: CommandHandler<C>> DynCommandHandler for TypedCommandHandler<C, H> {
    async fn handle_dyn(
        &self,
        command: Box<dyn Any + Send>,
    ) -> Result<Box<dyn Any + Send>, CommandError> {
        match command.downcast::<C>() {
            Ok(command) => {
                let output = self.handler.handle(*command).await?;
                Ok(Box::new(output))
            }
            Err(_) => Err(CommandError::ExecutionFailed(
                "command type mismatch".to_string(),
            )),
        }
    }
}

/// In-process command bus: the mediator between callers and the single
/// handler registered for each command type.
pub struct CommandBus {
    handlers: DashMap<TypeId, Arc<dyn DynCommandHandler>>,
}

impl CommandBus {
    /// Create an empty command bus.
    pub fn new() -> Self {
        Self {
            handlers: DashMap::new(),
        }
    }

    /// Register the handler for command type `C`, replacing any previous
    /// registration for the same type.
    pub fn register<C, H>(&self, handler: H)
    where
        C: Command,
        H: CommandHandler<C> + 'static,
    {
        self.handlers.insert(
            TypeId::of::<C>(),
            Arc::new(TypedCommandHandler {
                handler,
                _marker: PhantomData,
            }),
        );
    }

    /// Send a command to its handler and await the result.
    ///
    /// The command is forwarded unmodified; whatever the handler returns
    /// or raises propagates unchanged to the caller.
    pub async fn send<C>(&self, command: C) -> Result<C::Output, CommandError>
    where
        C: Command,
    {
        let handler = self
            .handlers
            .get(&TypeId::of::<C>())
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(CommandError::HandlerNotFound)?;

        let output = handler.handle_dyn(Box::new(command)).await?;
        match output.downcast::<C::Output>() {
            Ok(output) => Ok(*output),
            Err(_) => Err(CommandError::ExecutionFailed(
                "result type mismatch".to_string(),
            )),
        }
    }
}

impl Default for CommandBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct TransferFunds {
        from: String,
        to: String,
        amount: u64,
    }

    impl Command for TransferFunds {
        type Output = String; // transfer receipt id
    }

    struct TransferHandler {
        calls: Arc<AtomicU32>,
    }

    #[async_trait]
    impl CommandHandler<TransferFunds> for TransferHandler {
        async fn handle(&self, command: TransferFunds) -> Result<String, CommandError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if command.amount == 0 {
                return Err(CommandError::ExecutionFailed(
                    "zero amount".to_string(),
                ));
            }
            Ok(format!("{}->{}:{}", command.from, command.to, command.amount))
        }
    }

    #[tokio::test]
    async fn send_forwards_one_call_and_returns_the_result() {
        let bus = CommandBus::new();
        let calls = Arc::new(AtomicU32::new(0));
        bus.register::<TransferFunds, _>(TransferHandler {
            calls: calls.clone(),
        });

        let receipt = bus
            .send(TransferFunds {
                from: "a".to_string(),
                to: "b".to_string(),
                amount: 42,
            })
            .await
            .unwrap();

        assert_eq!(receipt, "a->b:42");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn handler_errors_propagate_unchanged() {
        let bus = CommandBus::new();
        bus.register::<TransferFunds, _>(TransferHandler {
            calls: Arc::new(AtomicU32::new(0)),
        });

        let err = bus
            .send(TransferFunds {
                from: "a".to_string(),
                to: "b".to_string(),
                amount: 0,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, CommandError::ExecutionFailed(_)));
    }

    #[tokio::test]
    async fn missing_handler_is_reported() {
        let bus = CommandBus::new();
        let err = bus
            .send(TransferFunds {
                from: "a".to_string(),
                to: "b".to_string(),
                amount: 1,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, CommandError::HandlerNotFound));
    }
}
