//! # Warren Core
//!
//! Domain contracts shared by every part of the warren event bus:
//!
//! - **Events** - immutable facts broadcast to zero or more subscribers,
//!   identified on the wire by their type name
//! - **Commands** - instructions sent to exactly one local handler,
//!   expecting a result
//! - **Handlers** - the capabilities that process one event type or one
//!   command type
//! - **Codec** - the seam between typed events and wire bytes
//!
//! ## Example
//!
//! ```rust,ignore
//! use warren_core::{CommandBus, Event, EventHandler, HandlerError};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! struct FundsDeposited {
//!     account: String,
//!     amount: u64,
//! }
//!
//! impl Event for FundsDeposited {}
//!
//! #[derive(Default)]
//! struct BalanceProjector;
//!
//! #[async_trait::async_trait]
//! impl EventHandler<FundsDeposited> for BalanceProjector {
//!     async fn handle(&self, event: FundsDeposited) -> Result<(), HandlerError> {
//!         println!("{} credited to {}", event.amount, event.account);
//!         Ok(())
//!     }
//! }
//! ```

pub mod codec;
pub mod command;
pub mod event;

pub use codec::{CodecError, EventCodec, JsonCodec};
pub use command::{Command, CommandBus, CommandError, CommandHandler};
pub use event::{Event, EventHandler, HandlerError, short_type_name};
