//! Order lifecycle events.
//!
//! The order flow publishes an event after each committed change. Hooks registered through [`EventHooks`] run on
//! their own tasks, so a slow hook never holds up the request that triggered it.
mod channel;
mod event_types;
mod hooks;

pub use channel::{EventHandler, EventProducer, Handler};
pub use event_types::*;
pub use hooks::{EventHandlers, EventHooks, EventProducers};
