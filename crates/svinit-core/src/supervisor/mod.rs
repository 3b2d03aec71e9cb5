mod aggregator;
mod child;
mod event;
mod event_loop;
mod shutdown_coordinator;

#[cfg(test)]
pub(crate) mod testing;

pub use aggregator::aggregate_exit_code;
pub use child::ChildHandle;
pub use event::{ChildRef, CompletionEvent, SignalSender};
pub use event_loop::{Supervisor, SupervisorReport};
pub use shutdown_coordinator::{ReapCause, ShutdownCoordinator, SupervisorState};
