use crate::process::{ExitDescriptor, ProcessError};
use crate::signal::Signal;
use derive_more::Display;
use tokio::sync::mpsc;

/// Identifies the child an event came from: roster position plus display identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display)]
#[display("{identity}")]
pub struct ChildRef {
    pub index: usize,
    pub identity: String,
}

/// Terminal report for one child.
///
/// `exit` is present when the OS produced a status; `error` when the child
/// failed to start or the wait failed.
#[derive(Debug)]
pub struct CompletionEvent {
    child: ChildRef,
    exit: Option<ExitDescriptor>,
    error: Option<ProcessError>,
}

impl CompletionEvent {
    pub fn exited(child: ChildRef, exit: ExitDescriptor) -> Self {
        Self {
            child,
            exit: Some(exit),
            error: None,
        }
    }

    pub fn start_failed(child: ChildRef, error: ProcessError) -> Self {
        Self {
            child,
            exit: None,
            error: Some(error),
        }
    }

    pub fn wait_failed(child: ChildRef, error: ProcessError, exit: Option<ExitDescriptor>) -> Self {
        Self {
            child,
            exit,
            error: Some(error),
        }
    }

    pub fn child(&self) -> &ChildRef {
        &self.child
    }

    pub fn exit(&self) -> Option<&ExitDescriptor> {
        self.exit.as_ref()
    }

    pub fn error(&self) -> Option<&ProcessError> {
        self.error.as_ref()
    }
}

/// Everything the supervisor loop reacts to arrives as one of these.
#[derive(Debug)]
pub(crate) enum Message {
    Signal(Signal),
    Completed(CompletionEvent),
}

/// Producer half of the supervisor's inbox.
///
/// Each producer holds its own clone; per-producer ordering is preserved.
#[derive(Debug, Clone)]
pub(crate) struct Inbox(mpsc::UnboundedSender<Message>);

impl Inbox {
    pub(crate) fn channel() -> (Self, mpsc::UnboundedReceiver<Message>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self(tx), rx)
    }

    pub(crate) fn post(&self, message: Message) -> bool {
        self.0.send(message).is_ok()
    }
}

/// Handle used by signal sources to deliver OS signals to the supervisor.
#[derive(Debug, Clone)]
pub struct SignalSender(Inbox);

impl SignalSender {
    pub(crate) fn new(inbox: Inbox) -> Self {
        Self(inbox)
    }

    /// Returns `false` once the supervisor has finished and dropped its inbox.
    pub fn send(&self, signal: Signal) -> bool {
        self.0.post(Message::Signal(signal))
    }
}
