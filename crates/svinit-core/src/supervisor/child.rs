use super::event::{ChildRef, CompletionEvent, Inbox, Message};
use crate::config::ChildSpec;
use crate::process::{ProcessError, ProcessId, ProcessLauncher, SpawnedProcess};
use crate::signal::Signal;
use tracing::{debug, warn};

/// Runtime tracking for one roster entry.
///
/// Owned by the supervisor loop. After a successful [`start`](Self::start) a
/// background task owns the OS process and posts exactly one
/// [`CompletionEvent`] to the inbox.
#[derive(Debug)]
pub struct ChildHandle {
    index: usize,
    spec: ChildSpec,
    pid: Option<ProcessId>,
}

impl ChildHandle {
    pub fn new(index: usize, spec: ChildSpec) -> Self {
        Self {
            index,
            spec,
            pid: None,
        }
    }

    pub fn identity(&self) -> &str {
        self.spec.identity()
    }

    pub fn pid(&self) -> Option<ProcessId> {
        self.pid
    }

    pub fn child_ref(&self) -> ChildRef {
        ChildRef {
            index: self.index,
            identity: self.identity().to_string(),
        }
    }

    pub(crate) fn start<L: ProcessLauncher>(
        &mut self,
        launcher: &L,
        inbox: &Inbox,
    ) -> Result<ProcessId, ProcessError> {
        let mut process = launcher.spawn(&self.spec)?;
        let pid = process.pid();
        self.pid = Some(pid);

        let child = self.child_ref();
        let inbox = inbox.clone();
        tokio::spawn(async move {
            let event = match process.wait().await {
                Ok(exit) => CompletionEvent::exited(child, exit),
                Err(e) => CompletionEvent::wait_failed(child, e, None),
            };
            debug!(child = %event.child(), "posting completion");
            if !inbox.post(Message::Completed(event)) {
                warn!(pid, "supervisor inbox closed before completion was delivered");
            }
        });

        Ok(pid)
    }

    pub fn signal<L: ProcessLauncher>(&self, launcher: &L, signal: Signal) -> Result<(), ProcessError> {
        let pid = self
            .pid
            .ok_or_else(|| ProcessError::NotStarted(self.identity().to_string()))?;
        launcher.signal(pid, signal)
    }
}
