use super::child::ChildHandle;
use crate::process::{ProcessError, ProcessLauncher};
use crate::signal::Signal;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SupervisorState {
    #[default]
    Running,
    Reaping,
}

/// Why the supervisor stopped running
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReapCause {
    /// A reap-trigger signal was delivered to the supervisor
    Signal(Signal),
    /// A child completed while the group was still running
    ChildExited(String),
    /// At least one child could not be started
    StartFailure,
}

/// Owns the `Running -> Reaping` transition and the single signal broadcast.
#[derive(Debug, Default)]
pub struct ShutdownCoordinator {
    state: SupervisorState,
    cause: Option<ReapCause>,
}

impl ShutdownCoordinator {
    pub fn state(&self) -> SupervisorState {
        self.state
    }

    pub fn cause(&self) -> Option<&ReapCause> {
        self.cause.as_ref()
    }

    /// Enter `Reaping` and send `signal` to every child in `children`.
    ///
    /// Returns `false` without signalling anyone when already reaping.
    pub fn start_reap<'a, L, I>(
        &mut self,
        cause: ReapCause,
        signal: Signal,
        launcher: &L,
        children: I,
    ) -> bool
    where
        L: ProcessLauncher,
        I: IntoIterator<Item = &'a ChildHandle>,
    {
        if self.state == SupervisorState::Reaping {
            debug!(?cause, "already reaping");
            return false;
        }

        info!(?cause, %signal, "shutting down all children");
        self.state = SupervisorState::Reaping;
        self.cause = Some(cause);

        for child in children {
            match child.signal(launcher, signal) {
                Ok(()) => info!(child = %child.identity(), pid = ?child.pid(), %signal, "signalled child"),
                Err(ProcessError::ProcessNotFound(pid)) => {
                    debug!(child = %child.identity(), pid, "child already gone")
                }
                Err(e) => warn!(child = %child.identity(), %signal, "failed to signal child: {e}"),
            }
        }
        true
    }
}
