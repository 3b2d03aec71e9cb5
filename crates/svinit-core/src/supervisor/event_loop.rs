use super::aggregator::aggregate_exit_code;
use super::child::ChildHandle;
use super::event::{CompletionEvent, Inbox, Message, SignalSender};
use super::shutdown_coordinator::{ReapCause, ShutdownCoordinator, SupervisorState};
use crate::config::ChildSpec;
use crate::process::ProcessLauncher;
use crate::signal::{ReapTriggerSet, Signal};
use std::collections::BTreeMap;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Outcome of one supervisor run
#[derive(Debug)]
pub struct SupervisorReport {
    pub state: SupervisorState,
    pub cause: Option<ReapCause>,
    /// Number of children that started successfully
    pub started: usize,
    /// Completion events in the order they were collected
    pub events: Vec<CompletionEvent>,
    pub exit_code: i32,
}

/// Starts a fixed roster, watches it, and tears it down as a unit.
///
/// All supervisor state lives inside [`run`](Self::run). Signal sources and
/// per-child waiters only post into the inbox.
pub struct Supervisor<L: ProcessLauncher> {
    launcher: L,
    roster: Vec<ChildSpec>,
    triggers: ReapTriggerSet,
    inbox: Inbox,
    receiver: mpsc::UnboundedReceiver<Message>,
}

impl<L: ProcessLauncher> Supervisor<L> {
    pub fn new(launcher: L, roster: Vec<ChildSpec>) -> Self {
        let (inbox, receiver) = Inbox::channel();
        Self {
            launcher,
            roster,
            triggers: ReapTriggerSet::default(),
            inbox,
            receiver,
        }
    }

    pub fn with_reap_triggers(mut self, triggers: ReapTriggerSet) -> Self {
        self.triggers = triggers;
        self
    }

    pub fn reap_triggers(&self) -> &ReapTriggerSet {
        &self.triggers
    }

    /// Sender for OS signals. Signals sent before [`run`](Self::run) are queued.
    pub fn signal_sender(&self) -> SignalSender {
        SignalSender::new(self.inbox.clone())
    }

    pub async fn run(self) -> SupervisorReport {
        let Supervisor {
            launcher,
            roster,
            triggers,
            inbox,
            mut receiver,
        } = self;

        let mut coordinator = ShutdownCoordinator::default();
        // Started children whose completion has not been observed yet.
        let mut watched: BTreeMap<usize, ChildHandle> = BTreeMap::new();
        let mut collected: Vec<CompletionEvent> = Vec::new();
        let mut start_failed = false;

        for (index, spec) in roster.into_iter().enumerate() {
            let mut child = ChildHandle::new(index, spec);
            info!(child = %child.identity(), "starting child");
            match child.start(&launcher, &inbox) {
                Ok(pid) => {
                    info!(child = %child.identity(), pid, "child started");
                    watched.insert(index, child);
                }
                Err(e) => {
                    error!(child = %child.identity(), "failed to start child: {e}");
                    collected.push(CompletionEvent::start_failed(child.child_ref(), e));
                    start_failed = true;
                }
            }
        }
        drop(inbox);

        let started = watched.len();
        if start_failed {
            coordinator.start_reap(
                ReapCause::StartFailure,
                Signal::Terminate,
                &launcher,
                watched.values(),
            );
        }

        while !watched.is_empty() {
            let Some(message) = receiver.recv().await else {
                error!(
                    remaining = watched.len(),
                    "all event sources closed with children outstanding"
                );
                break;
            };

            match message {
                Message::Signal(signal) => {
                    info!(%signal, state = ?coordinator.state(), "received signal");
                    if triggers.contains(signal) {
                        coordinator.start_reap(
                            ReapCause::Signal(signal),
                            signal,
                            &launcher,
                            watched.values(),
                        );
                    } else {
                        debug!(%signal, "signal is not a reap trigger, ignoring");
                    }
                }
                Message::Completed(event) => {
                    let Some(child) = watched.remove(&event.child().index) else {
                        warn!(child = %event.child(), "completion for unknown child");
                        continue;
                    };
                    match (event.exit(), event.error()) {
                        (_, Some(e)) => warn!(child = %child.identity(), "child wait failed: {e}"),
                        (Some(exit), None) => info!(child = %child.identity(), "child exited: {exit}"),
                        (None, None) => info!(child = %child.identity(), "child completed"),
                    }
                    collected.push(event);

                    if coordinator.state() == SupervisorState::Running {
                        coordinator.start_reap(
                            ReapCause::ChildExited(child.identity().to_string()),
                            Signal::Terminate,
                            &launcher,
                            watched.values(),
                        );
                    }
                    info!(remaining = watched.len(), "waiting for children");
                }
            }
        }

        let exit_code = aggregate_exit_code(&collected);
        SupervisorReport {
            state: coordinator.state(),
            cause: coordinator.cause().cloned(),
            started,
            events: collected,
            exit_code,
        }
    }
}
