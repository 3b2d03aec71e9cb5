//! In-memory launcher for exercising the supervisor without real processes.

use crate::config::ChildSpec;
use crate::process::{ExitDescriptor, ProcessError, ProcessId, ProcessLauncher, SpawnedProcess};
use crate::signal::Signal;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::oneshot;

type ExitSender = oneshot::Sender<Result<ExitDescriptor, ProcessError>>;

#[derive(Debug, Clone)]
pub(crate) enum FakeBehavior {
    /// Exits with the code as soon as any signal arrives (the default, with code 0)
    ExitOnSignal(i32),
    ExitImmediately(i32),
    /// Exits with the code after the delay; signals are recorded but ignored
    ExitAfter(Duration, i32),
    /// Stays up until the test calls [`FakeLauncher::exit`]
    IgnoreSignals,
    FailToStart,
    FailWait,
}

struct Pending {
    tx: ExitSender,
    exit_on_signal: Option<i32>,
}

#[derive(Default)]
struct FakeState {
    behaviors: HashMap<String, FakeBehavior>,
    next_pid: ProcessId,
    names: HashMap<ProcessId, String>,
    pending: HashMap<ProcessId, Pending>,
    signals: Vec<(String, Signal)>,
    log: Vec<String>,
}

#[derive(Clone, Default)]
pub(crate) struct FakeLauncher {
    state: Arc<Mutex<FakeState>>,
}

impl FakeLauncher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub(crate) fn set_behavior(&self, name: &str, behavior: FakeBehavior) {
        self.lock().behaviors.insert(name.to_string(), behavior);
    }

    /// Every signal delivery attempted against `name`, in order.
    pub(crate) fn signals_for(&self, name: &str) -> Vec<Signal> {
        self.lock()
            .signals
            .iter()
            .filter(|(target, _)| target == name)
            .map(|(_, signal)| *signal)
            .collect()
    }

    /// `spawn`, `signal` and `exit` entries in the order they happened.
    pub(crate) fn log(&self) -> Vec<String> {
        self.lock().log.clone()
    }

    /// Make a still-running fake exit. Returns `false` if it already exited.
    pub(crate) fn exit(&self, name: &str, code: i32) -> bool {
        let mut state = self.lock();
        let pid = state
            .names
            .iter()
            .find(|(_, n)| n.as_str() == name)
            .map(|(pid, _)| *pid);
        match pid.and_then(|pid| state.pending.remove(&pid)) {
            Some(pending) => pending.tx.send(Ok(ExitDescriptor::exited(code))).is_ok(),
            None => false,
        }
    }
}

pub(crate) struct FakeProcess {
    pid: ProcessId,
    name: String,
    rx: Option<oneshot::Receiver<Result<ExitDescriptor, ProcessError>>>,
    state: Arc<Mutex<FakeState>>,
}

#[async_trait]
impl SpawnedProcess for FakeProcess {
    fn pid(&self) -> ProcessId {
        self.pid
    }

    async fn wait(&mut self) -> Result<ExitDescriptor, ProcessError> {
        let rx = self
            .rx
            .take()
            .ok_or_else(|| ProcessError::Other("already waited".to_string()))?;
        let result = rx
            .await
            .unwrap_or_else(|_| Err(ProcessError::Other("fake process dropped".to_string())));
        self.state.lock().unwrap().log.push(format!("exit {}", self.name));
        result
    }
}

impl ProcessLauncher for FakeLauncher {
    type Process = FakeProcess;

    fn spawn(&self, spec: &ChildSpec) -> Result<FakeProcess, ProcessError> {
        let name = spec.identity().to_string();
        let mut state = self.lock();
        let behavior = state
            .behaviors
            .get(&name)
            .cloned()
            .unwrap_or(FakeBehavior::ExitOnSignal(0));

        if matches!(behavior, FakeBehavior::FailToStart) {
            state.log.push(format!("spawn-failed {name}"));
            return Err(ProcessError::SpawnFailed {
                command: spec.command.clone(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            });
        }

        state.next_pid += 1;
        let pid = 1000 + state.next_pid;
        state.names.insert(pid, name.clone());
        state.log.push(format!("spawn {name}"));

        let (tx, rx) = oneshot::channel();
        match behavior {
            FakeBehavior::ExitImmediately(code) => {
                let _ = tx.send(Ok(ExitDescriptor::exited(code)));
            }
            FakeBehavior::FailWait => {
                let _ = tx.send(Err(ProcessError::WaitFailed(std::io::Error::other(
                    "wait interrupted",
                ))));
            }
            FakeBehavior::ExitOnSignal(code) => {
                state.pending.insert(
                    pid,
                    Pending {
                        tx,
                        exit_on_signal: Some(code),
                    },
                );
            }
            FakeBehavior::IgnoreSignals => {
                state.pending.insert(
                    pid,
                    Pending {
                        tx,
                        exit_on_signal: None,
                    },
                );
            }
            FakeBehavior::ExitAfter(delay, code) => {
                state.pending.insert(
                    pid,
                    Pending {
                        tx,
                        exit_on_signal: None,
                    },
                );
                let shared = self.state.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let pending = shared.lock().unwrap().pending.remove(&pid);
                    if let Some(pending) = pending {
                        let _ = pending.tx.send(Ok(ExitDescriptor::exited(code)));
                    }
                });
            }
            FakeBehavior::FailToStart => unreachable!("handled above"),
        }

        Ok(FakeProcess {
            pid,
            name,
            rx: Some(rx),
            state: self.state.clone(),
        })
    }

    fn signal(&self, pid: ProcessId, signal: Signal) -> Result<(), ProcessError> {
        let mut state = self.lock();
        let name = state
            .names
            .get(&pid)
            .cloned()
            .ok_or(ProcessError::ProcessNotFound(pid))?;
        state.signals.push((name.clone(), signal));
        state.log.push(format!("signal {name} {signal}"));

        let exit_code = match state.pending.get(&pid) {
            None => return Err(ProcessError::ProcessNotFound(pid)),
            Some(pending) => pending.exit_on_signal,
        };
        if let Some(code) = exit_code {
            if let Some(pending) = state.pending.remove(&pid) {
                let _ = pending.tx.send(Ok(ExitDescriptor::exited(code)));
            }
        }
        Ok(())
    }
}

pub(crate) fn spec(name: &str) -> ChildSpec {
    ChildSpec::builder()
        .name(name)
        .command(format!("/usr/bin/{name}"))
        .build()
        .unwrap()
}
