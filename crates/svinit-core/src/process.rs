use crate::config::ChildSpec;
use crate::signal::Signal;
use async_trait::async_trait;
use std::fmt;

/// Unique identifier for a process
pub type ProcessId = u32;

/// How a started process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitDescriptor {
    code: Option<i32>,
    signal: Option<i32>,
}

impl ExitDescriptor {
    /// The process returned from `main`/called `exit` with `code`
    pub fn exited(code: i32) -> Self {
        Self {
            code: Some(code),
            signal: None,
        }
    }

    /// The process was terminated by signal number `signo`
    pub fn signaled(signo: i32) -> Self {
        Self {
            code: None,
            signal: Some(signo),
        }
    }

    /// Numeric exit code.
    ///
    /// The OS reports no exit code for a signal death, so this returns
    /// `128 + signo` like a shell does instead of a `-1` sentinel. That keeps
    /// a SIGKILLed child distinguishable in the supervisor's own exit status.
    pub fn code(&self) -> i32 {
        match (self.code, self.signal) {
            (Some(code), _) => code,
            (None, Some(signo)) => 128 + signo,
            (None, None) => -1,
        }
    }

    pub fn was_signaled(&self) -> bool {
        self.signal.is_some()
    }

    pub fn terminating_signal(&self) -> Option<i32> {
        self.signal
    }

    pub fn success(&self) -> bool {
        self.code() == 0
    }
}

impl fmt::Display for ExitDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.signal {
            Some(signo) => write!(f, "killed by signal {signo} (code {})", self.code()),
            None => write!(f, "exit code {}", self.code()),
        }
    }
}

/// Error types for process operations
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("Failed to spawn {command}: {source}")]
    SpawnFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Child {0} has not been started")]
    NotStarted(String),
    #[error("Process not found: {0}")]
    ProcessNotFound(ProcessId),
    #[error("Permission denied signalling process {0}")]
    PermissionDenied(ProcessId),
    #[error("Failed to deliver {signal} to process {pid}: {reason}")]
    SignalFailed {
        pid: ProcessId,
        signal: Signal,
        reason: String,
    },
    #[error("Failed to wait for process: {0}")]
    WaitFailed(#[source] std::io::Error),
    #[error("Other error: {0}")]
    Other(String),
}

/// A process that has been spawned and can be waited on exactly once.
#[async_trait]
pub trait SpawnedProcess: Send + 'static {
    fn pid(&self) -> ProcessId;

    /// Block until the process exits. Only fails when the OS wait itself fails.
    async fn wait(&mut self) -> Result<ExitDescriptor, ProcessError>;
}

/// Platform seam for starting and signalling children.
///
/// `spawn` must not block: output forwarding and waiting happen on
/// background tasks owned by the caller or the implementation.
pub trait ProcessLauncher: Send + Sync + 'static {
    type Process: SpawnedProcess;

    fn spawn(&self, spec: &ChildSpec) -> Result<Self::Process, ProcessError>;

    fn signal(&self, pid: ProcessId, signal: Signal) -> Result<(), ProcessError>;
}

/// Factory trait for creating platform-specific launchers
pub trait ProcessLauncherFactory {
    /// The type of launcher this factory creates
    type Launcher: ProcessLauncher;

    /// Create a launcher for the current platform
    fn create_launcher() -> Self::Launcher;

    /// Get the platform name for logging and debugging
    fn platform_name() -> &'static str;
}
