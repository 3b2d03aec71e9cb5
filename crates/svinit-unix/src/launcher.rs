#[cfg(unix)]
mod unix_impl {
    use crate::signals::to_native;
    use async_trait::async_trait;
    use nix::errno::Errno;
    use nix::sys::signal;
    use nix::unistd::Pid as NixPid;
    use std::collections::HashSet;
    use std::os::unix::process::ExitStatusExt;
    use std::process::{ExitStatus, Stdio};
    use std::sync::{Arc, Mutex, PoisonError};
    use std::time::Duration;
    use svinit_core::{
        ChildSpec, ExitDescriptor, OutputSink, ProcessError, ProcessId, ProcessLauncher, Signal,
        SpawnedProcess, pump_lines,
    };
    use tokio::io::AsyncRead;
    use tokio::process::{Child, Command};
    use tokio::task::JoinHandle;
    use tracing::{debug, info, warn};

    /// How long a completion waits for the child's output pipes to drain.
    /// Descendants that inherited the pipes can keep them open indefinitely.
    const OUTPUT_DRAIN_TIMEOUT: Duration = Duration::from_millis(500);

    /// Pids this launcher has already waited on. The kernel may hand them to
    /// an unrelated process, so they must never be passed to `kill(2)` again.
    #[derive(Debug, Default, Clone)]
    struct ReapedPids(Arc<Mutex<HashSet<ProcessId>>>);

    impl ReapedPids {
        fn with<T>(&self, f: impl FnOnce(&mut HashSet<ProcessId>) -> T) -> T {
            let mut pids = self.0.lock().unwrap_or_else(PoisonError::into_inner);
            f(&mut pids)
        }

        fn mark(&self, pid: ProcessId) {
            self.with(|pids| pids.insert(pid));
        }

        fn forget(&self, pid: ProcessId) {
            self.with(|pids| pids.remove(&pid));
        }

        fn contains(&self, pid: ProcessId) -> bool {
            self.with(|pids| pids.contains(&pid))
        }
    }

    /// A child spawned by [`UnixProcessLauncher`]
    pub struct UnixProcess {
        child: Child,
        pid: ProcessId,
        command: String,
        pumps: Vec<JoinHandle<()>>,
        reaped: ReapedPids,
    }

    impl UnixProcess {
        pub fn command(&self) -> &str {
            &self.command
        }

        async fn drain_output(&mut self) {
            let pumps = std::mem::take(&mut self.pumps);
            let drained = tokio::time::timeout(OUTPUT_DRAIN_TIMEOUT, async {
                for pump in pumps {
                    let _ = pump.await;
                }
            })
            .await;
            if drained.is_err() {
                debug!(pid = self.pid, "output still open after exit, not waiting for it");
            }
        }
    }

    #[async_trait]
    impl SpawnedProcess for UnixProcess {
        fn pid(&self) -> ProcessId {
            self.pid
        }

        async fn wait(&mut self) -> Result<ExitDescriptor, ProcessError> {
            let status = self.child.wait().await.map_err(ProcessError::WaitFailed)?;
            self.reaped.mark(self.pid);
            self.drain_output().await;
            Ok(exit_descriptor(status))
        }
    }

    pub(crate) fn exit_descriptor(status: ExitStatus) -> ExitDescriptor {
        match (status.code(), status.signal()) {
            (Some(code), _) => ExitDescriptor::exited(code),
            (None, Some(signo)) => ExitDescriptor::signaled(signo),
            // Stopped/continued statuses are never returned by wait().
            (None, None) => ExitDescriptor::exited(-1),
        }
    }

    fn spawn_pump<R>(io: R, label: String, sink: OutputSink) -> JoinHandle<()>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        tokio::spawn(async move {
            if let Err(e) = pump_lines(io, &label, sink).await {
                warn!(child = %label, "output forwarding stopped: {e}");
            }
        })
    }

    /// Unix launcher: each child runs in its own process group with piped,
    /// line-prefixed output, and signals are delivered with `kill(2)`.
    #[derive(Debug, Default, Clone)]
    pub struct UnixProcessLauncher {
        reaped: ReapedPids,
    }

    impl UnixProcessLauncher {
        pub fn new() -> Self {
            info!("Initializing Unix process launcher");
            Self::default()
        }
    }

    impl ProcessLauncher for UnixProcessLauncher {
        type Process = UnixProcess;

        fn spawn(&self, spec: &ChildSpec) -> Result<UnixProcess, ProcessError> {
            let mut cmd = Command::new(&spec.command);
            cmd.args(&spec.args)
                .envs(&spec.env)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped());

            if let Some(dir) = &spec.working_directory {
                cmd.current_dir(dir);
            }

            // Terminal-generated signals reach the supervisor only; it decides what to forward.
            cmd.process_group(0);

            let mut child = cmd.spawn().map_err(|source| ProcessError::SpawnFailed {
                command: spec.command.clone(),
                source,
            })?;

            let pid = child.id().ok_or_else(|| {
                ProcessError::Other(format!("{} has no pid after spawn", spec.command))
            })?;

            // A recycled pid belongs to this new child now.
            self.reaped.forget(pid);

            let label = spec.identity().to_string();
            let mut pumps = Vec::with_capacity(2);
            if let Some(stdout) = child.stdout.take() {
                pumps.push(spawn_pump(stdout, label.clone(), spec.stdout.clone()));
            }
            if let Some(stderr) = child.stderr.take() {
                pumps.push(spawn_pump(stderr, label, spec.stderr.clone()));
            }

            info!(
                "Spawned Unix process: {} (PID: {}) with args: {:?}",
                spec.command, pid, spec.args
            );

            Ok(UnixProcess {
                child,
                pid,
                command: spec.command.clone(),
                pumps,
                reaped: self.reaped.clone(),
            })
        }

        fn signal(&self, pid: ProcessId, signal: Signal) -> Result<(), ProcessError> {
            if self.reaped.contains(pid) {
                debug!("Process {} already reaped, not sending {}", pid, signal);
                return Err(ProcessError::ProcessNotFound(pid));
            }

            let nix_pid = NixPid::from_raw(pid as i32);

            match signal::kill(nix_pid, to_native(signal)) {
                Ok(()) => {
                    debug!("Sent {} to process {}", signal, pid);
                    Ok(())
                }
                Err(Errno::ESRCH) => Err(ProcessError::ProcessNotFound(pid)),
                Err(Errno::EPERM) => Err(ProcessError::PermissionDenied(pid)),
                Err(e) => Err(ProcessError::SignalFailed {
                    pid,
                    signal,
                    reason: e.to_string(),
                }),
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        fn sh(name: &str, script: &str) -> (ChildSpec, svinit_core::CapturedOutput) {
            let (out, captured) = OutputSink::capture();
            let spec = ChildSpec::builder()
                .name(name)
                .command("/bin/sh")
                .args(["-c", script])
                .stdout(out)
                .build()
                .unwrap();
            (spec, captured)
        }

        #[tokio::test]
        async fn test_exit_code_is_reported() {
            let launcher = UnixProcessLauncher::new();
            let (spec, _) = sh("seven", "exit 7");

            let mut process = launcher.spawn(&spec).unwrap();
            assert!(process.pid() > 0);
            assert_eq!(process.command(), "/bin/sh");

            let exit = process.wait().await.unwrap();
            assert_eq!(exit, ExitDescriptor::exited(7));
        }

        #[tokio::test]
        async fn test_missing_program_fails_to_spawn() {
            let launcher = UnixProcessLauncher::new();
            let spec = ChildSpec::builder()
                .command("/nonexistent/svinit-test-binary")
                .build()
                .unwrap();

            match launcher.spawn(&spec) {
                Err(ProcessError::SpawnFailed { command, .. }) => {
                    assert_eq!(command, "/nonexistent/svinit-test-binary")
                }
                Err(other) => panic!("unexpected error: {other}"),
                Ok(_) => panic!("spawn should fail"),
            }
        }

        #[tokio::test]
        async fn test_terminate_signal_is_delivered() {
            let launcher = UnixProcessLauncher::new();
            let (spec, _) = sh("sleeper", "exec sleep 30");

            let mut process = launcher.spawn(&spec).unwrap();
            launcher.signal(process.pid(), Signal::Terminate).unwrap();

            let exit = process.wait().await.unwrap();
            assert!(exit.was_signaled());
            assert_eq!(exit.terminating_signal(), Some(libc_sigterm()));
            assert_eq!(exit.code(), 128 + libc_sigterm());
        }

        #[tokio::test]
        async fn test_signalling_reaped_process_reports_not_found() {
            let launcher = UnixProcessLauncher::new();
            let (spec, _) = sh("quick", "exit 0");

            let mut process = launcher.spawn(&spec).unwrap();
            process.wait().await.unwrap();

            match launcher.signal(process.pid(), Signal::Terminate) {
                Err(ProcessError::ProcessNotFound(pid)) => assert_eq!(pid, process.pid()),
                other => panic!("unexpected result: {other:?}"),
            }
        }

        #[tokio::test]
        async fn test_no_signal_while_output_drains() {
            let launcher = UnixProcessLauncher::new();
            // The backgrounded sleep keeps the pipes open after the shell exits.
            let (spec, _) = sh("forker", "sleep 2 & exit 0");

            let mut process = launcher.spawn(&spec).unwrap();
            let pid = process.pid();
            let waiter = tokio::spawn(async move { process.wait().await });

            tokio::time::sleep(Duration::from_millis(200)).await;
            assert!(!waiter.is_finished());

            match launcher.signal(pid, Signal::Terminate) {
                Err(ProcessError::ProcessNotFound(reported)) => assert_eq!(reported, pid),
                other => panic!("unexpected result: {other:?}"),
            }

            let exit = waiter.await.unwrap().unwrap();
            assert_eq!(exit, ExitDescriptor::exited(0));
        }

        #[tokio::test]
        async fn test_output_is_prefixed_and_drained() {
            let launcher = UnixProcessLauncher::new();
            let (spec, captured) = sh("greeter", "echo hello; echo world");

            let mut process = launcher.spawn(&spec).unwrap();
            process.wait().await.unwrap();

            assert_eq!(captured.contents(), "greeter | hello\ngreeter | world\n");
        }

        fn libc_sigterm() -> i32 {
            nix::sys::signal::Signal::SIGTERM as i32
        }
    }
}

#[cfg(unix)]
pub use unix_impl::{UnixProcess, UnixProcessLauncher};
