//! Subscription to OS signals and their delivery into the supervisor inbox.

#[cfg(unix)]
mod unix_impl {
    use nix::sys::signal::Signal as NixSignal;
    use svinit_core::{ReapTriggerSet, Signal, SignalSender, SvinitError};
    use tokio::signal::unix::{SignalKind, signal};
    use tokio::task::JoinHandle;
    use tokio_stream::StreamExt;
    use tokio_stream::StreamMap;
    use tokio_stream::wrappers::SignalStream;
    use tracing::{debug, info, warn};

    /// Signals that are logged when received but never trigger reaping by default.
    const OBSERVED_ONLY: [Signal; 4] = [
        Signal::User1,
        Signal::User2,
        Signal::WindowChange,
        Signal::Alarm,
    ];

    pub fn to_native(signal: Signal) -> NixSignal {
        match signal {
            Signal::Hangup => NixSignal::SIGHUP,
            Signal::Interrupt => NixSignal::SIGINT,
            Signal::Quit => NixSignal::SIGQUIT,
            Signal::IllegalInstruction => NixSignal::SIGILL,
            Signal::Trap => NixSignal::SIGTRAP,
            Signal::Abort => NixSignal::SIGABRT,
            Signal::Bus => NixSignal::SIGBUS,
            Signal::BadSystemCall => NixSignal::SIGSYS,
            Signal::Terminate => NixSignal::SIGTERM,
            Signal::User1 => NixSignal::SIGUSR1,
            Signal::User2 => NixSignal::SIGUSR2,
            Signal::Alarm => NixSignal::SIGALRM,
            Signal::Pipe => NixSignal::SIGPIPE,
            Signal::WindowChange => NixSignal::SIGWINCH,
            Signal::Child => NixSignal::SIGCHLD,
            Signal::Continue => NixSignal::SIGCONT,
        }
    }

    /// Every signal the supervisor listens for: the trigger set plus the
    /// informational ones, without duplicates.
    pub fn watched_signals(triggers: &ReapTriggerSet) -> Vec<Signal> {
        let mut signals: Vec<Signal> = triggers.iter().chain(OBSERVED_ONLY).collect();
        signals.sort();
        signals.dedup();
        signals
    }

    /// Live OS signal subscriptions, merged into one stream.
    pub struct UnixSignalSource {
        streams: StreamMap<Signal, SignalStream>,
    }

    impl UnixSignalSource {
        /// Install handlers for `signals`.
        ///
        /// Signals the runtime refuses to hook (SIGILL among them) are skipped
        /// with a warning. Fails only when nothing could be subscribed.
        pub fn subscribe<I: IntoIterator<Item = Signal>>(signals: I) -> Result<Self, SvinitError> {
            let mut streams = StreamMap::new();

            for sig in signals {
                if streams.contains_key(&sig) {
                    continue;
                }
                let kind = SignalKind::from_raw(to_native(sig) as i32);
                match signal(kind) {
                    Ok(stream) => {
                        debug!(signal = %sig, "subscribed to signal");
                        streams.insert(sig, SignalStream::new(stream));
                    }
                    Err(e) => warn!(signal = %sig, "cannot subscribe to signal: {e}"),
                }
            }

            if streams.is_empty() {
                return Err(SvinitError::SignalSubscription(
                    "no signal handler could be installed".to_string(),
                ));
            }
            Ok(Self { streams })
        }

        pub fn subscribed(&self) -> Vec<Signal> {
            let mut signals: Vec<Signal> = self.streams.keys().copied().collect();
            signals.sort();
            signals
        }

        /// Forward every received signal to the supervisor until it stops listening.
        pub fn forward(mut self, sender: SignalSender) -> JoinHandle<()> {
            info!(signals = ?self.subscribed(), "forwarding signals to supervisor");
            tokio::spawn(async move {
                while let Some((signal, ())) = self.streams.next().await {
                    if !sender.send(signal) {
                        debug!(%signal, "supervisor finished, dropping signal");
                        break;
                    }
                }
            })
        }
    }

}

#[cfg(unix)]
pub use unix_impl::{UnixSignalSource, to_native, watched_signals};
