use std::collections::BTreeSet;
use std::fmt;

/// Platform-independent names for the OS signals the supervisor observes
/// and forwards. Platform crates translate these to native signal numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Signal {
    Hangup,
    Interrupt,
    Quit,
    IllegalInstruction,
    Trap,
    Abort,
    Bus,
    BadSystemCall,
    Terminate,
    User1,
    User2,
    Alarm,
    Pipe,
    WindowChange,
    Child,
    Continue,
}

impl Signal {
    pub const ALL: [Signal; 16] = [
        Signal::Hangup,
        Signal::Interrupt,
        Signal::Quit,
        Signal::IllegalInstruction,
        Signal::Trap,
        Signal::Abort,
        Signal::Bus,
        Signal::BadSystemCall,
        Signal::Terminate,
        Signal::User1,
        Signal::User2,
        Signal::Alarm,
        Signal::Pipe,
        Signal::WindowChange,
        Signal::Child,
        Signal::Continue,
    ];

    /// Conventional POSIX name, e.g. `SIGTERM`
    pub fn name(self) -> &'static str {
        match self {
            Signal::Hangup => "SIGHUP",
            Signal::Interrupt => "SIGINT",
            Signal::Quit => "SIGQUIT",
            Signal::IllegalInstruction => "SIGILL",
            Signal::Trap => "SIGTRAP",
            Signal::Abort => "SIGABRT",
            Signal::Bus => "SIGBUS",
            Signal::BadSystemCall => "SIGSYS",
            Signal::Terminate => "SIGTERM",
            Signal::User1 => "SIGUSR1",
            Signal::User2 => "SIGUSR2",
            Signal::Alarm => "SIGALRM",
            Signal::Pipe => "SIGPIPE",
            Signal::WindowChange => "SIGWINCH",
            Signal::Child => "SIGCHLD",
            Signal::Continue => "SIGCONT",
        }
    }

    /// Parse a signal name. Accepts `SIGTERM`, `TERM` and `term`.
    pub fn from_name(name: &str) -> Option<Signal> {
        let upper = name.trim().to_ascii_uppercase();
        let bare = upper.strip_prefix("SIG").unwrap_or(&upper);
        Signal::ALL
            .into_iter()
            .find(|signal| &signal.name()[3..] == bare)
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Signals that move the supervisor from `Running` to `Reaping`.
///
/// Anything outside the set is logged when received and otherwise ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReapTriggerSet(BTreeSet<Signal>);

impl Default for ReapTriggerSet {
    fn default() -> Self {
        Self::from_signals([
            Signal::Hangup,
            Signal::Interrupt,
            Signal::Terminate,
            Signal::Quit,
            Signal::IllegalInstruction,
            Signal::Trap,
            Signal::Abort,
            Signal::BadSystemCall,
        ])
    }
}

impl ReapTriggerSet {
    pub fn from_signals<I: IntoIterator<Item = Signal>>(signals: I) -> Self {
        Self(signals.into_iter().collect())
    }

    pub fn contains(&self, signal: Signal) -> bool {
        self.0.contains(&signal)
    }

    pub fn iter(&self) -> impl Iterator<Item = Signal> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
