//! svinit - run a fixed group of services as one container entry point.
//!
//! [`Svinit`] starts every configured child, forwards termination signals to
//! them, and shuts the whole group down as soon as any one of them exits.

pub mod factory;
pub mod logging;

use std::ffi::OsString;
use std::path::PathBuf;
use svinit_unix::{UnixSignalSource, watched_signals};
use tracing::info;

pub use factory::{PlatformLauncher, PlatformLauncherFactory};
// Re-export core functionality
pub use svinit_core::*;

/// Environment variable naming the roster file when no argument is given
pub const CONFIG_ENV: &str = "SVINIT_CONFIG";

/// Pick the roster path: the first CLI argument wins over the environment.
pub fn config_path(arg: Option<OsString>, env: Option<OsString>) -> Option<PathBuf> {
    arg.or(env)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

/// High-level platform-independent supervisor
pub struct Svinit {
    roster: Vec<ChildSpec>,
    triggers: ReapTriggerSet,
}

impl Svinit {
    pub fn new(roster: Vec<ChildSpec>) -> Self {
        Self {
            roster,
            triggers: ReapTriggerSet::default(),
        }
    }

    /// Build from a loaded roster; children write to the supervisor's own stdout/stderr.
    ///
    /// `config` is expected to come from [`RosterConfig::from_path`] or
    /// [`RosterConfig::from_json_str`], which validate it.
    pub fn from_config(config: &RosterConfig) -> Result<Self, SvinitError> {
        let roster = config.child_specs(&OutputSink::stdout(), &OutputSink::stderr())?;
        Ok(Self::new(roster).with_reap_triggers(config.reap_trigger_set()?))
    }

    pub fn with_reap_triggers(mut self, triggers: ReapTriggerSet) -> Self {
        self.triggers = triggers;
        self
    }

    /// Run the group to completion and return the report.
    ///
    /// Signal handlers are installed before the first child starts.
    pub async fn run(self) -> Result<SupervisorReport, SvinitError> {
        if self.roster.is_empty() {
            return Err(SvinitError::configuration("no children configured"));
        }

        info!(
            platform = PlatformLauncherFactory::platform_name(),
            children = self.roster.len(),
            "starting supervisor"
        );

        let launcher = PlatformLauncherFactory::create_launcher();
        let supervisor = Supervisor::new(launcher, self.roster).with_reap_triggers(self.triggers);

        let source = UnixSignalSource::subscribe(watched_signals(supervisor.reap_triggers()))?;
        let forwarder = source.forward(supervisor.signal_sender());

        let report = supervisor.run().await;
        forwarder.abort();

        info!(
            exit_code = report.exit_code,
            started = report.started,
            cause = ?report.cause,
            "all children finished"
        );
        Ok(report)
    }
}
