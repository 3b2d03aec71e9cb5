mod launcher;
pub mod signals;

#[cfg(unix)]
pub use launcher::{UnixProcess, UnixProcessLauncher};
#[cfg(unix)]
pub use signals::{UnixSignalSource, watched_signals};

pub struct UnixProcessLauncherFactory;

#[cfg(unix)]
impl svinit_core::ProcessLauncherFactory for UnixProcessLauncherFactory {
    type Launcher = UnixProcessLauncher;

    fn create_launcher() -> UnixProcessLauncher {
        UnixProcessLauncher::new()
    }

    fn platform_name() -> &'static str {
        "Unix"
    }
}
