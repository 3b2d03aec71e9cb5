use svinit_core::ProcessLauncherFactory;

#[cfg(not(unix))]
compile_error!("Unsupported platform: svinit supervises processes through Unix signals");

/// Platform-independent factory that selects the appropriate implementation at compile time
pub struct PlatformLauncherFactory;

impl ProcessLauncherFactory for PlatformLauncherFactory {
    #[cfg(unix)]
    type Launcher = svinit_unix::UnixProcessLauncher;

    fn create_launcher() -> Self::Launcher {
        #[cfg(unix)]
        return svinit_unix::UnixProcessLauncherFactory::create_launcher();
    }

    fn platform_name() -> &'static str {
        #[cfg(unix)]
        return svinit_unix::UnixProcessLauncherFactory::platform_name();
    }
}

/// Launcher type used on the current platform
pub type PlatformLauncher = <PlatformLauncherFactory as ProcessLauncherFactory>::Launcher;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_detection() {
        assert_eq!(PlatformLauncherFactory::platform_name(), "Unix");
        let _launcher = PlatformLauncherFactory::create_launcher();
    }
}
