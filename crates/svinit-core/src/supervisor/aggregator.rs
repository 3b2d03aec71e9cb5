use super::event::CompletionEvent;
use tracing::{info, warn};

/// Fold completion events, in the order they were observed, into one exit code.
///
/// Errors are logged and leave the code untouched. Every non-zero exit code
/// overwrites the running result, so the last non-zero exit observed wins.
pub fn aggregate_exit_code(events: &[CompletionEvent]) -> i32 {
    let mut code = 0;

    for event in events {
        if let Some(error) = event.error() {
            warn!(child = %event.child(), "child reported error: {error}");
        }
        if let Some(exit) = event.exit() {
            info!(child = %event.child(), "child finished with {exit}");
            if !exit.success() {
                code = exit.code();
            }
        }
    }

    code
}
