use thiserror::Error;

/// Core error types for svinit operations
#[derive(Error, Debug)]
pub enum SvinitError {
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Signal subscription failed: {0}")]
    SignalSubscription(String),

    #[error("Process error: {0}")]
    Process(#[from] crate::process::ProcessError),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl SvinitError {
    pub fn configuration(message: impl Into<String>) -> Self {
        SvinitError::ConfigurationError(message.into())
    }
}
