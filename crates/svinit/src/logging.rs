use tracing_subscriber::EnvFilter;

/// Filter directives, e.g. `SVINIT_LOG=debug`. Falls back to `RUST_LOG`, then `info`.
pub const LOG_ENV: &str = "SVINIT_LOG";
/// `json` switches to one JSON object per line; anything else is plain text.
pub const LOG_FORMAT_ENV: &str = "SVINIT_LOG_FORMAT";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    pub fn from_env_value(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Text,
        }
    }
}

pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the process-wide subscriber. Logs go to stderr; children's stdout
/// is forwarded on stdout.
pub fn init_tracing() -> anyhow::Result<()> {
    let format = LogFormat::from_env_value(std::env::var(LOG_FORMAT_ENV).ok().as_deref());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .with_target(false);

    match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.try_init(),
    }
    .map_err(|e| anyhow::anyhow!(e))
}
