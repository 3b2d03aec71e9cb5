use crate::error::SvinitError;
use crate::signal::{ReapTriggerSet, Signal};
use crate::stdio::OutputSink;
use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Static description of one supervised service
#[derive(Debug, Clone, Builder)]
#[builder(setter(into, strip_option))]
pub struct ChildSpec {
    /// Display name used in logs and as the output prefix. Defaults to the command.
    #[builder(default)]
    pub name: Option<String>,
    pub command: String,
    #[builder(default)]
    #[builder(setter(custom))]
    pub args: Vec<String>,
    #[builder(default)]
    #[builder(setter(custom))]
    pub env: HashMap<String, String>,
    #[builder(default)]
    pub working_directory: Option<PathBuf>,
    #[builder(default = "OutputSink::stdout()")]
    pub stdout: OutputSink,
    #[builder(default = "OutputSink::stderr()")]
    pub stderr: OutputSink,
}

impl ChildSpec {
    pub fn builder() -> ChildSpecBuilder {
        ChildSpecBuilder::default()
    }

    /// Stable label for log lines and output prefixes
    pub fn identity(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.command)
    }
}

impl ChildSpecBuilder {
    pub fn args<S: ToString, I: IntoIterator<Item = S>>(&mut self, iter: I) -> &mut Self {
        let args: Vec<String> = iter.into_iter().map(|s| s.to_string()).collect();
        self.args = Some(args);
        self
    }

    pub fn env<T: ToString>(&mut self, key: T, value: T) -> &mut Self {
        let map = self.env.get_or_insert_with(HashMap::new);
        map.insert(key.to_string(), value.to_string());
        self
    }

    pub fn env_multi<T: ToString, I: IntoIterator<Item = (T, T)>>(&mut self, iter: I) -> &mut Self {
        let env = self.env.get_or_insert_with(HashMap::new);
        for (key, value) in iter {
            env.insert(key.to_string(), value.to_string());
        }
        self
    }
}

/// One roster entry as written in the configuration file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChildEntry {
    #[serde(default)]
    pub name: Option<String>,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default)]
    pub working_directory: Option<PathBuf>,
}

/// The supervisor's configuration file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RosterConfig {
    pub children: Vec<ChildEntry>,

    /// Overrides the default reap trigger set, e.g. `["SIGTERM", "SIGINT"]`
    #[serde(default)]
    pub reap_signals: Option<Vec<String>>,
}

impl RosterConfig {
    pub fn from_json_str(json: &str) -> Result<Self, SvinitError> {
        let config: RosterConfig = serde_json::from_str(json)
            .map_err(|e| SvinitError::configuration(format!("invalid roster: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SvinitError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            SvinitError::configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json_str(&json)
    }

    /// Validate the configuration and return errors if invalid
    pub fn validate(&self) -> Result<(), SvinitError> {
        if self.children.is_empty() {
            return Err(SvinitError::configuration("no children configured"));
        }

        let mut seen = HashSet::new();
        for (index, child) in self.children.iter().enumerate() {
            if child.command.trim().is_empty() {
                return Err(SvinitError::configuration(format!(
                    "child #{index} has an empty command"
                )));
            }
            let identity = child.name.as_deref().unwrap_or(&child.command);
            if !seen.insert(identity) {
                return Err(SvinitError::configuration(format!(
                    "duplicate child name: {identity}"
                )));
            }
        }

        self.reap_trigger_set().map(|_| ())
    }

    pub fn reap_trigger_set(&self) -> Result<ReapTriggerSet, SvinitError> {
        let Some(names) = &self.reap_signals else {
            return Ok(ReapTriggerSet::default());
        };

        let signals = names
            .iter()
            .map(|name| {
                Signal::from_name(name)
                    .ok_or_else(|| SvinitError::configuration(format!("unknown signal: {name}")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        if signals.is_empty() {
            return Err(SvinitError::configuration("reapSignals must not be empty"));
        }
        Ok(ReapTriggerSet::from_signals(signals))
    }

    /// Build child specs in roster order, attaching the given sinks to every child.
    pub fn child_specs(
        &self,
        stdout: &OutputSink,
        stderr: &OutputSink,
    ) -> Result<Vec<ChildSpec>, SvinitError> {
        self.children
            .iter()
            .map(|entry| {
                let mut builder = ChildSpec::builder();
                builder
                    .command(entry.command.clone())
                    .args(&entry.args)
                    .env_multi(&entry.env)
                    .stdout(stdout.clone())
                    .stderr(stderr.clone());
                if let Some(name) = &entry.name {
                    builder.name(name.clone());
                }
                if let Some(dir) = &entry.working_directory {
                    builder.working_directory(dir.clone());
                }
                builder
                    .build()
                    .map_err(|e| SvinitError::configuration(e.to_string()))
            })
            .collect()
    }
}
