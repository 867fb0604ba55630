use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::retry::RetryPolicy;

pub const DEFAULT_TOOL_BINARY: &str = "terraform";

/// Configuration for one provisioning run. Built once per test run and
/// treated as immutable afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ProvisionOptions {
    /// Directory holding the infrastructure configuration under test.
    pub config_dir: PathBuf,
    /// Pass the tool's upgrade flag during init so provider plugins are
    /// refreshed instead of reused from a stale lock.
    pub upgrade_plugins: bool,
    /// String variables forwarded to the tool as `-var name=value`.
    pub variables: BTreeMap<String, String>,
    pub retry: RetryPolicy,
    /// Binary name or path of the provisioning tool.
    pub tool_binary: String,
}

impl ProvisionOptions {
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
            upgrade_plugins: false,
            variables: BTreeMap::new(),
            retry: RetryPolicy::no_retries(),
            tool_binary: DEFAULT_TOOL_BINARY.to_string(),
        }
    }

    /// Options preloaded with the known-transient provisioning errors,
    /// mirroring the conventional wrapper setup for flaky cloud backends.
    pub fn with_default_retryable_errors(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            retry: RetryPolicy::default_retryable_errors(),
            ..Self::new(config_dir)
        }
    }

    pub fn upgrade_plugins(mut self, upgrade: bool) -> Self {
        self.upgrade_plugins = upgrade;
        self
    }

    pub fn variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ValidationError {}

pub fn normalize_options(options: ProvisionOptions) -> Result<ProvisionOptions, ValidationError> {
    if options.config_dir.as_os_str().is_empty() {
        return Err(ValidationError::new("config_dir cannot be empty"));
    }

    let tool_binary = options.tool_binary.trim().to_string();
    if tool_binary.is_empty() {
        return Err(ValidationError::new("tool_binary cannot be empty"));
    }

    for name in options.variables.keys() {
        if name.trim().is_empty() {
            return Err(ValidationError::new(
                "variable names must be non-empty strings",
            ));
        }
    }

    if options.retry.max_attempts == 0 {
        return Err(ValidationError::new(
            "retry max_attempts must be a positive integer",
        ));
    }

    Ok(ProvisionOptions {
        tool_binary,
        ..options
    })
}
