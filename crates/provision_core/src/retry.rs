use std::time::Duration;

pub const DEFAULT_MAX_ATTEMPTS: usize = 3;
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(5);

/// Errors that cloud backends and plugin registries are known to throw
/// transiently. A command whose combined output contains one of these is
/// worth retrying; anything else fails immediately.
pub const DEFAULT_RETRYABLE_PATTERNS: &[&str] = &[
    "connection reset by peer",
    "TLS handshake timeout",
    "Throttling",
    "RequestError: send request failed",
    "temporary failure in name resolution",
    "timeout while waiting for plugin to start",
    "Error acquiring the state lock",
    "registry service is unreachable",
    "Client.Timeout exceeded while awaiting headers",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per command, including the first one.
    pub max_attempts: usize,
    pub backoff: Duration,
    pub retryable_patterns: Vec<String>,
}

impl RetryPolicy {
    /// Single attempt, nothing classified as transient.
    pub fn no_retries() -> Self {
        Self {
            max_attempts: 1,
            backoff: Duration::ZERO,
            retryable_patterns: Vec::new(),
        }
    }

    pub fn default_retryable_errors() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: DEFAULT_BACKOFF,
            retryable_patterns: DEFAULT_RETRYABLE_PATTERNS
                .iter()
                .map(|pattern| (*pattern).to_string())
                .collect(),
        }
    }

    /// First pattern found in the command's combined output, if any.
    pub fn match_transient(&self, combined_output: &str) -> Option<&str> {
        self.retryable_patterns
            .iter()
            .map(String::as_str)
            .find(|pattern| combined_output.contains(pattern))
    }
}
