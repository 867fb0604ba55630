use std::time::Instant;

use provision_core::{normalize_options, ProvisionOptions};
use serde_json::json;

use crate::client::ProvisioningClient;
use crate::logging::{log_error, log_info};

const COMPONENT: &str = "lifecycle";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyMode {
    /// Apply once.
    Once,
    /// Apply, then verify a follow-up plan is a no-op.
    CheckIdempotent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Options,
    Init,
    Apply,
    IdempotenceCheck,
    Verify,
    Destroy,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Options => "options",
            Self::Init => "init",
            Self::Apply => "apply",
            Self::IdempotenceCheck => "idempotence_check",
            Self::Verify => "verify",
            Self::Destroy => "destroy",
        }
    }
}

/// Failure of one lifecycle run. The first failing phase is primary; a
/// destroy failure that follows it is attached, never substituted, so the
/// original failure is what the test framework reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleError {
    pub phase: Phase,
    pub message: String,
    pub destroy_error: Option<String>,
}

impl LifecycleError {
    fn new(phase: Phase, message: impl Into<String>) -> Self {
        Self {
            phase,
            message: message.into(),
            destroy_error: None,
        }
    }
}

impl std::fmt::Display for LifecycleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} failed: {}", self.phase.as_str(), self.message)?;
        if let Some(destroy_error) = &self.destroy_error {
            write!(f, "; destroy also failed: {destroy_error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for LifecycleError {}

/// Failure raised by a verify closure, typically a missing or empty output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyError {
    message: String,
}

impl VerifyError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for VerifyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for VerifyError {}

/// Drive one scoped provisioning run: init, apply (optionally with the
/// idempotence check), run the verify closure against the live stack, then
/// destroy. Destroy runs exactly once on every exit path past option
/// validation, including apply and verify failures, so a failing run never
/// leaks provisioned resources.
pub fn provision_and_verify<C, F, T>(
    client: &C,
    options: &ProvisionOptions,
    mode: ApplyMode,
    verify: F,
) -> Result<T, LifecycleError>
where
    C: ProvisioningClient,
    F: FnOnce(&C, &ProvisionOptions) -> Result<T, VerifyError>,
{
    let options = normalize_options(options.clone())
        .map_err(|error| LifecycleError::new(Phase::Options, error.message()))?;

    let started_at = Instant::now();
    log_info(
        COMPONENT,
        "stack_apply_started",
        json!({
            "config_dir": options.config_dir.display().to_string(),
            "mode": match mode {
                ApplyMode::Once => "once",
                ApplyMode::CheckIdempotent => "check_idempotent",
            },
        }),
    );

    let primary = run_stack(client, &options, mode, verify, started_at);

    let destroy_started_at = Instant::now();
    let destroy_result = client.destroy(&options);
    match &destroy_result {
        Ok(()) => log_info(
            COMPONENT,
            "stack_destroy_completed",
            json!({
                "config_dir": options.config_dir.display().to_string(),
                "duration_ms": destroy_started_at.elapsed().as_millis() as u64,
            }),
        ),
        Err(error) => log_error(
            COMPONENT,
            "stack_destroy_failed",
            json!({
                "config_dir": options.config_dir.display().to_string(),
                "duration_ms": destroy_started_at.elapsed().as_millis() as u64,
                "error": error.to_string(),
            }),
        ),
    }

    match (primary, destroy_result) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(destroy_error)) => Err(LifecycleError::new(
            Phase::Destroy,
            destroy_error.to_string(),
        )),
        (Err(error), Ok(())) => Err(error),
        (Err(mut error), Err(destroy_error)) => {
            error.destroy_error = Some(destroy_error.to_string());
            Err(error)
        }
    }
}

fn run_stack<C, F, T>(
    client: &C,
    options: &ProvisionOptions,
    mode: ApplyMode,
    verify: F,
    started_at: Instant,
) -> Result<T, LifecycleError>
where
    C: ProvisioningClient,
    F: FnOnce(&C, &ProvisionOptions) -> Result<T, VerifyError>,
{
    client
        .init(options)
        .map_err(|error| LifecycleError::new(Phase::Init, error.to_string()))?;

    let report = client
        .apply(options)
        .map_err(|error| LifecycleError::new(Phase::Apply, error.to_string()))?;

    if mode == ApplyMode::CheckIdempotent {
        let has_changes = client
            .plan_has_changes(options)
            .map_err(|error| LifecycleError::new(Phase::IdempotenceCheck, error.to_string()))?;
        if has_changes {
            return Err(LifecycleError::new(
                Phase::IdempotenceCheck,
                "plan after apply still has pending changes",
            ));
        }
    }

    log_info(
        COMPONENT,
        "stack_apply_completed",
        json!({
            "config_dir": options.config_dir.display().to_string(),
            "duration_ms": started_at.elapsed().as_millis() as u64,
            "resources_added": report.summary.map(|summary| summary.added),
            "resources_changed": report.summary.map(|summary| summary.changed),
            "resources_destroyed": report.summary.map(|summary| summary.destroyed),
        }),
    );

    verify(client, options).map_err(|error| {
        log_error(
            COMPONENT,
            "stack_verify_failed",
            json!({
                "config_dir": options.config_dir.display().to_string(),
                "error": error.message(),
            }),
        );
        LifecycleError::new(Phase::Verify, error.message())
    })
}

/// Read a named output and require it to be non-empty, returning its string
/// form. Non-string outputs come back as compact JSON.
pub fn require_output<C: ProvisioningClient>(
    client: &C,
    options: &ProvisionOptions,
    name: &str,
) -> Result<String, VerifyError> {
    let output = client
        .output(options, name)
        .map_err(|error| VerifyError::new(format!("output '{name}' unavailable: {error}")))?;

    if output.is_empty() {
        return Err(VerifyError::new(format!("output '{name}' is empty")));
    }

    Ok(match output.as_str() {
        Some(text) => text.to_string(),
        None => output.value().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_keeps_primary_failure_first() {
        let error = LifecycleError {
            phase: Phase::Apply,
            message: "boom".to_string(),
            destroy_error: Some("state still locked".to_string()),
        };
        assert_eq!(
            error.to_string(),
            "apply failed: boom; destroy also failed: state still locked"
        );
    }

    #[test]
    fn display_without_destroy_error_is_just_the_phase() {
        let error = LifecycleError::new(Phase::Init, "no backend");
        assert_eq!(error.to_string(), "init failed: no backend");
    }

    #[test]
    fn phase_names_are_stable() {
        assert_eq!(Phase::Options.as_str(), "options");
        assert_eq!(Phase::Destroy.as_str(), "destroy");
    }
}
