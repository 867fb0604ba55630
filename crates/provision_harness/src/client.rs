use std::collections::BTreeMap;

use provision_core::{ChangeSummary, OutputValue, ProvisionOptions};

/// Outcome of one apply: the tool's full output plus the parsed change
/// trailer when present.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplyReport {
    pub raw_output: String,
    pub summary: Option<ChangeSummary>,
}

/// Narrow seam over the external provisioning tool. The harness is written
/// against this trait so lifecycle behavior can be tested with a recording
/// fake instead of a real cloud account.
pub trait ProvisioningClient {
    fn init(&self, options: &ProvisionOptions) -> Result<(), ClientError>;

    fn apply(&self, options: &ProvisionOptions) -> Result<ApplyReport, ClientError>;

    /// Whether a plan against the current state still has pending changes.
    fn plan_has_changes(&self, options: &ProvisionOptions) -> Result<bool, ClientError>;

    fn destroy(&self, options: &ProvisionOptions) -> Result<(), ClientError>;

    fn output(&self, options: &ProvisionOptions, name: &str) -> Result<OutputValue, ClientError>;

    fn outputs(
        &self,
        options: &ProvisionOptions,
    ) -> Result<BTreeMap<String, OutputValue>, ClientError>;

    /// Apply, then verify a follow-up plan is a no-op. Pending changes after
    /// a successful apply mean the configuration is not idempotent, which is
    /// a client error here.
    fn apply_idempotent(&self, options: &ProvisionOptions) -> Result<ApplyReport, ClientError> {
        let report = self.apply(options)?;
        if self.plan_has_changes(options)? {
            return Err(ClientError::new(
                "plan",
                "configuration is not idempotent: plan after apply still has pending changes",
            ));
        }
        Ok(report)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientError {
    operation: String,
    message: String,
}

impl ClientError {
    pub fn new(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} failed: {}", self.operation, self.message)
    }
}

impl std::error::Error for ClientError {}
