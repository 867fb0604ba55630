use std::collections::BTreeMap;
use std::process::Command;

use provision_core::{parse_output_map, parse_output_value, summary, OutputValue, ProvisionOptions};
use serde_json::json;

use crate::client::{ApplyReport, ClientError, ProvisioningClient};
use crate::logging::{log_error, log_info};

const COMPONENT: &str = "terraform_cli";

/// Process-backed client: one blocking child process per operation, run in
/// the options' config directory. The tool is an opaque black box; this
/// client only shapes arguments, applies the retry policy, and parses the
/// JSON output forms.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerraformCli;

impl TerraformCli {
    pub fn new() -> Self {
        Self
    }
}

struct CommandOutcome {
    exit_code: Option<i32>,
    stdout: String,
    stderr: String,
}

impl CommandOutcome {
    fn combined(&self) -> String {
        format!("{}\n{}", self.stdout, self.stderr)
    }
}

impl TerraformCli {
    fn run(
        &self,
        options: &ProvisionOptions,
        operation: &'static str,
        args: &[String],
        accepted_exit_codes: &[i32],
    ) -> Result<CommandOutcome, ClientError> {
        let mut attempt = 0usize;
        loop {
            attempt += 1;
            log_info(
                COMPONENT,
                "command_started",
                json!({
                    "operation": operation,
                    "binary": options.tool_binary.clone(),
                    "config_dir": options.config_dir.display().to_string(),
                    "attempt": attempt,
                }),
            );

            let output = Command::new(&options.tool_binary)
                .args(args)
                .current_dir(&options.config_dir)
                .env("TF_IN_AUTOMATION", "1")
                .output()
                .map_err(|error| {
                    ClientError::new(
                        operation,
                        format!("failed to launch '{}': {error}", options.tool_binary),
                    )
                })?;

            let outcome = CommandOutcome {
                exit_code: output.status.code(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            };

            if outcome
                .exit_code
                .is_some_and(|code| accepted_exit_codes.contains(&code))
            {
                return Ok(outcome);
            }

            let combined = outcome.combined();
            let transient = options.retry.match_transient(&combined);
            match transient {
                Some(pattern) if attempt < options.retry.max_attempts => {
                    log_info(
                        COMPONENT,
                        "command_retried",
                        json!({
                            "operation": operation,
                            "attempt": attempt,
                            "max_attempts": options.retry.max_attempts,
                            "matched_pattern": pattern,
                            "backoff_ms": options.retry.backoff.as_millis() as u64,
                        }),
                    );
                    std::thread::sleep(options.retry.backoff);
                }
                _ => {
                    log_error(
                        COMPONENT,
                        "command_failed",
                        json!({
                            "operation": operation,
                            "attempt": attempt,
                            "exit_code": outcome.exit_code,
                        }),
                    );
                    return Err(ClientError::new(
                        operation,
                        format!(
                            "exit code {:?} after {attempt} attempt(s): {}",
                            outcome.exit_code,
                            combined.trim()
                        ),
                    ));
                }
            }
        }
    }

    fn variable_args(options: &ProvisionOptions) -> Vec<String> {
        options
            .variables
            .iter()
            .flat_map(|(name, value)| ["-var".to_string(), format!("{name}={value}")])
            .collect()
    }
}

impl ProvisioningClient for TerraformCli {
    fn init(&self, options: &ProvisionOptions) -> Result<(), ClientError> {
        let mut args = vec![
            "init".to_string(),
            "-no-color".to_string(),
            "-input=false".to_string(),
        ];
        if options.upgrade_plugins {
            args.push("-upgrade".to_string());
        }
        self.run(options, "init", &args, &[0]).map(|_| ())
    }

    fn apply(&self, options: &ProvisionOptions) -> Result<ApplyReport, ClientError> {
        let mut args = vec![
            "apply".to_string(),
            "-no-color".to_string(),
            "-input=false".to_string(),
            "-auto-approve".to_string(),
        ];
        args.extend(Self::variable_args(options));

        let outcome = self.run(options, "apply", &args, &[0])?;
        Ok(ApplyReport {
            summary: summary::parse_change_summary(&outcome.stdout),
            raw_output: outcome.stdout,
        })
    }

    fn plan_has_changes(&self, options: &ProvisionOptions) -> Result<bool, ClientError> {
        let mut args = vec![
            "plan".to_string(),
            "-no-color".to_string(),
            "-input=false".to_string(),
            "-detailed-exitcode".to_string(),
        ];
        args.extend(Self::variable_args(options));

        // Detailed exit code contract: 0 = clean plan, 2 = pending changes.
        let outcome = self.run(options, "plan", &args, &[0, 2])?;
        Ok(outcome.exit_code == Some(2))
    }

    fn destroy(&self, options: &ProvisionOptions) -> Result<(), ClientError> {
        let mut args = vec![
            "destroy".to_string(),
            "-no-color".to_string(),
            "-input=false".to_string(),
            "-auto-approve".to_string(),
        ];
        args.extend(Self::variable_args(options));
        self.run(options, "destroy", &args, &[0]).map(|_| ())
    }

    fn output(&self, options: &ProvisionOptions, name: &str) -> Result<OutputValue, ClientError> {
        let args = vec![
            "output".to_string(),
            "-no-color".to_string(),
            "-json".to_string(),
            name.to_string(),
        ];
        let outcome = self.run(options, "output", &args, &[0])?;
        parse_output_value(&outcome.stdout)
            .map_err(|error| ClientError::new("output", error.message().to_string()))
    }

    fn outputs(
        &self,
        options: &ProvisionOptions,
    ) -> Result<BTreeMap<String, OutputValue>, ClientError> {
        let args = vec![
            "output".to_string(),
            "-no-color".to_string(),
            "-json".to_string(),
        ];
        let outcome = self.run(options, "output", &args, &[0])?;
        parse_output_map(&outcome.stdout)
            .map_err(|error| ClientError::new("output", error.message().to_string()))
    }
}
