use std::collections::BTreeMap;
use std::sync::Mutex;

use provision_core::{OutputValue, ProvisionOptions};
use provision_harness::lifecycle::require_output;
use provision_harness::{
    provision_and_verify, ApplyMode, ApplyReport, ClientError, Phase, ProvisioningClient,
    VerifyError,
};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Call {
    Init,
    Apply,
    Plan,
    Destroy,
    Output,
}

struct RecordingClient {
    calls: Mutex<Vec<Call>>,
    fail_on: Option<Call>,
    destroy_fails: bool,
    plan_has_changes: bool,
    outputs: BTreeMap<String, OutputValue>,
}

impl RecordingClient {
    fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_on: None,
            destroy_fails: false,
            plan_has_changes: false,
            outputs: BTreeMap::from([
                (
                    "instance_id".to_string(),
                    OutputValue::new(Value::from("i-0abc123")),
                ),
                (
                    "instance_public_ip".to_string(),
                    OutputValue::new(Value::from("203.0.113.7")),
                ),
            ]),
        }
    }

    fn failing_on(call: Call) -> Self {
        Self {
            fail_on: Some(call),
            ..Self::new()
        }
    }

    fn record(&self, call: Call) -> Result<(), ClientError> {
        self.calls.lock().expect("poisoned mutex").push(call);
        if self.fail_on == Some(call) {
            return Err(ClientError::new(
                "fake",
                "injected failure for verification",
            ));
        }
        Ok(())
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().expect("poisoned mutex").clone()
    }

    fn destroy_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| **call == Call::Destroy)
            .count()
    }
}

impl ProvisioningClient for RecordingClient {
    fn init(&self, _options: &ProvisionOptions) -> Result<(), ClientError> {
        self.record(Call::Init)
    }

    fn apply(&self, _options: &ProvisionOptions) -> Result<ApplyReport, ClientError> {
        self.record(Call::Apply)?;
        Ok(ApplyReport {
            raw_output: "Apply complete! Resources: 1 added, 0 changed, 0 destroyed.".to_string(),
            summary: provision_core::summary::parse_change_summary(
                "Apply complete! Resources: 1 added, 0 changed, 0 destroyed.",
            ),
        })
    }

    fn plan_has_changes(&self, _options: &ProvisionOptions) -> Result<bool, ClientError> {
        self.record(Call::Plan)?;
        Ok(self.plan_has_changes)
    }

    fn destroy(&self, _options: &ProvisionOptions) -> Result<(), ClientError> {
        self.calls.lock().expect("poisoned mutex").push(Call::Destroy);
        if self.destroy_fails {
            return Err(ClientError::new("destroy", "state still locked"));
        }
        Ok(())
    }

    fn output(&self, _options: &ProvisionOptions, name: &str) -> Result<OutputValue, ClientError> {
        self.record(Call::Output)?;
        self.outputs
            .get(name)
            .cloned()
            .ok_or_else(|| ClientError::new("output", format!("no output named '{name}'")))
    }

    fn outputs(
        &self,
        _options: &ProvisionOptions,
    ) -> Result<BTreeMap<String, OutputValue>, ClientError> {
        self.record(Call::Output)?;
        Ok(self.outputs.clone())
    }
}

fn sample_options() -> ProvisionOptions {
    ProvisionOptions::with_default_retryable_errors("../config").upgrade_plugins(true)
}

fn verify_instance_outputs(
    client: &RecordingClient,
    options: &ProvisionOptions,
) -> Result<(String, String), VerifyError> {
    let instance_id = require_output(client, options, "instance_id")?;
    let public_ip = require_output(client, options, "instance_public_ip")?;
    Ok((instance_id, public_ip))
}

#[test]
fn successful_run_applies_verifies_and_destroys_once() {
    let client = RecordingClient::new();

    let (instance_id, public_ip) = provision_and_verify(
        &client,
        &sample_options(),
        ApplyMode::CheckIdempotent,
        verify_instance_outputs,
    )
    .expect("lifecycle should pass");

    assert_eq!(instance_id, "i-0abc123");
    assert_eq!(public_ip, "203.0.113.7");
    assert_eq!(
        client.calls(),
        vec![
            Call::Init,
            Call::Apply,
            Call::Plan,
            Call::Output,
            Call::Output,
            Call::Destroy
        ]
    );
}

#[test]
fn apply_once_mode_skips_the_plan() {
    let client = RecordingClient::new();

    provision_and_verify(&client, &sample_options(), ApplyMode::Once, |_, _| Ok(()))
        .expect("lifecycle should pass");

    assert!(!client.calls().contains(&Call::Plan));
    assert_eq!(client.destroy_count(), 1);
}

#[test]
fn apply_failure_still_destroys_and_skips_verify() {
    let client = RecordingClient::failing_on(Call::Apply);

    let error = provision_and_verify(
        &client,
        &sample_options(),
        ApplyMode::CheckIdempotent,
        verify_instance_outputs,
    )
    .expect_err("lifecycle should fail");

    assert_eq!(error.phase, Phase::Apply);
    assert!(error.destroy_error.is_none());
    assert_eq!(client.destroy_count(), 1);
    assert!(!client.calls().contains(&Call::Output));
}

#[test]
fn init_failure_still_attempts_destroy() {
    let client = RecordingClient::failing_on(Call::Init);

    let error = provision_and_verify(
        &client,
        &sample_options(),
        ApplyMode::Once,
        verify_instance_outputs,
    )
    .expect_err("lifecycle should fail");

    assert_eq!(error.phase, Phase::Init);
    assert_eq!(client.destroy_count(), 1);
    assert!(!client.calls().contains(&Call::Apply));
}

#[test]
fn empty_output_fails_verify_but_still_destroys() {
    let mut client = RecordingClient::new();
    client
        .outputs
        .insert("instance_public_ip".to_string(), OutputValue::new(Value::from("")));

    let error = provision_and_verify(
        &client,
        &sample_options(),
        ApplyMode::CheckIdempotent,
        verify_instance_outputs,
    )
    .expect_err("lifecycle should fail");

    assert_eq!(error.phase, Phase::Verify);
    assert!(error.message.contains("instance_public_ip"));
    assert_eq!(client.destroy_count(), 1);
}

#[test]
fn destroy_failure_after_apply_failure_keeps_apply_as_primary() {
    let mut client = RecordingClient::failing_on(Call::Apply);
    client.destroy_fails = true;

    let error = provision_and_verify(
        &client,
        &sample_options(),
        ApplyMode::Once,
        verify_instance_outputs,
    )
    .expect_err("lifecycle should fail");

    assert_eq!(error.phase, Phase::Apply);
    let destroy_error = error
        .destroy_error
        .clone()
        .expect("destroy error should be attached");
    assert!(destroy_error.contains("state still locked"));
    assert!(error.to_string().starts_with("apply failed"));
}

#[test]
fn destroy_failure_after_clean_run_is_the_primary_failure() {
    let mut client = RecordingClient::new();
    client.destroy_fails = true;

    let error = provision_and_verify(&client, &sample_options(), ApplyMode::Once, |_, _| Ok(()))
        .expect_err("lifecycle should fail");

    assert_eq!(error.phase, Phase::Destroy);
    assert!(error.destroy_error.is_none());
}

#[test]
fn pending_changes_after_apply_fail_the_idempotence_check() {
    let mut client = RecordingClient::new();
    client.plan_has_changes = true;

    let error = provision_and_verify(
        &client,
        &sample_options(),
        ApplyMode::CheckIdempotent,
        verify_instance_outputs,
    )
    .expect_err("lifecycle should fail");

    assert_eq!(error.phase, Phase::IdempotenceCheck);
    assert_eq!(client.destroy_count(), 1);
}

#[test]
fn invalid_options_fail_before_anything_is_acquired() {
    let client = RecordingClient::new();
    let options = ProvisionOptions::new("");

    let error = provision_and_verify(&client, &options, ApplyMode::Once, |_, _| Ok(()))
        .expect_err("lifecycle should fail");

    assert_eq!(error.phase, Phase::Options);
    assert!(client.calls().is_empty());
}

#[test]
fn verify_can_pin_an_output_to_an_expected_value() {
    let client = RecordingClient::new();

    let result = provision_and_verify(
        &client,
        &sample_options(),
        ApplyMode::Once,
        |client, options| {
            let instance_id = require_output(client, options, "instance_id")?;
            if instance_id != "i-0expected" {
                return Err(VerifyError::new(format!(
                    "expected instance_id 'i-0expected', got '{instance_id}'"
                )));
            }
            Ok(())
        },
    );

    let error = result.expect_err("lifecycle should fail");
    assert_eq!(error.phase, Phase::Verify);
    assert!(error.message.contains("i-0abc123"));
    assert_eq!(client.destroy_count(), 1);
}
