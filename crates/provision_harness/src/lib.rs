//! Scoped provisioning test harness.
//!
//! This crate owns the runtime half of the harness: the narrow
//! `ProvisioningClient` seam, the process-backed `TerraformCli` client, and
//! the lifecycle driver that guarantees teardown on every exit path.
//! Contract types (options, retry classification, output parsing) live in
//! `provision_core`.

pub mod client;
pub mod lifecycle;
mod logging;
pub mod terraform;

pub use client::{ApplyReport, ClientError, ProvisioningClient};
pub use lifecycle::{
    provision_and_verify, ApplyMode, LifecycleError, Phase, VerifyError,
};
pub use terraform::TerraformCli;
