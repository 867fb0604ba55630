//! Contract types for driving an external provisioning tool.
//!
//! This crate owns the pure, I/O-free half of the provisioning harness:
//! option records and their validation, transient-error classification,
//! parsing of the tool's JSON output forms, and parsing of the apply
//! change summary. The process-backed client and the lifecycle driver
//! live in `provision_harness`.

pub mod options;
pub mod outputs;
pub mod retry;
pub mod summary;

pub use options::{normalize_options, ProvisionOptions, ValidationError};
pub use outputs::{parse_output_map, parse_output_value, OutputValue};
pub use retry::RetryPolicy;
pub use summary::ChangeSummary;
