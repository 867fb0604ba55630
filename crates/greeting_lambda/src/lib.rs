//! Placeholder invocation handler: emits a fixed greeting per invocation
//! and returns. The runtime owns process lifecycle and retry policy; the
//! handler itself has no error path beyond stdout I/O.

use std::io::Write;

use lambda_runtime::{Error, LambdaEvent};

pub const GREETING: &str = "Milch oder Kaffe?";

/// Emit the greeting exactly once, with a trailing newline.
pub fn write_greeting(out: &mut impl Write) -> std::io::Result<()> {
    writeln!(out, "{GREETING}")
}

/// Handler entry point. The payload is ignored; every invocation produces
/// the same fixed side effect.
pub async fn handle_invocation(_event: LambdaEvent<serde_json::Value>) -> Result<(), Error> {
    write_greeting(&mut std::io::stdout())?;
    Ok(())
}
