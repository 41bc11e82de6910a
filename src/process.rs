//! Subprocess execution helpers.

use anyhow::{Context, Result};
use tokio::process::Command;
use tracing::debug;

/// Run a command with inherited stdio, returning its exit code.
///
/// Non-zero exits are the caller's to interpret; only failure to spawn is an
/// error. A missing exit code (terminated by signal) maps to -1.
pub async fn run_process(cmd: &str, args: &[&str], envs: &[(&str, String)]) -> Result<i32> {
    debug!("Running {} {:?}", cmd, args);

    let status = Command::new(cmd)
        .args(args)
        .envs(envs.iter().map(|(key, value)| (*key, value.as_str())))
        .status()
        .await
        .with_context(|| format!("Failed to execute {}", cmd))?;

    Ok(status.code().unwrap_or(-1))
}

/// Run a command and capture stdout, with one trailing newline removed.
///
/// A non-zero exit is an error carrying the captured stderr.
pub async fn read_process(cmd: &str, args: &[&str]) -> Result<String> {
    debug!("Reading {} {:?}", cmd, args);

    let output = Command::new(cmd)
        .args(args)
        .output()
        .await
        .with_context(|| format!("Failed to execute {}", cmd))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("{} failed ({}): {}", cmd, output.status, stderr.trim());
    }

    let stdout =
        String::from_utf8(output.stdout).with_context(|| format!("{} output is not valid UTF-8", cmd))?;

    Ok(stdout.strip_suffix('\n').unwrap_or(&stdout).to_string())
}
