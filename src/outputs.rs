//! Workflow outputs.
//!
//! Each run reports its results in workflow-command format: appended to the
//! file named by `GITHUB_OUTPUT` when set, printed to stdout otherwise.

use std::fmt::Write as _;
use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::Path;

use anyhow::{Context, Result};

#[derive(Debug, Clone, Default)]
pub struct Outputs {
    pub success: bool,
    pub differences: bool,
    pub git_patch: String,
    pub restyled_base: String,
    pub restyled_head: String,
    pub restyled_title: String,
    pub restyled_body: String,
    pub suggestions_skipped: bool,
}

impl Outputs {
    /// Render as `key=value` lines, with heredoc delimiters for multiline
    /// values.
    pub fn render(&self) -> String {
        let mut out = String::new();

        write_value(&mut out, "success", bool_str(self.success));
        write_value(&mut out, "differences", bool_str(self.differences));
        write_value(&mut out, "git-patch", &self.git_patch);
        write_value(&mut out, "restyled-base", &self.restyled_base);
        write_value(&mut out, "restyled-head", &self.restyled_head);
        write_value(&mut out, "restyled-title", &self.restyled_title);
        write_value(&mut out, "restyled-body", &self.restyled_body);
        write_value(
            &mut out,
            "suggestions-skipped",
            bool_str(self.suggestions_skipped),
        );

        out
    }

    /// Append to `$GITHUB_OUTPUT`, or print when it is unset.
    pub fn set(&self) -> Result<()> {
        match std::env::var_os("GITHUB_OUTPUT") {
            Some(path) => self.write_to(Path::new(&path)),
            None => {
                print!("{}", self.render());
                Ok(())
            }
        }
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open {}", path.display()))?;

        file.write_all(self.render().as_bytes())
            .context("Failed to write outputs")
    }
}

fn bool_str(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

fn write_value(out: &mut String, key: &str, value: &str) {
    if value.contains('\n') {
        let delimiter = delimiter_for(key, value);
        let _ = writeln!(out, "{}<<{}", key, delimiter);
        let _ = writeln!(out, "{}", value);
        let _ = writeln!(out, "{}", delimiter);
    } else {
        let _ = writeln!(out, "{}={}", key, value);
    }
}

/// A heredoc delimiter that does not occur in the value.
fn delimiter_for(key: &str, value: &str) -> String {
    let mut delimiter = format!("EOF_{}", key.replace('-', "_"));

    while value.contains(&delimiter) {
        delimiter.push('_');
    }

    delimiter
}
