//! Common utilities for benchmarks.
//!
//! Provides deterministic patch generators so runs are reproducible.

#![allow(dead_code)]

/// Generate a bare unified diff with `file_count` files of `lines_per_file`
/// content lines each.
pub fn generate_diff(file_count: usize, lines_per_file: usize) -> String {
    let mut out = Vec::new();

    for file in 0..file_count {
        out.push(format!(
            "diff --git a/src/file_{0}.rs b/src/file_{0}.rs",
            file
        ));
        out.push("index 1111111..2222222 100644".to_string());
        out.push(format!("--- a/src/file_{}.rs", file));
        out.push(format!("+++ b/src/file_{}.rs", file));
        out.push(format!(
            "@@ -1,{0} +1,{0} @@",
            lines_per_file
        ));

        for i in 1..=lines_per_file {
            // A fixed mix: removal+addition pairs every fifth line, context
            // otherwise.
            if i % 5 == 0 {
                out.push(format!("-    let value_{} = compute();", i));
                out.push(format!("+    let value_{} = compute()?;", i));
            } else {
                out.push(format!("     let keep_{} = value;", i));
            }
        }
    }

    out.join("\n")
}

/// Generate mailbox-framed multi-patch input with `patch_count` commits.
pub fn generate_mailbox_patches(patch_count: usize, lines_per_file: usize) -> String {
    let mut out = Vec::new();

    for n in 0..patch_count {
        out.push(format!(
            "From 00000000000000000000000000000000000000{:02} Mon Sep 17 00:00:00 2001",
            n
        ));
        out.push("From: Bench Bot <bench@example.com>".to_string());
        out.push("Date: Sat, 1 Jun 2024 12:00:00 +0000".to_string());
        out.push(format!("Subject: [PATCH] Commit number {}", n));
        out.push(String::new());
        out.push(generate_diff(1, lines_per_file));
        out.push("-- ".to_string());
        out.push("2.44.0".to_string());
    }

    out.join("\n")
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_generate_diff_reproducible() {
        assert_eq!(super::generate_diff(2, 20), super::generate_diff(2, 20));
    }

    #[test]
    fn test_generate_mailbox_patches_framing() {
        let input = super::generate_mailbox_patches(3, 10);
        assert_eq!(input.matches("\nFrom 0").count() + 1, 3);
    }
}
