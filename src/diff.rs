//! Reconstruction of a pull request's own diff from file-listing fragments.
//!
//! The pull-request file listing returns each changed file as
//! `{ filename, patch }`, where `patch` is a bare hunk fragment with no
//! `diff --git` framing. A minimal header is synthesized so the patch parser
//! can be reused, and the resulting line records answer "did the pull
//! request itself add this range?".

use serde::{Deserialize, Serialize};

use crate::patch::{self, Patch, PatchFile, PatchLine};

/// A changed file as delivered by the pull-request file listing.
///
/// `patch` is absent for binary files and for diffs too large to inline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequestFile {
    pub filename: String,
    pub patch: Option<String>,
}

/// Parse one file's fragment into full line records.
///
/// Files without a fragment reconstruct to no lines, which downstream
/// treats as "nothing was added here".
pub fn file_lines(file: &PullRequestFile) -> Vec<PatchLine> {
    file_patch(file)
        .map(|f| f.modified_lines)
        .unwrap_or_default()
}

/// Aggregate a pull request's file fragments into a single metadata-less
/// patch, one file record per fragment that parses.
pub fn base_patch(files: &[PullRequestFile]) -> Patch {
    Patch {
        files: files.iter().filter_map(file_patch).collect(),
        ..Patch::default()
    }
}

/// Whether every line in `start_line..=end_line` was added by the file's
/// own diff.
pub fn wholly_added(file: &PullRequestFile, start_line: u32, end_line: u32) -> bool {
    if end_line < start_line {
        return false;
    }

    let lines = file_lines(file);
    let size = (end_line - start_line + 1) as usize;

    if lines.len() < size {
        return false;
    }

    (start_line..=end_line).all(|n| {
        lines.iter().any(|line| {
            matches!(line, PatchLine::Added { added_line_number, .. } if *added_line_number == n)
        })
    })
}

fn file_patch(file: &PullRequestFile) -> Option<PatchFile> {
    let fragment = file.patch.as_deref()?;

    let synthesized = format!(
        "diff --git a/{name} b/{name}\n\
         index 000000000..000000000 100644\n\
         --- a/{name}\n\
         +++ b/{name}\n\
         {fragment}",
        name = &file.filename,
    );

    patch::parse_patch(&synthesized)?.files.into_iter().next()
}
