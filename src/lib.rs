//! Map a restyler's proposed fixes onto a pull request's own diff, producing
//! review comments GitHub renders as one-click-apply suggestions.
//!
//! The core is pure: [`patch`] parses git patches and unified diffs into
//! per-line records, [`hunk`] groups line-numbered items into contiguous
//! runs, [`diff`] reconstructs a pull request's own additions from its
//! file-listing fragments, and [`suggestions`] correlates the restyler's
//! deletions against those additions to decide what may be suggested. The
//! [`github`], [`process`], and [`outputs`] modules are the thin I/O layer
//! the binary drives.

pub mod diff;
pub mod github;
pub mod group;
pub mod hunk;
pub mod non_empty;
pub mod outputs;
pub mod patch;
pub mod process;
pub mod suggestions;

pub use patch::{parse_patch, parse_patches, ParsedPatches, Patch, PatchFile, PatchLine};
pub use suggestions::{get_suggestions, suggest, Suggestion};
