mod client;
pub mod comment;
mod pr;

// Explicit re-exports - only export what is actually used
pub use client::{detect_repo, DetectRepoError};
pub use comment::{clear_prior_suggestions, comment_suggestion, COMMENT_TOKEN};
pub use pr::{fetch_pr, fetch_pull_request_files, Branch, PullRequest};
