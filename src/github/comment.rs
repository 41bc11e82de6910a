use anyhow::{Context, Result};
use serde::Deserialize;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::client::{gh_api_delete, gh_api_post, gh_graphql, FieldValue};
use crate::suggestions::Suggestion;

/// Marker embedded in every comment this tool posts, so later runs can find
/// and manage their own comments without touching anyone else's.
pub const COMMENT_TOKEN: &str = "<!-- added by resuggest -->";

#[derive(Debug, Clone, Deserialize)]
pub struct Nodes<T> {
    pub nodes: Vec<T>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewThread {
    pub resolved_by: Option<Resolver>,
    pub comments: Nodes<ThreadComment>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Resolver {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadComment {
    pub body: String,
    pub full_database_id: String,
    pub is_minimized: bool,
    /// Absent when the comment has become outdated.
    pub line: Option<u32>,
    pub minimized_reason: Option<String>,
    pub path: String,
    pub start_line: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ThreadsResponse {
    data: ThreadsData,
}

#[derive(Debug, Deserialize)]
struct ThreadsData {
    repository: RepositoryNode,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RepositoryNode {
    pull_request: PullRequestNode,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PullRequestNode {
    review_threads: Nodes<ReviewThread>,
}

/// Fetch the last 100 review threads with their last 100 comments each.
pub async fn query_review_threads(repo: &str, pr_number: u32) -> Result<Vec<ReviewThread>> {
    let (owner, name) = repo
        .split_once('/')
        .context("Repository must be in owner/repo form")?;

    let query = format!(
        r#"{{
  repository(owner: "{owner}", name: "{name}") {{
    pullRequest(number: {pr_number}) {{
      reviewThreads(last: 100) {{
        nodes {{
          resolvedBy {{ id }}
          comments(last: 100) {{
            nodes {{
              body
              fullDatabaseId
              isMinimized
              line
              minimizedReason
              path
              startLine
            }}
          }}
        }}
      }}
    }}
  }}
}}"#
    );

    let json = gh_graphql(&query).await?;
    let response: ThreadsResponse =
        serde_json::from_value(json).context("Failed to parse review threads response")?;

    Ok(response.data.repository.pull_request.review_threads.nodes)
}

/// Delete this tool's unresolved suggestion comments and collect the
/// resolved ones as locations not to re-post.
///
/// A thread counts as handled when it was resolved or its comment was
/// minimized; anything else carrying the marker token is stale output from
/// an earlier run and is removed so fresh suggestions can replace it.
pub async fn clear_prior_suggestions(repo: &str, pr_number: u32) -> Result<Vec<Suggestion>> {
    let threads = query_review_threads(repo, pr_number).await?;

    let mut resolved = Vec::new();
    let mut deletions = JoinSet::new();

    for thread in &threads {
        for comment in &thread.comments.nodes {
            if !comment.body.contains(COMMENT_TOKEN) {
                continue;
            }

            if comment.is_minimized || thread.resolved_by.is_some() {
                let Some(line) = comment.line else {
                    continue;
                };

                info!("Found resolved suggestion at {}:{}", comment.path, line);
                resolved.push(Suggestion {
                    path: comment.path.clone(),
                    description: String::new(),
                    start_line: comment.start_line.unwrap_or(line),
                    end_line: line,
                    code: Vec::new(),
                    skip_reason: None,
                });
            } else {
                let repo = repo.to_string();
                let id = comment.full_database_id.clone();

                deletions.spawn(async move {
                    let endpoint = format!("repos/{}/pulls/comments/{}", repo, id);
                    gh_api_delete(&endpoint).await
                });
            }
        }
    }

    debug!("Deleting {} old suggestion(s)", deletions.len());

    while let Some(result) = deletions.join_next().await {
        match result {
            Ok(Ok(())) => {}
            Ok(Err(err)) => warn!("Failed to delete prior suggestion: {:#}", err),
            Err(err) => warn!("Suggestion deletion task failed: {}", err),
        }
    }

    Ok(resolved)
}

/// Post one suggestion as a review comment on the PR head commit.
///
/// Callers must filter skipped suggestions out first: posting one is a
/// programming error, not a data-quality condition, and fails immediately.
pub async fn comment_suggestion(
    repo: &str,
    pr_number: u32,
    head_sha: &str,
    suggestion: &Suggestion,
) -> Result<()> {
    if let Some(reason) = &suggestion.skip_reason {
        anyhow::bail!(
            "Refusing to post skipped suggestion at {}:{} ({})",
            suggestion.path,
            suggestion.start_line,
            reason
        );
    }

    let body = suggestion_body(suggestion);
    let endpoint = format!("repos/{}/pulls/{}/comments", repo, pr_number);
    let line = suggestion.end_line.to_string();
    let start_line = suggestion.start_line.to_string();

    debug!(
        "Leaving review comment on {}:{}-{}",
        suggestion.path, suggestion.start_line, suggestion.end_line
    );

    let mut fields = vec![
        ("body", FieldValue::String(&body)),
        ("commit_id", FieldValue::String(head_sha)),
        ("path", FieldValue::String(&suggestion.path)),
        ("line", FieldValue::Raw(&line)),
        ("side", FieldValue::String("RIGHT")),
    ];

    // The multiline API variant requires start_line < line; a single-line
    // comment must omit it.
    if suggestion.start_line != suggestion.end_line {
        fields.push(("start_line", FieldValue::Raw(&start_line)));
        fields.push(("start_side", FieldValue::String("RIGHT")));
    }

    gh_api_post(&endpoint, &fields).await?;
    Ok(())
}

/// The comment body: description, a suggestion fence with the replacement
/// lines, and the marker token.
fn suggestion_body(suggestion: &Suggestion) -> String {
    let code = suggestion.code.join("\n");

    [
        suggestion.description.as_str(),
        "",
        "```suggestion",
        code.as_str(),
        "```",
        "",
        COMMENT_TOKEN,
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn suggestion(code: Vec<&str>) -> Suggestion {
        Suggestion {
            path: "src/app.js".to_string(),
            description: "Restyled by prettier".to_string(),
            start_line: 4,
            end_line: 5,
            code: code.into_iter().map(str::to_string).collect(),
            skip_reason: None,
        }
    }

    #[test]
    fn test_suggestion_body_format() {
        let body = suggestion_body(&suggestion(vec!["const a = 1;", "const b = 2;"]));

        assert_eq!(
            body,
            "Restyled by prettier\n\n```suggestion\nconst a = 1;\nconst b = 2;\n```\n\n<!-- added by resuggest -->"
        );
    }

    #[test]
    fn test_suggestion_body_empty_code_keeps_fence() {
        let body = suggestion_body(&suggestion(Vec::new()));

        assert!(body.contains("```suggestion\n\n```"));
        assert!(body.contains(COMMENT_TOKEN));
    }

    #[tokio::test]
    async fn test_comment_suggestion_rejects_skipped() {
        let mut skipped = suggestion(Vec::new());
        skipped.skip_reason = Some("already marked resolved".to_string());

        let err = comment_suggestion("owner/repo", 1, "deadbeef", &skipped)
            .await
            .unwrap_err();

        assert!(format!("{}", err).contains("Refusing to post"));
    }

    #[test]
    fn test_review_thread_deserialization() {
        let json = serde_json::json!({
            "resolvedBy": { "id": "U_abc" },
            "comments": {
                "nodes": [{
                    "body": "text <!-- added by resuggest -->",
                    "fullDatabaseId": "12345",
                    "isMinimized": false,
                    "line": 7,
                    "minimizedReason": null,
                    "path": "src/app.js",
                    "startLine": null
                }]
            }
        });

        let thread: ReviewThread = serde_json::from_value(json).unwrap();

        assert!(thread.resolved_by.is_some());
        assert_eq!(thread.comments.nodes.len(), 1);
        assert_eq!(thread.comments.nodes[0].line, Some(7));
        assert_eq!(thread.comments.nodes[0].start_line, None);
        assert_eq!(thread.comments.nodes[0].full_database_id, "12345");
    }
}
