//! Derivation of review suggestions from a restyler's output patch.
//!
//! For each file the restyler touched, its deletions are correlated against
//! its additions and against the region the pull request itself added. Every
//! maximal run of deleted lines produces one [`Suggestion`]; anything that
//! cannot be posted is still emitted, tagged with the reason, so operators
//! can see why a fix was withheld without re-running with tracing.

use serde::{Deserialize, Serialize};

use crate::diff::{self, PullRequestFile};
use crate::hunk::{HasLineNumber, Hunk, Hunks};
use crate::patch::{self, Patch, PatchFile, PatchLine};

/// A proposed replacement for a line range in a file's current revision.
///
/// `start_line`/`end_line` index the pull request head's numbering (where
/// the comment anchors), not the restyled file's. `code` holds the
/// replacement lines and may be empty. A populated `skip_reason` means the
/// suggestion must not be posted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub path: String,
    pub description: String,
    pub start_line: u32,
    pub end_line: u32,
    pub code: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub skip_reason: Option<String>,
}

impl Suggestion {
    /// Eligible for posting.
    pub fn postable(&self) -> bool {
        self.skip_reason.is_none()
    }
}

/// Derive suggestions for a pull request from a restyler's raw patch output.
///
/// `files` is the pull request's own changed-file listing, `resolved` holds
/// locations already handled in earlier runs, and `patch_text` is the
/// restyler's output: one mailbox patch or a concatenation of several.
pub fn suggest(
    files: &[PullRequestFile],
    resolved: &[Suggestion],
    patch_text: &str,
) -> Vec<Suggestion> {
    let parsed = patch::parse_patches(patch_text);
    let bases = [diff::base_patch(files)];

    get_suggestions(&bases, &parsed.patches, resolved)
}

/// Derive suggestions from pre-parsed patches.
///
/// For every maximal run of deleted lines in `patches`, emit one suggestion:
/// eligible when a matching addition exists at the same location and the
/// deleted span lies wholly within a region `bases` added, skipped with a
/// reason otherwise. Anomalies never abort the derivation.
pub fn get_suggestions(
    bases: &[Patch],
    patches: &[Patch],
    resolved: &[Suggestion],
) -> Vec<Suggestion> {
    let mut suggestions = Vec::new();
    let base_files: Vec<&PatchFile> = bases.iter().flat_map(|p| p.files.iter()).collect();

    for patch in patches {
        let description = description_of(patch);

        for file in &patch.files {
            let base_file = base_files.iter().find(|x| x.after_name == file.after_name);

            let Some(base_file) = base_file else {
                suggestions.push(Suggestion {
                    path: file.after_name.clone(),
                    description: description.clone(),
                    start_line: 0,
                    end_line: 0,
                    code: Vec::new(),
                    skip_reason: Some(format!(
                        "Changed file {} is not present in base diff",
                        file.after_name
                    )),
                });
                continue;
            };

            let base_adds = Hunks::new(added_lines(base_file));
            let dels = Hunks::new(removed_lines(file));
            let adds = Hunks::new(added_lines(file));

            for del in dels.iter() {
                suggestions.push(suggest_deletion(
                    file,
                    &description,
                    &base_adds,
                    &adds,
                    resolved,
                    del,
                ));
            }
        }
    }

    suggestions
}

/// Resolve one deletion run into an eligible or skipped suggestion.
fn suggest_deletion(
    file: &PatchFile,
    description: &str,
    base_adds: &Hunks<Line>,
    adds: &Hunks<Line>,
    resolved: &[Suggestion],
    del: &Hunk<Line>,
) -> Suggestion {
    let start_line = del.head().line_number;
    let end_line = del.last().line_number;
    let location = format!("{}:{}", file.after_name, start_line);

    let skipped = |reason: String| Suggestion {
        path: file.after_name.clone(),
        description: description.to_string(),
        start_line,
        end_line,
        code: Vec::new(),
        skip_reason: Some(reason),
    };

    // A deletion with no addition starting at the same line is a pure
    // removal; reported rather than dropped so restyler bugs stay visible.
    let Some(add) = adds.get(start_line) else {
        return skipped(format!(
            "Deletion at {} has no corresponding addition: {:?}",
            location,
            adds.lines()
        ));
    };

    // Only lines the pull request itself introduced may carry a suggestion;
    // comments outside its diff are rejected by the review API anyway.
    if !base_adds.contain(del) {
        return skipped(format!(
            "Deletion at {} was not added in base diff: {:?}",
            location,
            base_adds.lines()
        ));
    }

    let suggestion = Suggestion {
        path: file.after_name.clone(),
        description: description.to_string(),
        start_line,
        end_line,
        code: add.iter().map(|line| line.text.clone()).collect(),
        skip_reason: None,
    };

    if resolved.iter().any(|r| same_location(r, &suggestion)) {
        return skipped(format!("Suggestion at {} already marked resolved", location));
    }

    suggestion
}

/// A line with only the fields hunk indexing needs.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Line {
    line_number: u32,
    text: String,
}

impl HasLineNumber for Line {
    fn line_number(&self) -> u32 {
        self.line_number
    }
}

fn added_lines(file: &PatchFile) -> Vec<Line> {
    file.modified_lines
        .iter()
        .filter_map(|line| match line {
            PatchLine::Added {
                added_line_number,
                line,
            } => Some(Line {
                line_number: *added_line_number,
                text: line.clone(),
            }),
            _ => None,
        })
        .collect()
}

fn removed_lines(file: &PatchFile) -> Vec<Line> {
    file.modified_lines
        .iter()
        .filter_map(|line| match line {
            PatchLine::Removed {
                removed_line_number,
                line,
            } => Some(Line {
                line_number: *removed_line_number,
                text: line.clone(),
            }),
            _ => None,
        })
        .collect()
}

fn description_of(patch: &Patch) -> String {
    strip_subject_prefix(patch.message.as_deref().unwrap_or(""))
}

/// Strip a `[PATCH]` or `[PATCH n/m]` subject prefix.
fn strip_subject_prefix(message: &str) -> String {
    if let Some(rest) = message.strip_prefix("[PATCH") {
        if let Some(end) = rest.find("] ") {
            return rest[end + 2..].to_string();
        }
    }

    message.to_string()
}

fn same_location(a: &Suggestion, b: &Suggestion) -> bool {
    a.path == b.path && a.start_line == b.start_line && a.end_line == b.end_line
}

#[cfg(test)]
mod tests {
    use super::*;

    fn added(line_number: u32, text: &str) -> PatchLine {
        PatchLine::Added {
            added_line_number: line_number,
            line: text.to_string(),
        }
    }

    fn removed(line_number: u32, text: &str) -> PatchLine {
        PatchLine::Removed {
            removed_line_number: line_number,
            line: text.to_string(),
        }
    }

    fn patch_file(name: &str, modified_lines: Vec<PatchLine>) -> PatchFile {
        PatchFile {
            added: false,
            deleted: false,
            before_name: name.to_string(),
            after_name: name.to_string(),
            modified_lines,
        }
    }

    fn mailbox_patch(message: &str, files: Vec<PatchFile>) -> Patch {
        Patch {
            hash: Some("0123abcd".to_string()),
            author_name: Some("Restyled Test".to_string()),
            author_email: Some("test@restyled.io".to_string()),
            date: Some("Sat, 1 Jun 2024 12:00:00 +0000".to_string()),
            message: Some(format!("[PATCH] {}", message)),
            files,
        }
    }

    fn eligible(suggestions: &[Suggestion]) -> Vec<&Suggestion> {
        suggestions.iter().filter(|s| s.postable()).collect()
    }

    /// A restyle of a line the pull request itself rewrote.
    fn change_on_change() -> (Vec<Patch>, Vec<Patch>, Suggestion) {
        let bases = vec![mailbox_patch(
            "JSON stringify string responses",
            vec![patch_file(
                "src/events/http/HttpServer.js",
                vec![
                    removed(774, "        if (result && typeof result.body !== 'undefined') {"),
                    added(774, "        if (typeof result === 'string') {"),
                    added(775, "          response.source = JSON.stringify(result)"),
                    added(776, "        } else if (result && typeof result.body !== 'undefined') {"),
                ],
            )],
        )];

        let patches = vec![mailbox_patch(
            "Restyled by prettier",
            vec![patch_file(
                "src/events/http/HttpServer.js",
                vec![
                    removed(775, "          response.source = JSON.stringify(result)"),
                    added(775, "          response.source = JSON.stringify(result);"),
                ],
            )],
        )];

        let expected = Suggestion {
            path: "src/events/http/HttpServer.js".to_string(),
            description: "Restyled by prettier".to_string(),
            start_line: 775,
            end_line: 775,
            code: vec!["          response.source = JSON.stringify(result);".to_string()],
            skip_reason: None,
        };

        (bases, patches, expected)
    }

    #[test]
    fn test_change_on_change() {
        let (bases, patches, expected) = change_on_change();
        let suggestions = get_suggestions(&bases, &patches, &[]);

        assert_eq!(eligible(&suggestions), vec![&expected]);
    }

    #[test]
    fn test_change_on_addition_expands_one_line() {
        // The base added the whole file; the restyler splits line 18 into
        // three lines. One suggestion anchored at the single deleted line.
        let bases = vec![mailbox_patch(
            "Add hunk module",
            vec![patch_file(
                "src/hunks.ts",
                (1..=60).map(|n| added(n, &format!("line {}", n))).collect(),
            )],
        )];

        let patches = vec![mailbox_patch(
            "Restyled by prettier",
            vec![patch_file(
                "src/hunks.ts",
                vec![
                    removed(18, "  get(n) { return this.map.get(n) || null; }"),
                    added(18, "  get(n) {"),
                    added(19, "    return this.map.get(n) || null;"),
                    added(20, "  }"),
                ],
            )],
        )];

        let suggestions = get_suggestions(&bases, &patches, &[]);
        let posted = eligible(&suggestions);

        assert_eq!(posted.len(), 1);
        assert_eq!(posted[0].start_line, 18);
        assert_eq!(posted[0].end_line, 18);
        assert_eq!(
            posted[0].code,
            vec![
                "  get(n) {".to_string(),
                "    return this.map.get(n) || null;".to_string(),
                "  }".to_string(),
            ]
        );
    }

    #[test]
    fn test_multi_line_suggestion() {
        let bases = vec![mailbox_patch(
            "Update Foo",
            vec![patch_file(
                "Foo.hs",
                vec![
                    removed(2, " setRequestBody"),
                    removed(3, "   $ encode"),
                    added(2, " setRequestBody $"),
                    added(3, "   encode"),
                ],
            )],
        )];

        let patches = vec![mailbox_patch(
            "Restyled by fourmolu",
            vec![patch_file(
                "Foo.hs",
                vec![
                    removed(2, " setRequestBody $"),
                    removed(3, "   encode"),
                    added(2, " setRequestBody"),
                    added(3, "   $ encode"),
                ],
            )],
        )];

        let suggestions = get_suggestions(&bases, &patches, &[]);
        let posted = eligible(&suggestions);

        assert_eq!(posted.len(), 1);
        assert_eq!(posted[0].start_line, 2);
        assert_eq!(posted[0].end_line, 3);
        assert_eq!(
            posted[0].code,
            vec![" setRequestBody".to_string(), "   $ encode".to_string()]
        );
        assert_eq!(posted[0].description, "Restyled by fourmolu");
    }

    #[test]
    fn test_deletion_outside_base_additions_is_skipped() {
        // The restyler touched lines the pull request never added.
        let bases = vec![mailbox_patch(
            "Unrelated change",
            vec![patch_file("Foo.hs", vec![added(10, "tenth line")])],
        )];

        let patches = vec![mailbox_patch(
            "Restyled by fourmolu",
            vec![patch_file(
                "Foo.hs",
                vec![
                    removed(2, " setRequestBody $"),
                    removed(3, "   encode"),
                    added(2, " setRequestBody"),
                    added(3, "   $ encode"),
                ],
            )],
        )];

        let suggestions = get_suggestions(&bases, &patches, &[]);

        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].start_line, 2);
        assert_eq!(suggestions[0].end_line, 3);
        assert!(suggestions[0].code.is_empty());
        let reason = suggestions[0].skip_reason.as_deref().unwrap();
        assert!(
            reason.contains("was not added in base diff"),
            "unexpected reason: {}",
            reason
        );
    }

    #[test]
    fn test_file_missing_from_base_diff_is_surfaced() {
        let bases = vec![mailbox_patch("Base", vec![patch_file("a.txt", vec![])])];
        let patches = vec![mailbox_patch(
            "Restyled by prettier",
            vec![patch_file(
                "b.txt",
                vec![removed(1, "x"), added(1, "y")],
            )],
        )];

        let suggestions = get_suggestions(&bases, &patches, &[]);

        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].path, "b.txt");
        assert_eq!(suggestions[0].start_line, 0);
        assert_eq!(suggestions[0].end_line, 0);
        assert_eq!(
            suggestions[0].skip_reason.as_deref(),
            Some("Changed file b.txt is not present in base diff")
        );
    }

    #[test]
    fn test_pure_deletion_is_skipped_with_reason() {
        let bases = vec![mailbox_patch(
            "Base",
            vec![patch_file("a.txt", vec![added(5, "added by pr")])],
        )];
        let patches = vec![mailbox_patch(
            "Restyled by prettier",
            vec![patch_file("a.txt", vec![removed(5, "added by pr")])],
        )];

        let suggestions = get_suggestions(&bases, &patches, &[]);

        assert_eq!(suggestions.len(), 1);
        let reason = suggestions[0].skip_reason.as_deref().unwrap();
        assert!(
            reason.contains("has no corresponding addition"),
            "unexpected reason: {}",
            reason
        );
    }

    #[test]
    fn test_rerun_with_resolved_skips_everything() {
        let (bases, patches, expected) = change_on_change();

        let first = get_suggestions(&bases, &patches, &[]);
        let resolved: Vec<Suggestion> =
            first.into_iter().filter(Suggestion::postable).collect();
        assert_eq!(resolved, vec![expected]);

        let second = get_suggestions(&bases, &patches, &resolved);

        assert!(eligible(&second).is_empty());
        assert_eq!(
            second[0].skip_reason.as_deref(),
            Some("Suggestion at src/events/http/HttpServer.js:775 already marked resolved")
        );
    }

    #[test]
    fn test_multiple_files_multiple_patches() {
        let bases = vec![
            mailbox_patch(
                "First",
                vec![patch_file("a.txt", vec![added(1, "aa"), added(2, "bb")])],
            ),
            mailbox_patch("Second", vec![patch_file("b.txt", vec![added(7, "cc")])]),
        ];

        let patches = vec![mailbox_patch(
            "Restyled by prettier",
            vec![
                patch_file("a.txt", vec![removed(2, "bb"), added(2, "bb;")]),
                patch_file("b.txt", vec![removed(7, "cc"), added(7, "cc;")]),
            ],
        )];

        let suggestions = get_suggestions(&bases, &patches, &[]);
        let posted = eligible(&suggestions);

        assert_eq!(posted.len(), 2);
        assert_eq!(posted[0].path, "a.txt");
        assert_eq!(posted[1].path, "b.txt");
    }

    #[test]
    fn test_description_strips_subject_prefixes() {
        assert_eq!(strip_subject_prefix("[PATCH] Fix style"), "Fix style");
        assert_eq!(strip_subject_prefix("[PATCH 2/5] Fix style"), "Fix style");
        assert_eq!(strip_subject_prefix("Fix style"), "Fix style");
        assert_eq!(strip_subject_prefix(""), "");
    }

    #[test]
    fn test_description_absent_message() {
        let mut patch = mailbox_patch(
            "ignored",
            vec![patch_file("a.txt", vec![removed(1, "x"), added(1, "y")])],
        );
        patch.message = None;

        let bases = vec![mailbox_patch(
            "Base",
            vec![patch_file("a.txt", vec![added(1, "y")])],
        )];

        let suggestions = get_suggestions(&bases, &[patch], &[]);
        assert_eq!(suggestions[0].description, "");
    }

    #[test]
    fn test_suggest_end_to_end() {
        let files = vec![PullRequestFile {
            filename: "src/compare.js".to_string(),
            patch: Some("@@ -10,2 +10,3 @@ module.exports\n context\n+  return a == b;\n more".to_string()),
        }];

        let patch_text = "\
From 1234abcd Mon Sep 17 00:00:00 2001
From: Restyler <bot@example.com>
Date: Sat, 1 Jun 2024 12:00:00 +0000
Subject: [PATCH] Restyled by prettier

diff --git a/src/compare.js b/src/compare.js
index 1111111..2222222 100644
--- a/src/compare.js
+++ b/src/compare.js
@@ -11,1 +11,1 @@
-  return a == b;
+  return a === b;
";

        let suggestions = suggest(&files, &[], patch_text);

        assert_eq!(suggestions.len(), 1);
        let suggestion = &suggestions[0];
        assert!(suggestion.postable(), "skipped: {:?}", suggestion.skip_reason);
        assert_eq!(suggestion.path, "src/compare.js");
        assert_eq!(suggestion.start_line, 11);
        assert_eq!(suggestion.end_line, 11);
        assert_eq!(suggestion.code, vec!["  return a === b;".to_string()]);
        assert_eq!(suggestion.description, "Restyled by prettier");
    }

    #[test]
    fn test_suggest_with_unparseable_restyle_output() {
        let files = vec![PullRequestFile {
            filename: "a.txt".to_string(),
            patch: Some("@@ -1,1 +1,2 @@\n keep\n+added".to_string()),
        }];

        assert!(suggest(&files, &[], "complete nonsense").is_empty());
    }
}
