//! Parser for git patches and unified diffs.
//!
//! Accepts `git format-patch` mailbox output (single or concatenated) or a
//! bare `diff --git` body, and reconstructs each file's added, removed, and
//! context lines with explicit pre- and post-image line numbers.
//!
//! Parsing is lenient: a file or hunk with an unrecognizable header is
//! skipped and the rest of the patch still parses. Only mailbox metadata is
//! all-or-nothing, since a `From `-framed patch without intact headers is
//! suspect input rather than a partially valid one.

use tracing::warn;

/// One line of a file's diff, with its `+`/`-`/` ` marker stripped.
///
/// Line numbers are 1-based. Added lines are numbered in the post-image,
/// removed lines in the pre-image, and context lines in both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchLine {
    Added {
        added_line_number: u32,
        line: String,
    },
    Removed {
        removed_line_number: u32,
        line: String,
    },
    Context {
        added_line_number: u32,
        removed_line_number: u32,
        line: String,
    },
}

impl PatchLine {
    /// The line text without its diff marker.
    pub fn text(&self) -> &str {
        match self {
            PatchLine::Added { line, .. }
            | PatchLine::Removed { line, .. }
            | PatchLine::Context { line, .. } => line,
        }
    }
}

/// A single file's changes within a patch.
///
/// `added`/`deleted` reflect whole-file creation or removal from the
/// file-mode headers, independent of which lines are present. Renames carry
/// differing names and, for pure renames, no modified lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchFile {
    pub added: bool,
    pub deleted: bool,
    pub before_name: String,
    pub after_name: String,
    pub modified_lines: Vec<PatchLine>,
}

/// A parsed patch: optional mailbox metadata plus per-file changes.
///
/// Metadata is present only when the input carried mailbox headers; a bare
/// diff parses to a `Patch` with only `files` populated.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Patch {
    pub hash: Option<String>,
    pub author_name: Option<String>,
    pub author_email: Option<String>,
    pub date: Option<String>,
    pub message: Option<String>,
    pub files: Vec<PatchFile>,
}

/// Result of parsing multi-patch input: the patches that parsed, plus how
/// many `From `-delimited segments were dropped as unparseable.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedPatches {
    pub patches: Vec<Patch>,
    pub dropped: usize,
}

/// Split `input` on mailbox `From ` markers and parse each segment.
///
/// Segments that fail to parse are dropped (multi-patch output routinely
/// ends in boilerplate); the drop count is reported so callers can notice
/// wholesale failures. Text before the first `From ` line is not a segment.
pub fn parse_patches(input: &str) -> ParsedPatches {
    let lines: Vec<&str> = input.split('\n').collect();
    let mut result = ParsedPatches::default();

    for segment in split_on_prefix(&lines, "From ") {
        match parse_patch(&segment.join("\n")) {
            Some(patch) => result.patches.push(patch),
            None => {
                warn!("Dropping unparseable patch segment");
                result.dropped += 1;
            }
        }
    }

    result
}

/// Parse one patch, either mailbox-format or a bare diff.
///
/// Returns `None` when the input opens like a mailbox patch but its headers
/// do not parse. A recognizable input with no parseable files yields a
/// `Patch` with empty `files`.
pub fn parse_patch(input: &str) -> Option<Patch> {
    let lines: Vec<&str> = input.split('\n').collect();

    let (meta, body) = if input.starts_with("From") {
        (parse_meta(&lines)?, &lines[4..])
    } else {
        (Patch::default(), &lines[..])
    };

    let files = parse_diff(body);

    Some(Patch { files, ..meta })
}

/// Consume the four mailbox header lines: hash, author, date, subject.
fn parse_meta(lines: &[&str]) -> Option<Patch> {
    let hash = lines
        .first()?
        .strip_prefix("From ")?
        .split_whitespace()
        .next()?
        .to_string();

    let author = lines.get(1)?.strip_prefix("From:")?.trim();
    let (author_name, author_email) = match (author.find('<'), author.rfind('>')) {
        (Some(lt), Some(gt)) if lt < gt => {
            let name = author[..lt].trim();
            let email = &author[lt + 1..gt];
            (
                (!name.is_empty()).then(|| name.to_string()),
                Some(email.to_string()),
            )
        }
        _ => ((!author.is_empty()).then(|| author.to_string()), None),
    };

    let date = lines.get(2)?.strip_prefix("Date: ")?.to_string();
    let message = lines.get(3)?.strip_prefix("Subject: ")?.to_string();

    Some(Patch {
        hash: Some(hash),
        author_name,
        author_email,
        date: Some(date),
        message: Some(message),
        files: Vec::new(),
    })
}

/// Split the diff body on `diff --git` markers and parse each file.
fn parse_diff(lines: &[&str]) -> Vec<PatchFile> {
    let mut files = Vec::new();

    for segment in split_on_prefix(lines, "diff --git") {
        let Some((header, rest)) = segment.split_first() else {
            continue;
        };

        let Some((before_name, after_name)) = parse_file_header(header) else {
            warn!("Skipping file with unrecognized diff header: {}", header);
            continue;
        };

        let Some((meta_line, rest)) = rest.split_first() else {
            continue;
        };

        let mut file = PatchFile {
            added: meta_line.starts_with("new file mode "),
            deleted: meta_line.starts_with("deleted file mode "),
            before_name,
            after_name,
            modified_lines: Vec::new(),
        };

        // A pure rename carries no content hunks.
        if !meta_line.starts_with("similarity index ") {
            parse_hunks(rest, &mut file);
        }

        files.push(file);
    }

    files
}

/// `diff --git "?a/<before>"? "?b/<after>"?`, quoting optional on either
/// side.
fn parse_file_header(line: &str) -> Option<(String, String)> {
    let rest = line.strip_prefix("diff --git ")?;

    let at = match rest.rfind(" \"b/") {
        Some(at) => at,
        None => rest.rfind(" b/")?,
    };

    let before = rest[..at].trim().trim_matches('"').strip_prefix("a/")?;
    let after = rest[at + 1..].trim().trim_matches('"').strip_prefix("b/")?;

    Some((before.trim().to_string(), after.trim().to_string()))
}

/// Split a file segment on `@@ ` hunk headers and walk each hunk's lines,
/// numbering from the header's pre- and post-image start positions.
fn parse_hunks(lines: &[&str], file: &mut PatchFile) {
    for hunk in split_on_prefix(lines, "@@ ") {
        let Some((header, body)) = hunk.split_first() else {
            continue;
        };

        let Some((mut removed_line, mut added_line)) = parse_hunk_header(header) else {
            warn!("Skipping hunk with unrecognized header: {}", header);
            continue;
        };

        for line in body {
            // The mailbox signature trailer ends diff content.
            if *line == "-- " {
                break;
            }

            if let Some(text) = line.strip_prefix('+') {
                file.modified_lines.push(PatchLine::Added {
                    added_line_number: added_line,
                    line: text.to_string(),
                });
                added_line += 1;
            } else if let Some(text) = line.strip_prefix('-') {
                file.modified_lines.push(PatchLine::Removed {
                    removed_line_number: removed_line,
                    line: text.to_string(),
                });
                removed_line += 1;
            } else if let Some(text) = line.strip_prefix(' ') {
                file.modified_lines.push(PatchLine::Context {
                    added_line_number: added_line,
                    removed_line_number: removed_line,
                    line: text.to_string(),
                });
                removed_line += 1;
                added_line += 1;
            }
            // Anything else ("\ No newline at end of file", stray text) is
            // not diff content and is ignored.
        }
    }
}

/// Parse `@@ -<pre>[,<len>] +<post>[,<len>] @@ ...` into (pre, post).
fn parse_hunk_header(line: &str) -> Option<(u32, u32)> {
    let rest = line.strip_prefix("@@ -")?;
    let pre = leading_number(rest)?;
    let plus = rest.find(" +")?;
    let post = leading_number(&rest[plus + 2..])?;

    Some((pre, post))
}

fn leading_number(s: &str) -> Option<u32> {
    let end = s
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(s.len());
    s[..end].parse().ok()
}

/// Split into runs, each beginning with a line that starts with `prefix`.
/// Lines before the first marker are discarded.
fn split_on_prefix<'a>(lines: &[&'a str], prefix: &str) -> Vec<Vec<&'a str>> {
    let mut parts: Vec<Vec<&'a str>> = Vec::new();

    for &line in lines {
        if line.starts_with(prefix) {
            parts.push(vec![line]);
        } else if let Some(part) = parts.last_mut() {
            part.push(line);
        }
    }

    parts
}
