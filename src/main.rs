use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use resuggest::github;
use resuggest::outputs::Outputs;
use resuggest::process::{read_process, run_process};
use resuggest::suggestions::{suggest, Suggestion};

/// Exit code a restyler uses to report "fixes were needed" under
/// --fail-on-differences.
const DIFFERENCES_EXIT_CODE: i32 = 228;

#[derive(Parser, Debug)]
#[command(name = "resuggest")]
#[command(about = "Run a restyler against a pull request and post its fixes as review suggestions")]
#[command(version)]
struct Args {
    /// Repository (owner/repo); detected via gh from the current directory
    /// when omitted
    #[arg(short, long)]
    repo: Option<String>,

    /// Pull request number
    #[arg(short, long)]
    pr: u32,

    /// Paths to restyle (defaults to the PR's changed files)
    #[arg(long)]
    paths: Vec<String>,

    /// Restyler executable to invoke
    #[arg(long, default_value = "restyle")]
    restyler: String,

    /// Print the produced patch
    #[arg(long)]
    show_patch: bool,

    /// Print a copy-paste command that applies the patch locally
    #[arg(long)]
    show_patch_command: bool,

    /// Committer email for restyle commits
    #[arg(long, default_value = "commits@restyled.io")]
    committer_email: String,

    /// Committer name for restyle commits
    #[arg(long, default_value = "Restyled.io")]
    committer_name: String,

    /// Pass --debug to the restyler
    #[arg(long)]
    debug: bool,

    /// Derive suggestions without posting or deleting any comments; print
    /// them as JSON instead (also passed to the restyler as --dry-run)
    #[arg(long)]
    dry_run: bool,

    /// Treat restyler exit code 228 as "differences found"
    #[arg(long)]
    fail_on_differences: bool,

    /// Pass --image-cleanup to the restyler
    #[arg(long)]
    image_cleanup: bool,

    /// Restyler manifest path
    #[arg(long)]
    manifest: Option<String>,

    /// Pass --no-commit to the restyler
    #[arg(long)]
    no_commit: bool,

    /// Pass --no-pull to the restyler
    #[arg(long)]
    no_pull: bool,

    /// Skip leaving review suggestions entirely
    #[arg(long)]
    no_suggestions: bool,

    /// Maximum number of suggestions to post per run
    #[arg(long)]
    suggestions_limit: Option<usize>,
}

impl Args {
    fn restyler_args(&self, paths: &[String]) -> Vec<String> {
        let mut args = Vec::new();

        if self.debug {
            args.push("--debug".to_string());
        }
        if self.fail_on_differences {
            args.push("--fail-on-differences".to_string());
        }
        if self.image_cleanup {
            args.push("--image-cleanup".to_string());
        }
        if let Some(manifest) = &self.manifest {
            args.push("--manifest".to_string());
            args.push(manifest.clone());
        }
        if self.dry_run {
            args.push("--dry-run".to_string());
        }
        if self.no_commit {
            args.push("--no-commit".to_string());
        }
        if self.no_pull {
            args.push("--no-pull".to_string());
        }

        args.extend(paths.iter().cloned());
        args
    }

    fn restyler_env(&self) -> Vec<(&'static str, String)> {
        vec![
            ("GIT_AUTHOR_EMAIL", self.committer_email.clone()),
            ("GIT_AUTHOR_NAME", self.committer_name.clone()),
            ("GIT_COMMITTER_EMAIL", self.committer_email.clone()),
            ("GIT_COMMITTER_NAME", self.committer_name.clone()),
            ("LOG_BREAKPOINT", "200".to_string()),
            ("LOG_COLOR", "always".to_string()),
            ("LOG_CONCURRENCY", "1".to_string()),
        ]
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let repo = match &args.repo {
        Some(repo) => repo.clone(),
        None => github::detect_repo().await?,
    };

    let pr = github::fetch_pr(&repo, args.pr).await?;
    let files = github::fetch_pull_request_files(&repo, args.pr).await?;

    // The diff base is the checked-out HEAD before the restyler commits
    // fixes on top of it.
    let diff_base = read_process("git", &["rev-parse", "HEAD"]).await.ok();

    if let Some(base) = &diff_base {
        if *base != pr.head.sha {
            warn!(
                "The checked out commit does not match the PR head ({} != {}). \
                 Fixes may include changes already on the default branch.",
                base, pr.head.sha
            );
        }
    }

    let restyle_paths: Vec<String> = if args.paths.is_empty() {
        files.iter().map(|f| f.filename.clone()).collect()
    } else {
        args.paths.clone()
    };

    let restyler_args = args.restyler_args(&restyle_paths);
    let arg_refs: Vec<&str> = restyler_args.iter().map(|s| s.as_str()).collect();
    let exit_code = run_process(&args.restyler, &arg_refs, &args.restyler_env()).await?;

    let patch = match &diff_base {
        Some(base) => read_process("git", &["format-patch", "--stdout", base]).await?,
        None => String::new(),
    };

    let success = exit_code == 0 || (args.fail_on_differences && exit_code == DIFFERENCES_EXIT_CODE);
    let differences = if args.fail_on_differences {
        exit_code == DIFFERENCES_EXIT_CODE
    } else {
        exit_code == 0 && !patch.is_empty()
    };

    if args.show_patch && differences {
        info!("Restyling made the following fixes:");
        println!("{}", patch);
    }

    if args.show_patch_command && differences {
        info!("To apply these commits locally, run the following:");
        println!("{{ base64 -d - | git am; }} <<'EOM'");
        println!("{}", format_base64(&patch));
        println!("EOM");
    }

    let mut suggestions_skipped = false;

    if !args.no_suggestions && success {
        let resolved = if args.dry_run {
            Vec::new()
        } else {
            github::clear_prior_suggestions(&repo, args.pr).await?
        };

        if differences {
            let mut eligible: Vec<Suggestion> = Vec::new();

            for suggestion in suggest(&files, &resolved, &patch) {
                let limit_reached = args
                    .suggestions_limit
                    .map_or(false, |limit| eligible.len() >= limit);

                let skip_reason = suggestion
                    .skip_reason
                    .clone()
                    .or_else(|| limit_reached.then(|| "limit reached".to_string()));

                match skip_reason {
                    Some(reason) => {
                        warn!(
                            "[{}:{}]: Skipping suggestion: {}",
                            suggestion.path,
                            format_lines(&suggestion),
                            reason
                        );
                        suggestions_skipped = true;
                    }
                    None => eligible.push(suggestion),
                }
            }

            info!("Leaving {} suggestion(s)", eligible.len());

            if args.dry_run {
                println!("{}", serde_json::to_string_pretty(&eligible)?);
            } else {
                for suggestion in &eligible {
                    github::comment_suggestion(&repo, args.pr, &pr.head.sha, suggestion).await?;
                }
            }
        }
    }

    let outputs = Outputs {
        success,
        differences,
        git_patch: patch,
        restyled_base: pr.head.ref_name.clone(),
        restyled_head: format!("restyled/{}", pr.head.ref_name),
        restyled_title: format!("Restyled {}", pr.title),
        restyled_body: pull_request_description(pr.number),
        suggestions_skipped,
    };
    outputs.set()?;

    if exit_code != 0 {
        anyhow::bail!("Restyler exited non-zero: {}", exit_code);
    }

    Ok(())
}

fn format_lines(suggestion: &Suggestion) -> String {
    if suggestion.start_line == suggestion.end_line {
        suggestion.start_line.to_string()
    } else {
        format!("{}-{}", suggestion.start_line, suggestion.end_line)
    }
}

fn pull_request_description(number: u32) -> String {
    format!(
        "Automated style fixes for #{}, created by Restyled.\n\
         \n\
         To see which restylers made changes, view the Commits tab.\n\
         \n\
         To incorporate these changes, merge this Pull Request into the original. We\n\
         recommend using the Squash or Rebase strategies.\n\
         \n\
         **NOTE**: As work continues on the original Pull Request, this process will\n\
         re-run and update (force-push) this Pull Request with updated style fixes as\n\
         necessary. If the style is fixed manually at any point (i.e. this process finds\n\
         no fixes to make), this Pull Request will be closed automatically.\n",
        number
    )
}

// Outputs as multiple lines of 76 characters, like `base64` itself emits.
fn format_base64(patch: &str) -> String {
    let encoded = base64_encode(patch.as_bytes());

    encoded
        .as_bytes()
        .chunks(76)
        .map(|chunk| std::str::from_utf8(chunk).unwrap_or_default())
        .collect::<Vec<_>>()
        .join("\n")
}

fn base64_encode(input: &[u8]) -> String {
    const TABLE: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
    let mut output = String::with_capacity(input.len().div_ceil(3) * 4);
    let mut index = 0usize;

    while index < input.len() {
        let a = input[index];
        let b = input.get(index + 1).copied();
        let c = input.get(index + 2).copied();

        let n = (u32::from(a) << 16) | (u32::from(b.unwrap_or(0)) << 8) | u32::from(c.unwrap_or(0));
        output.push(TABLE[((n >> 18) & 0x3f) as usize] as char);
        output.push(TABLE[((n >> 12) & 0x3f) as usize] as char);
        output.push(b.map_or('=', |_| TABLE[((n >> 6) & 0x3f) as usize] as char));
        output.push(c.map_or('=', |_| TABLE[(n & 0x3f) as usize] as char));

        index += 3;
    }

    output
}
