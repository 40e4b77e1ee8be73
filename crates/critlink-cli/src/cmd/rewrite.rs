//! `critlink rewrite`: re-run breaking and tagging over existing artifacts.

use std::io::Write;
use std::path::{Path, PathBuf};

use clap::Args;
use critlink_core::config::ProjectConfig;
use critlink_core::rewrite::{RewriteOptions, RewriteOutcome, RewriteStatus, rewrite_all};
use serde::Serialize;

use crate::cmd::artifact_paths;
use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};

/// Arguments for `critlink rewrite`.
#[derive(Args, Debug, Default)]
pub struct RewriteArgs {
    /// Artifacts to rewrite (defaults to `[artifacts] paths`).
    pub paths: Vec<PathBuf>,

    /// Report what would change without writing.
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Serialize)]
struct RewriteOutput {
    dry_run: bool,
    artifacts: Vec<RewriteOutcome>,
}

/// Execute `critlink rewrite`.
pub fn run_rewrite(
    args: &RewriteArgs,
    config: &ProjectConfig,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<()> {
    let paths = artifact_paths(&args.paths, &config.artifacts.paths, project_root);
    let artifacts = rewrite_all(
        &paths,
        RewriteOptions {
            dry_run: args.dry_run,
        },
    )?;

    let payload = RewriteOutput {
        dry_run: args.dry_run,
        artifacts,
    };
    render_mode(output, &payload, render_rewrite_text, render_rewrite_pretty)
}

fn render_rewrite_text(payload: &RewriteOutput, w: &mut dyn Write) -> std::io::Result<()> {
    for outcome in &payload.artifacts {
        writeln!(
            w,
            "{}  {}  records={} links={}",
            outcome.status,
            outcome.path.display(),
            outcome.records,
            outcome.links
        )?;
    }
    Ok(())
}

fn render_rewrite_pretty(payload: &RewriteOutput, w: &mut dyn Write) -> std::io::Result<()> {
    let heading = if payload.dry_run {
        "Rewrite (dry run)"
    } else {
        "Rewrite"
    };
    pretty_section(w, heading)?;

    if payload.artifacts.is_empty() {
        return writeln!(w, "No artifact paths configured.");
    }

    for outcome in &payload.artifacts {
        writeln!(w, "{}", outcome.path.display())?;
        pretty_kv(w, "status", outcome.status.to_string())?;
        if outcome.status == RewriteStatus::Skipped {
            continue;
        }
        pretty_kv(w, "records", outcome.records.to_string())?;
        pretty_kv(w, "links", outcome.links.to_string())?;
        if let Some(stats) = &outcome.stats {
            pretty_kv(w, "self-edges", stats.self_edges.to_string())?;
            pretty_kv(w, "demoted", stats.breaking.demoted.to_string())?;
            pretty_kv(w, "dropped ties", stats.breaking.dropped_ties.to_string())?;
            pretty_kv(w, "retagged", stats.tagging.retagged.to_string())?;
        }
    }
    Ok(())
}
