//! `critlink check`: audit artifacts without modifying them.

use std::io::Write;
use std::path::{Path, PathBuf};

use clap::Args;
use critlink_core::artifact;
use critlink_core::config::ProjectConfig;
use critlink_core::graph::VerifyReport;
use critlink_core::graph::verify::verify_artifact;
use serde::Serialize;

use crate::cmd::artifact_paths;
use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};

/// Arguments for `critlink check`.
#[derive(Args, Debug, Default)]
pub struct CheckArgs {
    /// Artifacts to check (defaults to `[artifacts] paths`).
    pub paths: Vec<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Clean,
    Dirty,
    Missing,
}

#[derive(Debug, Serialize)]
struct CheckEntry {
    path: PathBuf,
    status: CheckStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<VerifyReport>,
}

#[derive(Debug, Serialize)]
struct CheckOutput {
    clean: bool,
    artifacts: Vec<CheckEntry>,
}

/// Execute `critlink check`.
///
/// Fails when any present artifact is not clean; missing artifacts are
/// reported but do not fail the check.
pub fn run_check(
    args: &CheckArgs,
    config: &ProjectConfig,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<()> {
    let paths = artifact_paths(&args.paths, &config.artifacts.paths, project_root);

    let mut artifacts = Vec::with_capacity(paths.len());
    for path in paths {
        let entry = match artifact::load(&path)? {
            None => CheckEntry {
                path,
                status: CheckStatus::Missing,
                report: None,
            },
            Some(loaded) => {
                let report = verify_artifact(&loaded.artifact, &loaded.bytes)?;
                let status = if report.is_clean() {
                    CheckStatus::Clean
                } else {
                    CheckStatus::Dirty
                };
                CheckEntry {
                    path,
                    status,
                    report: Some(report),
                }
            }
        };
        artifacts.push(entry);
    }

    let dirty = artifacts
        .iter()
        .filter(|a| a.status == CheckStatus::Dirty)
        .count();
    let payload = CheckOutput {
        clean: dirty == 0,
        artifacts,
    };
    render_mode(output, &payload, render_check_text, render_check_pretty)?;

    if dirty > 0 {
        anyhow::bail!("{dirty} artifact(s) failed verification; run `critlink rewrite` to fix");
    }
    Ok(())
}

fn status_label(status: CheckStatus) -> &'static str {
    match status {
        CheckStatus::Clean => "clean",
        CheckStatus::Dirty => "dirty",
        CheckStatus::Missing => "missing",
    }
}

fn render_check_text(payload: &CheckOutput, w: &mut dyn Write) -> std::io::Result<()> {
    for entry in &payload.artifacts {
        let issues = entry.report.as_ref().map_or(0, VerifyReport::issue_count);
        writeln!(
            w,
            "{}  {}  issues={issues}",
            status_label(entry.status),
            entry.path.display()
        )?;
    }
    Ok(())
}

fn render_check_pretty(payload: &CheckOutput, w: &mut dyn Write) -> std::io::Result<()> {
    pretty_section(w, "Link artifact check")?;

    for entry in &payload.artifacts {
        writeln!(w, "{}", entry.path.display())?;
        pretty_kv(w, "status", status_label(entry.status))?;
        let Some(report) = &entry.report else {
            continue;
        };
        pretty_kv(w, "records", report.records.to_string())?;
        pretty_kv(w, "links", report.links.to_string())?;
        if report.is_clean() {
            continue;
        }

        for issue in &report.self_edges {
            writeln!(w, "    self-edge       {} -> {}", issue.criteria, issue.link)?;
        }
        for (lower, higher) in &report.mutual_pairs {
            writeln!(w, "    mutual          {lower} <-> {higher}")?;
        }
        for issue in &report.missing_tags {
            writeln!(w, "    missing tag     {} -> {}", issue.criteria, issue.link)?;
        }
        for issue in &report.spurious_tags {
            writeln!(w, "    spurious tag    {} -> {}", issue.criteria, issue.link)?;
        }
        for issue in &report.tag_mismatches {
            writeln!(w, "    tag mismatch    {} -> {}", issue.criteria, issue.link)?;
        }
        for code in &report.out_of_order {
            writeln!(w, "    out of order    {code}")?;
        }
        for cycle in &report.forward_cycles {
            writeln!(w, "    forward cycle   {}", cycle.join(" -> "))?;
        }
        if report.rewrite_pending {
            writeln!(w, "    rewrite pending")?;
        }
    }
    Ok(())
}
