//! `critlink build`: extract relationships and write the link artifact.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use critlink_core::artifact::{self, LinkArtifact, content_hash};
use critlink_core::config::ProjectConfig;
use critlink_core::extract::{ExtractOptions, extract_relationships, read_source_text};
use critlink_core::pipeline::{PipelineStats, process};
use critlink_core::universe::load_universe;
use serde::Serialize;
use tracing::info;

use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};

/// Arguments for `critlink build`.
#[derive(Args, Debug, Default)]
pub struct BuildArgs {
    /// Configuration tree JSON (defaults to `[extract] config_tree`).
    #[arg(long)]
    pub config_tree: Option<PathBuf>,

    /// Extracted document text (defaults to `[extract] text`).
    #[arg(long)]
    pub text: Option<PathBuf>,

    /// Artifact to write (defaults to `[extract] out`).
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Minimum statement length after a leading code for a target line.
    #[arg(long)]
    pub min_statement_len: Option<usize>,

    /// Compute the artifact without writing it.
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum BuildStatus {
    Written,
    Unchanged,
    WouldWrite,
}

impl BuildStatus {
    const fn label(self) -> &'static str {
        match self {
            Self::Written => "written",
            Self::Unchanged => "unchanged",
            Self::WouldWrite => "would write",
        }
    }
}

#[derive(Debug, Serialize)]
struct BuildOutput {
    out: PathBuf,
    status: BuildStatus,
    universe: usize,
    relationships: usize,
    records: usize,
    links: usize,
    hash: String,
    stats: PipelineStats,
}

struct Inputs {
    config_tree: PathBuf,
    text: PathBuf,
    out: PathBuf,
    options: ExtractOptions,
}

fn resolve_inputs(args: &BuildArgs, config: &ProjectConfig, project_root: &Path) -> Inputs {
    let pick = |flag: Option<&PathBuf>, configured: &PathBuf| {
        flag.map_or_else(|| configured.clone(), |p| project_root.join(p))
    };
    let mut options = config.extract.options();
    if let Some(len) = args.min_statement_len {
        options.min_statement_len = len;
    }

    Inputs {
        config_tree: pick(args.config_tree.as_ref(), &config.extract.config_tree),
        text: pick(args.text.as_ref(), &config.extract.text),
        out: pick(args.out.as_ref(), &config.extract.out),
        options,
    }
}

/// Execute `critlink build`.
pub fn run_build(
    args: &BuildArgs,
    config: &ProjectConfig,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<()> {
    let inputs = resolve_inputs(args, config, project_root);

    let universe = load_universe(&inputs.config_tree)?;
    let text = read_source_text(&inputs.text)?;
    let relationships = extract_relationships(&text, &universe, inputs.options);
    info!(pairs = relationships.len(), "extracted relationships");

    let processed = process(&relationships, &universe)?;
    let built = processed.artifact();
    let bytes = built.to_bytes()?;
    let hash = content_hash(&bytes);

    let previous = artifact::load(&inputs.out)
        .with_context(|| format!("reading existing artifact {}", inputs.out.display()))?;
    let unchanged = previous.is_some_and(|loaded| content_hash(&loaded.bytes) == hash);

    let status = if unchanged {
        BuildStatus::Unchanged
    } else if args.dry_run {
        BuildStatus::WouldWrite
    } else {
        artifact::write_atomic(&inputs.out, &bytes)?;
        BuildStatus::Written
    };

    let payload = BuildOutput {
        out: inputs.out,
        status,
        universe: universe.len(),
        relationships: relationships.len(),
        records: built.len(),
        links: link_count(&built),
        hash,
        stats: processed.stats,
    };

    render_mode(output, &payload, render_build_text, render_build_pretty)
}

fn link_count(artifact: &LinkArtifact) -> usize {
    artifact.records.iter().map(|r| r.linked_criteria.len()).sum()
}

fn render_build_text(payload: &BuildOutput, w: &mut dyn Write) -> std::io::Result<()> {
    writeln!(
        w,
        "{}  {}  records={} links={} back_references={}",
        payload.status.label(),
        payload.out.display(),
        payload.records,
        payload.links,
        payload.stats.tagging.back_references
    )
}

fn render_build_pretty(payload: &BuildOutput, w: &mut dyn Write) -> std::io::Result<()> {
    pretty_section(w, "Link artifact")?;
    pretty_kv(w, "path", payload.out.display().to_string())?;
    pretty_kv(w, "status", payload.status.label())?;
    pretty_kv(w, "hash", &payload.hash)?;
    pretty_kv(w, "universe", payload.universe.to_string())?;
    pretty_kv(w, "relationships", payload.relationships.to_string())?;
    pretty_kv(w, "records", payload.records.to_string())?;
    pretty_kv(w, "links", payload.links.to_string())?;

    let breaking = &payload.stats.breaking;
    writeln!(w)?;
    pretty_section(w, "Cycle breaking")?;
    pretty_kv(w, "mutual edges", breaking.mutual_edges.to_string())?;
    pretty_kv(w, "demoted", breaking.demoted.to_string())?;
    pretty_kv(w, "dropped ties", breaking.dropped_ties.to_string())?;
    pretty_kv(
        w,
        "back-references",
        payload.stats.tagging.back_references.to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        args: BuildArgs,
    }

    #[test]
    fn build_args_parse_overrides() {
        let parsed = Wrapper::parse_from([
            "test",
            "--text",
            "t.txt",
            "--min-statement-len",
            "3",
            "--dry-run",
        ]);
        assert_eq!(parsed.args.text, Some(PathBuf::from("t.txt")));
        assert_eq!(parsed.args.min_statement_len, Some(3));
        assert!(parsed.args.dry_run);
    }

    #[test]
    fn flags_override_config_and_resolve_against_root() {
        let root = Path::new("/proj");
        let config = ProjectConfig::default().resolve_paths(root);
        let args = BuildArgs {
            out: Some(PathBuf::from("out/links.json")),
            min_statement_len: Some(2),
            ..BuildArgs::default()
        };

        let inputs = resolve_inputs(&args, &config, root);
        assert_eq!(inputs.out, PathBuf::from("/proj/out/links.json"));
        assert_eq!(inputs.text, PathBuf::from("/proj/Matrix/extracted_text.txt"));
        assert_eq!(inputs.options.min_statement_len, 2);
    }

    #[test]
    fn text_render_is_one_line() {
        let payload = BuildOutput {
            out: PathBuf::from("links.json"),
            status: BuildStatus::WouldWrite,
            universe: 4,
            relationships: 3,
            records: 2,
            links: 2,
            hash: "blake3:00".to_string(),
            stats: PipelineStats::default(),
        };
        let mut buf = Vec::new();
        render_build_text(&payload, &mut buf).expect("render");
        let text = String::from_utf8(buf).expect("utf8");
        assert_eq!(text.lines().count(), 1);
        assert!(text.starts_with("would write  links.json"));
    }
}
