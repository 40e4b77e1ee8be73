//! Idempotent artifact rewriting.
//!
//! A persisted artifact is read back into a link graph, run through the
//! same break and tag passes as a fresh build, and written out again.
//! Output of a rewrite is a fixed point: rewriting it again yields the same
//! bytes, so the file is left alone on disk.
//!
//! [`rewrite_all`] prepares every path before writing any of them; an error
//! on one artifact aborts the run with nothing written.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, instrument};

use crate::artifact::{self, LinkArtifact, content_hash};
use crate::error::LinkError;
use crate::pipeline::{PipelineStats, process_graph};

/// What happened to one artifact path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RewriteStatus {
    /// The file does not exist.
    Skipped,
    /// The rewrite produced identical bytes.
    Unchanged,
    /// The file was replaced.
    Rewritten,
    /// Dry run: the file would be replaced.
    WouldRewrite,
}

impl fmt::Display for RewriteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Skipped => "skipped",
            Self::Unchanged => "unchanged",
            Self::Rewritten => "rewritten",
            Self::WouldRewrite => "would rewrite",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewriteOptions {
    /// Compute outcomes without touching the filesystem.
    pub dry_run: bool,
}

/// Per-path result of [`rewrite_file`] / [`rewrite_all`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RewriteOutcome {
    pub path: PathBuf,
    pub status: RewriteStatus,
    pub records: usize,
    pub links: usize,
    /// Hash of the bytes now (or, on a dry run, that would be) on disk.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<PipelineStats>,
}

impl RewriteOutcome {
    fn skipped(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            status: RewriteStatus::Skipped,
            records: 0,
            links: 0,
            hash: None,
            stats: None,
        }
    }
}

/// A rewritten artifact held in memory.
#[derive(Debug, Clone)]
pub struct Rewritten {
    pub artifact: LinkArtifact,
    pub bytes: Vec<u8>,
    pub stats: PipelineStats,
}

/// Rewrite `artifact` in memory.
///
/// Every input record is kept (repeated codes are merged) and extra record
/// fields carry over.
///
/// # Errors
///
/// Returns [`LinkError::StructuralViolation`] if breaking fails to remove a
/// mutual pair, or [`LinkError::Serialize`] if the output cannot be encoded.
pub fn rewrite_artifact(artifact: &LinkArtifact) -> Result<Rewritten, LinkError> {
    let processed = process_graph(&artifact.to_graph())?;
    let mut out = processed.artifact();
    out.carry_extra_fields(artifact);
    let bytes = out.to_bytes()?;

    Ok(Rewritten {
        artifact: out,
        bytes,
        stats: processed.stats,
    })
}

struct Prepared {
    path: PathBuf,
    changed: bool,
    rewritten: Rewritten,
}

fn prepare(path: &Path) -> Result<Option<Prepared>, LinkError> {
    let Some(loaded) = artifact::load(path)? else {
        return Ok(None);
    };
    let rewritten = rewrite_artifact(&loaded.artifact)?;
    let changed = content_hash(&loaded.bytes) != content_hash(&rewritten.bytes);

    Ok(Some(Prepared {
        path: path.to_path_buf(),
        changed,
        rewritten,
    }))
}

fn commit(prepared: Prepared, options: RewriteOptions) -> Result<RewriteOutcome, LinkError> {
    let status = match (prepared.changed, options.dry_run) {
        (false, _) => RewriteStatus::Unchanged,
        (true, true) => RewriteStatus::WouldRewrite,
        (true, false) => {
            artifact::write_atomic(&prepared.path, &prepared.rewritten.bytes)?;
            RewriteStatus::Rewritten
        }
    };

    let out = &prepared.rewritten;
    info!(path = %prepared.path.display(), %status, "rewrite finished");

    Ok(RewriteOutcome {
        records: out.artifact.len(),
        links: out.artifact.records.iter().map(|r| r.linked_criteria.len()).sum(),
        hash: Some(content_hash(&out.bytes)),
        stats: Some(out.stats),
        status,
        path: prepared.path,
    })
}

/// Rewrite the artifact at `path`.
///
/// A missing file is [`RewriteStatus::Skipped`]; a file whose rewrite is
/// byte-identical is [`RewriteStatus::Unchanged`] and not written.
///
/// # Errors
///
/// Returns [`LinkError`] if the file cannot be read, parsed, processed, or
/// written. On a write error the previous file is left in place.
#[instrument(skip(options))]
pub fn rewrite_file(path: &Path, options: RewriteOptions) -> Result<RewriteOutcome, LinkError> {
    match prepare(path)? {
        Some(prepared) => commit(prepared, options),
        None => Ok(RewriteOutcome::skipped(path)),
    }
}

/// Rewrite every path in order.
///
/// All artifacts are read and processed before the first write, so a bad
/// artifact anywhere in the list leaves every file untouched.
///
/// # Errors
///
/// Returns the first error encountered.
pub fn rewrite_all<P: AsRef<Path>>(
    paths: &[P],
    options: RewriteOptions,
) -> Result<Vec<RewriteOutcome>, LinkError> {
    let prepared = paths
        .iter()
        .map(|p| prepare(p.as_ref()).map(|prep| (p.as_ref(), prep)))
        .collect::<Result<Vec<_>, _>>()?;

    prepared
        .into_iter()
        .map(|(path, prep)| match prep {
            Some(prep) => commit(prep, options),
            None => Ok(RewriteOutcome::skipped(path)),
        })
        .collect()
}
