//! The persisted link artifact.
//!
//! # Format
//!
//! A JSON array of records, sorted by criterion code under the hierarchical
//! order, indented with four spaces:
//!
//! ```json
//! [
//!     {
//!         "criteria": "1.2.1.2",
//!         "linked_criteria": [
//!             "1.2.5.1"
//!         ]
//!     },
//!     {
//!         "criteria": "1.2.5.1",
//!         "linked_criteria": [
//!             "1.2.1.2-root(1.2.1.2)"
//!         ]
//!     }
//! ]
//! ```
//!
//! Links are bare codes (forward edges) or `<code>-root(<code>)` tags
//! (back-references). Fields other than `criteria` and `linked_criteria`
//! are carried through untouched, except the legacy `root` list, which is
//! dropped because it is derived data.
//!
//! # Atomic writes
//!
//! [`write_atomic`] writes `<file>.tmp` next to the target and renames it
//! into place, so readers never observe a half-written artifact.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;
use tracing::{debug, info, warn};

use crate::code::cmp_total;
use crate::edge::Edge;
use crate::error::LinkError;
use crate::graph::assemble::{Criterion, LinkGraph};

/// Legacy per-record key holding the reverse relation.
const LEGACY_ROOT_KEY: &str = "root";

/// One criterion's entry in the artifact.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkRecord {
    #[serde(default)]
    pub criteria: String,
    #[serde(default)]
    pub linked_criteria: Vec<String>,
    /// Any other keys present in the source record.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl LinkRecord {
    #[must_use]
    pub fn new(criteria: impl Into<String>, linked_criteria: Vec<String>) -> Self {
        Self {
            criteria: criteria.into(),
            linked_criteria,
            extra: serde_json::Map::new(),
        }
    }
}

/// An ordered list of [`LinkRecord`]s.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkArtifact {
    pub records: Vec<LinkRecord>,
}

impl LinkArtifact {
    /// Parse artifact JSON. `path` is only used for error messages.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::MalformedArtifact`] if `bytes` is not a JSON
    /// array of records.
    pub fn from_json(bytes: &[u8], path: &Path) -> Result<Self, LinkError> {
        let records: Vec<LinkRecord> =
            serde_json::from_slice(bytes).map_err(|e| LinkError::MalformedArtifact {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        Ok(Self { records })
    }

    /// Serialize with four-space indentation and a trailing newline.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::Serialize`] if serialization fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>, LinkError> {
        let mut buf = Vec::new();
        let formatter = PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.records.serialize(&mut ser)?;
        buf.push(b'\n');
        Ok(buf)
    }

    /// Build the artifact for `graph`, sorted for output.
    ///
    /// Records are ordered by code; links within a record by target code,
    /// then by rendered form.
    #[must_use]
    pub fn from_graph(graph: &LinkGraph) -> Self {
        let mut criteria: Vec<&Criterion> = graph.iter().collect();
        criteria.sort_by(|a, b| cmp_total(&a.code, &b.code));

        let records = criteria
            .into_iter()
            .map(|c| {
                let mut edges: Vec<Edge> = c.edges().collect();
                edges.sort_by(|a, b| {
                    cmp_total(&a.target, &b.target).then_with(|| a.render().cmp(&b.render()))
                });
                LinkRecord::new(c.code.clone(), edges.iter().map(Edge::render).collect())
            })
            .collect();

        Self { records }
    }

    /// Rebuild a link graph from the records.
    ///
    /// Codes are normalized, repeated records are merged, and the reverse
    /// (`root`) relation is reconstructed from the outgoing links.
    #[must_use]
    pub fn to_graph(&self) -> LinkGraph {
        let mut graph = LinkGraph::new();
        for record in &self.records {
            if crate::code::normalize(&record.criteria).is_empty() {
                warn!("skipping artifact record without a criterion code");
                continue;
            }
            let criterion = graph.entry(&record.criteria);
            for link in &record.linked_criteria {
                criterion.add_edge(Edge::parse(link));
            }
        }
        graph.rebuild_roots();
        graph
    }

    /// Copy extra fields from `source` onto records with the same code.
    ///
    /// The first record for a code wins; the legacy `root` key is dropped.
    pub fn carry_extra_fields(&mut self, source: &Self) {
        for record in &mut self.records {
            let code = crate::code::normalize(&record.criteria);
            if let Some(src) = source
                .records
                .iter()
                .find(|r| crate::code::normalize(&r.criteria) == code)
            {
                record.extra = src.extra.clone();
                record.extra.remove(LEGACY_ROOT_KEY);
            }
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// An artifact together with the bytes it was read from.
#[derive(Debug, Clone)]
pub struct Loaded {
    pub artifact: LinkArtifact,
    pub bytes: Vec<u8>,
}

/// Load the artifact at `path`.
///
/// Returns `Ok(None)` if the file does not exist.
///
/// # Errors
///
/// Returns [`LinkError::Read`] for I/O failures other than a missing file,
/// and [`LinkError::MalformedArtifact`] if the content does not parse.
pub fn load(path: &Path) -> Result<Option<Loaded>, LinkError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            info!(path = %path.display(), "artifact not found; skipping");
            return Ok(None);
        }
        Err(source) => {
            return Err(LinkError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let artifact = LinkArtifact::from_json(&bytes, path)?;
    debug!(path = %path.display(), records = artifact.len(), "loaded artifact");
    Ok(Some(Loaded { artifact, bytes }))
}

/// Content hash of serialized artifact bytes (`blake3:<hex>`).
#[must_use]
pub fn content_hash(bytes: &[u8]) -> String {
    format!("blake3:{}", blake3::hash(bytes).to_hex())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(std::ffi::OsStr::to_os_string)
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write `bytes` to `path` via a temporary file and rename.
///
/// On failure the temporary file is removed and any existing artifact at
/// `path` is left as it was.
///
/// # Errors
///
/// Returns [`LinkError::Write`] if any step fails.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), LinkError> {
    let write_err = |source| LinkError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_err)?;
    }

    let tmp = tmp_path(path);
    let result = fs::File::create(&tmp)
        .and_then(|mut file| {
            file.write_all(bytes)?;
            file.sync_all()
        })
        .and_then(|()| fs::rename(&tmp, path));

    if let Err(source) = result {
        let _ = fs::remove_file(&tmp);
        return Err(write_err(source));
    }

    debug!(path = %path.display(), bytes = bytes.len(), "artifact written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::EdgeKind;

    fn sample_graph() -> LinkGraph {
        let mut g = LinkGraph::new();
        g.entry("1.2.5.1").add_edge(Edge::back_reference("1.2.1.2"));
        g.entry("1.2.1.2").add_edge(Edge::forward("1.2.10.1"));
        g.entry("1.2.1.2").add_edge(Edge::forward("1.2.5.1"));
        g
    }

    #[test]
    fn from_graph_sorts_records_and_links_hierarchically() {
        let artifact = LinkArtifact::from_graph(&sample_graph());
        let codes: Vec<&str> = artifact.records.iter().map(|r| r.criteria.as_str()).collect();
        assert_eq!(codes, vec!["1.2.1.2", "1.2.5.1"]);
        assert_eq!(artifact.records[0].linked_criteria, vec!["1.2.5.1", "1.2.10.1"]);
        assert_eq!(
            artifact.records[1].linked_criteria,
            vec!["1.2.1.2-root(1.2.1.2)"]
        );
    }

    #[test]
    fn to_bytes_uses_four_space_indent() {
        let artifact = LinkArtifact::from_graph(&sample_graph());
        let text = String::from_utf8(artifact.to_bytes().expect("bytes")).expect("utf8");
        assert!(text.starts_with("[\n    {\n        \"criteria\": \"1.2.1.2\""));
        assert!(text.ends_with("]\n"));
    }

    #[test]
    fn to_graph_parses_tags_and_rebuilds_roots() {
        let artifact = LinkArtifact::from_graph(&sample_graph());
        let g = artifact.to_graph();

        let b = g.get("1.2.5.1").expect("b");
        assert_eq!(b.linked["1.2.1.2"], EdgeKind::BackReference);
        assert!(b.root.contains("1.2.1.2"));
        let a = g.get("1.2.1.2").expect("a");
        assert!(a.root.contains("1.2.5.1"));
    }

    #[test]
    fn to_graph_merges_repeated_records() {
        let artifact = LinkArtifact {
            records: vec![
                LinkRecord::new("1.1.1.1", vec!["2.2.2.2".into()]),
                LinkRecord::new("EMS_1.1.1.1", vec!["3.3.3.3".into()]),
            ],
        };
        let g = artifact.to_graph();
        assert_eq!(g.len(), 1);
        assert_eq!(g.get("1.1.1.1").expect("c").linked.len(), 2);
    }

    #[test]
    fn extra_fields_survive_and_legacy_root_is_dropped() {
        let json = br#"[{"criteria":"1.1.1.1","linked_criteria":[],"description":"Plan","root":["2.2.2.2"]}]"#;
        let source = LinkArtifact::from_json(json, Path::new("a.json")).expect("parse");
        let mut out = LinkArtifact::from_graph(&source.to_graph());
        out.carry_extra_fields(&source);

        let record = &out.records[0];
        assert_eq!(record.extra.get("description"), Some(&serde_json::json!("Plan")));
        assert!(!record.extra.contains_key("root"));
    }

    #[test]
    fn malformed_json_is_reported() {
        let err = LinkArtifact::from_json(br#"{"criteria": 1}"#, Path::new("a.json"))
            .expect_err("error");
        assert!(matches!(err, LinkError::MalformedArtifact { .. }));
    }

    #[test]
    fn load_missing_file_is_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let loaded = load(&dir.path().join("missing.json")).expect("load");
        assert!(loaded.is_none());
    }

    #[test]
    fn write_atomic_replaces_file_and_leaves_no_tmp() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("links.json");

        write_atomic(&path, b"[]\n").expect("first write");
        write_atomic(&path, b"[ ]\n").expect("second write");

        assert_eq!(fs::read(&path).expect("read"), b"[ ]\n");
        assert!(!tmp_path(&path).exists());
    }

    #[test]
    fn write_atomic_failure_keeps_previous_content() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("links.json");
        fs::write(&path, b"old").expect("seed");
        // A directory squatting on the tmp path makes the write fail.
        fs::create_dir(tmp_path(&path)).expect("block tmp");

        let err = write_atomic(&path, b"new").expect_err("must fail");
        assert!(matches!(err, LinkError::Write { .. }));
        assert_eq!(fs::read(&path).expect("read"), b"old");
    }

    #[test]
    fn content_hash_is_prefixed_and_stable() {
        let a = content_hash(b"[]\n");
        assert!(a.starts_with("blake3:"));
        assert_eq!(a, content_hash(b"[]\n"));
        assert_ne!(a, content_hash(b"[ ]\n"));
    }
}
