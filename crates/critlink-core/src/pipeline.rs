//! End-to-end processing: assemble, break, tag, check.
//!
//! [`process`] is the build path from freshly extracted pairs.
//! [`process_graph`] is the shared tail, also used by the rewriter on
//! graphs read back from an artifact.

use serde::Serialize;
use tracing::{info, instrument};

use crate::artifact::LinkArtifact;
use crate::error::LinkError;
use crate::graph::assemble::{AssemblyStats, LinkGraph, assemble};
use crate::graph::breaker::{BreakStats, plan};
use crate::graph::tagger::{TagStats, apply_tags};
use crate::graph::verify::ensure_no_mutual;
use crate::universe::CodeUniverse;

/// Counters for one run of the pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PipelineStats {
    /// Absent when the input was an existing artifact.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assembly: Option<AssemblyStats>,
    /// Self-edges stripped before breaking.
    pub self_edges: usize,
    pub breaking: BreakStats,
    pub tagging: TagStats,
}

/// Result of [`process`] or [`process_graph`].
#[derive(Debug, Clone)]
pub struct Processed {
    pub graph: LinkGraph,
    pub stats: PipelineStats,
}

impl Processed {
    /// The artifact for the processed graph.
    #[must_use]
    pub fn artifact(&self) -> LinkArtifact {
        LinkArtifact::from_graph(&self.graph)
    }
}

/// Break and tag `graph`, then check that no mutual forward edge survived.
///
/// The input is not modified. Every criterion of the input appears in the
/// output, even if it ends up with no links.
///
/// # Errors
///
/// Returns [`LinkError::StructuralViolation`] if a mutual forward pair
/// remains after tagging.
#[instrument(skip_all, fields(criteria = graph.len(), edges = graph.edge_count()))]
pub fn process_graph(graph: &LinkGraph) -> Result<Processed, LinkError> {
    let mut snapshot = graph.clone();
    let self_edges = snapshot.remove_self_edges();
    snapshot.rebuild_roots();

    let break_plan = plan(&snapshot);
    let breaking = break_plan.stats();
    let mut out = break_plan.apply(&snapshot);

    let tagging = apply_tags(&mut out);
    ensure_no_mutual(&out)?;

    info!(
        criteria = out.len(),
        mutual = breaking.mutual_edges,
        dropped_ties = breaking.dropped_ties,
        back_references = tagging.back_references,
        "processed link graph"
    );

    Ok(Processed {
        graph: out,
        stats: PipelineStats {
            assembly: None,
            self_edges,
            breaking,
            tagging,
        },
    })
}

/// Build the processed link graph from extracted `(target, source)` pairs.
///
/// Only criteria that take part in at least one relationship are kept.
///
/// # Errors
///
/// See [`process_graph`].
#[instrument(skip_all, fields(universe = universe.len()))]
pub fn process<'a, I>(relationships: I, universe: &CodeUniverse) -> Result<Processed, LinkError>
where
    I: IntoIterator<Item = &'a (String, String)>,
{
    let assembly = assemble(relationships, universe);
    let mut processed = process_graph(&assembly.linked)?;
    processed.stats.assembly = Some(assembly.stats);
    processed.stats.self_edges += assembly.stats.self_edges;
    Ok(processed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::{Edge, EdgeKind};
    use crate::graph::assemble::RelationshipSet;

    fn pairs(raw: &[(&str, &str)]) -> RelationshipSet {
        raw.iter()
            .map(|(t, s)| ((*t).to_string(), (*s).to_string()))
            .collect()
    }

    fn universe(codes: &[&str]) -> CodeUniverse {
        codes.iter().copied().collect()
    }

    #[test]
    fn mutual_pair_yields_forward_and_tagged_back_reference() {
        let rels = pairs(&[("1.2.1.2", "1.2.5.1"), ("1.2.5.1", "1.2.1.2")]);
        let processed = process(&rels, &universe(&["1.2.1.2", "1.2.5.1"])).expect("process");
        let artifact = processed.artifact();

        assert_eq!(artifact.records[0].criteria, "1.2.1.2");
        assert_eq!(artifact.records[0].linked_criteria, vec!["1.2.5.1"]);
        assert_eq!(artifact.records[1].criteria, "1.2.5.1");
        assert_eq!(
            artifact.records[1].linked_criteria,
            vec!["1.2.1.2-root(1.2.1.2)"]
        );
        assert_eq!(processed.stats.breaking.mutual_edges, 2);
    }

    #[test]
    fn one_way_upward_link_is_unchanged() {
        let rels = pairs(&[("1.2.3.4", "9.9.9.9")]);
        let processed = process(&rels, &universe(&["1.2.3.4", "9.9.9.9"])).expect("process");
        let artifact = processed.artifact();

        let record = artifact
            .records
            .iter()
            .find(|r| r.criteria == "1.2.3.4")
            .expect("record");
        assert_eq!(record.linked_criteria, vec!["9.9.9.9"]);
    }

    #[test]
    fn one_way_downward_link_is_tagged() {
        let rels = pairs(&[("2.1.1.1", "1.1.1.1")]);
        let processed = process(&rels, &universe(&["1.1.1.1", "2.1.1.1"])).expect("process");
        let c = processed.graph.get("2.1.1.1").expect("criterion");
        assert_eq!(c.linked["1.1.1.1"], EdgeKind::BackReference);
    }

    #[test]
    fn processing_twice_is_a_fixed_point() {
        let rels = pairs(&[
            ("1.2.1.2", "1.2.5.1"),
            ("1.2.5.1", "1.2.1.2"),
            ("3.1.1.1", "1.2.1.2"),
            ("1.2.3.4", "1.2.3.04"),
            ("1.2.3.04", "1.2.3.4"),
        ]);
        let u = universe(&["1.2.1.2", "1.2.5.1", "3.1.1.1", "1.2.3.4", "1.2.3.04"]);
        let once = process(&rels, &u).expect("first");
        let twice = process_graph(&once.graph).expect("second");
        assert_eq!(once.graph, twice.graph);
        assert_eq!(twice.stats.tagging.retagged, 0);
    }

    #[test]
    fn process_graph_strips_self_edges() {
        let mut g = LinkGraph::new();
        g.entry("1.1.1.1").add_edge(Edge::back_reference("1.1.1.1"));
        let processed = process_graph(&g).expect("process");
        assert!(processed.graph.get("1.1.1.1").expect("c").linked.is_empty());
        assert_eq!(processed.stats.self_edges, 1);
    }
}
