//! Read-only audits over link graphs and artifacts.
//!
//! # Edge Direction
//!
//! Only forward edges take part in cycle and mutual-pair detection.
//! Back-references point from a higher to a lower code and never count as
//! consumption, so they cannot close a cycle.

#![allow(clippy::module_name_repetitions)]

use std::cmp::Ordering;
use std::collections::BTreeMap;

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;

use crate::artifact::LinkArtifact;
use crate::code::{cmp_total, compare, normalize};
use crate::edge::{EdgeKind, tag_parts};
use crate::error::LinkError;
use crate::graph::assemble::LinkGraph;

/// Mutual forward pairs in `graph`, as `(lower, higher)`, sorted.
#[must_use]
pub fn mutual_forward_pairs(graph: &LinkGraph) -> Vec<(String, String)> {
    let mut pairs = Vec::new();

    for criterion in graph.iter() {
        for (target, kind) in &criterion.linked {
            if *kind != EdgeKind::Forward || cmp_total(&criterion.code, target) != Ordering::Less {
                continue;
            }
            let back = graph
                .get(target)
                .and_then(|t| t.linked.get(&criterion.code).copied());
            if back == Some(EdgeKind::Forward) {
                pairs.push((criterion.code.clone(), target.clone()));
            }
        }
    }

    pairs.sort_by(|a, b| cmp_total(&a.0, &b.0).then_with(|| cmp_total(&a.1, &b.1)));
    pairs
}

/// Fail if any mutual forward pair remains.
///
/// # Errors
///
/// Returns [`LinkError::StructuralViolation`] naming the first pair found.
pub fn ensure_no_mutual(graph: &LinkGraph) -> Result<(), LinkError> {
    match mutual_forward_pairs(graph).into_iter().next() {
        Some((lower, higher)) => Err(LinkError::StructuralViolation { lower, higher }),
        None => Ok(()),
    }
}

/// Build a petgraph of the forward edges only.
///
/// Targets that have no criterion of their own still get a node.
#[must_use]
pub fn forward_digraph(graph: &LinkGraph) -> DiGraph<String, ()> {
    let mut out = DiGraph::new();
    let mut index: BTreeMap<String, NodeIndex> = BTreeMap::new();

    let mut node = |out: &mut DiGraph<String, ()>, code: &str| -> NodeIndex {
        *index
            .entry(code.to_string())
            .or_insert_with(|| out.add_node(code.to_string()))
    };

    for criterion in graph.iter() {
        let from = node(&mut out, &criterion.code);
        for (target, kind) in &criterion.linked {
            if *kind == EdgeKind::Forward && *target != criterion.code {
                let to = node(&mut out, target);
                if !out.contains_edge(from, to) {
                    out.add_edge(from, to, ());
                }
            }
        }
    }

    out
}

/// Strongly connected components of the forward graph with two or more
/// members. Members are sorted by code, components by their first member.
#[must_use]
pub fn forward_cycles(graph: &LinkGraph) -> Vec<Vec<String>> {
    let digraph = forward_digraph(graph);
    let mut cycles: Vec<Vec<String>> = tarjan_scc(&digraph)
        .into_iter()
        .filter(|component| component.len() > 1)
        .map(|component| {
            let mut codes: Vec<String> = component
                .into_iter()
                .filter_map(|idx| digraph.node_weight(idx).cloned())
                .collect();
            codes.sort_by(|a, b| cmp_total(a, b));
            codes
        })
        .collect();

    cycles.sort_by(|a, b| match (a.first(), b.first()) {
        (Some(x), Some(y)) => cmp_total(x, y),
        _ => a.len().cmp(&b.len()),
    });
    cycles
}

// ---------------------------------------------------------------------------
// Artifact audit
// ---------------------------------------------------------------------------

/// One offending link within a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkIssue {
    /// Record code.
    pub criteria: String,
    /// The link as written in the artifact.
    pub link: String,
}

/// Findings of [`verify_artifact`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VerifyReport {
    pub records: usize,
    pub links: usize,
    /// Records that list themselves, bare or tagged.
    pub self_edges: Vec<LinkIssue>,
    /// Mutual forward pairs as `(lower, higher)`.
    pub mutual_pairs: Vec<(String, String)>,
    /// Bare links to a lower-ordered code.
    pub missing_tags: Vec<LinkIssue>,
    /// Tagged links to a code that is not lower-ordered.
    pub spurious_tags: Vec<LinkIssue>,
    /// Tags whose leading and embedded codes differ.
    pub tag_mismatches: Vec<LinkIssue>,
    /// Record codes that appear after a higher-ordered record.
    pub out_of_order: Vec<String>,
    /// Forward-edge cycles (see [`forward_cycles`]).
    pub forward_cycles: Vec<Vec<String>>,
    /// A rewrite would produce different bytes.
    pub rewrite_pending: bool,
}

impl VerifyReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.self_edges.is_empty()
            && self.mutual_pairs.is_empty()
            && self.missing_tags.is_empty()
            && self.spurious_tags.is_empty()
            && self.tag_mismatches.is_empty()
            && self.out_of_order.is_empty()
            && self.forward_cycles.is_empty()
            && !self.rewrite_pending
    }

    /// Total number of findings, counting a pending rewrite as one.
    #[must_use]
    pub fn issue_count(&self) -> usize {
        self.self_edges.len()
            + self.mutual_pairs.len()
            + self.missing_tags.len()
            + self.spurious_tags.len()
            + self.tag_mismatches.len()
            + self.out_of_order.len()
            + self.forward_cycles.len()
            + usize::from(self.rewrite_pending)
    }
}

/// Audit `artifact` without modifying it.
///
/// `original` is the artifact's on-disk bytes; the report flags a pending
/// rewrite when the rewriter would produce anything else.
///
/// # Errors
///
/// Propagates errors from the rewrite dry run.
pub fn verify_artifact(artifact: &LinkArtifact, original: &[u8]) -> Result<VerifyReport, LinkError> {
    let mut report = VerifyReport {
        records: artifact.len(),
        ..VerifyReport::default()
    };

    let mut previous: Option<&str> = None;
    for record in &artifact.records {
        let code = normalize(&record.criteria);
        if previous.is_some_and(|prev| cmp_total(prev, &record.criteria) == Ordering::Greater) {
            report.out_of_order.push(code.clone());
        }
        previous = Some(&record.criteria);

        for link in &record.linked_criteria {
            report.links += 1;
            let issue = || LinkIssue {
                criteria: code.clone(),
                link: link.clone(),
            };

            let target = normalize(link);
            if target == code {
                report.self_edges.push(issue());
                continue;
            }

            match tag_parts(link) {
                Some((head, inner)) => {
                    if normalize(head) != normalize(inner) {
                        report.tag_mismatches.push(issue());
                    }
                    if compare(&target, &code) != Ordering::Less {
                        report.spurious_tags.push(issue());
                    }
                }
                None => {
                    if compare(&target, &code) == Ordering::Less {
                        report.missing_tags.push(issue());
                    }
                }
            }
        }
    }

    let graph = artifact.to_graph();
    report.mutual_pairs = mutual_forward_pairs(&graph);
    report.forward_cycles = forward_cycles(&graph);
    report.rewrite_pending = crate::rewrite::rewrite_artifact(artifact)?.bytes != original;

    Ok(report)
}
