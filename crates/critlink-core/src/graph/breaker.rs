//! Mutual-edge breaking.
//!
//! # Overview
//!
//! Extraction reads both the statement column and the detail column of the
//! standards matrix, so some pairs come out linked in both directions
//! (`A → B` and `B → A`). Only one direction may remain a forward
//! (consuming) edge. For a mutual pair the lower-ordered code keeps the
//! forward edge; the higher-ordered side's edge becomes a back-reference so
//! the artifact still records that it pointed at the lower code.
//!
//! # Decisions
//!
//! Decisions are computed per edge against an immutable snapshot of the
//! graph ([`plan`]) and then materialized into a new graph
//! ([`BreakPlan::apply`]). No criterion's decision depends on another
//! criterion's decision, only on the snapshot.
//!
//! | mutual? | `compare(source, target)` | decision        |
//! |---------|---------------------------|-----------------|
//! | no      | -                         | [`Decision::PassThrough`] |
//! | yes     | `Less`                    | [`Decision::Keep`]        |
//! | yes     | `Greater`                 | [`Decision::Demote`]      |
//! | yes     | `Equal`                   | [`Decision::DropTie`]     |
//!
//! A tie means two distinct strings collapsed to the same order under lenient
//! parsing. Each side then treats itself as the finer one and drops its edge,
//! so neither direction survives.

#![allow(clippy::module_name_repetitions)]

use std::cmp::Ordering;

use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::code::{cmp_total, compare};
use crate::edge::EdgeKind;
use crate::graph::assemble::{Criterion, LinkGraph};

/// What happens to one edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Not part of a mutual pair; left as is.
    PassThrough,
    /// Lower side of a mutual pair; stays a forward edge.
    Keep,
    /// Higher side of a mutual pair; leaves the forward relation and is kept
    /// as a back-reference.
    Demote,
    /// Mutual pair whose codes tie; removed.
    DropTie,
}

/// Decision for a single edge `source → target`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EdgeDecision {
    pub source: String,
    pub target: String,
    pub decision: Decision,
}

/// Counters for one breaking pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BreakStats {
    /// Edges that belonged to a mutual pair.
    pub mutual_edges: usize,
    pub kept: usize,
    pub demoted: usize,
    pub dropped_ties: usize,
    pub passed_through: usize,
}

/// Per-edge decisions for a whole graph.
#[derive(Debug, Clone, Default)]
pub struct BreakPlan {
    pub decisions: Vec<EdgeDecision>,
}

/// Decide the fate of `source → target` from the snapshot.
///
/// The pair is mutual when `target` is in the source's `root` set, i.e. the
/// target links back. Roots must be current (see
/// [`LinkGraph::rebuild_roots`]).
#[must_use]
pub fn decide(source: &Criterion, target: &str) -> Decision {
    if !source.root.contains(target) {
        return Decision::PassThrough;
    }

    match compare(&source.code, target) {
        Ordering::Less => Decision::Keep,
        Ordering::Greater => Decision::Demote,
        Ordering::Equal => Decision::DropTie,
    }
}

/// Compute a decision for every edge of `graph`.
#[must_use]
#[instrument(skip_all, fields(criteria = graph.len()))]
pub fn plan(graph: &LinkGraph) -> BreakPlan {
    let decisions = graph
        .iter()
        .flat_map(|criterion| {
            criterion.linked.keys().map(move |target| EdgeDecision {
                source: criterion.code.clone(),
                target: target.clone(),
                decision: decide(criterion, target),
            })
        })
        .collect();

    BreakPlan { decisions }
}

impl BreakPlan {
    /// Materialize a new graph from `graph` and this plan.
    ///
    /// The result carries every criterion of `graph`, outgoing edges only;
    /// `root` sets are left empty.
    #[must_use]
    pub fn apply(&self, graph: &LinkGraph) -> LinkGraph {
        let mut out: LinkGraph = graph
            .iter()
            .map(|c| Criterion::new(&c.code))
            .collect();

        for d in &self.decisions {
            let kind = match d.decision {
                Decision::PassThrough => graph
                    .get(&d.source)
                    .and_then(|c| c.linked.get(&d.target).copied())
                    .unwrap_or(EdgeKind::Forward),
                Decision::Keep => {
                    debug!(source = %d.source, target = %d.target, "keeping lower side of mutual link");
                    EdgeKind::Forward
                }
                Decision::Demote => {
                    debug!(source = %d.source, target = %d.target, "demoting higher side of mutual link");
                    EdgeKind::BackReference
                }
                Decision::DropTie => {
                    warn!(
                        source = %d.source,
                        target = %d.target,
                        "ambiguous tie between mutually linked codes; dropping edge"
                    );
                    continue;
                }
            };

            out.entry(&d.source).linked.insert(d.target.clone(), kind);
        }

        out
    }

    /// Summarize the plan.
    #[must_use]
    pub fn stats(&self) -> BreakStats {
        let mut stats = BreakStats::default();
        for d in &self.decisions {
            match d.decision {
                Decision::PassThrough => stats.passed_through += 1,
                Decision::Keep => stats.kept += 1,
                Decision::Demote => stats.demoted += 1,
                Decision::DropTie => stats.dropped_ties += 1,
            }
        }
        stats.mutual_edges = stats.kept + stats.demoted + stats.dropped_ties;
        stats
    }

    /// Mutual pairs resolved by this plan, as `(lower, higher)`.
    ///
    /// Each pair appears once; tied pairs are ordered by raw string.
    #[must_use]
    pub fn resolved_pairs(&self) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = self
            .decisions
            .iter()
            .filter(|d| d.decision != Decision::PassThrough)
            .filter(|d| cmp_total(&d.source, &d.target) == Ordering::Less)
            .map(|d| (d.source.clone(), d.target.clone()))
            .collect();
        pairs.sort_by(|a, b| cmp_total(&a.0, &b.0).then_with(|| cmp_total(&a.1, &b.1)));
        pairs
    }
}

/// Plan and apply in one step.
#[must_use]
pub fn break_cycles(graph: &LinkGraph) -> (LinkGraph, BreakStats) {
    let plan = plan(graph);
    let stats = plan.stats();
    (plan.apply(graph), stats)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
