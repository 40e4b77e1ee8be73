//! Link graph construction from extracted relationship pairs.
//!
//! # Edge Direction
//!
//! An edge `A → B` means "A **consumes** B": A's computed status is derived
//! from B. Extracted pairs arrive as `(target, source)`, where the target is
//! the criterion whose statement column mentioned the source code, so each
//! pair becomes the edge `target → source`.
//!
//! While assembling, every criterion also carries the reverse relation in
//! [`Criterion::root`]: the set of criteria that link to it. The cycle
//! breaker reads it to spot mutual pairs; it is not persisted.

#![allow(clippy::module_name_repetitions)]

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::code::normalize;
use crate::edge::{Edge, EdgeKind};
use crate::universe::CodeUniverse;

/// Raw `(target, source)` pairs produced by extraction.
pub type RelationshipSet = BTreeSet<(String, String)>;

// ---------------------------------------------------------------------------
// Criterion
// ---------------------------------------------------------------------------

/// One criterion and its adjacency.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Criterion {
    /// Normalized code.
    pub code: String,
    /// Outgoing edges keyed by normalized target code.
    pub linked: BTreeMap<String, EdgeKind>,
    /// Criteria that link to this one.
    pub root: BTreeSet<String>,
}

impl Criterion {
    #[must_use]
    pub fn new(code: &str) -> Self {
        Self {
            code: normalize(code),
            ..Self::default()
        }
    }

    /// Return `true` if the criterion links to, or is linked from, anything.
    #[must_use]
    pub fn has_relationships(&self) -> bool {
        !self.linked.is_empty() || !self.root.is_empty()
    }

    /// Return `true` if this criterion has an edge (of any kind) to `code`.
    #[must_use]
    pub fn links_to(&self, code: &str) -> bool {
        self.linked.contains_key(&normalize(code))
    }

    /// Iterate outgoing edges in key order.
    pub fn edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.linked.iter().map(|(target, kind)| Edge {
            target: target.clone(),
            kind: *kind,
        })
    }

    /// Add an edge, keeping the first kind seen for a repeated target.
    pub fn add_edge(&mut self, edge: Edge) {
        self.linked.entry(edge.target).or_insert(edge.kind);
    }
}

// ---------------------------------------------------------------------------
// LinkGraph
// ---------------------------------------------------------------------------

/// Criteria keyed by normalized code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkGraph {
    criteria: BTreeMap<String, Criterion>,
}

impl LinkGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a criterion by (possibly decorated) code.
    #[must_use]
    pub fn get(&self, code: &str) -> Option<&Criterion> {
        self.criteria.get(&normalize(code))
    }

    pub fn get_mut(&mut self, code: &str) -> Option<&mut Criterion> {
        self.criteria.get_mut(&normalize(code))
    }

    #[must_use]
    pub fn contains(&self, code: &str) -> bool {
        self.criteria.contains_key(&normalize(code))
    }

    /// Return the criterion for `code`, creating an empty one if needed.
    pub fn entry(&mut self, code: &str) -> &mut Criterion {
        let key = normalize(code);
        self.criteria
            .entry(key.clone())
            .or_insert_with(|| Criterion::new(&key))
    }

    /// Insert a criterion, replacing any existing one with the same code.
    pub fn insert(&mut self, criterion: Criterion) {
        self.criteria.insert(criterion.code.clone(), criterion);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.criteria.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    /// Iterate criteria in key order.
    pub fn iter(&self) -> impl Iterator<Item = &Criterion> {
        self.criteria.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Criterion> {
        self.criteria.values_mut()
    }

    /// Total number of outgoing edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.criteria.values().map(|c| c.linked.len()).sum()
    }

    /// Recompute every `root` set from the current outgoing edges.
    ///
    /// Targets that are not criteria of this graph are ignored.
    pub fn rebuild_roots(&mut self) {
        for criterion in self.criteria.values_mut() {
            criterion.root.clear();
        }

        let reverse: Vec<(String, String)> = self
            .criteria
            .values()
            .flat_map(|c| c.linked.keys().map(|t| (t.clone(), c.code.clone())))
            .collect();

        for (target, source) in reverse {
            if let Some(criterion) = self.criteria.get_mut(&target) {
                criterion.root.insert(source);
            }
        }
    }

    /// Remove every criterion from its own `linked` and `root` sets.
    ///
    /// Returns the number of self-edges removed.
    pub fn remove_self_edges(&mut self) -> usize {
        let mut removed = 0;
        for criterion in self.criteria.values_mut() {
            if criterion.linked.remove(&criterion.code).is_some() {
                removed += 1;
            }
            criterion.root.remove(&criterion.code);
        }
        removed
    }

    /// Return a copy holding only criteria with at least one relationship.
    #[must_use]
    pub fn with_relationships(&self) -> Self {
        Self {
            criteria: self
                .criteria
                .iter()
                .filter(|(_, c)| c.has_relationships())
                .map(|(k, c)| (k.clone(), c.clone()))
                .collect(),
        }
    }
}

impl FromIterator<Criterion> for LinkGraph {
    fn from_iter<I: IntoIterator<Item = Criterion>>(iter: I) -> Self {
        let mut graph = Self::new();
        for criterion in iter {
            graph.insert(criterion);
        }
        graph
    }
}

// ---------------------------------------------------------------------------
// Assembly
// ---------------------------------------------------------------------------

/// Counters reported by [`assemble`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AssemblyStats {
    /// Codes in the universe.
    pub universe: usize,
    /// Pairs offered by extraction.
    pub pairs: usize,
    /// Pairs skipped because a code is outside the universe.
    pub unknown_pairs: usize,
    /// Self-edges removed after assembly.
    pub self_edges: usize,
    /// Criteria with at least one relationship.
    pub linked_criteria: usize,
}

/// Output of [`assemble`].
#[derive(Debug, Clone)]
pub struct Assembly {
    /// One criterion per universe code.
    pub graph: LinkGraph,
    /// Only criteria that take part in at least one relationship.
    pub linked: LinkGraph,
    pub stats: AssemblyStats,
}

/// Build the per-criterion adjacency from extracted pairs.
///
/// Every universe code gets a criterion. For each `(target, source)` pair
/// the edge `target → source` is recorded and `target` is added to the
/// source's `root`. Self-edges are stripped once all pairs are in.
#[instrument(skip_all, fields(universe = universe.len()))]
pub fn assemble<'a, I>(relationships: I, universe: &CodeUniverse) -> Assembly
where
    I: IntoIterator<Item = &'a (String, String)>,
{
    let mut graph: LinkGraph = universe.iter().map(Criterion::new).collect();
    let mut stats = AssemblyStats {
        universe: universe.len(),
        ..AssemblyStats::default()
    };

    for (target, source) in relationships {
        stats.pairs += 1;
        let target = normalize(target);
        let source = normalize(source);

        if !graph.contains(&target) || !graph.contains(&source) {
            warn!(%target, %source, "skipping pair outside the code universe");
            stats.unknown_pairs += 1;
            continue;
        }

        graph.entry(&target).add_edge(Edge::forward(&source));
        graph.entry(&source).root.insert(target);
    }

    stats.self_edges = graph.remove_self_edges();
    let linked = graph.with_relationships();
    stats.linked_criteria = linked.len();

    debug!(
        pairs = stats.pairs,
        linked = stats.linked_criteria,
        edges = linked.edge_count(),
        "assembled link graph"
    );

    Assembly {
        graph,
        linked,
        stats,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
