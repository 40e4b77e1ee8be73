//! Back-reference tagging.
//!
//! After breaking, every edge whose target is lower-ordered than its source
//! is a back-reference; every other edge is forward. The kind is derived
//! from the code order alone, so tagging an already-tagged graph changes
//! nothing.

use std::cmp::Ordering;

use serde::Serialize;

use crate::code::compare;
use crate::edge::EdgeKind;
use crate::graph::assemble::LinkGraph;

/// Counters for one tagging pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TagStats {
    pub forward: usize,
    pub back_references: usize,
    /// Edges whose kind changed during this pass.
    pub retagged: usize,
}

/// The kind an edge `source → target` must carry.
#[must_use]
pub fn kind_for(source: &str, target: &str) -> EdgeKind {
    if compare(target, source) == Ordering::Less {
        EdgeKind::BackReference
    } else {
        EdgeKind::Forward
    }
}

/// Set the kind of every edge in `graph` from the code order.
pub fn apply_tags(graph: &mut LinkGraph) -> TagStats {
    let mut stats = TagStats::default();

    for criterion in graph.iter_mut() {
        for (target, kind) in &mut criterion.linked {
            let wanted = kind_for(&criterion.code, target);
            if *kind != wanted {
                stats.retagged += 1;
                *kind = wanted;
            }
            match wanted {
                EdgeKind::Forward => stats.forward += 1,
                EdgeKind::BackReference => stats.back_references += 1,
            }
        }
    }

    stats
}
