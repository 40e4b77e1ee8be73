//! Link graph construction, cycle breaking, and tagging.
//!
//! # Overview
//!
//! Extracted `(target, source)` pairs become a per-criterion adjacency
//! ([`LinkGraph`]). Mutual links are broken so that only the lower-ordered
//! side consumes the other, and every edge is then tagged forward or
//! back-reference from the code order.
//!
//! ## Pipeline
//!
//! ```text
//! RelationshipSet (target, source) pairs
//!        ↓  assemble::assemble()
//! LinkGraph (forward edges + reverse `root` sets, may be mutual)
//!        ↓  breaker::plan() → BreakPlan::apply()
//! LinkGraph (no mutual forward pairs)
//!        ↓  tagger::apply_tags()
//! LinkGraph (every edge tagged by code order)
//!        ↓  verify::ensure_no_mutual()
//! LinkArtifact
//! ```
//!
//! ## Typical Usage
//!
//! ```rust,ignore
//! use critlink_core::graph::{assemble, break_cycles, apply_tags, ensure_no_mutual};
//!
//! let assembly = assemble(&pairs, &universe);
//! let (mut graph, stats) = break_cycles(&assembly.linked);
//! apply_tags(&mut graph);
//! ensure_no_mutual(&graph)?;
//! ```

pub mod assemble;
pub mod breaker;
pub mod tagger;
pub mod verify;

pub use assemble::{Assembly, AssemblyStats, Criterion, LinkGraph, RelationshipSet, assemble};
pub use breaker::{BreakPlan, BreakStats, Decision, break_cycles};
pub use tagger::{TagStats, apply_tags};
pub use verify::{VerifyReport, ensure_no_mutual, forward_cycles, verify_artifact};
