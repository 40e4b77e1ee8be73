//! Typed link edges and the back-reference tag syntax.
//!
//! Internally an edge is a bare target code plus an [`EdgeKind`]. The
//! decorated on-disk form `"{code}-root({code})"` only exists at the
//! serialization boundary ([`Edge::parse`] / [`Edge::render`]).

use std::fmt;

use serde::Serialize;
use tracing::warn;

use crate::code::{ROOT_TAG_MARKER, normalize};

/// Direction of an edge relative to the code order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// The source consumes the target.
    Forward,
    /// The target is lower-ordered than the source; kept for traceability.
    BackReference,
}

/// One outgoing link of a criterion.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Edge {
    /// Normalized target code.
    pub target: String,
    pub kind: EdgeKind,
}

impl Edge {
    #[must_use]
    pub fn forward(target: &str) -> Self {
        Self {
            target: normalize(target),
            kind: EdgeKind::Forward,
        }
    }

    #[must_use]
    pub fn back_reference(target: &str) -> Self {
        Self {
            target: normalize(target),
            kind: EdgeKind::BackReference,
        }
    }

    /// Parse a serialized link (`1.2.3.4` or `1.2.3.4-root(1.2.3.4)`).
    ///
    /// A tag whose two embedded codes disagree is accepted; the leading code
    /// wins and a warning is logged.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match tag_parts(raw) {
            Some((head, inner)) => {
                if normalize(head) != normalize(inner) {
                    warn!(link = raw, "back-reference tag embeds two different codes");
                }
                Self::back_reference(head)
            }
            None => Self::forward(raw),
        }
    }

    /// Render in artifact form.
    #[must_use]
    pub fn render(&self) -> String {
        match self.kind {
            EdgeKind::Forward => self.target.clone(),
            EdgeKind::BackReference => tag(&self.target),
        }
    }

    #[must_use]
    pub fn is_back_reference(&self) -> bool {
        self.kind == EdgeKind::BackReference
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Build the back-reference tag for `code`.
#[must_use]
pub fn tag(code: &str) -> String {
    let code = normalize(code);
    format!("{code}{ROOT_TAG_MARKER}{code})")
}

/// Split a tagged link into its leading and embedded codes.
///
/// Returns `None` for a bare link.
#[must_use]
pub fn tag_parts(raw: &str) -> Option<(&str, &str)> {
    let raw = raw.trim();
    let idx = raw.find(ROOT_TAG_MARKER)?;
    let head = &raw[..idx];
    let rest = &raw[idx + ROOT_TAG_MARKER.len()..];
    let inner = rest.strip_suffix(')').unwrap_or(rest);
    Some((head, inner))
}
