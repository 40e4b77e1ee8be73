//! Hierarchical criterion codes: normalization and ordering.
//!
//! A criterion code is four dot-separated integers
//! (`ServiceElement.Section.Standard.Criterion`, e.g. `1.2.3.4`). Codes read
//! from extracted text or from older artifacts may carry decoration:
//!
//! - a back-reference tag: `1.2.1.2-root(1.2.1.2)`
//! - a prefix token: `EMS_1.2.1.2`, `SE 1.2.1.2`
//! - trailing words: `1.2.1.2 extra`
//!
//! [`normalize`] is the single canonical way to strip all of these. Every
//! comparison in the crate goes through [`compare`], which normalizes first.
//!
//! # Ordering
//!
//! [`compare`] is a total *preorder*: two distinct strings may compare equal
//! when lenient parsing collapses them (`1.2.3.04` vs `1.2.3.4`, or
//! `abc.1.2.3` vs `0.1.2.3`). Non-numeric segments count as `0` and are never
//! an error. Use [`cmp_total`] when a deterministic sort is needed.

use std::cmp::Ordering;

/// Marker that opens a back-reference tag.
pub const ROOT_TAG_MARKER: &str = "-root(";

/// Number of segments in a well-formed criterion code.
pub const CODE_DEPTH: usize = 4;

/// Strip decoration from a code and return its bare form.
///
/// Steps, in order:
/// 1. trim whitespace;
/// 2. cut a trailing back-reference tag (`-root(...)`);
/// 3. drop everything up to the last `_` (`EMS_1.1.1.1` → `1.1.1.1`);
/// 4. drop a leading `SE ` token;
/// 5. keep the first whitespace-delimited token.
///
/// Empty input normalizes to the empty string. The function is idempotent.
#[must_use]
pub fn normalize(code: &str) -> String {
    let mut code = code.trim();

    if let Some(idx) = code.find(ROOT_TAG_MARKER) {
        code = &code[..idx];
    }
    if let Some((_, tail)) = code.rsplit_once('_') {
        code = tail;
    }
    code = code.trim_start();
    if let Some(rest) = code.strip_prefix("SE ") {
        code = rest;
    }

    code.split_whitespace()
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Parse the numeric segments of a (normalized) code.
///
/// Segments that are empty, contain non-digits, or overflow `u64` count as 0.
#[must_use]
pub fn segments(code: &str) -> Vec<u64> {
    normalize(code).split('.').map(segment_value).collect()
}

fn segment_value(segment: &str) -> u64 {
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return 0;
    }
    segment.parse().unwrap_or(0)
}

/// Compare two codes under the hierarchical order.
///
/// Identical normalized strings are equal without any numeric parsing.
/// Otherwise segments are compared numerically left to right, padding the
/// shorter code with zeros.
#[must_use]
pub fn compare(a: &str, b: &str) -> Ordering {
    let a = normalize(a);
    let b = normalize(b);
    if a == b {
        return Ordering::Equal;
    }

    let left: Vec<u64> = a.split('.').map(segment_value).collect();
    let right: Vec<u64> = b.split('.').map(segment_value).collect();
    let len = left.len().max(right.len());

    (0..len)
        .map(|i| {
            let l = left.get(i).copied().unwrap_or(0);
            let r = right.get(i).copied().unwrap_or(0);
            l.cmp(&r)
        })
        .find(|ord| ord.is_ne())
        .unwrap_or(Ordering::Equal)
}

/// [`compare`], with ties broken by the raw strings.
///
/// Only used for sorting output; mutual-edge resolution always uses the
/// plain preorder.
#[must_use]
pub fn cmp_total(a: &str, b: &str) -> Ordering {
    compare(a, b).then_with(|| a.cmp(b))
}

/// Sort codes in place by [`cmp_total`].
pub fn sort_codes<S: AsRef<str>>(codes: &mut [S]) {
    codes.sort_by(|a, b| cmp_total(a.as_ref(), b.as_ref()));
}

/// Return `true` if `code` normalizes to exactly four numeric segments.
#[must_use]
pub fn is_well_formed(code: &str) -> bool {
    let code = normalize(code);
    let parts: Vec<&str> = code.split('.').collect();
    parts.len() == CODE_DEPTH
        && parts
            .iter()
            .all(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()))
}
