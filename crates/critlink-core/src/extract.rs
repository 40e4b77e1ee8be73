//! Column-based relationship extraction from document text.
//!
//! The standards matrix lays out each criterion as a row: the criterion code
//! and its statement in the first column, and the codes it draws on in a
//! companion column. After text extraction the columns are interleaved line
//! by line, so the scan tracks an *active target*:
//!
//! - a line that starts with a known code followed by statement text makes
//!   that code the active target;
//! - every other known code found afterwards is linked to the active target.
//!
//! Pairs are `(target, source)`, deduplicated and sorted.

use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, instrument};

use crate::error::LinkError;
use crate::graph::assemble::RelationshipSet;
use crate::universe::CodeUniverse;

const CODE_PATTERN: &str = r"\d+\.\d+\.\d+\.\d+";

/// Default minimum statement length for a target line.
pub const DEFAULT_MIN_STATEMENT_LEN: usize = 10;

/// Tunables for [`extract_relationships`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Characters of text that must follow a leading code for the line to
    /// start a new target.
    pub min_statement_len: usize,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            min_statement_len: DEFAULT_MIN_STATEMENT_LEN,
        }
    }
}

fn code_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(CODE_PATTERN).expect("code pattern is valid"))
}

fn leading_code_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(r"^({CODE_PATTERN})\b")).expect("leading code pattern is valid")
    })
}

fn is_noise(line: &str) -> bool {
    line.is_empty() || line.contains("--- Page") || line.contains("Criteria")
}

/// Scan extracted text for `(target, source)` pairs.
///
/// Only codes present in `universe` are considered. A code is never linked
/// to itself.
#[must_use]
#[instrument(skip_all, fields(universe = universe.len()))]
pub fn extract_relationships(
    text: &str,
    universe: &CodeUniverse,
    options: ExtractOptions,
) -> RelationshipSet {
    let mut relationships = RelationshipSet::new();
    let mut current_target: Option<String> = None;

    for line in text.lines() {
        let line = line.trim();
        if is_noise(line) || !code_re().is_match(line) {
            continue;
        }

        if let Some(caps) = leading_code_re().captures(line) {
            let detected = &caps[1];
            let remaining = line[detected.len()..].trim();
            let starts_with_code = code_re().find(remaining).is_some_and(|m| m.start() == 0);

            if universe.contains(detected)
                && remaining.chars().count() > options.min_statement_len
                && !starts_with_code
            {
                debug!(target = detected, "new target");
                for found in code_re().find_iter(remaining) {
                    let source = found.as_str();
                    if source != detected && universe.contains(source) {
                        relationships.insert((detected.to_string(), source.to_string()));
                    }
                }
                current_target = Some(detected.to_string());
                continue;
            }
        }

        if let Some(target) = current_target.as_deref() {
            for found in code_re().find_iter(line) {
                let source = found.as_str();
                if source != target && universe.contains(source) {
                    relationships.insert((target.to_string(), source.to_string()));
                }
            }
        }
    }

    relationships
}

/// Read the extracted text file.
///
/// # Errors
///
/// Returns [`LinkError::SourceText`] if the file cannot be read.
pub fn read_source_text(path: &Path) -> Result<String, LinkError> {
    fs::read_to_string(path).map_err(|source| LinkError::SourceText {
        path: path.to_path_buf(),
        source,
    })
}
