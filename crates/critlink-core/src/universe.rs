//! The set of valid criterion codes, read from the configuration tree.
//!
//! The tree is produced by a separate structural parser and nests
//! Service Element → Section → Standard → Criterion. Only the criterion ids
//! are read here; the tree itself is never modified.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::{info, instrument, warn};

use crate::code::{is_well_formed, normalize};
use crate::error::LinkError;

#[derive(Debug, Default, Deserialize)]
struct ConfigTree {
    #[serde(default)]
    ems_full_configuration: Vec<ServiceElement>,
}

#[derive(Debug, Default, Deserialize)]
struct ServiceElement {
    #[serde(default)]
    sections: Vec<Section>,
}

#[derive(Debug, Default, Deserialize)]
struct Section {
    #[serde(default)]
    standards: Vec<Standard>,
}

#[derive(Debug, Default, Deserialize)]
struct Standard {
    #[serde(default)]
    criteria: Vec<CriterionEntry>,
}

#[derive(Debug, Default, Deserialize)]
struct CriterionEntry {
    #[serde(default)]
    id: String,
}

/// Normalized codes that may appear in relationships.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeUniverse {
    codes: BTreeSet<String>,
}

impl CodeUniverse {
    #[must_use]
    pub fn contains(&self, code: &str) -> bool {
        self.codes.contains(&normalize(code))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.codes.iter().map(String::as_str)
    }

    /// Parse a configuration tree document.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::ConfigTree`] if `json` is not a valid tree.
    pub fn from_tree_json(json: &str, path: &Path) -> Result<Self, LinkError> {
        let tree: ConfigTree =
            serde_json::from_str(json).map_err(|e| LinkError::ConfigTree {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let universe: Self = tree
            .ems_full_configuration
            .iter()
            .flat_map(|se| &se.sections)
            .flat_map(|section| &section.standards)
            .flat_map(|standard| &standard.criteria)
            .map(|c| c.id.as_str())
            .filter(|id| !id.trim().is_empty())
            .collect();

        let irregular = universe.iter().filter(|c| !is_well_formed(c)).count();
        if irregular > 0 {
            warn!(
                path = %path.display(),
                irregular,
                "configuration tree has criterion ids that are not four numeric segments"
            );
        }

        Ok(universe)
    }
}

impl<'a> FromIterator<&'a str> for CodeUniverse {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        Self {
            codes: iter.into_iter().map(normalize).collect(),
        }
    }
}

/// Load the code universe from the configuration tree at `path`.
///
/// # Errors
///
/// Returns [`LinkError::ConfigTree`] if the file is missing, unreadable, or
/// not a valid tree.
#[instrument]
pub fn load_universe(path: &Path) -> Result<CodeUniverse, LinkError> {
    let json = fs::read_to_string(path).map_err(|e| LinkError::ConfigTree {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let universe = CodeUniverse::from_tree_json(&json, path)?;
    info!(codes = universe.len(), "loaded code universe");
    Ok(universe)
}
