use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::extract::{DEFAULT_MIN_STATEMENT_LEN, ExtractOptions};

/// File name looked up at the project root when no `--config` is given.
pub const CONFIG_FILE_NAME: &str = "critlink.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub artifacts: ArtifactConfig,
    #[serde(default)]
    pub extract: ExtractConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactConfig {
    /// Artifacts probed by `rewrite` and `check`, in order.
    #[serde(default = "default_artifact_paths")]
    pub paths: Vec<PathBuf>,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            paths: default_artifact_paths(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractConfig {
    #[serde(default = "default_config_tree")]
    pub config_tree: PathBuf,
    #[serde(default = "default_text")]
    pub text: PathBuf,
    #[serde(default = "default_out")]
    pub out: PathBuf,
    #[serde(default = "default_min_statement_len")]
    pub min_statement_len: usize,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            config_tree: default_config_tree(),
            text: default_text(),
            out: default_out(),
            min_statement_len: default_min_statement_len(),
        }
    }
}

impl ExtractConfig {
    #[must_use]
    pub const fn options(&self) -> ExtractOptions {
        ExtractOptions {
            min_statement_len: self.min_statement_len,
        }
    }
}

impl ProjectConfig {
    /// Resolve every relative path against `root`.
    #[must_use]
    pub fn resolve_paths(mut self, root: &Path) -> Self {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = root.join(&*p);
            }
        };
        self.artifacts.paths.iter_mut().for_each(resolve);
        resolve(&mut self.extract.config_tree);
        resolve(&mut self.extract.text);
        resolve(&mut self.extract.out);
        self
    }
}

/// Load the project configuration.
///
/// With `explicit` set, that file must exist. Otherwise `critlink.toml` at
/// `project_root` is read if present, and defaults are used if not. Relative
/// paths in the result are resolved against `project_root`.
pub fn load_project_config(project_root: &Path, explicit: Option<&Path>) -> Result<ProjectConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let path = project_root.join(CONFIG_FILE_NAME);
            if !path.exists() {
                return Ok(ProjectConfig::default().resolve_paths(project_root));
            }
            path
        }
    };

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let config = toml::from_str::<ProjectConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    Ok(config.resolve_paths(project_root))
}

fn default_artifact_paths() -> Vec<PathBuf> {
    vec![
        PathBuf::from("src/assets/ems_links.json"),
        PathBuf::from("Matrix/reextracted_ems_links.json"),
    ]
}

fn default_config_tree() -> PathBuf {
    PathBuf::from("src/assets/ems_config.json")
}

fn default_text() -> PathBuf {
    PathBuf::from("Matrix/extracted_text.txt")
}

fn default_out() -> PathBuf {
    PathBuf::from("src/assets/ems_links.json")
}

const fn default_min_statement_len() -> usize {
    DEFAULT_MIN_STATEMENT_LEN
}
