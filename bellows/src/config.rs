use std::path::Path;

use rustc_hash::FxHashMap;
use serde::Deserialize;
use serde_json::Value;

use smelt::error::{Chainable, Result};
use smelt::error;

/// Project settings, read from `config.toml` at the project root. Unknown
/// top-level keys become globals templates can read as `G.<key>`.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// The permalink pattern applied to rendered pages.
    pub permalink: String,
    /// Basename globs removed from the snapshot before anything else runs.
    pub ignore: Vec<String>,
    /// Globs, relative to the project directory, that trigger rebuilds in
    /// watch mode.
    pub watch: Vec<String>,
    pub collections: FxHashMap<String, Collection>,
    #[serde(flatten)]
    pub globals: FxHashMap<String, Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Collection {
    pub pattern: Option<String>,
    pub sort_by: Option<String>,
    pub reverse: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            permalink: ":year/:month/:title".into(),
            ignore: vec![".DS_Store".into()],
            watch: vec!["content/**/*".into(), "templates/**/*".into()],
            collections: FxHashMap::default(),
            globals: FxHashMap::default(),
        }
    }
}

impl Settings {
    /// Settings from `config.toml` under `project`, or the defaults when
    /// the file does not exist.
    pub fn discover(project: &Path) -> Result<Self> {
        let path = project.join(crate::CONFIG_FILE);
        if !path.exists() {
            return Ok(Settings::default());
        }

        let raw = std::fs::read_to_string(&path).chain_with(|| error! {
            "failed to read configuration",
            "path" => path.display(),
        })?;

        toml::from_str(&raw).chain_with(|| error! {
            "invalid configuration",
            "path" => path.display(),
        })
    }
}
