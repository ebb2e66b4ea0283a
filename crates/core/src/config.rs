//! Override and exclusion configuration.
//!
//! The built-in tables cover the libvips operations that need special handling. A config
//! file (`vipsgen.toml`, or YAML) merges over them:
//! ```toml
//! exclusions = ["thumbnail_source"]
//!
//! [overrides.jpegload]
//! needs_custom_wrapper = true
//! options_param = "option_string"
//! ```
//! Set `disable_defaults = true` to start from empty tables.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{GenError, Result};

/// Config file looked up in the working directory.
pub const CONFIG_FILENAME: &str = "vipsgen.toml";
/// Directory under the user config dir holding the fallback config file.
const CONFIG_DIR: &str = "vipsgen";

const CUSTOM_LOADERS: &[&str] = &["jpegload", "pngload", "webpload", "gifload"];
const SKIPPED: &[&str] = &["jpegsave", "pngsave", "webpsave", "composite", "composite2"];
const EXCLUDED: &[&str] = &["cache", "system", "version", "sequential", "tilecache"];

/// Per-operation adjustments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperationOverride {
    /// Never emit this operation.
    pub skip_generation: bool,
    /// Receiver surface is hand-written in the static files.
    pub needs_custom_wrapper: bool,
    /// Name of a synthesized optional string input carrying libvips option syntax.
    pub options_param: Option<String>,
}

/// Overrides and exclusions consumed by the normalizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratorConfig {
    /// Overrides keyed by native operation name.
    pub overrides: BTreeMap<String, OperationOverride>,
    /// Operations that are never emitted.
    pub exclusions: BTreeSet<String>,
}

/// On-disk shape of a config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    /// Ignore the built-in tables.
    pub disable_defaults: bool,
    /// Overrides replacing built-in entries per key.
    pub overrides: BTreeMap<String, OperationOverride>,
    /// Exclusions added to the built-in set.
    pub exclusions: BTreeSet<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self::builtin()
    }
}

impl GeneratorConfig {
    /// No overrides, no exclusions.
    pub fn empty() -> Self {
        Self {
            overrides: BTreeMap::new(),
            exclusions: BTreeSet::new(),
        }
    }

    /// The built-in tables.
    pub fn builtin() -> Self {
        let mut overrides = BTreeMap::new();
        for name in CUSTOM_LOADERS {
            overrides.insert(
                (*name).to_string(),
                OperationOverride {
                    needs_custom_wrapper: true,
                    options_param: Some("option_string".to_string()),
                    ..OperationOverride::default()
                },
            );
        }
        for name in SKIPPED {
            overrides.insert(
                (*name).to_string(),
                OperationOverride {
                    skip_generation: true,
                    ..OperationOverride::default()
                },
            );
        }

        Self {
            overrides,
            exclusions: EXCLUDED.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    /// Apply a config file over these tables.
    pub fn merge(mut self, file: ConfigFile) -> Self {
        if file.disable_defaults {
            self = Self::empty();
        }
        self.overrides.extend(file.overrides);
        self.exclusions.extend(file.exclusions);
        self
    }

    /// Parse config text. YAML when `path` ends in `.yaml`/`.yml`, TOML otherwise.
    pub fn parse(content: &str, path: &Path) -> Result<ConfigFile> {
        let is_yaml = matches!(
            path.extension().and_then(|ext| ext.to_str()),
            Some("yaml" | "yml")
        );
        let parsed = if is_yaml {
            serde_yaml::from_str(content).map_err(|err| err.to_string())
        } else {
            toml::from_str(content).map_err(|err| err.to_string())
        };
        parsed.map_err(|message| GenError::Config {
            path: path.to_path_buf(),
            message,
        })
    }

    /// Built-in tables merged with the file at `path`.
    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|err| GenError::Config {
            path: path.to_path_buf(),
            message: format!("Failed to read config file: {err}"),
        })?;
        let file = Self::parse(&contents, path)?;
        debug!(config_path = %path.display(), "Loaded generator config.");
        Ok(Self::builtin().merge(file))
    }

    /// Resolve the config for a run.
    ///
    /// An explicit path must exist. Otherwise `vipsgen.toml` in `cwd`, then the user config
    /// dir, then the built-in tables.
    pub fn load(explicit: Option<&Path>, cwd: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_path(path);
        }

        let candidates = [Some(cwd.join(CONFIG_FILENAME)), Self::user_config_path()];
        for path in candidates.into_iter().flatten() {
            if path.is_file() {
                return Self::from_path(&path);
            }
        }

        debug!("No config file found, using built-in overrides.");
        Ok(Self::builtin())
    }

    /// `~/.config/vipsgen/vipsgen.toml` (platform equivalent).
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILENAME))
    }

    /// Whether the operation is in the exclusion set.
    pub fn is_excluded(&self, name: &str) -> bool {
        self.exclusions.contains(name)
    }

    /// Override entry for an operation.
    pub fn override_for(&self, name: &str) -> Option<&OperationOverride> {
        self.overrides.get(name)
    }
}
