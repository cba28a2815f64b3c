//! Resolved configuration with provenance
//!
//! Built once per invocation from defaults, the build file and CLI flags,
//! then only read.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

use super::defaults::{BuiltinDefaults, ConfigKey};
use super::merge::merge_layers;

/// Build files searched, in order, when no `--config` is given.
pub const SEARCH_LOCATIONS: &[&str] = &["config/build.yml", "build.yml"];

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot find file \"{}\"", .0.display())]
    FileNotFound(PathBuf),

    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("{} must contain a mapping at the top level", .0.display())]
    NotAMapping(PathBuf),
}

/// Origin of a configuration layer
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigOrigin {
    Builtin,
    File,
    Cli,
}

/// A contributing layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSource {
    pub origin: ConfigOrigin,

    /// File path (File only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// SHA-256 of the raw file bytes (File only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

/// Values passed on the command line that participate in layering.
///
/// `None` means "not passed"; such fields never override lower layers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub workspace: Option<String>,
    pub scheme: Option<String>,
    pub configuration: Option<String>,
    pub sdk: Option<String>,
    pub output: Option<String>,
    pub identity: Option<String>,
}

impl ConfigOverrides {
    /// The CLI layer as a mapping containing only the flags that were set.
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        let fields = [
            (ConfigKey::Workspace, &self.workspace),
            (ConfigKey::Scheme, &self.scheme),
            (ConfigKey::Configuration, &self.configuration),
            (ConfigKey::Sdk, &self.sdk),
            (ConfigKey::Output, &self.output),
            (ConfigKey::Identity, &self.identity),
        ];
        for (key, value) in fields {
            if let Some(value) = value {
                map.insert(key.as_str().to_string(), Value::String(value.clone()));
            }
        }
        Value::Object(map)
    }
}

/// The merged configuration for one invocation.
#[derive(Debug, Clone, Serialize)]
pub struct Configuration {
    /// When this configuration was resolved
    pub created_at: DateTime<Utc>,

    /// Merged key/value mapping
    pub config: Value,

    /// Contributing layers in precedence order
    pub sources: Vec<ConfigSource>,
}

impl Configuration {
    /// Resolve configuration for a run started in `working_dir`.
    ///
    /// An explicit `config_path` must exist. Without one, the first existing
    /// entry of [`SEARCH_LOCATIONS`] is used; finding none is fine.
    pub fn resolve(
        overrides: &ConfigOverrides,
        config_path: Option<&Path>,
        working_dir: &Path,
    ) -> Result<Self, ConfigError> {
        let mut layers = vec![BuiltinDefaults::default().to_value()];
        let mut sources = vec![ConfigSource {
            origin: ConfigOrigin::Builtin,
            path: None,
            digest: None,
        }];

        if let Some(path) = Self::find_file(config_path, working_dir)? {
            let (value, digest) = Self::load_yaml_file(&path)?;
            log::debug!("Loaded {} (sha256 {})", path.display(), digest);
            layers.push(value);
            sources.push(ConfigSource {
                origin: ConfigOrigin::File,
                path: Some(path.to_string_lossy().to_string()),
                digest: Some(digest),
            });
        }

        layers.push(overrides.to_value());
        sources.push(ConfigSource {
            origin: ConfigOrigin::Cli,
            path: None,
            digest: None,
        });

        Ok(Self {
            created_at: Utc::now(),
            config: merge_layers(layers),
            sources,
        })
    }

    /// Locate the build file, if any.
    pub fn find_file(
        config_path: Option<&Path>,
        working_dir: &Path,
    ) -> Result<Option<PathBuf>, ConfigError> {
        if let Some(path) = config_path {
            let path = working_dir.join(path);
            if !path.is_file() {
                return Err(ConfigError::FileNotFound(path));
            }
            return Ok(Some(path));
        }

        Ok(SEARCH_LOCATIONS
            .iter()
            .map(|candidate| working_dir.join(candidate))
            .find(|candidate| candidate.is_file()))
    }

    /// Load a YAML build file, returning its mapping and digest.
    fn load_yaml_file(path: &Path) -> Result<(Value, String), ConfigError> {
        let bytes = fs::read(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        let digest = hex::encode(hasher.finalize());

        let value: Value =
            serde_yaml::from_slice(&bytes).map_err(|e| ConfigError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        match value {
            Value::Object(_) => Ok((value, digest)),
            Value::Null => Ok((Value::Object(Map::new()), digest)),
            _ => Err(ConfigError::NotAMapping(path.to_path_buf())),
        }
    }

    /// Look up a key. Missing and explicitly-null values both read as `None`.
    pub fn get(&self, key: ConfigKey) -> Option<&Value> {
        self.config.get(key.as_str()).filter(|v| !v.is_null())
    }

    /// Look up a string-valued key.
    ///
    /// Scalars are rendered as strings; empty strings read as unset.
    pub fn get_str(&self, key: ConfigKey) -> Option<String> {
        match self.get(key)? {
            Value::String(s) if s.is_empty() => None,
            Value::String(s) => Some(s.clone()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Embed profile configured for a build configuration (`profiles.<name>`).
    pub fn profile_for(&self, configuration: &str) -> Option<String> {
        self.get(ConfigKey::Profiles)?
            .get(configuration)?
            .as_str()
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }

    /// Path of the build file that contributed, if any.
    pub fn file_path(&self) -> Option<&str> {
        self.sources
            .iter()
            .find(|s| s.origin == ConfigOrigin::File)
            .and_then(|s| s.path.as_deref())
    }

    /// Pretty JSON dump of the merged configuration and its sources.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
