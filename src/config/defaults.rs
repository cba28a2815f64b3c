//! Built-in defaults (layer 1) and the closed set of recognized keys.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Every configuration key the build pipeline reads.
///
/// `project` is deliberately absent: a project is only ever taken from the
/// command line. `profiles` maps a configuration name to an embed profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    Workspace,
    Scheme,
    Configuration,
    Sdk,
    Output,
    Identity,
    Profiles,
    HockeyappToken,
}

impl ConfigKey {
    pub const ALL: [ConfigKey; 8] = [
        ConfigKey::Workspace,
        ConfigKey::Scheme,
        ConfigKey::Configuration,
        ConfigKey::Sdk,
        ConfigKey::Output,
        ConfigKey::Identity,
        ConfigKey::Profiles,
        ConfigKey::HockeyappToken,
    ];

    /// Key name as written in the build file.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigKey::Workspace => "workspace",
            ConfigKey::Scheme => "scheme",
            ConfigKey::Configuration => "configuration",
            ConfigKey::Sdk => "sdk",
            ConfigKey::Output => "output",
            ConfigKey::Identity => "identity",
            ConfigKey::Profiles => "profiles",
            ConfigKey::HockeyappToken => "hockeyapp_token",
        }
    }

    /// Built-in default for this key, if it has one.
    pub fn default_value(&self) -> Option<Value> {
        let defaults = BuiltinDefaults::default().to_value();
        defaults.get(self.as_str()).cloned()
    }
}

impl std::fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Built-in default configuration values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltinDefaults {
    /// Build configuration (default: "Debug")
    pub configuration: String,

    /// SDK passed to xcodebuild and xcrun (default: "iphoneos")
    pub sdk: String,

    /// Upload token flag; carried through untouched (default: true)
    pub hockeyapp_token: bool,
}

impl Default for BuiltinDefaults {
    fn default() -> Self {
        Self {
            configuration: "Debug".to_string(),
            sdk: "iphoneos".to_string(),
            hockeyapp_token: true,
        }
    }
}

impl BuiltinDefaults {
    /// Convert to JSON Value for merging
    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "configuration": self.configuration,
            "sdk": self.sdk,
            "hockeyapp_token": self.hockeyapp_token,
        })
    }
}
