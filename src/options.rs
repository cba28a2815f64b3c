//! Options for a single `ipa build` run.

use std::path::PathBuf;

use crate::config::ConfigOverrides;

/// Everything the command line can say about a build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    pub workspace: Option<PathBuf>,
    /// Only honored when no workspace is given (CLI or config)
    pub project: Option<PathBuf>,
    pub configuration: Option<String>,
    pub scheme: Option<String>,
    pub clean: bool,
    pub archive: bool,
    pub destination: Option<PathBuf>,
    /// Provisioning profile passed to the packager
    pub embed: Option<String>,
    pub identity: Option<String>,
    pub sdk: Option<String>,
    /// Explicit build file; must exist if given
    pub config_path: Option<PathBuf>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            workspace: None,
            project: None,
            configuration: None,
            scheme: None,
            clean: true,
            archive: true,
            destination: None,
            embed: None,
            identity: None,
            sdk: None,
            config_path: None,
        }
    }
}

impl BuildOptions {
    /// The subset of options layered over the build file.
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            workspace: self.workspace.as_ref().map(|p| p.to_string_lossy().to_string()),
            scheme: self.scheme.clone(),
            configuration: self.configuration.clone(),
            sdk: self.sdk.clone(),
            output: self.destination.as_ref().map(|p| p.to_string_lossy().to_string()),
            identity: self.identity.clone(),
        }
    }
}
