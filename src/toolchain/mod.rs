//! The external build toolchain
//!
//! Everything the pipeline needs from `xcodebuild`/`xcrun` goes through the
//! [`Toolchain`] trait so the orchestration logic can run against fakes.
//! [`Xcodebuild`] is the subprocess-backed implementation.

mod xcodebuild;

pub use xcodebuild::Xcodebuild;

use std::cmp::Ordering;
use std::fmt;
use std::path::{Path, PathBuf};

use ipa_xcodebuild::{compare_versions, ListOutput, TargetSettings};
use serde::Serialize;

/// Oldest Xcode release this tool drives.
pub const MIN_XCODE_VERSION: &str = "4.0.0";

/// Toolchain errors
#[derive(Debug, thiserror::Error)]
pub enum ToolchainError {
    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} failed with exit code {}", .code.map_or_else(|| "none".to_string(), |c| c.to_string()))]
    CommandFailed { command: String, code: Option<i32> },

    #[error("Could not determine Xcode version from: {0}")]
    UnparsableVersion(String),

    #[error("ipa requires Xcode {minimum} (found {found}). Please install or switch to the latest Xcode.")]
    Unsupported { found: String, minimum: String },
}

/// What is being built: a workspace or a project, never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "path")]
pub enum BuildContainer {
    Workspace(PathBuf),
    Project(PathBuf),
}

impl BuildContainer {
    pub fn path(&self) -> &Path {
        match self {
            BuildContainer::Workspace(p) | BuildContainer::Project(p) => p,
        }
    }

    pub fn is_workspace(&self) -> bool {
        matches!(self, BuildContainer::Workspace(_))
    }

    /// xcodebuild flag selecting this container.
    pub fn flag(&self) -> &'static str {
        match self {
            BuildContainer::Workspace(_) => "-workspace",
            BuildContainer::Project(_) => "-project",
        }
    }
}

impl fmt::Display for BuildContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path().display())
    }
}

/// Flags shared by every build and settings invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildFlags {
    pub sdk: String,
    pub container: BuildContainer,
    pub scheme: Option<String>,
    pub configuration: Option<String>,
}

impl BuildFlags {
    /// argv fragment, in xcodebuild's conventional order.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![
            "-sdk".to_string(),
            self.sdk.clone(),
            self.container.flag().to_string(),
            self.container.path().to_string_lossy().to_string(),
        ];
        if let Some(scheme) = &self.scheme {
            args.push("-scheme".to_string());
            args.push(scheme.clone());
        }
        if let Some(configuration) = &self.configuration {
            args.push("-configuration".to_string());
            args.push(configuration.clone());
        }
        args
    }
}

impl fmt::Display for BuildFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "-sdk {} {} '{}'", self.sdk, self.container.flag(), self.container)?;
        if let Some(scheme) = &self.scheme {
            write!(f, " -scheme '{}'", scheme)?;
        }
        if let Some(configuration) = &self.configuration {
            write!(f, " -configuration '{}'", configuration)?;
        }
        Ok(())
    }
}

/// xcodebuild actions, run in the order given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildAction {
    Clean,
    Build,
    Archive,
}

impl BuildAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildAction::Clean => "clean",
            BuildAction::Build => "build",
            BuildAction::Archive => "archive",
        }
    }
}

/// Action list for a run: clean and archive are on unless disabled.
pub fn build_actions(clean: bool, archive: bool) -> Vec<BuildAction> {
    let mut actions = Vec::with_capacity(3);
    if clean {
        actions.push(BuildAction::Clean);
    }
    actions.push(BuildAction::Build);
    if archive {
        actions.push(BuildAction::Archive);
    }
    actions
}

/// Static facts about a workspace or project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ToolchainInfo {
    pub targets: Vec<String>,
    pub build_configurations: Vec<String>,
    pub schemes: Vec<String>,
}

impl ToolchainInfo {
    pub fn has_scheme(&self, scheme: &str) -> bool {
        self.schemes.iter().any(|s| s == scheme)
    }

    pub fn has_configuration(&self, configuration: &str) -> bool {
        self.build_configurations.iter().any(|c| c == configuration)
    }
}

impl From<ListOutput> for ToolchainInfo {
    fn from(list: ListOutput) -> Self {
        Self {
            targets: list.targets,
            build_configurations: list.build_configurations,
            schemes: list.schemes,
        }
    }
}

/// Arguments for turning an `.app` bundle into an `.ipa`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRequest {
    pub sdk: String,
    pub app_path: PathBuf,
    pub output_path: PathBuf,
    /// Provisioning profile, or the dSYM path when none is configured
    pub embed: String,
    pub identity: Option<String>,
}

/// Narrow interface to the external build and packaging tools.
pub trait Toolchain {
    /// Installed Xcode version, e.g. "15.4".
    fn version(&self) -> Result<String, ToolchainError>;

    /// Schemes, configurations and targets of a workspace or project.
    fn query_info(&self, container: &BuildContainer) -> Result<ToolchainInfo, ToolchainError>;

    /// Per-target build settings for the given flags.
    fn query_settings(&self, flags: &BuildFlags) -> Result<Vec<TargetSettings>, ToolchainError>;

    /// Run the given actions; a non-zero exit is an error.
    fn run_build(&self, flags: &BuildFlags, actions: &[BuildAction]) -> Result<(), ToolchainError>;

    /// Package an app bundle into an ipa; a non-zero exit is an error.
    fn run_package(&self, request: &PackageRequest) -> Result<(), ToolchainError>;
}

/// Fail unless the installed Xcode is at least [`MIN_XCODE_VERSION`].
pub fn check_version(toolchain: &dyn Toolchain) -> Result<String, ToolchainError> {
    let found = toolchain.version()?;
    if compare_versions(&found, MIN_XCODE_VERSION) == Ordering::Less {
        return Err(ToolchainError::Unsupported {
            found,
            minimum: MIN_XCODE_VERSION.to_string(),
        });
    }
    Ok(found)
}

/// Probe a container, treating any failure as "nothing known".
pub fn probe_info(toolchain: &dyn Toolchain, container: &BuildContainer) -> ToolchainInfo {
    match toolchain.query_info(container) {
        Ok(info) => info,
        Err(e) => {
            log::warn!("Could not list schemes for {}: {}", container, e);
            ToolchainInfo::default()
        }
    }
}
