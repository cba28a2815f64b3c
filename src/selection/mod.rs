//! Target selection
//!
//! Decides what to build, in this order:
//! 1. Workspace (CLI or config), else project (CLI only), else whatever
//!    `*.xcworkspace` / `*.xcodeproj` sits in the working directory.
//!    Workspaces always win over projects.
//! 2. For projects only: configuration, defaulting to "Debug" when the
//!    project has it (or reports nothing), and validated against the list.
//! 3. Scheme, validated against the list.
//!
//! Where more than one candidate remains, the injected [`Chooser`] decides.

mod prompt;

pub use prompt::TerminalChooser;

use std::fs;
use std::path::{Path, PathBuf};

use globset::Glob;
use serde::Serialize;

use crate::config::{ConfigKey, Configuration};
use crate::options::BuildOptions;
use crate::toolchain::{probe_info, BuildContainer, BuildFlags, Toolchain, ToolchainInfo};

/// Configuration used when none is given and the project has one by that name.
pub const DEFAULT_CONFIGURATION: &str = "Debug";

/// SDK used when neither CLI nor config names one.
pub const DEFAULT_SDK: &str = "iphoneos";

/// Selection errors
#[derive(Debug, thiserror::Error)]
pub enum SelectionError {
    #[error("No Xcode projects or workspaces found in {}", .0.display())]
    NoContainer(PathBuf),

    #[error("No schemes found in Xcode project or workspace")]
    NoSchemes,

    #[error("Scheme {0} not found")]
    InvalidScheme(String),

    #[error("Configuration {0} not found")]
    InvalidConfiguration(String),

    #[error("Failed to list {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] globset::Error),

    #[error("Prompt failed: {0}")]
    Prompt(String),
}

/// "Pick one of these" capability.
pub trait Chooser {
    /// Return one of `options`. Never called with an empty list.
    fn choose(&self, prompt: &str, options: &[String]) -> Result<String, SelectionError>;
}

/// The resolved build target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetSpec {
    pub container: BuildContainer,
    pub scheme: String,
    /// `None` for workspace builds until xcodebuild reports its default
    pub configuration: Option<String>,
    pub sdk: String,
}

impl TargetSpec {
    /// Invocation flags for this target.
    pub fn flags(&self) -> BuildFlags {
        BuildFlags {
            sdk: self.sdk.clone(),
            container: self.container.clone(),
            scheme: Some(self.scheme.clone()),
            configuration: self.configuration.clone(),
        }
    }

    /// Fix the configuration once it is known.
    pub fn with_configuration(self, configuration: impl Into<String>) -> Self {
        Self {
            configuration: Some(configuration.into()),
            ..self
        }
    }
}

/// Resolves a [`TargetSpec`] from config, CLI options and probed facts.
pub struct TargetSelector<'a> {
    toolchain: &'a dyn Toolchain,
    chooser: &'a dyn Chooser,
    working_dir: &'a Path,
}

impl<'a> TargetSelector<'a> {
    pub fn new(toolchain: &'a dyn Toolchain, chooser: &'a dyn Chooser, working_dir: &'a Path) -> Self {
        Self {
            toolchain,
            chooser,
            working_dir,
        }
    }

    /// Resolve container, configuration, scheme and sdk.
    pub fn select(
        &self,
        config: &Configuration,
        options: &BuildOptions,
    ) -> Result<TargetSpec, SelectionError> {
        let container = match (config.get_str(ConfigKey::Workspace), &options.project) {
            (Some(workspace), _) => BuildContainer::Workspace(PathBuf::from(workspace)),
            (None, Some(project)) => BuildContainer::Project(project.clone()),
            (None, None) => self.detect_container()?,
        };

        let info = probe_info(self.toolchain, &container);

        let mut configuration = config.get_str(ConfigKey::Configuration);
        if !container.is_workspace() {
            // Workspaces may aggregate several projects' configurations, so
            // only projects are checked against the probed list.
            let chosen = match configuration {
                Some(c) => c,
                None => self.determine_configuration(&info)?,
            };
            if !info.has_configuration(&chosen) {
                return Err(SelectionError::InvalidConfiguration(chosen));
            }
            configuration = Some(chosen);
        }

        let scheme = match config.get_str(ConfigKey::Scheme) {
            Some(s) => s,
            None => self.determine_scheme(&info)?,
        };
        if !info.has_scheme(&scheme) {
            return Err(SelectionError::InvalidScheme(scheme));
        }

        let sdk = config
            .get_str(ConfigKey::Sdk)
            .unwrap_or_else(|| DEFAULT_SDK.to_string());

        Ok(TargetSpec {
            container,
            scheme,
            configuration,
            sdk,
        })
    }

    /// Find a workspace, else a project, in the working directory.
    pub fn detect_container(&self) -> Result<BuildContainer, SelectionError> {
        let workspaces = self.list_matching("*.xcworkspace")?;
        if !workspaces.is_empty() {
            let name = self.pick("Select a workspace:", workspaces)?;
            return Ok(BuildContainer::Workspace(self.working_dir.join(name)));
        }

        let projects = self.list_matching("*.xcodeproj")?;
        if !projects.is_empty() {
            let name = self.pick("Select a project:", projects)?;
            return Ok(BuildContainer::Project(self.working_dir.join(name)));
        }

        Err(SelectionError::NoContainer(self.working_dir.to_path_buf()))
    }

    fn determine_configuration(&self, info: &ToolchainInfo) -> Result<String, SelectionError> {
        let configurations = &info.build_configurations;

        let defaulted = if configurations.is_empty()
            || configurations.iter().any(|c| c == DEFAULT_CONFIGURATION)
        {
            Some(DEFAULT_CONFIGURATION.to_string())
        } else if configurations.len() == 1 {
            Some(configurations[0].clone())
        } else {
            None
        };

        match defaulted {
            Some(configuration) => {
                log::warn!("Configuration was not passed, defaulting to {}", configuration);
                Ok(configuration)
            }
            None => self.chooser.choose("Select a configuration:", configurations),
        }
    }

    fn determine_scheme(&self, info: &ToolchainInfo) -> Result<String, SelectionError> {
        if info.schemes.is_empty() {
            return Err(SelectionError::NoSchemes);
        }
        self.pick("Select a scheme:", info.schemes.clone())
    }

    /// The sole option, or the chooser's pick among several.
    fn pick(&self, prompt: &str, mut options: Vec<String>) -> Result<String, SelectionError> {
        if options.len() == 1 {
            return Ok(options.remove(0));
        }
        self.chooser.choose(prompt, &options)
    }

    /// Names of working-directory entries matching `pattern`, sorted.
    fn list_matching(&self, pattern: &str) -> Result<Vec<String>, SelectionError> {
        let matcher = Glob::new(pattern)?.compile_matcher();
        let entries = fs::read_dir(self.working_dir).map_err(|source| SelectionError::Io {
            path: self.working_dir.to_path_buf(),
            source,
        })?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| SelectionError::Io {
                path: self.working_dir.to_path_buf(),
                source,
            })?;
            let name = entry.file_name().to_string_lossy().to_string();
            if matcher.is_match(&name) {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }
}
