//! Build pipeline
//!
//! Runs one `ipa build` through its stages, strictly in order:
//!
//! Validated → Built → SettingsDiscovered → Packaged → SymbolsArchived → Done
//!
//! Any failure aborts the run. Nothing is retried and nothing already written
//! is rolled back.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::archive::{archive_symbols, ArchiveError};
use crate::config::{ConfigError, ConfigKey, Configuration};
use crate::options::BuildOptions;
use crate::selection::{Chooser, SelectionError, TargetSelector, TargetSpec};
use crate::settings::{resolve_app_settings, ArtifactPaths, SettingsError};
use crate::toolchain::{build_actions, check_version, PackageRequest, Toolchain, ToolchainError};

/// Pipeline errors
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Toolchain(#[from] ToolchainError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error("Failed to create destination {}: {source}", .path.display())]
    Destination {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl PipelineError {
    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            PipelineError::Config(_) => 2,
            PipelineError::Toolchain(ToolchainError::Unsupported { .. })
            | PipelineError::Toolchain(ToolchainError::UnparsableVersion(_)) => 2,
            PipelineError::Selection(SelectionError::Io { .. }) => 1,
            PipelineError::Selection(_) => 3,
            PipelineError::Settings(SettingsError::Toolchain(_)) => 5,
            PipelineError::Settings(_) => 4,
            PipelineError::Toolchain(_) => 5,
            PipelineError::Archive(_) => 6,
            PipelineError::Destination { .. } => 1,
        }
    }
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Pipeline stages, in the order they are reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Validated,
    Built,
    SettingsDiscovered,
    Packaged,
    SymbolsArchived,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Validated => "validated",
            Stage::Built => "built",
            Stage::SettingsDiscovered => "settings discovered",
            Stage::Packaged => "packaged",
            Stage::SymbolsArchived => "symbols archived",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// What a successful run produced.
#[derive(Debug, Clone, Serialize)]
pub struct BuildOutcome {
    pub target: TargetSpec,
    pub artifacts: ArtifactPaths,
    pub ipa_path: PathBuf,
    pub dsym_zip_path: PathBuf,
    pub stages: Vec<Stage>,
}

/// Drives one build against a toolchain.
pub struct BuildOrchestrator<'a> {
    toolchain: &'a dyn Toolchain,
    chooser: &'a dyn Chooser,
    working_dir: PathBuf,
}

impl<'a> BuildOrchestrator<'a> {
    pub fn new(toolchain: &'a dyn Toolchain, chooser: &'a dyn Chooser, working_dir: PathBuf) -> Self {
        Self {
            toolchain,
            chooser,
            working_dir,
        }
    }

    /// Build, package and archive symbols.
    pub fn run(&self, options: &BuildOptions) -> PipelineResult<BuildOutcome> {
        let mut stages = Vec::with_capacity(6);

        // Version gate first: nothing else is read or spawned before it.
        let version = check_version(self.toolchain)?;
        log::info!("Using Xcode {}", version);

        let config = Configuration::resolve(
            &options.overrides(),
            options.config_path.as_deref(),
            &self.working_dir,
        )?;
        if let Some(path) = config.file_path() {
            log::info!("Using configuration from {}", path);
        }

        let target = TargetSelector::new(self.toolchain, self.chooser, &self.working_dir)
            .select(&config, options)?;
        let (target, _) = resolve_app_settings(self.toolchain, target)?;
        let configuration = target.configuration.clone().unwrap_or_default();
        log::info!(
            "Building \"{}\" with Scheme \"{}\" and Configuration \"{}\"",
            target.container,
            target.scheme,
            configuration
        );
        advance(&mut stages, Stage::Validated);

        let destination = self.destination(&config);
        fs::create_dir_all(&destination).map_err(|source| PipelineError::Destination {
            path: destination.clone(),
            source,
        })?;

        let actions = build_actions(options.clean, options.archive);
        log::info!("xcodebuild {}", target.container);
        self.toolchain.run_build(&target.flags(), &actions)?;
        advance(&mut stages, Stage::Built);

        let (target, settings) = resolve_app_settings(self.toolchain, target)?;
        let artifacts = ArtifactPaths::derive(&settings, &destination)?;
        advance(&mut stages, Stage::SettingsDiscovered);

        // No profile means the dSYM path is handed to --embed, as the
        // packager's own default does.
        let embed = options
            .embed
            .clone()
            .or_else(|| config.profile_for(&configuration))
            .unwrap_or_else(|| artifacts.dsym_path.to_string_lossy().to_string());
        let request = PackageRequest {
            sdk: target.sdk.clone(),
            app_path: artifacts.app_path.clone(),
            output_path: artifacts.ipa_path.clone(),
            embed,
            identity: config.get_str(ConfigKey::Identity),
        };
        log::info!("xcrun PackageApplication {}", artifacts.app_path.display());
        self.toolchain.run_package(&request)?;
        advance(&mut stages, Stage::Packaged);

        log::info!("zip {}", artifacts.dsym_copy_path.display());
        let dsym_zip_path = archive_symbols(&artifacts.dsym_path, &artifacts.dsym_copy_path)?;
        advance(&mut stages, Stage::SymbolsArchived);

        advance(&mut stages, Stage::Done);
        Ok(BuildOutcome {
            target,
            ipa_path: artifacts.ipa_path.clone(),
            dsym_zip_path,
            artifacts,
            stages,
        })
    }

    /// `output` from CLI/config, relative to the working directory; else the
    /// working directory itself.
    fn destination(&self, config: &Configuration) -> PathBuf {
        match config.get_str(ConfigKey::Output) {
            Some(output) => absolutize(&self.working_dir, Path::new(&output)),
            None => self.working_dir.clone(),
        }
    }
}

fn advance(stages: &mut Vec<Stage>, stage: Stage) {
    log::debug!("stage: {}", stage);
    stages.push(stage);
}

fn absolutize(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
