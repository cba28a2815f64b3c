//! Build settings of the app target and the artifact paths derived from them
//!
//! Settings are queried twice per run: before building, to confirm an app
//! target exists and to learn the configuration xcodebuild will default to,
//! and after building, because product locations can only be trusted once the
//! configuration is fixed.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use ipa_xcodebuild::TargetSettings;
use serde::Serialize;

use crate::selection::TargetSpec;
use crate::toolchain::{Toolchain, ToolchainError};

/// `WRAPPER_EXTENSION` of an application target.
pub const APP_WRAPPER_EXTENSION: &str = "app";

/// Suffix of a debug-symbol bundle.
pub const DSYM_EXTENSION: &str = ".dSYM";

pub const IPA_EXTENSION: &str = ".ipa";

pub const ZIP_EXTENSION: &str = ".zip";

/// Settings errors
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("App settings could not be found.")]
    AppTargetNotFound,

    #[error("Build setting {0} is missing for target {1}")]
    MissingSetting(&'static str, String),

    #[error(transparent)]
    Toolchain(#[from] ToolchainError),
}

/// Build settings of one resolved app target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildSettings {
    pub target: String,
    pub values: BTreeMap<String, String>,
}

impl From<TargetSettings> for BuildSettings {
    fn from(target: TargetSettings) -> Self {
        Self {
            target: target.target,
            values: target.settings,
        }
    }
}

impl BuildSettings {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    fn require(&self, key: &'static str) -> Result<&str, SettingsError> {
        self.get(key)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| SettingsError::MissingSetting(key, self.target.clone()))
    }

    pub fn is_app(&self) -> bool {
        self.get("WRAPPER_EXTENSION") == Some(APP_WRAPPER_EXTENSION)
    }

    pub fn built_products_dir(&self) -> Result<PathBuf, SettingsError> {
        self.require("BUILT_PRODUCTS_DIR").map(PathBuf::from)
    }

    /// e.g. "App.app"
    pub fn wrapper_name(&self) -> Result<&str, SettingsError> {
        self.require("WRAPPER_NAME")
    }

    /// e.g. ".app"; empty when unset
    pub fn wrapper_suffix(&self) -> &str {
        self.get("WRAPPER_SUFFIX").unwrap_or("")
    }

    /// Configuration xcodebuild resolved for this target.
    pub fn configuration(&self) -> Option<&str> {
        self.get("CONFIGURATION").filter(|c| !c.is_empty())
    }
}

/// Query settings for `spec` and pick out the app target.
///
/// If `spec` has no configuration yet, the one xcodebuild reports is fixed
/// into the returned spec so later invocations pass it explicitly.
pub fn resolve_app_settings(
    toolchain: &dyn Toolchain,
    spec: TargetSpec,
) -> Result<(TargetSpec, BuildSettings), SettingsError> {
    let targets = toolchain.query_settings(&spec.flags())?;

    let settings = targets
        .into_iter()
        .map(BuildSettings::from)
        .find(BuildSettings::is_app)
        .ok_or(SettingsError::AppTargetNotFound)?;

    let spec = match spec.configuration {
        Some(_) => spec,
        None => {
            let configuration = settings
                .configuration()
                .ok_or_else(|| SettingsError::MissingSetting("CONFIGURATION", settings.target.clone()))?
                .to_string();
            log::debug!("xcodebuild resolved configuration {}", configuration);
            spec.with_configuration(configuration)
        }
    };

    Ok((spec, settings))
}

/// Where the build products are and where the outputs go.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactPaths {
    /// BUILT_PRODUCTS_DIR/WRAPPER_NAME
    pub app_path: PathBuf,
    /// The dSYM beside the app bundle
    pub dsym_path: PathBuf,
    /// destination/WRAPPER_NAME.dSYM, removed once zipped
    pub dsym_copy_path: PathBuf,
    pub dsym_zip_path: PathBuf,
    /// destination/<WRAPPER_NAME without WRAPPER_SUFFIX>.ipa
    pub ipa_path: PathBuf,
}

impl ArtifactPaths {
    pub fn derive(settings: &BuildSettings, destination: &Path) -> Result<Self, SettingsError> {
        let wrapper_name = settings.wrapper_name()?;
        let app_path = settings.built_products_dir()?.join(wrapper_name);

        let dsym_path = append(&app_path, DSYM_EXTENSION);
        // Keeps the full wrapper name: App.app -> App.app.dSYM.zip
        let dsym_copy_path = destination.join(format!("{}{}", wrapper_name, DSYM_EXTENSION));
        let dsym_zip_path = append(&dsym_copy_path, ZIP_EXTENSION);

        let suffix = settings.wrapper_suffix();
        let base_name = if suffix.is_empty() {
            wrapper_name.to_string()
        } else {
            wrapper_name.replace(suffix, "")
        };
        let ipa_path = destination.join(format!("{}{}", base_name, IPA_EXTENSION));

        Ok(Self {
            app_path,
            dsym_path,
            dsym_copy_path,
            dsym_zip_path,
            ipa_path,
        })
    }
}

fn append(path: &Path, extension: &str) -> PathBuf {
    let mut raw = path.as_os_str().to_os_string();
    raw.push(extension);
    PathBuf::from(raw)
}
