use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use ipa_xcodebuild::TargetSettings;

use crate::toolchain::{
    BuildAction, BuildContainer, BuildFlags, PackageRequest, Toolchain, ToolchainError,
    ToolchainInfo,
};

/// One recorded toolchain invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolchainCall {
    Version,
    QueryInfo(BuildContainer),
    QuerySettings(BuildFlags),
    RunBuild(BuildFlags, Vec<BuildAction>),
    RunPackage(PackageRequest),
}

/// Settings for an app target as `-showBuildSettings` would report them.
pub fn app_target(name: &str, built_products_dir: &Path, configuration: &str) -> TargetSettings {
    let mut settings = BTreeMap::new();
    settings.insert(
        "BUILT_PRODUCTS_DIR".to_string(),
        built_products_dir.to_string_lossy().to_string(),
    );
    settings.insert("CONFIGURATION".to_string(), configuration.to_string());
    settings.insert("WRAPPER_EXTENSION".to_string(), "app".to_string());
    settings.insert("WRAPPER_NAME".to_string(), format!("{}.app", name));
    settings.insert("WRAPPER_SUFFIX".to_string(), ".app".to_string());
    TargetSettings {
        target: name.to_string(),
        settings,
    }
}

/// Scriptable [`Toolchain`].
#[derive(Debug)]
pub struct MockToolchain {
    version: String,
    info: Option<ToolchainInfo>,
    settings: Vec<TargetSettings>,
    post_build_settings: Option<Vec<TargetSettings>>,
    build_exit: Option<i32>,
    package_exit: Option<i32>,
    produce_artifacts: bool,
    calls: RefCell<Vec<ToolchainCall>>,
}

impl Default for MockToolchain {
    fn default() -> Self {
        Self::new()
    }
}

impl MockToolchain {
    /// Xcode 15.4, nothing known about any container, every command succeeds.
    pub fn new() -> Self {
        Self {
            version: "15.4".to_string(),
            info: Some(ToolchainInfo::default()),
            settings: Vec::new(),
            post_build_settings: None,
            build_exit: None,
            package_exit: None,
            produce_artifacts: false,
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn with_version(mut self, version: &str) -> Self {
        self.version = version.to_string();
        self
    }

    pub fn with_info(mut self, info: ToolchainInfo) -> Self {
        self.info = Some(info);
        self
    }

    /// `xcodebuild -list` fails.
    pub fn with_info_failure(mut self) -> Self {
        self.info = None;
        self
    }

    pub fn with_settings(mut self, settings: Vec<TargetSettings>) -> Self {
        self.settings = settings;
        self
    }

    /// Settings reported once a build has run.
    pub fn with_post_build_settings(mut self, settings: Vec<TargetSettings>) -> Self {
        self.post_build_settings = Some(settings);
        self
    }

    pub fn with_build_failure(mut self, code: i32) -> Self {
        self.build_exit = Some(code);
        self
    }

    pub fn with_package_failure(mut self, code: i32) -> Self {
        self.package_exit = Some(code);
        self
    }

    /// Write the dSYM on build and the ipa on packaging.
    pub fn producing_artifacts(mut self) -> Self {
        self.produce_artifacts = true;
        self
    }

    /// Every invocation so far, in order.
    pub fn calls(&self) -> Vec<ToolchainCall> {
        self.calls.borrow().clone()
    }

    fn record(&self, call: ToolchainCall) {
        self.calls.borrow_mut().push(call);
    }

    fn has_built(&self) -> bool {
        self.calls
            .borrow()
            .iter()
            .any(|c| matches!(c, ToolchainCall::RunBuild(..)))
    }

    fn current_settings(&self) -> &[TargetSettings] {
        match &self.post_build_settings {
            Some(post) if self.has_built() => post,
            _ => &self.settings,
        }
    }

    fn write_dsym(&self) -> std::io::Result<()> {
        let app = self
            .current_settings()
            .iter()
            .find(|t| t.get("WRAPPER_EXTENSION") == Some("app"));
        let Some(app) = app else {
            return Ok(());
        };
        let (Some(dir), Some(wrapper)) = (app.get("BUILT_PRODUCTS_DIR"), app.get("WRAPPER_NAME")) else {
            return Ok(());
        };

        let dsym = PathBuf::from(dir).join(format!("{}.dSYM", wrapper));
        let dwarf = dsym.join("Contents/Resources/DWARF");
        fs::create_dir_all(&dwarf)?;
        fs::write(dwarf.join(&app.target), b"dwarf")?;
        fs::write(dsym.join("Contents/Info.plist"), b"plist")
    }

    fn exit(command: &str, code: Option<i32>) -> Result<(), ToolchainError> {
        match code {
            Some(code) if code != 0 => Err(ToolchainError::CommandFailed {
                command: command.to_string(),
                code: Some(code),
            }),
            _ => Ok(()),
        }
    }
}

impl Toolchain for MockToolchain {
    fn version(&self) -> Result<String, ToolchainError> {
        self.record(ToolchainCall::Version);
        Ok(self.version.clone())
    }

    fn query_info(&self, container: &BuildContainer) -> Result<ToolchainInfo, ToolchainError> {
        self.record(ToolchainCall::QueryInfo(container.clone()));
        self.info.clone().ok_or_else(|| ToolchainError::CommandFailed {
            command: format!("xcodebuild -list {} {}", container.flag(), container),
            code: Some(66),
        })
    }

    fn query_settings(&self, flags: &BuildFlags) -> Result<Vec<TargetSettings>, ToolchainError> {
        let settings = self.current_settings().to_vec();
        self.record(ToolchainCall::QuerySettings(flags.clone()));
        Ok(settings)
    }

    fn run_build(&self, flags: &BuildFlags, actions: &[BuildAction]) -> Result<(), ToolchainError> {
        self.record(ToolchainCall::RunBuild(flags.clone(), actions.to_vec()));
        Self::exit("xcodebuild", self.build_exit)?;

        if self.produce_artifacts {
            self.write_dsym().map_err(|source| ToolchainError::Spawn {
                program: "xcodebuild".to_string(),
                source,
            })?;
        }
        Ok(())
    }

    fn run_package(&self, request: &PackageRequest) -> Result<(), ToolchainError> {
        self.record(ToolchainCall::RunPackage(request.clone()));
        Self::exit("xcrun", self.package_exit)?;

        if self.produce_artifacts {
            fs::write(&request.output_path, b"ipa").map_err(|source| ToolchainError::Spawn {
                program: "xcrun".to_string(),
                source,
            })?;
        }
        Ok(())
    }
}
