//! ipa-build - build and package iOS apps
//!
//! Drives `xcodebuild` to build a workspace or project, packages the app
//! bundle into an `.ipa` with `xcrun PackageApplication`, and zips the
//! matching dSYM next to it.
//!
//! What to build comes from CLI flags layered over a `build.yml` and
//! built-in defaults, with auto-detection and interactive prompts filling
//! the gaps.

pub mod archive;
pub mod config;
pub mod mock;
pub mod options;
pub mod pipeline;
pub mod selection;
pub mod settings;
pub mod signal;
pub mod toolchain;

pub use config::{ConfigKey, ConfigOverrides, Configuration};
pub use options::BuildOptions;
pub use pipeline::{BuildOrchestrator, BuildOutcome, PipelineError, Stage};
pub use selection::{Chooser, TargetSelector, TargetSpec, TerminalChooser};
pub use toolchain::{Toolchain, Xcodebuild};
