//! Parsers for the textual output of `xcodebuild`.
//!
//! `xcodebuild` has no stable machine-readable mode on the Xcode releases this
//! tool supports, so the orchestrator scrapes three outputs:
//!
//! - `xcodebuild -list` → targets, build configurations and schemes
//! - `xcodebuild -showBuildSettings` → per-target `KEY = value` maps
//! - `xcodebuild -version` → the `Xcode X.Y.Z` line
//!
//! Everything here is pure string processing; spawning the tool is the
//! caller's business.

mod list;
mod settings;
mod version;

pub use list::{parse_list, ListOutput};
pub use settings::{parse_build_settings, TargetSettings};
pub use version::{compare_versions, parse_version};
