//! Test doubles for the pipeline's external seams
//!
//! - [`MockToolchain`]: canned xcodebuild/xcrun answers, records every call,
//!   optionally writes the files a real build would leave behind
//! - [`ScriptedChooser`]: picks a fixed index and records each prompt

mod chooser;
mod toolchain;

pub use chooser::ScriptedChooser;
pub use toolchain::{app_target, MockToolchain, ToolchainCall};
