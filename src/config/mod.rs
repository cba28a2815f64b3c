//! Layered build configuration
//!
//! Three layers, lowest precedence first:
//! 1. Built-in defaults
//! 2. Build file (`--config <path>`, else `config/build.yml`, else `build.yml`)
//! 3. CLI flags (only the ones actually passed)

mod defaults;
mod effective;
mod merge;

pub use defaults::{BuiltinDefaults, ConfigKey};
pub use effective::{
    ConfigError, ConfigOrigin, ConfigOverrides, ConfigSource, Configuration, SEARCH_LOCATIONS,
};
pub use merge::{deep_merge, merge_layers};
