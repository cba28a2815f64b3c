//! `xcodebuild -showBuildSettings` parser.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex_lite::Regex;

/// Build settings reported for a single target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetSettings {
    pub target: String,
    pub settings: BTreeMap<String, String>,
}

impl TargetSettings {
    /// Look up a setting value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.settings.get(key).map(String::as_str)
    }
}

fn header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"^Build settings for action \S+ and target "?(.+?)"?:$"#)
            .expect("header pattern is valid")
    })
}

fn setting_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s+([A-Za-z0-9_]+) = ?(.*)$").expect("setting pattern is valid")
    })
}

/// Parse `-showBuildSettings` output into per-target maps, in output order.
///
/// Setting lines seen before the first target header are dropped.
pub fn parse_build_settings(output: &str) -> Vec<TargetSettings> {
    let mut targets: Vec<TargetSettings> = Vec::new();

    for line in output.lines() {
        if let Some(caps) = header_re().captures(line.trim_end()) {
            targets.push(TargetSettings {
                target: caps[1].to_string(),
                settings: BTreeMap::new(),
            });
            continue;
        }

        let Some(current) = targets.last_mut() else {
            continue;
        };

        if let Some(caps) = setting_re().captures(line) {
            current
                .settings
                .insert(caps[1].to_string(), caps[2].trim_end().to_string());
        }
    }

    targets
}
