//! `xcodebuild -version` parser and dotted version comparison.

use std::cmp::Ordering;

/// Extract the version number from `xcodebuild -version` output.
///
/// Expects a line of the form `Xcode 15.4` (older releases print
/// `Xcode 4.6.3`). Returns `None` if no such line exists.
pub fn parse_version(output: &str) -> Option<String> {
    output.lines().find_map(|line| {
        let version = line.trim().strip_prefix("Xcode ")?.trim();
        if version.is_empty() {
            None
        } else {
            Some(version.to_string())
        }
    })
}

/// Compare dotted versions numerically ("4.6" vs "4.0.0").
///
/// Missing trailing components count as zero, so "4.0" == "4.0.0".
/// Non-numeric components (beta suffixes and the like) count as zero.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let parse = |v: &str| -> Vec<u32> {
        v.split('.')
            .map(|s| s.trim().parse::<u32>().unwrap_or(0))
            .collect()
    };

    let a_parts = parse(a);
    let b_parts = parse(b);
    let len = a_parts.len().max(b_parts.len());

    for i in 0..len {
        let ap = a_parts.get(i).copied().unwrap_or(0);
        let bp = b_parts.get(i).copied().unwrap_or(0);
        match ap.cmp(&bp) {
            Ordering::Equal => continue,
            other => return other,
        }
    }

    Ordering::Equal
}
