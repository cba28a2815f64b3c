//! `xcodebuild -list` parser.

/// Facts reported by `xcodebuild -list` for a project or workspace.
///
/// Workspaces only report schemes; projects report all three sections.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOutput {
    /// Name from the `Information about project "X":` header, if present.
    pub name: Option<String>,
    pub targets: Vec<String>,
    pub build_configurations: Vec<String>,
    pub schemes: Vec<String>,
}

#[derive(Clone, Copy)]
enum Section {
    Targets,
    BuildConfigurations,
    Schemes,
    Other,
}

/// Parse `xcodebuild -list` output.
///
/// Section headers (`Targets:`, `Build Configurations:`, `Schemes:`) are
/// followed by one item per line until a blank line or the next header.
/// Unknown sections and free-text lines are ignored.
pub fn parse_list(output: &str) -> ListOutput {
    let mut result = ListOutput::default();
    let mut section: Option<Section> = None;

    for raw in output.lines() {
        let line = raw.trim();

        if line.is_empty() {
            section = None;
            continue;
        }

        if let Some(rest) = line.strip_prefix("Information about ") {
            result.name = rest
                .split_once('"')
                .and_then(|(_, tail)| tail.split_once('"'))
                .map(|(name, _)| name.to_string());
            section = None;
            continue;
        }

        if let Some(header) = line.strip_suffix(':') {
            section = Some(match header {
                "Targets" => Section::Targets,
                "Build Configurations" => Section::BuildConfigurations,
                "Schemes" => Section::Schemes,
                _ => Section::Other,
            });
            continue;
        }

        let bucket = match section {
            Some(Section::Targets) => &mut result.targets,
            Some(Section::BuildConfigurations) => &mut result.build_configurations,
            Some(Section::Schemes) => &mut result.schemes,
            Some(Section::Other) | None => continue,
        };

        if !bucket.iter().any(|existing| existing == line) {
            bucket.push(line.to_string());
        }
    }

    result
}
