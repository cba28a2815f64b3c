//! Subprocess-backed toolchain: `xcodebuild` and `xcrun PackageApplication`.

use std::process::{Command, Output, Stdio};

use ipa_xcodebuild::{parse_build_settings, parse_list, parse_version, TargetSettings};

use super::{BuildAction, BuildContainer, BuildFlags, PackageRequest, Toolchain, ToolchainError, ToolchainInfo};

const XCODEBUILD: &str = "xcodebuild";
const XCRUN: &str = "xcrun";

/// Real toolchain. Blocks on every subprocess; there is no timeout.
#[derive(Debug, Clone, Default)]
pub struct Xcodebuild {
    /// Pass subprocess stdout through instead of discarding it
    pub verbose: bool,
}

impl Xcodebuild {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    fn describe(program: &str, args: &[String]) -> String {
        let mut command = program.to_string();
        for arg in args {
            command.push(' ');
            if arg.contains(' ') {
                command.push('\'');
                command.push_str(arg);
                command.push('\'');
            } else {
                command.push_str(arg);
            }
        }
        command
    }

    /// Run and capture output, failing on non-zero exit.
    fn capture(&self, program: &str, args: &[String]) -> Result<Output, ToolchainError> {
        log::debug!("$ {}", Self::describe(program, args));

        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| ToolchainError::Spawn {
                program: program.to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(ToolchainError::CommandFailed {
                command: Self::describe(program, args),
                code: output.status.code(),
            });
        }

        Ok(output)
    }

    /// Run with inherited stderr; stdout is discarded unless verbose.
    fn run(&self, mut command: Command, program: &str, args: &[String]) -> Result<(), ToolchainError> {
        log::debug!("$ {}", Self::describe(program, args));

        let stdout = if self.verbose {
            Stdio::inherit()
        } else {
            Stdio::null()
        };

        let status = command
            .args(args)
            .stdout(stdout)
            .status()
            .map_err(|source| ToolchainError::Spawn {
                program: program.to_string(),
                source,
            })?;

        if !status.success() {
            return Err(ToolchainError::CommandFailed {
                command: Self::describe(program, args),
                code: status.code(),
            });
        }

        Ok(())
    }
}

/// Build invocation: `xcodebuild <flags> <actions>` with `CC` cleared.
fn build_command(flags: &BuildFlags, actions: &[BuildAction]) -> (Command, Vec<String>) {
    let mut args = flags.to_args();
    args.extend(actions.iter().map(|a| a.as_str().to_string()));

    // CC from the caller's environment overrides Xcode's compiler selection.
    let mut command = Command::new(XCODEBUILD);
    command.env_remove("CC");

    (command, args)
}

impl Toolchain for Xcodebuild {
    fn version(&self) -> Result<String, ToolchainError> {
        let output = self.capture(XCODEBUILD, &["-version".to_string()])?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_version(&stdout).ok_or_else(|| ToolchainError::UnparsableVersion(stdout.trim().to_string()))
    }

    fn query_info(&self, container: &BuildContainer) -> Result<ToolchainInfo, ToolchainError> {
        let args = vec![
            "-list".to_string(),
            container.flag().to_string(),
            container.path().to_string_lossy().to_string(),
        ];
        let output = self.capture(XCODEBUILD, &args)?;
        Ok(parse_list(&String::from_utf8_lossy(&output.stdout)).into())
    }

    fn query_settings(&self, flags: &BuildFlags) -> Result<Vec<TargetSettings>, ToolchainError> {
        let mut args = flags.to_args();
        args.push("-showBuildSettings".to_string());
        let output = self.capture(XCODEBUILD, &args)?;
        Ok(parse_build_settings(&String::from_utf8_lossy(&output.stdout)))
    }

    fn run_build(&self, flags: &BuildFlags, actions: &[BuildAction]) -> Result<(), ToolchainError> {
        let (command, args) = build_command(flags, actions);
        self.run(command, XCODEBUILD, &args)
    }

    fn run_package(&self, request: &PackageRequest) -> Result<(), ToolchainError> {
        let mut args = vec![
            "-sdk".to_string(),
            request.sdk.clone(),
            "PackageApplication".to_string(),
            "-v".to_string(),
            request.app_path.to_string_lossy().to_string(),
            "-o".to_string(),
            request.output_path.to_string_lossy().to_string(),
            "--embed".to_string(),
            request.embed.clone(),
        ];
        if let Some(identity) = &request.identity {
            args.push("-s".to_string());
            args.push(identity.clone());
        }

        self.run(Command::new(XCRUN), XCRUN, &args)
    }
}
