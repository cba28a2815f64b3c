//! End-to-end pipeline tests against the mock toolchain.
//!
//! Each test gets a scratch working directory; the mock toolchain writes the
//! dSYM and ipa where a real build would, so the archiving stage runs for real.

use std::fs;
use std::path::{Path, PathBuf};

use ipa_build::mock::{app_target, MockToolchain, ScriptedChooser, ToolchainCall};
use ipa_build::pipeline::{BuildOrchestrator, PipelineError, Stage};
use ipa_build::selection::SelectionError;
use ipa_build::settings::SettingsError;
use ipa_build::toolchain::{BuildAction, BuildContainer, ToolchainError, ToolchainInfo};
use ipa_build::BuildOptions;
use tempfile::TempDir;

fn info(configurations: &[&str], schemes: &[&str]) -> ToolchainInfo {
    ToolchainInfo {
        targets: vec!["App".to_string()],
        build_configurations: configurations.iter().map(|s| s.to_string()).collect(),
        schemes: schemes.iter().map(|s| s.to_string()).collect(),
    }
}

fn products_dir(work: &Path, configuration: &str) -> PathBuf {
    work.join(format!("Build/Products/{}-iphoneos", configuration))
}

fn release_toolchain(work: &Path) -> MockToolchain {
    MockToolchain::new()
        .with_info(info(&[], &["App"]))
        .with_settings(vec![app_target("App", &products_dir(work, "Release"), "Release")])
        .producing_artifacts()
}

fn workspace_options(destination: &Path) -> BuildOptions {
    BuildOptions {
        workspace: Some(PathBuf::from("App.xcworkspace")),
        scheme: Some("App".to_string()),
        configuration: Some("Release".to_string()),
        destination: Some(destination.to_path_buf()),
        ..Default::default()
    }
}

fn dir_entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}

fn package_request(calls: &[ToolchainCall]) -> ipa_build::toolchain::PackageRequest {
    calls
        .iter()
        .find_map(|c| match c {
            ToolchainCall::RunPackage(request) => Some(request.clone()),
            _ => None,
        })
        .expect("packaging was invoked")
}

#[test]
fn test_workspace_build_produces_ipa_and_dsym_zip() {
    let work = TempDir::new().unwrap();
    let out = work.path().join("out");
    let toolchain = release_toolchain(work.path());
    let chooser = ScriptedChooser::new(0);
    let orchestrator = BuildOrchestrator::new(&toolchain, &chooser, work.path().to_path_buf());

    let outcome = orchestrator.run(&workspace_options(&out)).unwrap();

    assert_eq!(outcome.ipa_path, out.join("App.ipa"));
    assert_eq!(outcome.dsym_zip_path, out.join("App.app.dSYM.zip"));
    assert_eq!(dir_entries(&out), vec!["App.app.dSYM.zip", "App.ipa"]);
    assert_eq!(
        outcome.stages,
        vec![
            Stage::Validated,
            Stage::Built,
            Stage::SettingsDiscovered,
            Stage::Packaged,
            Stage::SymbolsArchived,
            Stage::Done,
        ]
    );
    assert!(chooser.prompts().is_empty());
}

#[test]
fn test_invocation_sequence() {
    let work = TempDir::new().unwrap();
    let out = work.path().join("out");
    let toolchain = release_toolchain(work.path());
    let chooser = ScriptedChooser::new(0);
    let orchestrator = BuildOrchestrator::new(&toolchain, &chooser, work.path().to_path_buf());

    orchestrator.run(&workspace_options(&out)).unwrap();

    let calls = toolchain.calls();
    assert_eq!(calls.len(), 6);
    assert_eq!(calls[0], ToolchainCall::Version);
    assert_eq!(
        calls[1],
        ToolchainCall::QueryInfo(BuildContainer::Workspace(PathBuf::from("App.xcworkspace")))
    );
    assert!(matches!(calls[2], ToolchainCall::QuerySettings(_)));
    match &calls[3] {
        ToolchainCall::RunBuild(flags, actions) => {
            assert_eq!(
                flags.to_args(),
                vec![
                    "-sdk",
                    "iphoneos",
                    "-workspace",
                    "App.xcworkspace",
                    "-scheme",
                    "App",
                    "-configuration",
                    "Release"
                ]
            );
            assert_eq!(
                actions,
                &vec![BuildAction::Clean, BuildAction::Build, BuildAction::Archive]
            );
        }
        other => panic!("expected build, got {:?}", other),
    }
    assert!(matches!(calls[4], ToolchainCall::QuerySettings(_)));
    assert!(matches!(calls[5], ToolchainCall::RunPackage(_)));
}

#[test]
fn test_embed_falls_back_to_dsym_path() {
    let work = TempDir::new().unwrap();
    let out = work.path().join("out");
    let toolchain = release_toolchain(work.path());
    let chooser = ScriptedChooser::new(0);
    let orchestrator = BuildOrchestrator::new(&toolchain, &chooser, work.path().to_path_buf());

    orchestrator.run(&workspace_options(&out)).unwrap();

    let request = package_request(&toolchain.calls());
    let app = products_dir(work.path(), "Release").join("App.app");
    assert_eq!(request.app_path, app);
    assert_eq!(request.output_path, out.join("App.ipa"));
    assert_eq!(request.embed, format!("{}.dSYM", app.display()));
    assert_eq!(request.identity, None);
}

#[test]
fn test_profile_and_identity_from_config() {
    let work = TempDir::new().unwrap();
    fs::write(
        work.path().join("build.yml"),
        "identity: \"iPhone Distribution: Acme\"\nprofiles:\n  Release: dist.mobileprovision\n",
    )
    .unwrap();
    let out = work.path().join("out");
    let toolchain = release_toolchain(work.path());
    let chooser = ScriptedChooser::new(0);
    let orchestrator = BuildOrchestrator::new(&toolchain, &chooser, work.path().to_path_buf());

    orchestrator.run(&workspace_options(&out)).unwrap();

    let request = package_request(&toolchain.calls());
    assert_eq!(request.embed, "dist.mobileprovision");
    assert_eq!(request.identity.as_deref(), Some("iPhone Distribution: Acme"));
}

#[test]
fn test_cli_embed_and_identity_win() {
    let work = TempDir::new().unwrap();
    fs::write(
        work.path().join("build.yml"),
        "identity: FromFile\nprofiles:\n  Release: dist.mobileprovision\n",
    )
    .unwrap();
    let out = work.path().join("out");
    let toolchain = release_toolchain(work.path());
    let chooser = ScriptedChooser::new(0);
    let orchestrator = BuildOrchestrator::new(&toolchain, &chooser, work.path().to_path_buf());
    let options = BuildOptions {
        embed: Some("adhoc.mobileprovision".to_string()),
        identity: Some("FromCli".to_string()),
        ..workspace_options(&out)
    };

    orchestrator.run(&options).unwrap();

    let request = package_request(&toolchain.calls());
    assert_eq!(request.embed, "adhoc.mobileprovision");
    assert_eq!(request.identity.as_deref(), Some("FromCli"));
}

#[test]
fn test_build_failure_stops_pipeline() {
    let work = TempDir::new().unwrap();
    let out = work.path().join("out");
    let toolchain = release_toolchain(work.path()).with_build_failure(65);
    let chooser = ScriptedChooser::new(0);
    let orchestrator = BuildOrchestrator::new(&toolchain, &chooser, work.path().to_path_buf());

    let err = orchestrator.run(&workspace_options(&out)).unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Toolchain(ToolchainError::CommandFailed { code: Some(65), .. })
    ));
    assert_eq!(err.exit_code(), 5);

    let calls = toolchain.calls();
    assert!(matches!(calls.last(), Some(ToolchainCall::RunBuild(..))));
    let settings_queries = calls
        .iter()
        .filter(|c| matches!(c, ToolchainCall::QuerySettings(_)))
        .count();
    assert_eq!(settings_queries, 1);
    assert!(!calls.iter().any(|c| matches!(c, ToolchainCall::RunPackage(_))));
    // destination is prepared before the build runs, but nothing lands in it
    assert!(out.is_dir());
    assert!(dir_entries(&out).is_empty());
}

#[test]
fn test_package_failure_skips_symbols() {
    let work = TempDir::new().unwrap();
    let out = work.path().join("out");
    let toolchain = release_toolchain(work.path()).with_package_failure(1);
    let chooser = ScriptedChooser::new(0);
    let orchestrator = BuildOrchestrator::new(&toolchain, &chooser, work.path().to_path_buf());

    let err = orchestrator.run(&workspace_options(&out)).unwrap_err();

    assert_eq!(err.exit_code(), 5);
    assert!(dir_entries(&out).is_empty());
}

#[test]
fn test_old_xcode_aborts_before_anything_else() {
    let work = TempDir::new().unwrap();
    let out = work.path().join("out");
    let toolchain = release_toolchain(work.path()).with_version("3.2.6");
    let chooser = ScriptedChooser::new(0);
    let orchestrator = BuildOrchestrator::new(&toolchain, &chooser, work.path().to_path_buf());
    // A missing explicit config would also fail; the version check must come first.
    let options = BuildOptions {
        config_path: Some(PathBuf::from("missing.yml")),
        ..workspace_options(&out)
    };

    let err = orchestrator.run(&options).unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Toolchain(ToolchainError::Unsupported { .. })
    ));
    assert_eq!(err.exit_code(), 2);
    assert_eq!(toolchain.calls(), vec![ToolchainCall::Version]);
    assert!(!out.exists());
}

#[test]
fn test_missing_explicit_config() {
    let work = TempDir::new().unwrap();
    let toolchain = release_toolchain(work.path());
    let chooser = ScriptedChooser::new(0);
    let orchestrator = BuildOrchestrator::new(&toolchain, &chooser, work.path().to_path_buf());
    let options = BuildOptions {
        config_path: Some(PathBuf::from("missing.yml")),
        ..Default::default()
    };

    let err = orchestrator.run(&options).unwrap_err();

    assert_eq!(err.exit_code(), 2);
    assert!(err.to_string().contains("Cannot find file"));
    assert_eq!(toolchain.calls(), vec![ToolchainCall::Version]);
}

#[test]
fn test_empty_directory_has_nothing_to_build() {
    let work = TempDir::new().unwrap();
    let toolchain = release_toolchain(work.path());
    let chooser = ScriptedChooser::new(0);
    let orchestrator = BuildOrchestrator::new(&toolchain, &chooser, work.path().to_path_buf());

    let err = orchestrator.run(&BuildOptions::default()).unwrap_err();

    assert!(matches!(err, PipelineError::Selection(SelectionError::NoContainer(_))));
    assert_eq!(err.exit_code(), 3);
    assert_eq!(toolchain.calls(), vec![ToolchainCall::Version]);
}

#[test]
fn test_no_schemes_never_builds() {
    let work = TempDir::new().unwrap();
    fs::create_dir(work.path().join("App.xcodeproj")).unwrap();
    let toolchain = release_toolchain(work.path()).with_info(info(&["Debug", "Release"], &[]));
    let chooser = ScriptedChooser::new(0);
    let orchestrator = BuildOrchestrator::new(&toolchain, &chooser, work.path().to_path_buf());

    let err = orchestrator.run(&BuildOptions::default()).unwrap_err();

    assert!(matches!(err, PipelineError::Selection(SelectionError::NoSchemes)));
    assert!(!toolchain
        .calls()
        .iter()
        .any(|c| matches!(c, ToolchainCall::RunBuild(..))));
}

#[test]
fn test_detected_project_defaults_to_debug() {
    let work = TempDir::new().unwrap();
    fs::create_dir(work.path().join("App.xcodeproj")).unwrap();
    fs::write(work.path().join("build.yml"), "configuration: ~\n").unwrap();
    let toolchain = MockToolchain::new()
        .with_info(info(&["Debug", "Release"], &["App"]))
        .with_settings(vec![app_target("App", &products_dir(work.path(), "Debug"), "Debug")])
        .producing_artifacts();
    let chooser = ScriptedChooser::new(1);
    let orchestrator = BuildOrchestrator::new(&toolchain, &chooser, work.path().to_path_buf());

    let outcome = orchestrator.run(&BuildOptions::default()).unwrap();

    assert_eq!(
        outcome.target.container,
        BuildContainer::Project(work.path().join("App.xcodeproj"))
    );
    assert_eq!(outcome.target.configuration.as_deref(), Some("Debug"));
    assert!(chooser.prompts().is_empty());
    // destination defaults to the working directory
    assert_eq!(outcome.ipa_path, work.path().join("App.ipa"));
    assert!(work.path().join("App.app.dSYM.zip").is_file());
    assert!(!work.path().join("App.app.dSYM").exists());
}

#[test]
fn test_workspace_configuration_read_back_from_settings() {
    let work = TempDir::new().unwrap();
    fs::write(work.path().join("build.yml"), "configuration: ~\n").unwrap();
    let out = work.path().join("out");
    let toolchain = release_toolchain(work.path());
    let chooser = ScriptedChooser::new(0);
    let orchestrator = BuildOrchestrator::new(&toolchain, &chooser, work.path().to_path_buf());
    let options = BuildOptions {
        configuration: None,
        ..workspace_options(&out)
    };

    let outcome = orchestrator.run(&options).unwrap();

    assert_eq!(outcome.target.configuration.as_deref(), Some("Release"));
    let build_flags = toolchain
        .calls()
        .into_iter()
        .find_map(|c| match c {
            ToolchainCall::RunBuild(flags, _) => Some(flags),
            _ => None,
        })
        .unwrap();
    assert_eq!(build_flags.configuration.as_deref(), Some("Release"));
}

#[test]
fn test_artifacts_follow_post_build_settings() {
    let work = TempDir::new().unwrap();
    let out = work.path().join("out");
    let toolchain = MockToolchain::new()
        .with_info(info(&[], &["App"]))
        .with_settings(vec![app_target("App", &work.path().join("stale"), "Release")])
        .with_post_build_settings(vec![app_target(
            "App",
            &products_dir(work.path(), "Release"),
            "Release",
        )])
        .producing_artifacts();
    let chooser = ScriptedChooser::new(0);
    let orchestrator = BuildOrchestrator::new(&toolchain, &chooser, work.path().to_path_buf());

    let outcome = orchestrator.run(&workspace_options(&out)).unwrap();

    assert_eq!(
        outcome.artifacts.app_path,
        products_dir(work.path(), "Release").join("App.app")
    );
}

#[test]
fn test_no_app_target_aborts_before_build() {
    let work = TempDir::new().unwrap();
    let out = work.path().join("out");
    let toolchain = MockToolchain::new()
        .with_info(info(&[], &["App"]))
        .with_settings(vec![]);
    let chooser = ScriptedChooser::new(0);
    let orchestrator = BuildOrchestrator::new(&toolchain, &chooser, work.path().to_path_buf());

    let err = orchestrator.run(&workspace_options(&out)).unwrap_err();

    assert!(matches!(err, PipelineError::Settings(SettingsError::AppTargetNotFound)));
    assert_eq!(err.exit_code(), 4);
    assert!(!out.exists());
    assert!(!toolchain
        .calls()
        .iter()
        .any(|c| matches!(c, ToolchainCall::RunBuild(..))));
}

#[test]
fn test_skip_clean_and_archive() {
    let work = TempDir::new().unwrap();
    let out = work.path().join("out");
    let toolchain = release_toolchain(work.path());
    let chooser = ScriptedChooser::new(0);
    let orchestrator = BuildOrchestrator::new(&toolchain, &chooser, work.path().to_path_buf());
    let options = BuildOptions {
        clean: false,
        archive: false,
        ..workspace_options(&out)
    };

    orchestrator.run(&options).unwrap();

    let actions = toolchain
        .calls()
        .into_iter()
        .find_map(|c| match c {
            ToolchainCall::RunBuild(_, actions) => Some(actions),
            _ => None,
        })
        .unwrap();
    assert_eq!(actions, vec![BuildAction::Build]);
}

#[test]
fn test_relative_output_from_config() {
    let work = TempDir::new().unwrap();
    fs::write(work.path().join("build.yml"), "output: dist\n").unwrap();
    let toolchain = release_toolchain(work.path());
    let chooser = ScriptedChooser::new(0);
    let orchestrator = BuildOrchestrator::new(&toolchain, &chooser, work.path().to_path_buf());
    let options = BuildOptions {
        destination: None,
        ..workspace_options(Path::new("unused"))
    };

    let outcome = orchestrator.run(&options).unwrap();

    assert_eq!(outcome.ipa_path, work.path().join("dist/App.ipa"));
    assert!(outcome.ipa_path.is_file());
}
