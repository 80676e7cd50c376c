//! Tests for configuration loading and root folder resolution
//!
//! Uses serial_test to prevent environment variable races: tests that touch
//! MEALPLAN_ROOT_FOLDER are marked #[serial].

use mealplan_common::config::{
    CompiledDefaults, RootFolderInitializer, RootFolderResolver, TomlConfig, ROOT_FOLDER_ENV,
};
use serial_test::serial;
use std::env;
use std::path::PathBuf;

#[test]
fn test_compiled_defaults_for_current_platform() {
    let defaults = CompiledDefaults::for_current_platform();
    assert!(!defaults.root_folder.as_os_str().is_empty());
    assert!(defaults.root_folder.to_string_lossy().contains("mealplan"));
    assert_eq!(defaults.port, 5780);
}

#[test]
#[serial]
fn test_cli_argument_has_highest_priority() {
    env::set_var(ROOT_FOLDER_ENV, "/tmp/from-env");
    let toml = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/from-toml")),
        ..Default::default()
    };

    let resolver = RootFolderResolver::new(Some(PathBuf::from("/tmp/from-cli")), toml);
    assert_eq!(resolver.resolve(), PathBuf::from("/tmp/from-cli"));

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_environment_beats_toml() {
    env::set_var(ROOT_FOLDER_ENV, "/tmp/from-env");
    let toml = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/from-toml")),
        ..Default::default()
    };

    let resolver = RootFolderResolver::new(None, toml);
    assert_eq!(resolver.resolve(), PathBuf::from("/tmp/from-env"));

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_toml_used_without_cli_or_env() {
    env::remove_var(ROOT_FOLDER_ENV);
    let toml = TomlConfig::parse("root_folder = \"/tmp/from-toml\"").unwrap();

    let resolver = RootFolderResolver::new(None, toml);
    assert_eq!(resolver.resolve(), PathBuf::from("/tmp/from-toml"));
}

#[test]
#[serial]
fn test_no_overrides_uses_default() {
    env::remove_var(ROOT_FOLDER_ENV);

    let resolver = RootFolderResolver::new(None, TomlConfig::default());
    assert_eq!(
        resolver.resolve(),
        CompiledDefaults::for_current_platform().root_folder
    );
}

#[test]
fn test_initializer_creates_directories() {
    let temp = tempfile::tempdir().unwrap();
    let root = temp.path().join("nested").join("mealplan");

    let initializer = RootFolderInitializer::new(root.clone());
    initializer.ensure_directory_exists().unwrap();

    assert!(root.is_dir());
    assert!(initializer.uploads_path().is_dir());
    assert_eq!(initializer.database_path(), root.join("mealplan.db"));

    // Second call is a no-op
    initializer.ensure_directory_exists().unwrap();
}

#[test]
fn test_missing_config_file_is_error_not_panic() {
    let temp = tempfile::tempdir().unwrap();
    let result = TomlConfig::load(&temp.path().join("absent.toml"));
    assert!(result.is_err());
}
