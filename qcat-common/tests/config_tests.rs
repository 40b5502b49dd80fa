//! Configuration resolution and graceful degradation
//!
//! Tests that manipulate QCAT_ROOT_FOLDER are marked #[serial] so they never
//! race on the process environment.

use qcat_common::config::{
    load_toml_config, CompiledDefaults, RootFolderInitializer, RootFolderResolver, TomlConfig,
    ROOT_FOLDER_ENV,
};
use serial_test::serial;
use std::env;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_compiled_defaults_for_current_platform() {
    let defaults = CompiledDefaults::for_current_platform();

    assert!(!defaults.root_folder.as_os_str().is_empty());
    assert_eq!(defaults.log_level, "info");
    assert!(defaults.log_file.is_none());

    #[cfg(target_os = "linux")]
    {
        let path_str = defaults.root_folder.to_string_lossy();
        assert!(path_str.ends_with("qcat"), "Linux default should end in qcat");
    }
}

#[test]
#[serial]
fn test_resolver_with_no_overrides_uses_default() {
    env::remove_var(ROOT_FOLDER_ENV);

    let root_folder = RootFolderResolver::new(None, None).resolve();

    assert_eq!(root_folder, CompiledDefaults::for_current_platform().root_folder);
}

#[test]
#[serial]
fn test_resolver_priority_order() {
    let toml = TomlConfig::from_toml_str(r#"root_folder = "/tmp/qcat-from-toml""#).unwrap();

    // TOML beats the compiled default
    env::remove_var(ROOT_FOLDER_ENV);
    let resolved = RootFolderResolver::new(None, Some(&toml)).resolve();
    assert_eq!(resolved, PathBuf::from("/tmp/qcat-from-toml"));

    // Environment beats TOML
    env::set_var(ROOT_FOLDER_ENV, "/tmp/qcat-from-env");
    let resolved = RootFolderResolver::new(None, Some(&toml)).resolve();
    assert_eq!(resolved, PathBuf::from("/tmp/qcat-from-env"));

    // CLI beats everything
    let resolved =
        RootFolderResolver::new(Some(PathBuf::from("/tmp/qcat-from-cli")), Some(&toml)).resolve();
    assert_eq!(resolved, PathBuf::from("/tmp/qcat-from-cli"));

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_empty_env_var_is_ignored() {
    env::set_var(ROOT_FOLDER_ENV, "   ");

    let resolved = RootFolderResolver::new(None, None).resolve();
    assert_eq!(resolved, CompiledDefaults::for_current_platform().root_folder);

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
fn test_initializer_database_path() {
    let root = PathBuf::from("/tmp/qcat-test-root");
    let initializer = RootFolderInitializer::new(root.clone());

    assert_eq!(initializer.database_path(), root.join("qcat.db"));
    assert_eq!(initializer.root_folder(), root.as_path());
}

#[test]
fn test_initializer_creates_directory_idempotently() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("nested").join("qcat");

    let initializer = RootFolderInitializer::new(root.clone());
    initializer.ensure_directory_exists().unwrap();
    initializer.ensure_directory_exists().unwrap();

    assert!(root.is_dir());
}

#[test]
fn test_explicit_config_file_is_loaded() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
root_folder = "/srv/qcat"

[server]
port = 8080

[pagination]
default_page_size = 50
"#,
    )
    .unwrap();

    let config = load_toml_config(Some(&path)).unwrap().unwrap();
    assert_eq!(config.root_folder, Some(PathBuf::from("/srv/qcat")));
    assert_eq!(config.server.port, 8080);
    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.pagination.default_page_size, 50);
    assert_eq!(config.pagination.max_page_size, 500);
}

#[test]
fn test_missing_explicit_config_file_is_error() {
    let temp = TempDir::new().unwrap();
    let result = load_toml_config(Some(&temp.path().join("absent.toml")));
    assert!(result.is_err());
}
