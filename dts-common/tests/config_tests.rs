//! Bootstrap configuration loading from disk

use dts_common::config::{resolve_database_path, resolve_root_folder, TomlConfig, DATABASE_FILE};
use std::io::Write;
use std::path::{Path, PathBuf};

#[test]
fn test_load_explicit_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
root_folder = "/srv/dts"
port = 6000

[logging]
level = "debug"
"#
    )
    .unwrap();

    let config = TomlConfig::load(Some(file.path())).unwrap();
    assert_eq!(config.port, Some(6000));
    assert_eq!(config.logging.level, "debug");

    let root = resolve_root_folder(Some(Path::new("/cli/root")), &config);
    assert_eq!(root, PathBuf::from("/cli/root"));
    assert_eq!(resolve_database_path(&root, &config), root.join(DATABASE_FILE));
}

#[test]
fn test_explicit_database_path_wins() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, r#"database_path = "/data/other.db""#).unwrap();

    let config = TomlConfig::load(Some(file.path())).unwrap();
    assert_eq!(
        resolve_database_path(Path::new("/ignored"), &config),
        PathBuf::from("/data/other.db")
    );
}

#[test]
fn test_malformed_file_is_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "port = [not a number").unwrap();

    assert!(TomlConfig::load(Some(file.path())).is_err());
}
