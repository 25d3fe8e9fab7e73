//! `Config::load` against real files on disk, covering the TOML/JSON
//! extension dispatch the inline unit tests (which only deserialize JSON
//! strings in memory) don't exercise.

use rvsim_core::common::error::HostError;
use rvsim_core::Config;

fn config_path(tag: &str, ext: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("rvt-config-test-{}-{tag}.{ext}", std::process::id()))
}

#[test]
fn loads_toml_file_by_extension() {
    let path = config_path("toml", "toml");
    std::fs::write(&path, "[system]\nram_bytes = 2048\n").unwrap();

    let config = Config::load(path.to_str().unwrap()).unwrap();
    assert_eq!(config.system.ram_bytes, 2048);
    assert_eq!(config.system.storage_path, "storage.img");
    assert!(!config.general.trace);

    let _ = std::fs::remove_file(&path);
}

#[test]
fn loads_json_file_for_any_other_extension() {
    let path = config_path("json", "json");
    std::fs::write(&path, r#"{ "general": { "trace": true } }"#).unwrap();

    let config = Config::load(path.to_str().unwrap()).unwrap();
    assert!(config.general.trace);

    let _ = std::fs::remove_file(&path);
}

#[test]
fn malformed_toml_is_a_config_error_not_a_panic() {
    let path = config_path("bad", "toml");
    std::fs::write(&path, "not = [valid").unwrap();

    let err = Config::load(path.to_str().unwrap()).unwrap_err();
    assert!(matches!(err, HostError::Config { .. }));

    let _ = std::fs::remove_file(&path);
}
