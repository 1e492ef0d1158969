use loft_kernel::config::{load_config, load_config_with_env};
use loft_kernel::domain::config::{LoftConfig, MetadataBackend};
use std::io::Write;

fn write_toml(dir: &tempfile::TempDir, body: &str) -> std::path::PathBuf {
    let path = dir.path().join("loft.toml");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(body.as_bytes()).unwrap();
    path
}

#[test]
fn file_values_are_loaded() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_toml(
        &dir,
        r#"
[storage]
root = "/srv/loft"

[metadata]
backend = "surreal"
url = "ws://127.0.0.1:8000"
"#,
    );

    let cfg: LoftConfig = load_config(Some(&path)).unwrap();
    assert_eq!(cfg.storage.root, std::path::PathBuf::from("/srv/loft"));
    assert_eq!(cfg.metadata.backend, MetadataBackend::Surreal);
    assert_eq!(cfg.engine.max_retries, 8);
}

#[test]
fn environment_overrides_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_toml(&dir, "[engine]\nmax_retries = 2\n");

    let env = config::Map::from([
        ("LOFT__ENGINE__MAX_RETRIES".to_owned(), "5".to_owned()),
        ("LOFT__LOG__JSON".to_owned(), "true".to_owned()),
    ]);

    let cfg: LoftConfig = load_config_with_env(Some(&path), Some(env)).unwrap();
    assert_eq!(cfg.engine.max_retries, 5);
    assert!(cfg.log.json);
}

#[test]
fn explicit_missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_config::<LoftConfig>(Some(dir.path().join("absent.toml"))).unwrap_err();
    assert!(err.to_string().contains("Failed to build config"));
}
