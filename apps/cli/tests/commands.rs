use loft_cli::{Command, execute, run};
use loft_domain::config::LoftConfig;
use loft_metadata::MemoryMetadataStore;
use loft_namespace::NamespaceEngine;
use loft_storage::LocalBlobStore;
use std::time::Duration;
use tempfile::TempDir;

type Engine = NamespaceEngine<MemoryMetadataStore, LocalBlobStore>;

async fn engine() -> (Engine, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let physical =
        LocalBlobStore::builder().root(dir.path().join("blobs")).connect().await.unwrap();
    let engine = NamespaceEngine::builder()
        .metadata(MemoryMetadataStore::new())
        .physical(physical)
        .connect()
        .await
        .unwrap();
    (engine, dir)
}

async fn output(engine: &Engine, command: Command) -> anyhow::Result<String> {
    let mut out = Vec::new();
    execute(engine, command, Duration::from_secs(3600), &mut out).await?;
    Ok(String::from_utf8(out).unwrap())
}

fn s(value: &str) -> String {
    value.to_owned()
}

#[tokio::test]
async fn put_mv_cat_round_trip() {
    let (engine, dir) = engine().await;
    let local = dir.path().join("report.txt");
    std::fs::write(&local, "quarterly numbers").unwrap();

    output(&engine, Command::Mkdir { path: s("/docs") }).await.unwrap();
    let put = output(&engine, Command::Put { local, remote: s("/docs/report.txt") }).await.unwrap();
    assert_eq!(put, "/docs/report.txt: 17 bytes\n");

    output(&engine, Command::Mv { from: s("/docs"), to: s("/archive") }).await.unwrap();

    let body = output(&engine, Command::Cat { path: s("/archive/report.txt") }).await.unwrap();
    assert_eq!(body, "quarterly numbers");

    let listing = output(&engine, Command::Ls { path: s("/") }).await.unwrap();
    assert_eq!(listing.lines().count(), 1);
    assert!(listing.starts_with('d'));
    assert!(listing.trim_end().ends_with(" archive/"));
}

#[tokio::test]
async fn stat_and_rm() {
    let (engine, _dir) = engine().await;
    engine.write("/a.txt", b"hello").await.unwrap();

    let stat = output(&engine, Command::Stat { path: s("/a.txt") }).await.unwrap();
    assert!(stat.contains("kind:     file\n"));
    assert!(stat.contains("size:     5\n"));

    output(&engine, Command::Rm { path: s("/a.txt") }).await.unwrap();
    let err = output(&engine, Command::Stat { path: s("/a.txt") }).await.unwrap_err();
    assert_eq!(err.to_string(), "stat /a.txt");
    assert!(engine.stat("/a.txt").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn property_commands() {
    let (engine, _dir) = engine().await;
    engine.mkdir("/d", 0).await.unwrap();

    for (key, value) in [("DAV:displayname", "Docs"), ("x:owner", "ops")] {
        let command = Command::Propset { path: s("/d"), key: s(key), value: s(value) };
        output(&engine, command).await.unwrap();
    }
    output(&engine, Command::Propdel { path: s("/d"), key: s("x:owner") }).await.unwrap();
    output(&engine, Command::Propdel { path: s("/d"), key: s("x:never") }).await.unwrap();

    let props = output(&engine, Command::Props { path: s("/d") }).await.unwrap();
    assert_eq!(props, "DAV:displayname = Docs\n");
}

#[tokio::test]
async fn sweep_reports_counts() {
    let (engine, _dir) = engine().await;
    engine.write("/kept", b"kept").await.unwrap();

    let report = output(&engine, Command::Sweep { grace_secs: Some(0) }).await.unwrap();
    assert_eq!(report, "scanned 1, referenced 1, recent 0, deleted 0, failed 0, purged 0\n");
}

#[tokio::test]
async fn errors_name_the_command() {
    let (engine, _dir) = engine().await;

    let err = output(&engine, Command::Mkdir { path: s("/missing/child") }).await.unwrap_err();
    assert_eq!(err.to_string(), "mkdir /missing/child");

    let err = output(&engine, Command::Cat { path: s("/") }).await.unwrap_err();
    assert_eq!(err.to_string(), "cat /");
}

#[tokio::test]
async fn run_opens_the_configured_stores() {
    let dir = tempfile::tempdir().unwrap();
    let local = dir.path().join("note.txt");
    std::fs::write(&local, "note").unwrap();

    let mut config = LoftConfig::default();
    config.storage.root = dir.path().join("blobs");

    let mut out = Vec::new();
    run(Command::Put { local, remote: s("/note.txt") }, &config, &mut out).await.unwrap();

    assert_eq!(String::from_utf8(out).unwrap(), "/note.txt: 4 bytes\n");
    assert!(dir.path().join("blobs").is_dir());
}
