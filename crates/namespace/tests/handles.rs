mod common;

use common::{assert_coherent, engine, paths};
use loft_domain::OpenFlags;
use loft_metadata::MetadataStore;
use loft_namespace::{ErrorKind, FileHandle};
use std::io::SeekFrom;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

#[tokio::test]
async fn streaming_write_commits_on_close() {
    let (engine, _dir) = engine().await;
    let mut handle = engine.open_for_write("/log.txt", OpenFlags::CREATE, 0o644).await.unwrap();

    for chunk in [&b"alpha "[..], &b"beta "[..], &b"gamma"[..]] {
        assert_eq!(handle.write(chunk).await.unwrap(), chunk.len());
    }
    assert!(engine.stat("/log.txt").await.unwrap_err().is_not_found(), "invisible until close");

    let info = handle.close().await.unwrap();
    assert_eq!(info.size, 16);
    assert_eq!(handle.written(), 16);

    let mut body = String::new();
    engine.open_read("/log.txt").await.unwrap().read_to_string(&mut body).await.unwrap();
    assert_eq!(body, "alpha beta gamma");
    assert_coherent(engine.metadata()).await;
}

#[tokio::test]
async fn second_close_returns_the_cached_outcome() {
    let (engine, _dir) = engine().await;
    let mut handle = engine.open_for_write("/f", OpenFlags::CREATE, 0).await.unwrap();
    handle.write(b"once").await.unwrap();

    let first = handle.close().await.unwrap();
    let version = engine.metadata().get_index().await.unwrap().version;
    let second = handle.close().await.unwrap();

    assert_eq!(first, second);
    assert_eq!(engine.metadata().get_index().await.unwrap().version, version, "no second commit");

    let err = handle.write(b"late").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotSupported);
}

#[tokio::test]
async fn bodies_larger_than_the_pipe_stream_through() {
    let (engine, _dir) = engine().await;
    let chunk = vec![0x5a_u8; 48 * 1024];
    let mut handle = engine.open_for_write("/big", OpenFlags::CREATE, 0).await.unwrap();
    for _ in 0..8 {
        handle.write(&chunk).await.unwrap();
    }

    assert_eq!(handle.close().await.unwrap().size, 8 * 48 * 1024);
    assert_eq!(engine.stat("/big").await.unwrap().size, 8 * 48 * 1024);
}

#[tokio::test]
async fn open_flags_gate_existing_and_missing_paths() {
    let (engine, _dir) = engine().await;
    engine.write("/f", b"x").await.unwrap();
    engine.mkdir("/d", 0).await.unwrap();

    let cases = [
        ("/f", OpenFlags::CREATE, ErrorKind::AlreadyExists),
        ("/f", OpenFlags::CREATE_OR_REPLACE | OpenFlags::EXCLUSIVE, ErrorKind::AlreadyExists),
        ("/missing", OpenFlags::TRUNCATE, ErrorKind::NotFound),
        ("/d", OpenFlags::CREATE_OR_REPLACE, ErrorKind::NotSupported),
        ("/nowhere/f", OpenFlags::CREATE, ErrorKind::NotFound),
    ];
    for (path, flags, kind) in cases {
        let err = engine.open_for_write(path, flags, 0).await.unwrap_err();
        assert_eq!(err.kind(), kind, "{path} with {flags:?}");
    }

    let mut replace = engine.open_for_write("/f", OpenFlags::TRUNCATE, 0).await.unwrap();
    replace.write(b"replaced").await.unwrap();
    assert_eq!(replace.close().await.unwrap().size, 8);
}

#[tokio::test]
async fn dropping_an_open_handle_commits_nothing() {
    let (engine, _dir) = engine().await;
    let before = engine.metadata().get_index().await.unwrap();

    let mut handle = engine.open_for_write("/abandoned", OpenFlags::CREATE, 0).await.unwrap();
    handle.write(b"partial").await.unwrap();
    drop(handle);
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(engine.metadata().get_index().await.unwrap(), before);
    assert_eq!(paths(engine.metadata()).await, vec!["/"]);
}

fn partial_uploads(dir: &std::path::Path) -> Vec<std::path::PathBuf> {
    let mut found = Vec::new();
    for entry in std::fs::read_dir(dir).unwrap().flatten() {
        let path = entry.path();
        if path.is_dir() {
            found.extend(partial_uploads(&path));
        } else if entry.file_name().to_string_lossy().contains(".lofttmp.") {
            found.push(path);
        }
    }
    found
}

#[tokio::test]
async fn abandoned_uploads_leave_no_temp_files_after_a_sweep() {
    let (engine, dir) = engine().await;

    for n in 0..5 {
        let path = format!("/abandoned-{n}");
        let mut handle = engine.open_for_write(&path, OpenFlags::CREATE, 0).await.unwrap();
        handle.write(b"some partial body").await.unwrap();
        drop(handle);
    }
    tokio::time::sleep(Duration::from_millis(20)).await;

    let report = engine.sweep_orphans(Duration::ZERO).await.unwrap();

    assert_eq!(report.failed, 0);
    assert_eq!(report.deleted, 0);
    assert_eq!(partial_uploads(dir.path()), Vec::<std::path::PathBuf>::new());
    assert_eq!(paths(engine.metadata()).await, vec!["/"]);
}

#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl std::io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn failed_replacement_commit_is_logged() {
    let logs = Captured::default();
    let sink = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || sink.clone())
        .with_max_level(tracing::Level::WARN)
        .finish();
    let _log = tracing::subscriber::set_default(subscriber);

    let (engine, _dir) = engine().await;
    engine.write("/f", b"original").await.unwrap();
    let mut replace = engine.open_for_write("/f", OpenFlags::TRUNCATE, 0).await.unwrap();
    replace.write(b"replacement").await.unwrap();
    engine.remove_all("/f").await.unwrap();

    let err = replace.close().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let text = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
    assert!(text.contains("Replacement commit failed"), "logs: {text}");
    assert!(text.contains("/f"), "logs: {text}");
}

#[tokio::test]
async fn content_given_up_front_yields_a_closed_handle() {
    let (engine, _dir) = engine().await;
    let mut handle = engine
        .create_or_open_for_write("/inline", OpenFlags::CREATE, 0, Some(&b"inline body"[..]))
        .await
        .unwrap();

    assert!(engine.stat("/inline").await.is_ok(), "committed before close");
    assert_eq!(handle.close().await.unwrap().size, 11);

    let FileHandle::Write(mut write) = handle else { panic!("expected a write handle") };
    assert_eq!(write.write(b"more").await.unwrap_err().kind(), ErrorKind::NotSupported);
}

#[tokio::test]
async fn no_content_yields_an_open_write_handle() {
    let (engine, _dir) = engine().await;
    let mut handle = engine
        .create_or_open_for_write::<&[u8]>("/later", OpenFlags::CREATE, 0, None)
        .await
        .unwrap();
    let FileHandle::Write(write) = &mut handle else { panic!("expected a write handle") };
    write.write(b"later").await.unwrap();

    assert_eq!(handle.close().await.unwrap().size, 5);
}

#[tokio::test]
async fn read_handles_seek() {
    let (engine, _dir) = engine().await;
    engine.write("/digits", b"0123456789").await.unwrap();

    let mut handle = engine.open_read("/digits").await.unwrap();
    assert_eq!(handle.stat().size, 10);

    handle.seek(SeekFrom::Start(6)).await.unwrap();
    let mut tail = String::new();
    handle.read_to_string(&mut tail).await.unwrap();
    assert_eq!(tail, "6789");

    handle.seek(SeekFrom::End(-7)).await.unwrap();
    let mut three = [0_u8; 3];
    handle.read_exact(&mut three).await.unwrap();
    assert_eq!(&three, b"345");

    assert_eq!(handle.close().name, "digits");
}

#[tokio::test]
async fn directories_open_for_listing() {
    let (engine, _dir) = engine().await;
    engine.mkdir("/d", 0).await.unwrap();
    engine.write("/d/b", b"b").await.unwrap();
    engine.write("/d/a", b"a").await.unwrap();

    let mut handle = engine.open_for_read_or_list("/d").await.unwrap();
    assert!(handle.is_dir());
    let FileHandle::Directory(dir) = &handle else { panic!("expected a directory handle") };
    let names: Vec<_> = dir.list().await.unwrap().into_iter().map(|i| i.name).collect();
    assert_eq!(names, vec!["a", "b"]);

    engine.write("/d/c", b"c").await.unwrap();
    assert_eq!(dir.list().await.unwrap().len(), 3, "listing reads a fresh index");

    assert!(handle.close().await.unwrap().is_dir);
}

#[tokio::test]
async fn handle_kind_mismatches_are_not_supported() {
    let (engine, _dir) = engine().await;
    engine.mkdir("/d", 0).await.unwrap();
    engine.write("/f", b"x").await.unwrap();

    assert_eq!(engine.open_read("/d").await.unwrap_err().kind(), ErrorKind::NotSupported);
    assert_eq!(engine.open_dir("/f").await.unwrap_err().kind(), ErrorKind::NotSupported);
    assert!(engine.open_dir("/missing").await.unwrap_err().is_not_found());

    let dir = engine.open_dir("/d").await.unwrap();
    assert_eq!(dir.path().as_str(), "/d");
    assert!(dir.close().is_dir);
}
