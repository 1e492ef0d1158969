use crate::store::BlobInfo;
use std::path::Path;
use std::time::{Duration, SystemTime};
use tracing::{error, info, warn};
use walkdir::{DirEntry, WalkDir};

pub(crate) const TMP_MARKER: &str = ".lofttmp.";
const TMP_THRESHOLD: Duration = Duration::from_secs(300);

pub(crate) async fn purge_tmp(root: &Path) {
    let root = root.to_path_buf();
    let now = SystemTime::now();

    match tokio::task::spawn_blocking(move || remove_stale(&root, now, TMP_THRESHOLD, true)).await {
        Ok((removed, failed)) if removed > 0 || failed > 0 => {
            info!(removed, failed, "Purged interrupted uploads");
        },
        Err(e) => {
            error!(error = %e, "Temp file cleanup task panicked");
        },
        _ => {},
    }
}

/// Lists every committed blob under `root` with its last modification time.
pub(crate) fn scan_blobs(root: &Path) -> std::io::Result<Vec<BlobInfo>> {
    let mut blobs = Vec::new();

    for entry in WalkDir::new(root).min_depth(1) {
        let entry = entry.map_err(std::io::Error::other)?;
        if !entry.file_type().is_file() || is_tmp(&entry) {
            continue;
        }
        let Some(id) = entry.file_name().to_str() else {
            continue;
        };
        let modified = entry.metadata().map_err(std::io::Error::other)?.modified()?;
        blobs.push(BlobInfo { id: id.to_owned(), modified });
    }

    Ok(blobs)
}

/// Removes temp files older than `threshold`. With `prune_dirs`, empty shard
/// directories go too, which is only safe while no upload is running.
pub(crate) fn remove_stale(
    root: &Path,
    now: SystemTime,
    threshold: Duration,
    prune_dirs: bool,
) -> (usize, usize) {
    let mut removed = 0;
    let mut failed = 0;

    WalkDir::new(root)
        .contents_first(true)
        .into_iter()
        .flatten()
        .filter(|e| e.path() != root)
        .for_each(|entry| {
            let path = entry.path();

            if entry.file_type().is_file() {
                if is_tmp(&entry) && is_stale(&entry, now, threshold) {
                    match std::fs::remove_file(path) {
                        Ok(()) => removed += 1,
                        Err(e) => {
                            warn!(path = %path.display(), error = %e, "Failed to remove stale upload");
                            failed += 1;
                        },
                    }
                }
            } else if prune_dirs && entry.file_type().is_dir() {
                // Only succeeds for empty shard directories.
                let _ = std::fs::remove_dir(path);
            }
        });

    (removed, failed)
}

fn is_tmp(entry: &DirEntry) -> bool {
    entry.file_name().to_str().is_some_and(|name| name.contains(TMP_MARKER))
}

fn is_stale(entry: &DirEntry, now: SystemTime, threshold: Duration) -> bool {
    entry
        .metadata()
        .ok()
        .and_then(|m| m.modified().ok())
        .map(|modified| now.duration_since(modified).unwrap_or(Duration::ZERO))
        .is_none_or(|age| age >= threshold)
}
