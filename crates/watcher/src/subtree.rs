//! Background subtree watch registration
//!
//! Adding a watch is a syscall per directory, so large trees are
//! registered off the run loop: the tree is scanned first, then watches
//! are added by a pool of blocking workers. Individual failures are
//! logged and skipped so one unreadable directory never aborts a start.

use crate::observer::SharedWatcher;
use notify::{RecursiveMode, Watcher};
use std::path::PathBuf;
use std::sync::PoisonError;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Workers for syscall-bound watch registration
const SUBTREE_WORKERS: usize = 32;

/// Register watches for `root` and every directory beneath it without
/// blocking the caller.
pub(crate) fn spawn_watch(watcher: SharedWatcher, root: PathBuf) {
    tokio::spawn(watch_subtree(watcher, root));
}

async fn watch_subtree(watcher: SharedWatcher, root: PathBuf) {
    let scan_root = root.clone();
    let dirs = match tokio::task::spawn_blocking(move || collect_dirs(&scan_root)).await {
        Ok(dirs) => dirs,
        Err(e) => {
            warn!(root = %root.display(), "subtree scan task failed: {e}");
            return;
        }
    };

    debug!(count = dirs.len(), root = %root.display(), "directories discovered, adding watches");

    let chunk_size = dirs.len().div_ceil(SUBTREE_WORKERS).max(1);
    let mut handles = Vec::with_capacity(SUBTREE_WORKERS);
    for chunk in dirs.chunks(chunk_size) {
        let chunk = chunk.to_vec();
        let watcher = watcher.clone();
        handles.push(tokio::task::spawn_blocking(move || add_watches(&watcher, &chunk)));
    }

    let mut added = 0usize;
    let mut failed = 0usize;
    for handle in handles {
        if let Ok((a, f)) = handle.await {
            added += a;
            failed += f;
        }
    }

    if failed > 0 {
        warn!(added, failed, root = %root.display(), "some watches failed to add");
    } else {
        debug!(directories = added, root = %root.display(), "completed adding watches");
    }
}

fn collect_dirs(root: &PathBuf) -> Vec<PathBuf> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) if entry.file_type().is_dir() => Some(entry.into_path()),
            Ok(_) => None,
            Err(e) => {
                debug!("error accessing path during scan, skipping: {e}");
                None
            }
        })
        .collect()
}

fn add_watches(watcher: &SharedWatcher, dirs: &[PathBuf]) -> (usize, usize) {
    let mut added = 0;
    let mut failed = 0;
    for dir in dirs {
        let mut guard = watcher.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(watcher) = guard.as_mut() else {
            // observer stopped while registration was in flight
            return (added, failed);
        };
        match watcher.watch(dir, RecursiveMode::NonRecursive) {
            Ok(()) => added += 1,
            Err(e) => {
                debug!(path = %dir.display(), "failed to add watch: {e}");
                failed += 1;
            }
        }
    }
    (added, failed)
}
