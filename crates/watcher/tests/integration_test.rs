//! Integration tests for the directory observer
//!
//! These tests use temporary directories and real filesystem operations
//! to validate batching, debouncing and lifecycle behavior.

use mediawatch_core::types::{ServiceKind, WatchDir};
use mediawatch_watcher::{DirectoryObserver, EventOp, ObserverConfig, WatchEvent};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

fn watch_dir(path: &Path) -> WatchDir {
    WatchDir {
        path: path.to_path_buf(),
        service: ServiceKind::Plex,
        enabled: true,
    }
}

fn setup_observer(
    dirs: Vec<WatchDir>,
    debounce: Duration,
    recursive: bool,
) -> (DirectoryObserver, mpsc::UnboundedReceiver<WatchEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let config = ObserverConfig {
        dirs,
        recursive,
        debounce_window: debounce,
        handler: Arc::new(move |event| {
            let _ = tx.send(event);
        }),
    };
    let observer = DirectoryObserver::new(config).unwrap();
    (observer, rx)
}

/// Wait for the next change event on a specific path
async fn recv_change_for(
    rx: &mut mpsc::UnboundedReceiver<WatchEvent>,
    path: &Path,
    wait: Duration,
) -> Option<EventOp> {
    let deadline = tokio::time::Instant::now() + wait;
    loop {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        match timeout(remaining, rx.recv()).await {
            Ok(Some(WatchEvent::Change { path: p, op })) if p == path => return Some(op),
            Ok(Some(_)) => continue,
            Ok(None) | Err(_) => return None,
        }
    }
}

#[tokio::test]
async fn test_file_creation_detection() {
    let temp_dir = TempDir::new().unwrap();
    let (observer, mut rx) = setup_observer(
        vec![watch_dir(temp_dir.path())],
        Duration::from_millis(50),
        false,
    );
    observer.start(CancellationToken::new()).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let file = temp_dir.path().join("movie.mkv");
    tokio::fs::write(&file, b"data").await.unwrap();

    let op = recv_change_for(&mut rx, &file, Duration::from_secs(2))
        .await
        .expect("expected a change event");
    assert!(op.contains(EventOp::CREATE));

    observer.stop().await;
}

#[tokio::test]
async fn test_debounce_coalesces_burst_into_one_event() {
    let temp_dir = TempDir::new().unwrap();
    let (observer, mut rx) = setup_observer(
        vec![watch_dir(temp_dir.path())],
        Duration::from_millis(200),
        false,
    );
    observer.start(CancellationToken::new()).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    // create + two writes within the window
    let file = temp_dir.path().join("x.mkv");
    tokio::fs::write(&file, b"a").await.unwrap();
    tokio::time::sleep(Duration::from_millis(25)).await;
    tokio::fs::write(&file, b"ab").await.unwrap();
    tokio::time::sleep(Duration::from_millis(25)).await;
    tokio::fs::write(&file, b"abc").await.unwrap();

    let op = recv_change_for(&mut rx, &file, Duration::from_secs(2))
        .await
        .expect("expected one batched event");
    assert!(op.contains(EventOp::CREATE | EventOp::WRITE));

    // the burst was coalesced; nothing further arrives for this path
    let extra = recv_change_for(&mut rx, &file, Duration::from_secs(1)).await;
    assert!(extra.is_none(), "burst produced more than one event");

    observer.stop().await;
}

#[tokio::test]
async fn test_zero_debounce_forwards_immediately() {
    let temp_dir = TempDir::new().unwrap();
    let (observer, mut rx) =
        setup_observer(vec![watch_dir(temp_dir.path())], Duration::ZERO, false);
    observer.start(CancellationToken::new()).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let file = temp_dir.path().join("track.mp3");
    tokio::fs::write(&file, b"data").await.unwrap();

    let op = recv_change_for(&mut rx, &file, Duration::from_secs(2))
        .await
        .expect("expected an immediate event");
    assert!(!op.is_empty());

    observer.stop().await;
}

#[tokio::test]
async fn test_stop_flushes_pending_events() {
    let temp_dir = TempDir::new().unwrap();
    // window far longer than the test; only the final flush can deliver
    let (observer, mut rx) = setup_observer(
        vec![watch_dir(temp_dir.path())],
        Duration::from_secs(60),
        false,
    );
    observer.start(CancellationToken::new()).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let file = temp_dir.path().join("movie.mkv");
    tokio::fs::write(&file, b"data").await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;

    observer.stop().await;

    let op = recv_change_for(&mut rx, &file, Duration::from_millis(500))
        .await
        .expect("pending event was lost on stop");
    assert!(op.contains(EventOp::CREATE));
}

#[tokio::test]
async fn test_recursive_picks_up_new_subdirectories() {
    let temp_dir = TempDir::new().unwrap();
    let (observer, mut rx) = setup_observer(
        vec![watch_dir(temp_dir.path())],
        Duration::from_millis(50),
        true,
    );
    observer.start(CancellationToken::new()).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    // a directory created after start must itself be watched
    let show_dir = temp_dir.path().join("Season 01");
    tokio::fs::create_dir(&show_dir).await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;

    let episode = show_dir.join("S01E01.mkv");
    tokio::fs::write(&episode, b"data").await.unwrap();

    let op = recv_change_for(&mut rx, &episode, Duration::from_secs(2))
        .await
        .expect("expected an event from the new subdirectory");
    assert!(op.contains(EventOp::CREATE));

    observer.stop().await;
}

#[tokio::test]
async fn test_recursive_watches_existing_subdirectories() {
    let temp_dir = TempDir::new().unwrap();
    let nested = temp_dir.path().join("shows").join("Breaking Bad");
    tokio::fs::create_dir_all(&nested).await.unwrap();

    let (observer, mut rx) = setup_observer(
        vec![watch_dir(temp_dir.path())],
        Duration::from_millis(50),
        true,
    );
    observer.start(CancellationToken::new()).unwrap();
    // give the background subtree registration a moment
    tokio::time::sleep(Duration::from_millis(300)).await;

    let file = nested.join("pilot.mkv");
    tokio::fs::write(&file, b"data").await.unwrap();

    let op = recv_change_for(&mut rx, &file, Duration::from_secs(2))
        .await
        .expect("expected an event from the pre-existing subdirectory");
    assert!(op.contains(EventOp::CREATE));

    observer.stop().await;
}

#[tokio::test]
async fn test_start_twice_fails() {
    let temp_dir = TempDir::new().unwrap();
    let (observer, _rx) = setup_observer(
        vec![watch_dir(temp_dir.path())],
        Duration::from_millis(50),
        false,
    );
    observer.start(CancellationToken::new()).unwrap();

    let err = observer.start(CancellationToken::new()).unwrap_err();
    assert!(err.to_string().contains("already started"));

    observer.stop().await;
}

#[tokio::test]
async fn test_stop_is_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    let (observer, _rx) = setup_observer(
        vec![watch_dir(temp_dir.path())],
        Duration::from_millis(50),
        false,
    );
    observer.start(CancellationToken::new()).unwrap();

    observer.stop().await;
    observer.stop().await;
}

#[tokio::test]
async fn test_start_after_stop_fails() {
    let temp_dir = TempDir::new().unwrap();
    let (observer, _rx) = setup_observer(
        vec![watch_dir(temp_dir.path())],
        Duration::from_millis(50),
        false,
    );
    observer.start(CancellationToken::new()).unwrap();
    observer.stop().await;

    let err = observer.start(CancellationToken::new()).unwrap_err();
    assert!(err.to_string().contains("already closed"));
}

#[tokio::test]
async fn test_context_cancellation_flushes_and_stops_delivery() {
    let temp_dir = TempDir::new().unwrap();
    let (observer, mut rx) = setup_observer(
        vec![watch_dir(temp_dir.path())],
        Duration::from_secs(60),
        false,
    );
    let ctx = CancellationToken::new();
    observer.start(ctx.clone()).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let file = temp_dir.path().join("movie.mkv");
    tokio::fs::write(&file, b"data").await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;

    ctx.cancel();

    let op = recv_change_for(&mut rx, &file, Duration::from_secs(1))
        .await
        .expect("cancellation must flush pending events");
    assert!(op.contains(EventOp::CREATE));

    observer.stop().await;
}

#[tokio::test]
async fn test_distinct_paths_each_get_an_event() {
    let temp_dir = TempDir::new().unwrap();
    let (observer, mut rx) = setup_observer(
        vec![watch_dir(temp_dir.path())],
        Duration::from_millis(100),
        false,
    );
    observer.start(CancellationToken::new()).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let files: Vec<PathBuf> = (0..3)
        .map(|i| temp_dir.path().join(format!("file{i}.mkv")))
        .collect();
    for file in &files {
        tokio::fs::write(file, b"data").await.unwrap();
    }

    for file in &files {
        let op = recv_change_for(&mut rx, file, Duration::from_secs(2)).await;
        assert!(op.is_some(), "missing event for {}", file.display());
    }

    observer.stop().await;
}
