//! End-to-end pipeline tests: filesystem event → routing → dedup →
//! bounded dispatch → mock media server refresh.

use async_trait::async_trait;
use mediawatch_core::error::Result;
use mediawatch_core::types::{ServiceKind, StartRequest, WatchDir};
use mediawatch_server::{ScanDispatcher, WatcherManager};
use mediawatch_services::plex::{MediaKind, PlexApi, PlexScanner, SectionRoot};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

struct RecordingPlexApi {
    sections: Vec<SectionRoot>,
    refreshed: Mutex<Vec<(i64, String)>>,
}

impl RecordingPlexApi {
    fn new(sections: Vec<SectionRoot>) -> Arc<Self> {
        Arc::new(Self {
            sections,
            refreshed: Mutex::new(Vec::new()),
        })
    }

    fn refreshed(&self) -> Vec<(i64, String)> {
        self.refreshed.lock().unwrap().clone()
    }
}

#[async_trait]
impl PlexApi for RecordingPlexApi {
    async fn list_sections(&self) -> Result<Vec<SectionRoot>> {
        Ok(self.sections.clone())
    }

    async fn refresh_section(&self, key: i64, path: Option<&str>) -> Result<()> {
        self.refreshed
            .lock()
            .unwrap()
            .push((key, path.unwrap_or_default().to_string()));
        Ok(())
    }
}

async fn wait_until(deadline: Duration, mut done: impl FnMut() -> bool) -> bool {
    let start = tokio::time::Instant::now();
    while start.elapsed() < deadline {
        if done() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    done()
}

#[tokio::test]
async fn test_file_event_drives_plex_refresh_at_item_root() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().to_string_lossy().into_owned();
    let movie_dir = temp_dir.path().join("Dune");
    tokio::fs::create_dir(&movie_dir).await.unwrap();

    // the Plex section is rooted at the watched directory itself, so
    // the suffix mapper resolves local paths to identical server paths
    let api = RecordingPlexApi::new(vec![SectionRoot {
        key: 12,
        title: "Movies".to_string(),
        kind: MediaKind::Movie,
        root_path: root.clone(),
    }]);
    let scanner = Arc::new(
        PlexScanner::new(Arc::clone(&api) as Arc<dyn PlexApi>)
            .await
            .unwrap(),
    );

    let dispatcher = ScanDispatcher::new(4, vec![".mkv".to_string()]);
    let manager = WatcherManager::new();
    manager.register_handler(ServiceKind::Plex, dispatcher.plex_handler(scanner, CancellationToken::new()));

    manager
        .start(&StartRequest {
            service_configs: Default::default(),
            watched_dirs: vec![WatchDir {
                path: temp_dir.path().to_path_buf(),
                service: ServiceKind::Plex,
                enabled: true,
            }],
            cooldown: 0,
        }, CancellationToken::new())
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;

    // an ignored sidecar file and the actual movie file
    tokio::fs::write(movie_dir.join("Dune.nfo"), b"metadata")
        .await
        .unwrap();
    tokio::fs::write(movie_dir.join("Dune.mkv"), b"video")
        .await
        .unwrap();

    let expected_target = format!("{root}/Dune");
    let reached = wait_until(Duration::from_secs(5), || {
        api.refreshed()
            .iter()
            .any(|(key, path)| *key == 12 && *path == expected_target)
    })
    .await;
    assert!(reached, "no refresh arrived for {expected_target}");

    // only media files trigger scans
    for (_, path) in api.refreshed() {
        assert_eq!(path, expected_target);
    }

    manager.stop().await;
}

#[tokio::test]
async fn test_burst_in_one_folder_yields_single_refresh() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().to_string_lossy().into_owned();
    let movie_dir = temp_dir.path().join("Arrival");
    tokio::fs::create_dir(&movie_dir).await.unwrap();

    let api = RecordingPlexApi::new(vec![SectionRoot {
        key: 3,
        title: "Movies".to_string(),
        kind: MediaKind::Movie,
        root_path: root.clone(),
    }]);
    let scanner = Arc::new(
        PlexScanner::new(Arc::clone(&api) as Arc<dyn PlexApi>)
            .await
            .unwrap(),
    );

    let dispatcher = ScanDispatcher::new(4, vec![".mkv".to_string()]);
    let manager = WatcherManager::new();
    manager.register_handler(ServiceKind::Plex, dispatcher.plex_handler(scanner, CancellationToken::new()));

    // one second of debounce coalesces the whole copy burst
    manager
        .start(&StartRequest {
            service_configs: Default::default(),
            watched_dirs: vec![WatchDir {
                path: temp_dir.path().to_path_buf(),
                service: ServiceKind::Plex,
                enabled: true,
            }],
            cooldown: 1,
        }, CancellationToken::new())
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;

    for i in 0..5 {
        tokio::fs::write(movie_dir.join(format!("part{i}.mkv")), b"video")
            .await
            .unwrap();
    }

    let expected_target = format!("{root}/Arrival");
    let reached = wait_until(Duration::from_secs(5), || !api.refreshed().is_empty()).await;
    assert!(reached, "no refresh arrived");

    // all five files share one scan target; dedup collapses the burst
    tokio::time::sleep(Duration::from_millis(500)).await;
    let refreshed = api.refreshed();
    assert_eq!(refreshed.len(), 1, "burst produced {refreshed:?}");
    assert_eq!(refreshed[0].1, expected_target);

    manager.stop().await;
}
