//! Audiobookshelf library index

use crate::audiobookshelf::client::AudiobookshelfApi;
use crate::audiobookshelf::AbsLibrary;
use crate::plex::path_map::normalize;
use mediawatch_core::error::{Error, Result};
use std::sync::Arc;
use tracing::info;

/// Library index discovered once at construction, immutable afterwards
pub struct AbsLibraryIndex {
    api: Arc<dyn AudiobookshelfApi>,
    libraries: Vec<AbsLibrary>,
}

impl AbsLibraryIndex {
    /// Discover the server's libraries and build the index.
    ///
    /// Fails when the server reports zero libraries.
    pub async fn new(api: Arc<dyn AudiobookshelfApi>) -> Result<Self> {
        let libraries = api.list_libraries().await?;
        if libraries.is_empty() {
            return Err(Error::discovery("no Audiobookshelf libraries found"));
        }

        for library in &libraries {
            info!(
                name = %library.name,
                id = %library.id,
                folders = library.folders.len(),
                "found Audiobookshelf library"
            );
        }

        Ok(Self { api, libraries })
    }

    /// All discovered libraries
    pub fn libraries(&self) -> &[AbsLibrary] {
        &self.libraries
    }

    /// Find the library owning `path`.
    ///
    /// With exactly one library it is selected unconditionally.
    /// Otherwise the library whose folder is the longest
    /// case-insensitive, component-boundary-aware prefix of the path
    /// wins; a path outside every folder is an error.
    pub fn library_for_path(&self, path: &str) -> Result<&AbsLibrary> {
        if self.libraries.len() == 1 {
            return Ok(&self.libraries[0]);
        }

        let lower = normalize(path).to_lowercase();

        let mut longest_match = 0usize;
        let mut matched: Option<&AbsLibrary> = None;

        for library in &self.libraries {
            for folder in &library.folders {
                let folder_lower = normalize(&folder.full_path).to_lowercase();
                if folder_lower.is_empty() {
                    continue;
                }
                // the match must end at a component boundary, so
                // /media/audiobooks-new cannot match /media/audiobooks
                let is_exact = folder_lower.len() == lower.len() && lower == folder_lower;
                let is_sub_path = lower.len() > folder_lower.len()
                    && lower.starts_with(&folder_lower)
                    && lower.as_bytes()[folder_lower.len()] == b'/';
                if (is_exact || is_sub_path) && folder_lower.len() > longest_match {
                    longest_match = folder_lower.len();
                    matched = Some(library);
                }
            }
        }

        matched.ok_or_else(|| {
            Error::path_mapping(format!("no library found containing path: {path}"))
        })
    }

    /// Trigger a scan of the library owning `path`
    pub async fn scan_path(&self, path: &str) -> Result<()> {
        let library = self.library_for_path(path)?;
        self.api.scan_library(&library.id).await?;
        info!(library = %library.name, path, "scanned Audiobookshelf library");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audiobookshelf::LibraryFolder;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct MockAbsApi {
        libraries: Vec<AbsLibrary>,
        scanned: Mutex<Vec<String>>,
    }

    impl MockAbsApi {
        fn new(libraries: Vec<AbsLibrary>) -> Arc<Self> {
            Arc::new(Self {
                libraries,
                scanned: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl AudiobookshelfApi for MockAbsApi {
        async fn list_libraries(&self) -> Result<Vec<AbsLibrary>> {
            Ok(self.libraries.clone())
        }

        async fn scan_library(&self, id: &str) -> Result<()> {
            self.scanned.lock().unwrap().push(id.to_string());
            Ok(())
        }
    }

    fn library(id: &str, folders: &[&str]) -> AbsLibrary {
        AbsLibrary {
            id: id.to_string(),
            name: format!("library-{id}"),
            media_type: "book".to_string(),
            folders: folders
                .iter()
                .map(|path| LibraryFolder {
                    id: String::new(),
                    full_path: path.to_string(),
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_new_fails_on_zero_libraries() {
        let api = MockAbsApi::new(vec![]);
        let result = AbsLibraryIndex::new(api).await;
        assert!(matches!(result, Err(Error::Discovery(_))));
    }

    #[tokio::test]
    async fn test_single_library_matches_unconditionally() {
        let api = MockAbsApi::new(vec![library("a", &["/media/audiobooks"])]);
        let index = AbsLibraryIndex::new(api).await.unwrap();

        let matched = index.library_for_path("/somewhere/else/entirely").unwrap();
        assert_eq!(matched.id, "a");
    }

    #[tokio::test]
    async fn test_longest_folder_prefix_wins() {
        let api = MockAbsApi::new(vec![
            library("a", &["/media/audiobooks"]),
            library("b", &["/media/audiobooks/kids"]),
        ]);
        let index = AbsLibraryIndex::new(api).await.unwrap();

        let matched = index
            .library_for_path("/media/audiobooks/kids/The Hobbit/01.mp3")
            .unwrap();
        assert_eq!(matched.id, "b");
    }

    #[tokio::test]
    async fn test_prefix_match_respects_component_boundaries() {
        let api = MockAbsApi::new(vec![
            library("a", &["/media/audiobooks"]),
            library("b", &["/media/podcasts"]),
        ]);
        let index = AbsLibraryIndex::new(api).await.unwrap();

        let result = index.library_for_path("/media/audiobooks-new/title/01.mp3");
        assert!(matches!(result, Err(Error::PathMapping(_))));
    }

    #[tokio::test]
    async fn test_match_is_case_insensitive() {
        let api = MockAbsApi::new(vec![
            library("a", &["/Media/Audiobooks"]),
            library("b", &["/media/podcasts"]),
        ]);
        let index = AbsLibraryIndex::new(api).await.unwrap();

        let matched = index
            .library_for_path("/media/audiobooks/Title/01.mp3")
            .unwrap();
        assert_eq!(matched.id, "a");
    }

    #[tokio::test]
    async fn test_scan_path_scans_owning_library() {
        let api = MockAbsApi::new(vec![
            library("a", &["/media/audiobooks"]),
            library("b", &["/media/podcasts"]),
        ]);
        let index = AbsLibraryIndex::new(Arc::clone(&api) as Arc<dyn AudiobookshelfApi>)
            .await
            .unwrap();

        index
            .scan_path("/media/podcasts/Some Show/episode.mp3")
            .await
            .unwrap();
        assert_eq!(api.scanned.lock().unwrap().as_slice(), &["b".to_string()]);
    }
}
