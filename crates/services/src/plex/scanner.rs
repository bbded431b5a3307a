//! Plex library index and scan dispatch
//!
//! Discovers the server's sections once at construction and resolves
//! every scan against that immutable snapshot: local paths are
//! translated with the suffix mapper, the owning section is found by
//! longest-prefix match, and show scans are lifted from season folders
//! to the show root so Plex reconciles season additions and removals.

use crate::plex::client::PlexApi;
use crate::plex::path_map::{self, map_to_plex_path};
use crate::plex::types::{MediaKind, SectionRoot};
use mediawatch_core::error::{Error, Result};
use regex::Regex;
use std::sync::{Arc, LazyLock};
use tracing::info;

// Compile-time constant pattern, so we use infallible initialization
static SEASON_DIR: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)^season\s*\d+").ok());

fn is_season_dir(name: &str) -> bool {
    SEASON_DIR.as_ref().is_some_and(|re| re.is_match(name))
}

/// Plex library index
///
/// Holds the sections discovered at construction, sorted by root-path
/// length so nested library roots resolve to the most specific section.
pub struct PlexScanner {
    api: Arc<dyn PlexApi>,
    sections: Vec<SectionRoot>,
}

impl PlexScanner {
    /// Discover the server's sections and build the index.
    ///
    /// Fails when the server reports zero sections.
    pub async fn new(api: Arc<dyn PlexApi>) -> Result<Self> {
        let mut sections = api.list_sections().await?;
        if sections.is_empty() {
            return Err(Error::discovery("no Plex library sections found"));
        }

        // longest roots first for longest-prefix section resolution
        sections.sort_by(|a, b| b.root_path.len().cmp(&a.root_path.len()));

        for section in &sections {
            info!(
                title = %section.title,
                kind = ?section.kind,
                path = %section.root_path,
                "found Plex section"
            );
        }

        Ok(Self { api, sections })
    }

    /// All discovered sections, longest root first
    pub fn sections(&self) -> &[SectionRoot] {
        &self.sections
    }

    /// Map a local path to its Plex-visible path and owning section
    pub fn map_to_plex(&self, local_path: &str) -> Option<(String, &SectionRoot)> {
        map_to_plex_path(local_path, &self.sections)
    }

    /// Compute the optimal directory to scan for a file path.
    ///
    /// Movies scan the file's parent directory. Shows walk further up,
    /// past any trailing `Season N` folders, so the scan lands on the
    /// show root.
    pub fn scan_target(&self, path: &str, kind: MediaKind) -> String {
        let absolute = path.starts_with('/') || path.starts_with('\\');
        let mut parts = path_map::split_components(path);
        parts.pop();
        if kind == MediaKind::Show {
            while parts.last().is_some_and(|part| is_season_dir(part)) {
                parts.pop();
            }
        }
        let joined = parts.join("/");
        if absolute {
            format!("/{joined}")
        } else {
            joined
        }
    }

    /// Trigger a Plex scan for the given server-visible path.
    ///
    /// Resolves the owning section by longest-prefix match and invokes
    /// the section refresh endpoint; a path outside every section root
    /// is an error.
    pub async fn scan_path(&self, path: &str) -> Result<&SectionRoot> {
        let section = self.find_section(path)?;
        self.api.refresh_section(section.key, Some(path)).await?;
        info!(section = %section.title, path, "scanned Plex section");
        Ok(section)
    }

    /// Locate the section owning `path` (longest-prefix,
    /// case-insensitive, component-boundary-aware).
    fn find_section(&self, path: &str) -> Result<&SectionRoot> {
        let lower = path_map::normalize(path).to_lowercase();

        for section in &self.sections {
            let root_lower = section.root_path.to_lowercase();
            let is_exact = lower == root_lower;
            let is_sub_path = lower.len() > root_lower.len()
                && lower.starts_with(&root_lower)
                && lower.as_bytes()[root_lower.len()] == b'/';
            if is_exact || is_sub_path {
                return Ok(section);
            }
        }

        let roots: Vec<&str> = self.sections.iter().map(|s| s.root_path.as_str()).collect();
        Err(Error::path_mapping(format!(
            "no Plex section found for path '{path}'; available roots: {roots:?}"
        )))
    }
}
