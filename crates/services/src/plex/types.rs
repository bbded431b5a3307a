//! Plex domain and wire types

use serde::{Deserialize, Serialize};

/// Kind of media a Plex section holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Movie,
    Show,
}

/// A Plex library section root
///
/// A section with multiple locations is represented by one entry per
/// location, all sharing `key`. Never mutated after discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionRoot {
    pub key: i64,
    pub title: String,
    pub kind: MediaKind,
    /// Server-visible root path, normalized to forward slashes
    pub root_path: String,
}

// Wire types matching the Plex `/library/sections` response schema.

#[derive(Debug, Deserialize)]
pub(crate) struct ListSectionsResponse {
    #[serde(rename = "MediaContainer")]
    pub media_container: MediaContainer,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MediaContainer {
    #[serde(rename = "Directory", default)]
    pub directory: Vec<Directory>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Directory {
    pub key: String,
    pub title: String,
    #[serde(rename = "type")]
    pub section_type: String,
    #[serde(rename = "Location", default)]
    pub location: Vec<Location>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Location {
    pub path: String,
}
