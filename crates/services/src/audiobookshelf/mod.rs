//! Audiobookshelf integration

mod client;
mod library;

pub use client::{AbsClient, AudiobookshelfApi};
pub use library::AbsLibraryIndex;

use serde::{Deserialize, Serialize};

/// An Audiobookshelf library with its folder roots
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbsLibrary {
    pub id: String,
    pub name: String,
    #[serde(rename = "mediaType", default)]
    pub media_type: String,
    #[serde(default)]
    pub folders: Vec<LibraryFolder>,
}

/// A folder root belonging to a library
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryFolder {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "fullPath")]
    pub full_path: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListLibrariesResponse {
    pub libraries: Vec<AbsLibrary>,
}
