//! Plex Media Server integration

pub(crate) mod client;
pub(crate) mod path_map;
mod scanner;
mod types;

pub use client::{PlexApi, PlexClient};
pub use path_map::map_to_plex_path;
pub use scanner::PlexScanner;
pub use types::{MediaKind, SectionRoot};
