//! Media-server clients and library indices
//!
//! One submodule per supported service:
//!
//! - **plex**: REST client, section discovery, local-to-server path
//!   translation and section-aware scan dispatch
//! - **audiobookshelf**: REST client and library index with
//!   folder-prefix resolution
//!
//! Clients sit behind `async_trait` seams (`PlexApi`,
//! `AudiobookshelfApi`) so the indices can be exercised against mock
//! implementations in tests.

#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

pub mod audiobookshelf;
pub mod plex;

pub use audiobookshelf::{AbsClient, AbsLibrary, AbsLibraryIndex, AudiobookshelfApi};
pub use plex::{MediaKind, PlexApi, PlexClient, PlexScanner, SectionRoot};

/// Per-request timeout applied to every media-server HTTP call
pub(crate) const HTTP_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);
