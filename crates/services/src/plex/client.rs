//! Plex Media Server REST client

use crate::plex::path_map;
use crate::plex::types::{ListSectionsResponse, MediaKind, SectionRoot};
use async_trait::async_trait;
use mediawatch_core::error::{Error, Result};
use reqwest::{Client, Response, Url};
use tracing::debug;

/// Operations the scanner needs from a Plex server
#[async_trait]
pub trait PlexApi: Send + Sync {
    /// List all library sections, one entry per section location
    async fn list_sections(&self) -> Result<Vec<SectionRoot>>;

    /// Scan a specific path in a section, or the entire section when
    /// `path` is `None`
    async fn refresh_section(&self, key: i64, path: Option<&str>) -> Result<()>;
}

/// HTTP client for the Plex Media Server API
pub struct PlexClient {
    base_url: Url,
    token: String,
    http: Client,
}

impl PlexClient {
    /// Create a new client for the given base URL and token
    pub fn new(base_url: &str, token: &str) -> Result<Self> {
        if base_url.is_empty() {
            return Err(Error::config("Plex base URL is empty"));
        }
        let parsed = Url::parse(base_url)
            .map_err(|e| Error::config(format!("invalid Plex base URL: {e}")))?;
        if parsed.host_str().is_none() || !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::config(format!(
                "invalid Plex base URL, missing scheme or host: {base_url}"
            )));
        }

        let http = Client::builder()
            .timeout(crate::HTTP_TIMEOUT)
            .user_agent(concat!("mediawatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            base_url: parsed,
            token: token.to_string(),
            http,
        })
    }

    /// The configured server URL
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url.as_str().trim_end_matches('/'))
    }
}

#[async_trait]
impl PlexApi for PlexClient {
    async fn list_sections(&self) -> Result<Vec<SectionRoot>> {
        let response = self
            .http
            .get(self.endpoint("library/sections"))
            .query(&[("X-Plex-Token", self.token.as_str())])
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| Error::discovery(format!("plex list sections: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::discovery(format!(
                "plex list sections: http {status}: {}",
                error_body(response).await
            )));
        }

        let data: ListSectionsResponse = response
            .json()
            .await
            .map_err(|e| Error::discovery(format!("plex list sections: decode: {e}")))?;

        let mut sections = Vec::new();
        for dir in data.media_container.directory {
            let key: i64 = dir.key.parse().map_err(|_| {
                Error::discovery(format!("plex list sections: non-integer section key: {}", dir.key))
            })?;
            let kind = match dir.section_type.as_str() {
                "movie" => MediaKind::Movie,
                "show" => MediaKind::Show,
                other => {
                    return Err(Error::discovery(format!(
                        "plex list sections: unknown or unsupported section type: {other}"
                    )))
                }
            };
            // one entry per location so multi-root sections stay routable
            for location in dir.location {
                sections.push(SectionRoot {
                    key,
                    title: dir.title.clone(),
                    kind,
                    root_path: path_map::normalize(&location.path),
                });
            }
        }

        debug!(count = sections.len(), "plex sections discovered");
        Ok(sections)
    }

    async fn refresh_section(&self, key: i64, path: Option<&str>) -> Result<()> {
        let mut request = self
            .http
            .post(self.endpoint(&format!("library/sections/{key}/refresh")))
            .query(&[("X-Plex-Token", self.token.as_str())])
            .header("Accept", "application/json");

        request = match path {
            Some(path) if !path.is_empty() => request.query(&[("path", path)]),
            // no path: rescan the whole section
            _ => request.query(&[("force", "1")]),
        };

        let response = request
            .send()
            .await
            .map_err(|e| Error::scan(format!("plex refresh section {key}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::scan(format!(
                "plex refresh section {key}: http {status}: {}",
                error_body(response).await
            )));
        }
        Ok(())
    }
}

/// Read at most 4 KiB of an error response body
pub(crate) async fn error_body(response: Response) -> String {
    match response.text().await {
        Ok(mut body) => {
            body.truncate(4096);
            body
        }
        Err(_) => String::new(),
    }
}
