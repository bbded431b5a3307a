//! Audiobookshelf REST client

use crate::audiobookshelf::{AbsLibrary, ListLibrariesResponse};
use crate::plex::client::error_body;
use async_trait::async_trait;
use mediawatch_core::error::{Error, Result};
use reqwest::{Client, Url};
use tracing::debug;

/// Operations the library index needs from an Audiobookshelf server
#[async_trait]
pub trait AudiobookshelfApi: Send + Sync {
    async fn list_libraries(&self) -> Result<Vec<AbsLibrary>>;

    async fn scan_library(&self, id: &str) -> Result<()>;
}

/// HTTP client for the Audiobookshelf API
///
/// Authenticates with a bearer token, see
/// <https://www.audiobookshelf.org/guides/api-keys#authentication-header>
pub struct AbsClient {
    base_url: Url,
    api_key: String,
    http: Client,
}

impl AbsClient {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        let parsed = Url::parse(base_url)
            .map_err(|e| Error::config(format!("invalid Audiobookshelf base URL: {e}")))?;
        if parsed.host_str().is_none() || !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::config(format!(
                "invalid Audiobookshelf base URL, missing scheme or host: {base_url}"
            )));
        }

        let http = Client::builder()
            .timeout(crate::HTTP_TIMEOUT)
            .user_agent(concat!("mediawatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            base_url: parsed,
            api_key: api_key.to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url.as_str().trim_end_matches('/'))
    }
}

#[async_trait]
impl AudiobookshelfApi for AbsClient {
    async fn list_libraries(&self) -> Result<Vec<AbsLibrary>> {
        let response = self
            .http
            .get(self.endpoint("api/libraries"))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| Error::discovery(format!("audiobookshelf list libraries: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::discovery(format!(
                "audiobookshelf list libraries: http {status}: {}",
                error_body(response).await
            )));
        }

        let data: ListLibrariesResponse = response.json().await.map_err(|e| {
            Error::discovery(format!("audiobookshelf list libraries: decode: {e}"))
        })?;

        debug!(count = data.libraries.len(), "audiobookshelf libraries discovered");
        Ok(data.libraries)
    }

    async fn scan_library(&self, id: &str) -> Result<()> {
        let response = self
            .http
            .post(self.endpoint(&format!("api/libraries/{id}/scan")))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| Error::scan(format!("audiobookshelf scan library {id}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::scan(format!(
                "audiobookshelf scan library {id}: http {status}: {}",
                error_body(response).await
            )));
        }
        Ok(())
    }
}
