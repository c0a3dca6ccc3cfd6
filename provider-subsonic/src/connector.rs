//! Subsonic API connector implementation
//!
//! Implements the `RemoteCatalogClient` trait for Subsonic API 1.16.

use async_trait::async_trait;
use bridge_traits::catalog::{
    AlbumDetail, AlbumListType, ArtistDetail, RemoteAlbum, RemoteArtist, RemoteCatalogClient,
};
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
use core_runtime::logging::redact_query_credentials;
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::config::SubsonicConfig;
use crate::error::{Result, SubsonicError};
use crate::types::{Envelope, SubsonicResponse};

/// Largest `size` `getAlbumList2` accepts.
pub const MAX_ALBUM_LIST_SIZE: u32 = 500;

/// Cover art edge length used when the caller does not ask for one.
pub const DEFAULT_COVER_ART_SIZE: u32 = 300;

/// Subsonic REST connector
///
/// Implements `RemoteCatalogClient` against any server speaking the Subsonic
/// API (Navidrome, Airsonic, Gonic).
///
/// # Features
///
/// - Password auth in hex form (`p=enc:...`), JSON responses (`f=json`)
/// - `status: "failed"` envelopes surfaced as typed errors (code 70 is not-found)
/// - Exponential backoff on HTTP 429/5xx and dropped connections
/// - Credential parameters are redacted from every log line
///
/// # Example
///
/// ```ignore
/// use provider_subsonic::{SubsonicClient, SubsonicConfig};
/// use bridge_traits::catalog::RemoteCatalogClient;
///
/// let client = SubsonicClient::new(http_client, SubsonicConfig::new(url, user, pass))?;
/// client.ping().await?;
/// let artists = client.list_artists().await?;
/// ```
pub struct SubsonicClient {
    http_client: Arc<dyn HttpClient>,
    config: SubsonicConfig,
}

impl SubsonicClient {
    pub fn new(http_client: Arc<dyn HttpClient>, config: SubsonicConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            http_client,
            config,
        })
    }

    pub fn config(&self) -> &SubsonicConfig {
        &self.config
    }

    /// Verify the server is reachable and accepts the credentials.
    #[instrument(skip(self), fields(server = %self.config.server_url))]
    pub async fn ping(&self) -> BridgeResult<()> {
        let response = self.call("ping", &[]).await?;
        info!(
            version = response.version.as_deref().unwrap_or("unknown"),
            "Subsonic server reachable"
        );
        Ok(())
    }

    /// Hex form of the password as Subsonic expects after `enc:`.
    fn encoded_password(&self) -> String {
        let mut hex = String::with_capacity(self.config.password.len() * 2);
        for byte in self.config.password.as_bytes() {
            let _ = write!(hex, "{:02x}", byte);
        }
        format!("enc:{}", hex)
    }

    /// Build `<server>/rest/<endpoint>?<auth>&<params>`.
    fn build_url(&self, endpoint: &str, params: &[(&str, String)]) -> String {
        let mut url = format!(
            "{}/rest/{}?u={}&p={}&v={}&c={}&f=json",
            self.config.server_url,
            endpoint,
            urlencoding::encode(&self.config.username),
            urlencoding::encode(&self.encoded_password()),
            urlencoding::encode(&self.config.api_version),
            urlencoding::encode(&self.config.client_name),
        );
        for (key, value) in params {
            url.push('&');
            url.push_str(key);
            url.push('=');
            url.push_str(&urlencoding::encode(value));
        }
        url
    }

    /// Execute API request with retry logic
    ///
    /// Retries transient failures with exponential backoff; anything else is
    /// returned on first sight.
    async fn execute_with_retry(&self, url: &str) -> Result<HttpResponse> {
        let mut attempt = 0;

        loop {
            let request = HttpRequest::get(url)
                .header("Accept", "application/json")
                .timeout(self.config.request_timeout);

            let error = match self.http_client.execute(request).await {
                Ok(response) if response.is_success() => return Ok(response),
                Ok(response) => SubsonicError::Http {
                    status: response.status,
                    message: response.text_lossy(),
                },
                Err(e) => SubsonicError::Bridge(e),
            };

            attempt += 1;
            if !error.is_transient() || attempt >= self.config.max_retries {
                warn!(
                    url = %redact_query_credentials(url),
                    attempts = attempt,
                    error = %error,
                    "Subsonic request failed"
                );
                return Err(error);
            }

            let backoff_ms = 100u64 * 2u64.pow(attempt);
            warn!(
                attempt,
                max_retries = self.config.max_retries,
                backoff_ms,
                error = %error,
                "Subsonic request failed, retrying"
            );
            tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
        }
    }

    /// Call an endpoint and unwrap the `subsonic-response` envelope.
    async fn call(&self, endpoint: &'static str, params: &[(&str, String)]) -> Result<SubsonicResponse> {
        let url = self.build_url(endpoint, params);
        debug!(url = %redact_query_credentials(&url), "Subsonic request");

        let response = self.execute_with_retry(&url).await?;
        let envelope: Envelope = serde_json::from_slice(&response.body).map_err(|e| {
            SubsonicError::Parse(format!("Failed to parse {} response: {}", endpoint, e))
        })?;

        let body = envelope.response;
        if body.is_ok() {
            return Ok(body);
        }
        let (code, message) = body
            .error
            .map(|e| (e.code, e.message))
            .unwrap_or((0, "Unknown error".to_string()));
        warn!(endpoint, code, message = %message, "Subsonic API error");
        Err(SubsonicError::Api { code, message })
    }
}

#[async_trait]
impl RemoteCatalogClient for SubsonicClient {
    #[instrument(skip(self))]
    async fn list_artists(&self) -> BridgeResult<Vec<RemoteArtist>> {
        let response = self.call("getArtists", &[]).await?;
        let index = response.artists.ok_or(SubsonicError::MissingElement {
            endpoint: "getArtists",
            element: "artists",
        })?;

        let artists: Vec<RemoteArtist> = index.flatten().into_iter().map(Into::into).collect();
        info!("Listed {} artists", artists.len());
        Ok(artists)
    }

    #[instrument(skip(self), fields(artist_id = %id))]
    async fn get_artist(&self, id: &str) -> BridgeResult<ArtistDetail> {
        let response = self.call("getArtist", &[("id", id.to_string())]).await?;
        let artist = response.artist.ok_or(SubsonicError::MissingElement {
            endpoint: "getArtist",
            element: "artist",
        })?;

        Ok(ArtistDetail {
            artist: artist.artist.into(),
            albums: artist.album.into_iter().map(Into::into).collect(),
        })
    }

    #[instrument(skip(self), fields(album_id = %id))]
    async fn get_album(&self, id: &str) -> BridgeResult<AlbumDetail> {
        let response = self.call("getAlbum", &[("id", id.to_string())]).await?;
        let album = response.album.ok_or(SubsonicError::MissingElement {
            endpoint: "getAlbum",
            element: "album",
        })?;

        Ok(AlbumDetail {
            album: album.album.into(),
            songs: album.song.into_iter().map(Into::into).collect(),
        })
    }

    #[instrument(skip(self))]
    async fn list_albums(
        &self,
        list_type: AlbumListType,
        size: u32,
        offset: u32,
    ) -> BridgeResult<Vec<RemoteAlbum>> {
        let size = size.clamp(1, MAX_ALBUM_LIST_SIZE);
        let response = self
            .call(
                "getAlbumList2",
                &[
                    ("type", list_type.as_str().to_string()),
                    ("size", size.to_string()),
                    ("offset", offset.to_string()),
                ],
            )
            .await?;

        // Servers omit the element entirely for an empty page.
        let albums = response.album_list2.unwrap_or_default().album;
        debug!(count = albums.len(), "Listed album page");
        Ok(albums.into_iter().map(Into::into).collect())
    }

    fn resolve_stream_url(&self, song_id: &str) -> BridgeResult<String> {
        let mut params = vec![("id", song_id.to_string())];
        if let Some(transcoding) = &self.config.transcoding {
            params.push(("maxBitRate", transcoding.max_bit_rate().to_string()));
            params.push(("format", transcoding.format().as_str().to_string()));
        }
        Ok(self.build_url("stream", &params))
    }

    fn resolve_cover_art_url(&self, cover_art_id: &str, size: Option<u32>) -> BridgeResult<String> {
        Ok(self.build_url(
            "getCoverArt",
            &[
                ("id", cover_art_id.to_string()),
                ("size", size.unwrap_or(DEFAULT_COVER_ART_SIZE).to_string()),
            ],
        ))
    }
}
