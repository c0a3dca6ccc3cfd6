//! Connection settings for a Subsonic server.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::error::{Result, SubsonicError};

/// Maximum bit rates (kbps) a transcoding profile may request.
pub const TRANSCODE_BITRATES: [u32; 7] = [64, 96, 128, 160, 192, 256, 320];

const DEFAULT_CLIENT_NAME: &str = "LibrarySync";
const DEFAULT_API_VERSION: &str = "1.16.1";

/// Target codec for server-side transcoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscodeFormat {
    Mp3,
    Opus,
    Aac,
}

impl TranscodeFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            TranscodeFormat::Mp3 => "mp3",
            TranscodeFormat::Opus => "opus",
            TranscodeFormat::Aac => "aac",
        }
    }
}

impl fmt::Display for TranscodeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transcoding profile applied to every stream URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscodeSettings {
    format: TranscodeFormat,
    max_bit_rate: u32,
}

impl TranscodeSettings {
    /// Fails unless `max_bit_rate` is one of [`TRANSCODE_BITRATES`].
    pub fn new(format: TranscodeFormat, max_bit_rate: u32) -> Result<Self> {
        if !TRANSCODE_BITRATES.contains(&max_bit_rate) {
            return Err(SubsonicError::InvalidConfig(format!(
                "unsupported max bit rate {} kbps (expected one of {:?})",
                max_bit_rate, TRANSCODE_BITRATES
            )));
        }
        Ok(Self {
            format,
            max_bit_rate,
        })
    }

    pub fn format(&self) -> TranscodeFormat {
        self.format
    }

    pub fn max_bit_rate(&self) -> u32 {
        self.max_bit_rate
    }
}

/// Server location, credentials and request behaviour.
///
/// # Example
///
/// ```ignore
/// use provider_subsonic::{SubsonicConfig, TranscodeFormat, TranscodeSettings};
///
/// let config = SubsonicConfig::new("https://music.example", "admin", "hunter2")
///     .with_transcoding(TranscodeSettings::new(TranscodeFormat::Opus, 128)?);
/// ```
#[derive(Clone)]
pub struct SubsonicConfig {
    pub server_url: String,
    pub username: String,
    pub password: String,
    pub client_name: String,
    pub api_version: String,
    pub transcoding: Option<TranscodeSettings>,
    pub request_timeout: Duration,
    pub max_retries: u32,
}

impl SubsonicConfig {
    pub fn new(
        server_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            server_url: server_url.into().trim_end_matches('/').to_string(),
            username: username.into(),
            password: password.into(),
            client_name: DEFAULT_CLIENT_NAME.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            transcoding: None,
            request_timeout: Duration::from_secs(10),
            max_retries: 3,
        }
    }

    pub fn with_client_name(mut self, name: impl Into<String>) -> Self {
        self.client_name = name.into();
        self
    }

    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    pub fn with_transcoding(mut self, settings: TranscodeSettings) -> Self {
        self.transcoding = Some(settings);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Attempts per request, including the first. Values below 1 are raised to 1.
    pub fn with_max_retries(mut self, attempts: u32) -> Self {
        self.max_retries = attempts.max(1);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.server_url.starts_with("http://") || self.server_url.starts_with("https://")) {
            return Err(SubsonicError::InvalidConfig(format!(
                "server url must be http(s): {}",
                self.server_url
            )));
        }
        if self.username.is_empty() {
            return Err(SubsonicError::InvalidConfig("username is empty".into()));
        }
        if self.request_timeout.is_zero() {
            return Err(SubsonicError::InvalidConfig(
                "request timeout must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for SubsonicConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubsonicConfig")
            .field("server_url", &self.server_url)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("client_name", &self.client_name)
            .field("api_version", &self.api_version)
            .field("transcoding", &self.transcoding)
            .field("request_timeout", &self.request_timeout)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}
