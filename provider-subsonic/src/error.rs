//! Error types for the Subsonic provider

use bridge_traits::error::BridgeError;
use thiserror::Error;

/// Subsonic error code for "the requested data was not found".
pub const CODE_NOT_FOUND: i32 = 70;

/// Subsonic provider errors
#[derive(Error, Debug)]
pub enum SubsonicError {
    /// Server answered `status: "failed"`
    #[error("Subsonic API error {code}: {message}")]
    Api { code: i32, message: String },

    /// Non-success HTTP status
    #[error("HTTP error (status {status}): {message}")]
    Http { status: u16, message: String },

    /// Body could not be decoded
    #[error("Failed to parse API response: {0}")]
    Parse(String),

    /// Response decoded but lacked the expected element
    #[error("Response to {endpoint} lacks '{element}'")]
    MissingElement {
        endpoint: &'static str,
        element: &'static str,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Transport failure reported by the HTTP bridge
    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

/// Result type for Subsonic operations
pub type Result<T> = std::result::Result<T, SubsonicError>;

impl SubsonicError {
    /// Worth retrying: throttling, server-side failures and transport drops.
    pub fn is_transient(&self) -> bool {
        match self {
            SubsonicError::Http { status, .. } => *status == 429 || (500..600).contains(status),
            SubsonicError::Bridge(e) => e.is_connectivity(),
            _ => false,
        }
    }
}

impl From<SubsonicError> for BridgeError {
    fn from(error: SubsonicError) -> Self {
        match error {
            SubsonicError::Api { code, message } if code == CODE_NOT_FOUND => {
                BridgeError::NotFound(message)
            }
            SubsonicError::Api { code, message } => {
                BridgeError::OperationFailed(format!("Subsonic error {}: {}", code, message))
            }
            SubsonicError::Http { status: 404, message } => BridgeError::NotFound(message),
            SubsonicError::Http { status, message } if status == 429 || status >= 500 => {
                BridgeError::Connectivity(format!("HTTP {}: {}", status, message))
            }
            SubsonicError::Http { status, message } => {
                BridgeError::OperationFailed(format!("HTTP {}: {}", status, message))
            }
            error @ SubsonicError::Parse(_) => BridgeError::Malformed(error.to_string()),
            error @ SubsonicError::MissingElement { .. } => {
                BridgeError::Malformed(error.to_string())
            }
            SubsonicError::InvalidConfig(msg) => {
                BridgeError::NotAvailable(format!("Subsonic client misconfigured: {}", msg))
            }
            SubsonicError::Bridge(e) => e,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = SubsonicError::Api {
            code: 40,
            message: "Wrong username or password".to_string(),
        };

        assert_eq!(
            error.to_string(),
            "Subsonic API error 40: Wrong username or password"
        );
    }

    #[test]
    fn test_not_found_code_maps_to_not_found() {
        let error = SubsonicError::Api {
            code: CODE_NOT_FOUND,
            message: "Artist not found".to_string(),
        };
        assert!(matches!(BridgeError::from(error), BridgeError::NotFound(_)));
    }

    #[test]
    fn test_error_conversion() {
        let bridge: BridgeError = SubsonicError::Parse("eof".into()).into();
        assert!(matches!(bridge, BridgeError::Malformed(_)));

        let bridge: BridgeError = SubsonicError::Http {
            status: 503,
            message: "busy".into(),
        }
        .into();
        assert!(bridge.is_connectivity());

        let bridge: BridgeError =
            SubsonicError::Bridge(BridgeError::Connectivity("refused".into())).into();
        assert!(bridge.is_connectivity());
    }

    #[test]
    fn test_transient_classification() {
        assert!(SubsonicError::Http {
            status: 429,
            message: String::new()
        }
        .is_transient());
        assert!(!SubsonicError::Api {
            code: 70,
            message: String::new()
        }
        .is_transient());
    }
}
