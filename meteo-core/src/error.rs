//! Error types and the failure classification used by the degrade-to-`None` clients.

use reqwest::StatusCode;
use std::path::PathBuf;

/// Errors from the geocoding endpoint.
#[derive(Debug, thiserror::Error)]
pub enum GeocodingError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Geocoding request failed with status {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("Failed to parse geocoding JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Errors from the forecast endpoint.
#[derive(Debug, thiserror::Error)]
pub enum ForecastError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Forecast request failed with status {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("JSON Parse error: {source}; body starts with: {snippet}")]
    Parse {
        source: serde_json::Error,
        snippet: String,
    },
    #[error("Inconsistent forecast payload: {0}")]
    Inconsistent(String),
    #[error("No forecast data: {0}")]
    NoData(&'static str),
}

/// Errors from the key-value backend behind the favorites store.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Storage I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Corrupt stored value: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// How a failed upstream call is reported.
///
/// Every kind ends up as the same empty result for the caller; the kind only
/// decides the log severity and what the detail screen can tell the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    NoData,
    Malformed,
    Timeout,
    Network,
    Storage,
    Unclassified,
}

impl FailureKind {
    /// Classify from an optional status code and the error's message.
    ///
    /// Order matters: markup and parse failures win over gateway hints, which
    /// win over generic transport hints.
    pub fn classify(status: Option<StatusCode>, message: &str) -> Self {
        if status == Some(StatusCode::GATEWAY_TIMEOUT) {
            return Self::Timeout;
        }

        if message.contains("JSON Parse error")
            || message.contains("Unexpected character")
            || message.contains('<')
        {
            return Self::Malformed;
        }

        if message.contains("504") || message.contains("Gateway") || message.contains("timeout") {
            return Self::Timeout;
        }

        const NETWORK_HINTS: [&str; 7] = [
            "Network",
            "Failed",
            "ECONNREFUSED",
            "ETIMEDOUT",
            "Connection refused",
            "dns error",
            "error sending request",
        ];
        if NETWORK_HINTS.iter().any(|hint| message.contains(hint)) {
            return Self::Network;
        }

        Self::Unclassified
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Unclassified)
    }
}

impl ForecastError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::NoData(_) => FailureKind::NoData,
            Self::Inconsistent(_) => FailureKind::Malformed,
            Self::Network(e) if e.is_timeout() => FailureKind::Timeout,
            Self::Network(e) if e.is_connect() => FailureKind::Network,
            Self::Network(e) => FailureKind::classify(e.status(), &e.to_string()),
            Self::Status { status, .. } => FailureKind::classify(Some(*status), &self.to_string()),
            Self::Parse { .. } => FailureKind::classify(None, &self.to_string()),
        }
    }
}

impl StorageError {
    pub fn kind(&self) -> FailureKind {
        FailureKind::Storage
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_errors_have_storage_kind() {
        let err = StorageError::Io {
            path: PathBuf::from("/data/weather_favorites.json"),
            source: std::io::Error::other("read-only"),
        };
        assert_eq!(err.kind(), FailureKind::Storage);
    }

    #[test]
    fn markup_is_malformed() {
        let kind = FailureKind::classify(None, "<html><body>Bad Gateway</body></html>");
        assert_eq!(kind, FailureKind::Malformed);
    }

    #[test]
    fn gateway_status_is_timeout_even_with_html_body() {
        let kind = FailureKind::classify(Some(StatusCode::GATEWAY_TIMEOUT), "<html>504</html>");
        assert_eq!(kind, FailureKind::Timeout);
    }

    #[test]
    fn gateway_substrings_are_timeout() {
        assert_eq!(FailureKind::classify(None, "status 504"), FailureKind::Timeout);
        assert_eq!(FailureKind::classify(None, "Gateway Time-out"), FailureKind::Timeout);
        assert_eq!(FailureKind::classify(None, "request timeout"), FailureKind::Timeout);
    }

    #[test]
    fn transport_substrings_are_network() {
        assert_eq!(FailureKind::classify(None, "connect ECONNREFUSED"), FailureKind::Network);
        assert_eq!(FailureKind::classify(None, "ETIMEDOUT"), FailureKind::Network);
        assert_eq!(FailureKind::classify(None, "Network request Failed"), FailureKind::Network);
    }

    #[test]
    fn anything_else_is_unclassified() {
        let kind = FailureKind::classify(Some(StatusCode::IM_A_TEAPOT), "teapot");
        assert_eq!(kind, FailureKind::Unclassified);
        assert!(kind.is_error());
    }

    #[test]
    fn parse_error_kind_is_malformed() {
        let source = serde_json::from_str::<serde_json::Value>("oops").unwrap_err();
        let err = ForecastError::Parse { source, snippet: "oops".into() };

        assert_eq!(err.kind(), FailureKind::Malformed);
    }

    #[test]
    fn no_data_and_inconsistent_kinds() {
        assert_eq!(ForecastError::NoData("hourly section absent").kind(), FailureKind::NoData);
        assert_eq!(
            ForecastError::Inconsistent("length mismatch".into()).kind(),
            FailureKind::Malformed
        );
    }

    #[test]
    fn status_with_html_body_is_malformed() {
        let err = ForecastError::Status {
            status: StatusCode::BAD_GATEWAY,
            body: "<html>oops</html>".into(),
        };
        assert_eq!(err.kind(), FailureKind::Malformed);
    }
}
