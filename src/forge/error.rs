use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use thiserror::Error;

/// Errors raised while talking to the forge
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ForgeError {
    #[error("Request to {url} timed out")]
    Timeout { url: String },

    #[error("Network error contacting {url}: {message}")]
    Network { url: String, message: String },

    #[error("Forge returned HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Forge rate limit exceeded for {url}")]
    RateLimited {
        url: String,
        retry_after: Option<u64>,
    },

    #[error("Malformed response from {url}: {message}")]
    InvalidResponse { url: String, message: String },

    #[error("Invalid artifact bundle: {0}")]
    InvalidArchive(String),

    #[error("Download exceeds the {limit} byte ceiling")]
    TooLarge { limit: u64 },
}

impl ForgeError {
    pub(crate) fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ForgeError::Timeout {
                url: url.to_string(),
            }
        } else if err.is_decode() {
            ForgeError::InvalidResponse {
                url: url.to_string(),
                message: err.to_string(),
            }
        } else if let Some(status) = err.status() {
            ForgeError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            }
        } else {
            ForgeError::Network {
                url: url.to_string(),
                message: err.to_string(),
            }
        }
    }

    /// Maps a non-success response. GitHub signals exhausted quota either with
    /// 429 or with 403 plus `x-ratelimit-remaining: 0`.
    pub(crate) fn from_status(url: &str, status: StatusCode, headers: &HeaderMap) -> Self {
        let quota_exhausted = headers
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim() == "0")
            .unwrap_or(false);

        if status == StatusCode::TOO_MANY_REQUESTS
            || (status == StatusCode::FORBIDDEN && quota_exhausted)
        {
            let retry_after = headers
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            return ForgeError::RateLimited {
                url: url.to_string(),
                retry_after,
            };
        }

        ForgeError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        }
    }

    /// Whether repeating the same request later could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            ForgeError::Timeout { .. }
            | ForgeError::Network { .. }
            | ForgeError::RateLimited { .. } => true,
            ForgeError::Status { status, .. } => *status >= 500,
            ForgeError::InvalidResponse { .. }
            | ForgeError::InvalidArchive(_)
            | ForgeError::TooLarge { .. } => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ForgeError::Status { status: 404, .. })
    }
}
