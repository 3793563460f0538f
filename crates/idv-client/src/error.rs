//! Gateway error types and their mapping onto the verification taxonomy.

use idv_core::VerificationError;

/// Errors from verification API calls.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// HTTP transport error.
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        endpoint: String,
        source: reqwest::Error,
    },
    /// The API answered with a non-2xx status.
    #[error("verification API {endpoint} returned {status}: {body}")]
    ApiError {
        endpoint: String,
        status: u16,
        body: String,
    },
    /// The API accepted the request but reported failure in the body.
    #[error("verification API {endpoint} refused the submission: {}", .message.as_deref().unwrap_or("no reason given"))]
    Refused {
        endpoint: String,
        message: Option<String>,
    },
    /// Response deserialization failed.
    #[error("failed to deserialize response from {endpoint}: {source}")]
    Deserialization {
        endpoint: String,
        source: reqwest::Error,
    },
}

/// Pull a human-readable reason out of an error body: `error`, then
/// `message`, else nothing. Non-JSON bodies yield nothing.
pub(crate) fn body_reason(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["error", "message"].iter().find_map(|key| {
        value
            .get(key)
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    })
}

impl From<GatewayError> for VerificationError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::ApiError { status, body, .. } => VerificationError::RemoteRejection {
                status: Some(status),
                message: body_reason(&body),
            },
            GatewayError::Refused { message, .. } => VerificationError::RemoteRejection {
                status: None,
                message,
            },
            other @ (GatewayError::Http { .. } | GatewayError::Deserialization { .. }) => {
                VerificationError::TransportFailure {
                    reason: other.to_string(),
                }
            }
        }
    }
}
