//! # idv-client — HTTP verification gateway
//!
//! [`HttpVerificationGateway`] implements
//! [`idv_core::VerificationGateway`] against the remote verification API:
//!
//! | Method | Path | Operation |
//! |--------|------|-----------|
//! | GET    | `/api/verification/verification-status` | [`query_status`](HttpVerificationGateway::fetch_status) |
//! | POST   | `/api/verification/verify-identity` | [`submit`](HttpVerificationGateway::submit_identity) |
//!
//! Both calls carry `Authorization: Bearer <token>`. Images travel as
//! standard base64 strings; an absent back page is an explicit `null`.
//!
//! The status query retries transport errors with backoff. Submission is
//! sent once and never retried, since the server records an approval as a
//! side effect.

pub mod config;
pub mod error;
pub(crate) mod retry;

pub use config::{ConfigError, GatewayConfig};
pub use error::GatewayError;

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use idv_core::{
    BearerToken, ImagePayload, StatusReport, SubmissionReceipt, SubmissionRequest,
    VerificationError, VerificationGateway,
};
use serde::Serialize;

/// Status endpoint path, relative to the base URL.
pub const STATUS_PATH: &str = "api/verification/verification-status";

/// Submission endpoint path, relative to the base URL.
pub const SUBMIT_PATH: &str = "api/verification/verify-identity";

/// JSON body of the submission call.
#[derive(Debug, Serialize)]
struct SubmitBody {
    selfie_image: String,
    rg_front_image: String,
    rg_back_image: Option<String>,
}

impl SubmitBody {
    fn encode(request: &SubmissionRequest) -> Self {
        let encode = |p: &ImagePayload| BASE64.encode(p.as_bytes());
        Self {
            selfie_image: encode(&request.selfie),
            rg_front_image: encode(&request.document_front),
            rg_back_image: request.document_back.as_ref().map(encode),
        }
    }
}

/// Remote verification gateway over HTTP.
#[derive(Debug, Clone)]
pub struct HttpVerificationGateway {
    http: reqwest::Client,
    config: GatewayConfig,
}

impl HttpVerificationGateway {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GatewayError::Http {
                endpoint: "client_init".into(),
                source: e,
            })?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// `GET /api/verification/verification-status`.
    pub async fn fetch_status(&self, token: &BearerToken) -> Result<StatusReport, GatewayError> {
        let endpoint = "GET /verification-status";
        let url = self.config.endpoint(STATUS_PATH);
        let auth = token.authorization_value();

        let resp = retry::retry_send(self.config.status_retries, || {
            self.http
                .get(&url)
                .header(reqwest::header::AUTHORIZATION, auth.as_str())
                .send()
        })
        .await
        .map_err(|e| GatewayError::Http {
            endpoint: endpoint.into(),
            source: e,
        })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp
                .text()
                .await
                .unwrap_or_else(|e| format!("<failed to read response body: {e}>"));
            return Err(GatewayError::ApiError {
                endpoint: endpoint.into(),
                status,
                body,
            });
        }

        resp.json()
            .await
            .map_err(|e| GatewayError::Deserialization {
                endpoint: endpoint.into(),
                source: e,
            })
    }

    /// `POST /api/verification/verify-identity`. Sent exactly once.
    pub async fn submit_identity(
        &self,
        token: &BearerToken,
        request: &SubmissionRequest,
    ) -> Result<SubmissionReceipt, GatewayError> {
        let endpoint = "POST /verify-identity";
        let url = self.config.endpoint(SUBMIT_PATH);
        let body = SubmitBody::encode(request);

        tracing::debug!(
            selfie_bytes = request.selfie.len(),
            front_bytes = request.document_front.len(),
            back_provided = request.has_document_back(),
            "submitting identity verification"
        );

        let resp = self
            .http
            .post(&url)
            .header(
                reqwest::header::AUTHORIZATION,
                token.authorization_value().as_str(),
            )
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::Http {
                endpoint: endpoint.into(),
                source: e,
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp
                .text()
                .await
                .unwrap_or_else(|e| format!("<failed to read response body: {e}>"));
            return Err(GatewayError::ApiError {
                endpoint: endpoint.into(),
                status,
                body,
            });
        }

        let receipt: SubmissionReceipt =
            resp.json()
                .await
                .map_err(|e| GatewayError::Deserialization {
                    endpoint: endpoint.into(),
                    source: e,
                })?;

        if !receipt.is_accepted() {
            return Err(GatewayError::Refused {
                endpoint: endpoint.into(),
                message: receipt.error.or(receipt.message),
            });
        }
        Ok(receipt)
    }
}

impl VerificationGateway for HttpVerificationGateway {
    async fn query_status(&self, token: &BearerToken) -> Result<StatusReport, VerificationError> {
        self.fetch_status(token).await.map_err(VerificationError::from)
    }

    async fn submit(
        &self,
        token: &BearerToken,
        request: &SubmissionRequest,
    ) -> Result<SubmissionReceipt, VerificationError> {
        self.submit_identity(token, request)
            .await
            .map_err(VerificationError::from)
    }
}
