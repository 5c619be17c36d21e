//! Typed wrappers for the generation endpoints.
//!
//! Each wrapper builds the request from the client, sends it, and parses the
//! response into its wire type. Rejections carrying the backend's structured
//! error envelope surface as [`ApiError::Backend`] so callers can classify
//! by code without inspecting raw payloads.

use std::time::Instant;

use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};

use reelgen_types::{
    ApiErrorEnvelope, ClipPromptRequest, ClipPromptResponse, CreateGenerationRequest, CreateGenerationResponse,
    GenerationAssets, GenerationListResponse, GenerationStatusResponse, ListGenerationsQuery,
};

use crate::ReelgenClient;

/// Path of the clip-prompt generation endpoint.
pub const CLIP_PROMPTS_PATH: &str = "/v1/clip-prompts";

/// Error surfaced by the typed endpoint wrappers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The backend rejected the request with a structured error envelope.
    #[error("backend rejected the request ({code})")]
    Backend { code: String, message: String, status: u16 },
    /// Non-success response without a parseable error envelope.
    #[error("unexpected HTTP status {status}")]
    Http { status: u16 },
    /// Network, TLS, or timeout failure before a response arrived.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// The response body did not match the expected wire shape.
    #[error("unexpected response payload: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    /// Structured backend error code, when one was supplied.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Backend { code, .. } => Some(code),
            _ => None,
        }
    }
}

impl ReelgenClient {
    /// `POST /v1/generations`: submit a new generation job.
    pub async fn create_generation(&self, request: &CreateGenerationRequest) -> Result<CreateGenerationResponse, ApiError> {
        let builder = self.request(Method::POST, "/v1/generations").json(request);
        self.send_json(builder, "/v1/generations").await
    }

    /// `GET /v1/generations/{id}`: fetch the current job status.
    pub async fn get_generation(&self, generation_id: &str) -> Result<GenerationStatusResponse, ApiError> {
        let path = format!("/v1/generations/{}", generation_id);
        let builder = self.request(Method::GET, &path);
        self.send_json(builder, &path).await
    }

    /// `POST /v1/generations/{id}/cancel`: request job cancellation.
    pub async fn cancel_generation(&self, generation_id: &str) -> Result<GenerationStatusResponse, ApiError> {
        let path = format!("/v1/generations/{}/cancel", generation_id);
        let builder = self.request(Method::POST, &path);
        self.send_json(builder, &path).await
    }

    /// `GET /v1/generations`: list jobs. Page-oriented inputs are converted
    /// to an offset before transmission.
    pub async fn list_generations(&self, query: &ListGenerationsQuery) -> Result<GenerationListResponse, ApiError> {
        let builder = self.request(Method::GET, "/v1/generations").query(&query.to_query_pairs());
        self.send_json(builder, "/v1/generations").await
    }

    /// `DELETE /v1/generations/{id}`: remove a finished job.
    pub async fn delete_generation(&self, generation_id: &str) -> Result<(), ApiError> {
        let path = format!("/v1/generations/{}", generation_id);
        let builder = self.request(Method::DELETE, &path);
        self.send_empty(builder, &path).await
    }

    /// `GET /v1/generations/{id}/assets`: fetch produced assets.
    pub async fn generation_assets(&self, generation_id: &str) -> Result<GenerationAssets, ApiError> {
        let path = format!("/v1/generations/{}/assets", generation_id);
        let builder = self.request(Method::GET, &path);
        self.send_json(builder, &path).await
    }

    /// Clip-prompt generation: expands a concept into per-clip prompts.
    pub async fn generate_clip_prompts(&self, request: &ClipPromptRequest) -> Result<ClipPromptResponse, ApiError> {
        let builder = self.request(Method::POST, CLIP_PROMPTS_PATH).json(request);
        self.send_json(builder, CLIP_PROMPTS_PATH).await
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: reqwest::RequestBuilder, path: &str) -> Result<T, ApiError> {
        let (status, body) = self.send_raw(builder, path).await?;
        Ok(serde_json::from_str(&body).inspect_err(|error| {
            warn!(path, status = status.as_u16(), error = %error, "response JSON did not match wire shape");
        })?)
    }

    async fn send_empty(&self, builder: reqwest::RequestBuilder, path: &str) -> Result<(), ApiError> {
        self.send_raw(builder, path).await.map(|_| ())
    }

    async fn send_raw(&self, builder: reqwest::RequestBuilder, path: &str) -> Result<(StatusCode, String), ApiError> {
        let start = Instant::now();
        let response = builder.send().await.inspect_err(|error| {
            warn!(path, error = %error, "http request failed before a response arrived");
        })?;

        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            debug!(path, status = status.as_u16(), duration_ms = start.elapsed().as_millis() as u64, "http request completed");
            return Ok((status, body));
        }

        warn!(path, status = status.as_u16(), duration_ms = start.elapsed().as_millis() as u64, "http request rejected");
        Err(classify_rejection(status, &body))
    }
}

/// Turn a non-success response into a typed error, preferring the backend's
/// structured envelope when one is present.
fn classify_rejection(status: StatusCode, body: &str) -> ApiError {
    match serde_json::from_str::<ApiErrorEnvelope>(body) {
        Ok(envelope) => ApiError::Backend {
            code: envelope.error.code,
            message: envelope.error.message,
            status: status.as_u16(),
        },
        Err(_) => ApiError::Http { status: status.as_u16() },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structured_envelope_becomes_backend_error() {
        let body = r#"{"error":{"code":"RATE_LIMIT_EXCEEDED","message":"slow down"}}"#;
        let error = classify_rejection(StatusCode::TOO_MANY_REQUESTS, body);
        match error {
            ApiError::Backend { code, message, status } => {
                assert_eq!(code, "RATE_LIMIT_EXCEEDED");
                assert_eq!(message, "slow down");
                assert_eq!(status, 429);
            }
            other => panic!("expected backend error, got {other:?}"),
        }
    }

    #[test]
    fn envelope_without_message_still_classifies() {
        let body = r#"{"error":{"code":"INVALID_PROMPT"}}"#;
        let error = classify_rejection(StatusCode::BAD_REQUEST, body);
        assert_eq!(error.code(), Some("INVALID_PROMPT"));
    }

    #[test]
    fn unstructured_rejection_falls_back_to_http_error() {
        let error = classify_rejection(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>");
        assert!(matches!(error, ApiError::Http { status: 502 }));
        assert_eq!(error.code(), None);
    }
}
