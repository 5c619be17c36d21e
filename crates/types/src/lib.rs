use std::{error::Error, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod form;

pub use form::{
    BrandColorField, BrandColors, DRAFT_SCHEMA_VERSION, Draft, FieldId, FieldValue, FormData, ValidationErrors, WizardStep,
};

/// Lifecycle states reported by the backend for a generation job.
///
/// `Completed`, `Failed`, and `Cancelled` are terminal: once one of them is
/// observed for a job id, no further transitions occur.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStatus {
    Queued,
    Processing,
    Composing,
    Completed,
    Failed,
    Cancelled,
}

impl GenerationStatus {
    /// Returns true when no further status transitions can occur.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Processing => "processing",
            Self::Composing => "composing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for GenerationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GenerationStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(Self::Queued),
            "processing" => Ok(Self::Processing),
            "composing" => Ok(Self::Composing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(ParseStatusError),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseStatusError;

impl fmt::Display for ParseStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("invalid generation status; expected queued, processing, composing, completed, failed, or cancelled")
    }
}

impl Error for ParseStatusError {}

/// Visual treatment applied to the generated video.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoStyle {
    #[default]
    Cinematic,
    Energetic,
    Minimalist,
    Playful,
}

impl VideoStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cinematic => "cinematic",
            Self::Energetic => "energetic",
            Self::Minimalist => "minimalist",
            Self::Playful => "playful",
        }
    }
}

/// Output frame shape, serialized in the backend's `W:H` notation.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "16:9")]
    Landscape,
    #[serde(rename = "9:16")]
    Portrait,
    #[serde(rename = "1:1")]
    Square,
}

impl AspectRatio {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Landscape => "16:9",
            Self::Portrait => "9:16",
            Self::Square => "1:1",
        }
    }
}

/// Soundtrack selection for the composed video.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MusicStyle {
    #[default]
    Upbeat,
    Ambient,
    Corporate,
    None,
}

impl MusicStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Upbeat => "upbeat",
            Self::Ambient => "ambient",
            Self::Corporate => "corporate",
            Self::None => "none",
        }
    }
}

/// Rendering quality tier.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quality {
    #[default]
    Standard,
    High,
}

impl Quality {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::High => "high",
        }
    }
}

/// Body of `POST /v1/generations`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CreateGenerationRequest {
    pub prompt: String,
    pub parameters: GenerationParameters,
    pub options: GenerationOptions,
}

/// Creative parameters inside a create request. Optional blocks are omitted
/// from the wire payload entirely rather than sent as null.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerationParameters {
    pub duration_seconds: u32,
    pub aspect_ratio: AspectRatio,
    pub style: VideoStyle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<BrandParameters>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_cta: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cta_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub music_style: Option<MusicStyle>,
}

/// Brand identity block, present only when the user supplied a brand name.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BrandParameters {
    pub name: String,
    pub primary_color: String,
    /// Secondary palette; a single entry today, serialized as a list.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub secondary_colors: Vec<String>,
}

/// Execution options inside a create request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    pub quality: Quality,
    pub fast_generation: bool,
    pub parallelize_generations: bool,
}

/// Response of `POST /v1/generations`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CreateGenerationResponse {
    pub generation_id: String,
    pub status: GenerationStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub estimated_completion: Option<DateTime<Utc>>,
    #[serde(default)]
    pub websocket_url: Option<String>,
}

/// Response of `GET /v1/generations/{id}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerationStatusResponse {
    pub generation_id: String,
    pub status: GenerationStatus,
    #[serde(default)]
    pub progress: Option<GenerationProgress>,
    #[serde(default)]
    pub metadata: Value,
    #[serde(default)]
    pub clips_generated: u32,
}

/// Fine-grained progress block inside a status response.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerationProgress {
    #[serde(default)]
    pub current_step: String,
    #[serde(default)]
    pub steps_completed: u32,
    #[serde(default)]
    pub total_steps: u32,
    #[serde(default)]
    pub percentage: f64,
}

/// Typed event delivered over the push channel, keyed by generation id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PushEvent {
    #[serde(rename = "type")]
    pub kind: PushEventType,
    #[serde(default)]
    pub data: Value,
    pub generation_id: String,
}

/// Discriminator for push-channel messages. `Completed` and `Error` are
/// terminal and end tracking for the job.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PushEventType {
    Progress,
    ClipCompleted,
    StatusChange,
    EncodingProgress,
    Completed,
    Error,
}

impl PushEventType {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }
}

/// Structured error envelope returned by the backend on rejected requests.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApiErrorEnvelope {
    pub error: ApiErrorBody,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub code: String,
    #[serde(default)]
    pub message: String,
}

/// Body of the clip-prompt generation endpoint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClipPromptRequest {
    pub prompt: String,
    pub num_clips: u32,
    pub clip_length: u32,
}

/// Result of clip-prompt generation, handed off to the results view.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ClipPromptResponse {
    #[serde(default)]
    pub prompts: Vec<String>,
    #[serde(default)]
    pub metadata: Value,
}

/// Clip count and per-clip length derived from a requested duration.
///
/// Targets roughly five seconds per clip; both values are clamped to the
/// backend's accepted [3, 10] range. The clamp bounds are authoritative, the
/// rounding rule approximates `num_clips * clip_length == duration`.
pub fn clip_plan(duration_seconds: u32) -> (u32, u32) {
    let num_clips = ((duration_seconds as f64 / 5.0).round() as u32).clamp(3, 10);
    let clip_length = (duration_seconds / num_clips).clamp(3, 10);
    (num_clips, clip_length)
}

/// Query parameters accepted by `GET /v1/generations`. Page-oriented inputs
/// are converted to an offset before transmission.
#[derive(Clone, Debug, PartialEq)]
pub struct ListGenerationsQuery {
    /// 1-based page index.
    pub page: u32,
    pub limit: u32,
    pub status: Option<GenerationStatus>,
    pub sort: Option<String>,
}

impl Default for ListGenerationsQuery {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 20,
            status: None,
            sort: None,
        }
    }
}

impl ListGenerationsQuery {
    /// Zero-based offset transmitted to the backend.
    pub fn offset(&self) -> u32 {
        self.page.saturating_sub(1) * self.limit
    }

    /// Render the wire query pairs (`offset`, `limit`, optional filters).
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("offset", self.offset().to_string()), ("limit", self.limit.to_string())];
        if let Some(status) = self.status {
            pairs.push(("status", status.as_str().to_string()));
        }
        if let Some(sort) = &self.sort {
            pairs.push(("sort", sort.clone()));
        }
        pairs
    }
}

/// Response of `GET /v1/generations`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationListResponse {
    #[serde(default)]
    pub generations: Vec<GenerationStatusResponse>,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub offset: u32,
    #[serde(default)]
    pub limit: u32,
}

/// Response of `GET /v1/generations/{id}/assets`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationAssets {
    pub generation_id: String,
    #[serde(default)]
    pub assets: Vec<GenerationAsset>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerationAsset {
    #[serde(rename = "type")]
    pub kind: String,
    pub url: String,
}

/// Health of the push channel as seen by the tracker.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConnectionState {
    pub status: ConnectionStatus,
    pub reconnect_attempts: u32,
    pub last_error: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ConnectionStatus {
    #[default]
    Connecting,
    Connected,
    Disconnected,
    Error,
}

impl ConnectionState {
    /// Record a successful connection; the reconnect counter resets.
    pub fn mark_connected(&mut self) {
        self.status = ConnectionStatus::Connected;
        self.reconnect_attempts = 0;
        self.last_error = None;
    }

    pub fn mark_disconnected(&mut self) {
        self.status = ConnectionStatus::Disconnected;
    }

    pub fn mark_error(&mut self, error: impl Into<String>) {
        self.status = ConnectionStatus::Error;
        self.last_error = Some(error.into());
    }

    pub fn mark_reconnecting(&mut self) {
        self.status = ConnectionStatus::Connecting;
        self.reconnect_attempts += 1;
    }
}
