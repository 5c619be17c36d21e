//! Seam between the orchestration core and the generation backend.
//!
//! The engine talks to the backend exclusively through
//! [`GenerationBackend`], so the wizard controller and the status
//! synchronizer can be exercised against scripted fakes while the CLI wires
//! in the real [`ReelgenClient`].

use async_trait::async_trait;

use reelgen_api::{ApiError, ReelgenClient};
use reelgen_types::{
    ClipPromptRequest, ClipPromptResponse, CreateGenerationRequest, CreateGenerationResponse, GenerationStatusResponse,
};

/// Backend operations the orchestration core depends on.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Submit a new generation job.
    async fn create_generation(&self, request: &CreateGenerationRequest) -> Result<CreateGenerationResponse, ApiError>;

    /// Fetch the current status of a job.
    async fn get_generation(&self, generation_id: &str) -> Result<GenerationStatusResponse, ApiError>;

    /// Request cancellation of a job.
    async fn cancel_generation(&self, generation_id: &str) -> Result<GenerationStatusResponse, ApiError>;

    /// Expand a concept into per-clip prompts.
    async fn generate_clip_prompts(&self, request: &ClipPromptRequest) -> Result<ClipPromptResponse, ApiError>;
}

#[async_trait]
impl GenerationBackend for ReelgenClient {
    async fn create_generation(&self, request: &CreateGenerationRequest) -> Result<CreateGenerationResponse, ApiError> {
        ReelgenClient::create_generation(self, request).await
    }

    async fn get_generation(&self, generation_id: &str) -> Result<GenerationStatusResponse, ApiError> {
        ReelgenClient::get_generation(self, generation_id).await
    }

    async fn cancel_generation(&self, generation_id: &str) -> Result<GenerationStatusResponse, ApiError> {
        ReelgenClient::cancel_generation(self, generation_id).await
    }

    async fn generate_clip_prompts(&self, request: &ClipPromptRequest) -> Result<ClipPromptResponse, ApiError> {
        ReelgenClient::generate_clip_prompts(self, request).await
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted backend fake shared by the engine's unit tests.

    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use chrono::Utc;
    use reelgen_types::GenerationStatus;

    /// Backend whose responses are scripted ahead of time. Status fetches
    /// are counted so tests can assert exact poll behavior.
    #[derive(Default)]
    pub struct ScriptedBackend {
        create_results: Mutex<VecDeque<Result<CreateGenerationResponse, ApiError>>>,
        status_results: Mutex<VecDeque<Result<GenerationStatusResponse, ApiError>>>,
        /// Returned once the scripted status queue runs dry, so long-running
        /// tracker tests can poll indefinitely.
        status_when_empty: Mutex<Option<GenerationStatusResponse>>,
        status_calls: AtomicU32,
    }

    impl ScriptedBackend {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn push_create(&self, result: Result<CreateGenerationResponse, ApiError>) {
            self.create_results.lock().unwrap().push_back(result);
        }

        pub fn push_status(&self, result: Result<GenerationStatusResponse, ApiError>) {
            self.status_results.lock().unwrap().push_back(result);
        }

        pub fn status_when_empty(&self, response: GenerationStatusResponse) {
            *self.status_when_empty.lock().unwrap() = Some(response);
        }

        pub fn status_call_count(&self) -> u32 {
            self.status_calls.load(Ordering::SeqCst)
        }

        pub fn created(generation_id: &str) -> CreateGenerationResponse {
            CreateGenerationResponse {
                generation_id: generation_id.into(),
                status: GenerationStatus::Queued,
                created_at: Utc::now(),
                estimated_completion: None,
                websocket_url: None,
            }
        }

        pub fn status(generation_id: &str, status: GenerationStatus) -> GenerationStatusResponse {
            GenerationStatusResponse {
                generation_id: generation_id.into(),
                status,
                progress: None,
                metadata: serde_json::Value::Null,
                clips_generated: 0,
            }
        }
    }

    #[async_trait]
    impl GenerationBackend for ScriptedBackend {
        async fn create_generation(&self, _request: &CreateGenerationRequest) -> Result<CreateGenerationResponse, ApiError> {
            self.create_results
                .lock()
                .unwrap()
                .pop_front()
                .expect("no scripted create result left")
        }

        async fn get_generation(&self, _generation_id: &str) -> Result<GenerationStatusResponse, ApiError> {
            self.status_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(result) = self.status_results.lock().unwrap().pop_front() {
                return result;
            }
            self.status_when_empty
                .lock()
                .unwrap()
                .clone()
                .ok_or(ApiError::Http { status: 500 })
        }

        async fn cancel_generation(&self, generation_id: &str) -> Result<GenerationStatusResponse, ApiError> {
            Ok(Self::status(generation_id, GenerationStatus::Cancelled))
        }

        async fn generate_clip_prompts(&self, _request: &ClipPromptRequest) -> Result<ClipPromptResponse, ApiError> {
            Ok(ClipPromptResponse::default())
        }
    }
}
