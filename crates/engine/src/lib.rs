//! Orchestration core for the Reelgen generation workflow.
//!
//! The engine owns the wizard state machine ([`wizard::WizardController`]),
//! the pure request builder ([`request`]), backend error mapping
//! ([`errors`]), and the status synchronizer ([`status`], [`push`]) that
//! follows a submitted job to its terminal state.

pub mod backend;
pub mod errors;
pub mod push;
pub mod request;
pub mod status;
pub mod wizard;

pub use backend::GenerationBackend;
pub use errors::map_api_error;
pub use push::{PushChannelConfig, PushSubscription};
pub use request::{build_clip_prompt_request, build_request};
pub use status::{DEFAULT_POLL_INTERVAL, TrackError, TrackUpdate, Tracker, poll_until_terminal, track};
pub use wizard::{SubmissionState, SubmitError, WizardController};
