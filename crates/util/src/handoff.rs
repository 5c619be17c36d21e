//! Transient handoff slot for clip-prompt results.
//!
//! The clip-prompt endpoint runs before the results view exists; its output
//! is parked here so the results view can pick it up without a second
//! network round trip. The slot lives for the process only and is never
//! written to disk.

use std::sync::Mutex;

use reelgen_types::ClipPromptResponse;

/// Holds the most recent clip-prompt result for handoff to a results view.
#[derive(Default)]
pub struct ClipPromptHandoff {
    slot: Mutex<Option<ClipPromptResponse>>,
}

impl ClipPromptHandoff {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the slot content with the latest result.
    pub fn store(&self, response: ClipPromptResponse) {
        let mut slot = self.slot.lock().expect("handoff lock poisoned");
        *slot = Some(response);
    }

    /// Take the stored result, leaving the slot empty.
    pub fn take(&self) -> Option<ClipPromptResponse> {
        let mut slot = self.slot.lock().expect("handoff lock poisoned");
        slot.take()
    }

    /// Read the stored result without consuming it.
    pub fn peek(&self) -> Option<ClipPromptResponse> {
        let slot = self.slot.lock().expect("handoff lock poisoned");
        slot.clone()
    }
}
