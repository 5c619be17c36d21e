//! Mapping from backend errors to user-facing messages.
//!
//! Known backend codes map to fixed strings. Unknown codes, plain HTTP
//! failures, and transport errors all fall back to a generic retry message.
//! Raw backend payloads never reach the user.

use reelgen_api::ApiError;

pub const MSG_INVALID_PROMPT: &str = "Your video concept was rejected. Try rephrasing it and submit again.";
pub const MSG_INVALID_PARAMETERS: &str = "Some generation settings were not accepted. Review your choices and try again.";
pub const MSG_RATE_LIMIT: &str = "You're creating videos too quickly. Wait a moment and try again.";
pub const MSG_INSUFFICIENT_CREDITS: &str = "You don't have enough credits for this video. Top up and try again.";
pub const MSG_UPLOAD_FAILED: &str = "We couldn't upload your brand assets. Check them and try again.";
pub const MSG_GENERIC: &str = "Something went wrong while creating your video. Please try again.";

/// Map a backend error to the message shown to the user.
pub fn map_api_error(error: &ApiError) -> String {
    let message = match error.code() {
        Some("INVALID_PROMPT") => MSG_INVALID_PROMPT,
        Some("INVALID_PARAMETERS") => MSG_INVALID_PARAMETERS,
        Some("RATE_LIMIT_EXCEEDED") => MSG_RATE_LIMIT,
        Some("INSUFFICIENT_CREDITS") => MSG_INSUFFICIENT_CREDITS,
        Some("UPLOAD_FAILED") => MSG_UPLOAD_FAILED,
        _ => MSG_GENERIC,
    };
    message.to_string()
}
