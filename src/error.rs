use reqwest::StatusCode;
use thiserror::Error;

pub const GENERIC_ERROR_MESSAGE: &str = "An error occurred. Please try again.";
pub const CLIPBOARD_COPIED_NOTICE: &str = "Copied!";
pub const CLIPBOARD_FAILED_NOTICE: &str = "Copy failed. Select the text and copy it manually.";

#[derive(Debug, Error)]
pub enum GlamoError {
    #[error("image decode failed: {0}")] Decode(String),
    #[error("image encode failed: {0}")] Encode(String),
    #[error("transport error: {0}")] Transport(String),
    #[error("server error: status={status} detail={detail:?}")]
    Server { status: StatusCode, detail: Option<String> },
    #[error("clipboard copy failed")] Clipboard,
    #[error("invalid request: {0}")] InvalidRequest(String),
}

impl GlamoError {
    /// Text shown to the user. A server `detail` is surfaced verbatim.
    pub fn user_message(&self) -> String {
        match self {
            GlamoError::Server { detail: Some(detail), .. } => detail.clone(),
            GlamoError::Clipboard => CLIPBOARD_FAILED_NOTICE.to_string(),
            GlamoError::InvalidRequest(msg) => msg.clone(),
            _ => GENERIC_ERROR_MESSAGE.to_string(),
        }
    }
}

impl From<reqwest::Error> for GlamoError {
    fn from(e: reqwest::Error) -> Self { GlamoError::Transport(e.to_string()) }
}
