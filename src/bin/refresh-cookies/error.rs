//! Errors that abort a refresh.

use fantoccini::error::CmdError;
use fantoccini::error::NewSessionError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("Could not start a browser session: {0}")]
    Session(#[from] NewSessionError),

    #[error("Browser command failed: {0}")]
    Browser(#[from] CmdError),

    #[error("Login did not finish within {secs}s, check the credentials.")]
    LoginTimedOut { secs: u64 },

    #[error("The browser has no youtube or google cookies.")]
    NoCookies,

    #[error("Cookie jar IO failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("yt-dlp rejected the new cookies: {reason}")]
    Rejected { reason: String },

    #[error("yt-dlp did not answer within {secs}s.")]
    ValidationTimedOut { secs: u64 },
}
