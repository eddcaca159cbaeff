// Error types for the platform adapter. The command layer works with
// `anyhow::Result`; the HTTP client reports these typed errors so the
// connection manager can tell a rejected login apart from a transport
// failure.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid url {url}: {reason}")]
    Url { url: String, reason: String },

    #[error("could not find {what} on {page}")]
    MissingToken { what: &'static str, page: String },

    #[error("login rejected: check your email and password")]
    LoginRejected,

    #[error("unexpected status payload from {link}: {source}")]
    Payload {
        link: String,
        #[source]
        source: serde_json::Error,
    },
}
