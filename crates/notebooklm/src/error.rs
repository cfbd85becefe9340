//! Error types for the NotebookLM client.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// No credential bundle could be loaded (run interactive login first).
    #[error("not authenticated: no stored credentials found (run `login` first)")]
    NotAuthenticated,

    /// The server rejected the request as unauthenticated (401/403 or an
    /// auth-flavored error message).
    #[error("authentication error: {0}")]
    Auth(String),

    /// The server returned a user-displayable error, which in practice means
    /// the account hit a generation rate limit.
    #[error("rate limited by server")]
    RateLimited,

    /// Explicit `er` envelope from the batch protocol.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// The decoded envelope had no item for the requested method. The IDs
    /// that were present are kept for diagnosing server-side schema changes.
    #[error("no result for RPC {method} (found IDs: {seen:?})")]
    NoResult { method: String, seen: Vec<String> },

    /// Response was well-formed JSON but a required field was missing or had
    /// an unexpected shape.
    #[error("unexpected response shape: {0}")]
    Parse(String),

    /// A required per-session token was absent from the homepage HTML.
    #[error("{0} not found in page")]
    TokenMissing(&'static str),

    /// Interactive login did not complete within the allotted time.
    #[error("login timed out after {0} seconds")]
    LoginTimeout(u64),

    /// Browser automation failure during interactive login.
    #[error("login failed: {0}")]
    Login(String),

    /// A media download came back as an HTML page, meaning the service
    /// silently redirected to a sign-in page.
    #[error("received HTML instead of media file (authentication may have failed)")]
    HtmlDownload,

    /// The target notebook has no sources to work with.
    #[error("notebook has no sources")]
    NoSources,

    #[error("upload failed: {0}")]
    Upload(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error indicates the session is no longer authenticated.
    ///
    /// Matches both the typed variants and the keyword set callers rely on
    /// to decide when to prompt for re-login.
    pub fn is_auth_error(&self) -> bool {
        match self {
            Error::Auth(_) | Error::NotAuthenticated | Error::TokenMissing(_) => true,
            other => {
                let text = other.to_string().to_lowercase();
                const AUTH_KEYWORDS: [&str; 7] = [
                    "authentication",
                    "unauthorized",
                    "401",
                    "403",
                    "expired",
                    "login",
                    "re-authenticate",
                ];
                AUTH_KEYWORDS.iter().any(|kw| text.contains(kw))
            }
        }
    }

    /// Whether this error is a transient network failure worth retrying.
    pub fn is_retryable(&self) -> bool {
        let text = self.to_string();
        const RETRY_KEYWORDS: [&str; 6] = [
            "timeout",
            "connection refused",
            "connection reset",
            "TLS handshake",
            "EOF",
            "network is unreachable",
        ];
        RETRY_KEYWORDS.iter().any(|kw| text.contains(kw))
            || matches!(self, Error::Http(e) if e.is_timeout() || e.is_connect())
    }
}
