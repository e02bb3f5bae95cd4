use thiserror::Error;

/// Unified error type for the entire financiary-core library.
/// Every fallible public function returns `Result<T, CoreError>`.
///
/// The `Display` output is meant to be shown to the user as-is.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Local validation ────────────────────────────────────────────
    #[error("Validation failed: {0}")]
    Validation(String),

    // ── Authentication ──────────────────────────────────────────────
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("You must be logged in to {0}")]
    NotAuthenticated(String),

    #[error("Session is no longer valid: {0}")]
    Unauthorized(String),

    // ── Remote / Network ────────────────────────────────────────────
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("API error ({status}): {message}")]
    Api {
        status: u16,
        message: String,
    },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    // ── Local resources ─────────────────────────────────────────────
    #[error("Credential storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Coarse classification of a [`CoreError`], used by callers that only need
/// to decide how to present a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected locally before any network call.
    Validation,
    /// Bad credentials, missing session, or a token the backend refused.
    Auth,
    /// Network failure or server-side rejection (including missing records).
    Remote,
    /// Local persistence or configuration problems.
    Local,
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::Validation(_) => ErrorKind::Validation,
            CoreError::Authentication(_)
            | CoreError::NotAuthenticated(_)
            | CoreError::Unauthorized(_) => ErrorKind::Auth,
            CoreError::NotFound(_)
            | CoreError::Api { .. }
            | CoreError::Network(_)
            | CoreError::Deserialization(_) => ErrorKind::Remote,
            CoreError::Storage(_) | CoreError::Config(_) => ErrorKind::Local,
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, CoreError::NotFound(_))
    }
}

// ── Conversion helpers (From impls) ─────────────────────────────────

impl From<std::io::Error> for CoreError {
    fn from(e: std::io::Error) -> Self {
        CoreError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Deserialization(e.to_string())
    }
}

impl From<reqwest::Error> for CoreError {
    fn from(e: reqwest::Error) -> Self {
        // Strip query parameters so paging/filter details stay out of user-facing messages.
        let msg = e.to_string();
        let sanitized = if let Some(idx) = msg.find('?') {
            format!("{}?<query redacted>", &msg[..idx])
        } else {
            msg
        };
        if e.is_timeout() {
            CoreError::Network(format!("request timed out: {sanitized}"))
        } else {
            CoreError::Network(sanitized)
        }
    }
}

impl From<config::ConfigError> for CoreError {
    fn from(e: config::ConfigError) -> Self {
        CoreError::Config(e.to_string())
    }
}
