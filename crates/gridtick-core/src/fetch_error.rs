//! Provider failure taxonomy.
//!
//! | Kind | Retryable | Typical cause |
//! |------|-----------|---------------|
//! | `Network` | yes | connection refused/reset, DNS failure |
//! | `Timeout` | yes | attempt exceeded the policy timeout, HTTP 408 |
//! | `RateLimited` | yes | HTTP 429, may carry a Retry-After hint |
//! | `Server` | yes | HTTP 5xx |
//! | `Auth` | no | HTTP 401/403 |
//! | `MalformedRequest` | no | other HTTP 4xx, no feed for the source |
//! | `MalformedResponse` | no | unparseable or empty payload |
//! | `Cancelled` | no | caller deadline elapsed before the source finished |

use std::fmt::{Display, Formatter};
use std::time::Duration;

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::domain::duration_ms;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchErrorKind {
    Network,
    Timeout,
    RateLimited,
    Server,
    Auth,
    MalformedRequest,
    MalformedResponse,
    Cancelled,
}

impl FetchErrorKind {
    pub const fn retryable(self) -> bool {
        matches!(
            self,
            Self::Network | Self::Timeout | Self::RateLimited | Self::Server
        )
    }

    pub const fn code(self) -> &'static str {
        match self {
            Self::Network => "fetch.network",
            Self::Timeout => "fetch.timeout",
            Self::RateLimited => "fetch.rate_limited",
            Self::Server => "fetch.server",
            Self::Auth => "fetch.auth",
            Self::MalformedRequest => "fetch.malformed_request",
            Self::MalformedResponse => "fetch.malformed_response",
            Self::Cancelled => "fetch.cancelled",
        }
    }
}

/// Structured failure of one source fetch, carrying the last cause and attempt count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchError {
    kind: FetchErrorKind,
    message: String,
    status: Option<u16>,
    retry_after: Option<Duration>,
    attempts: u32,
}

impl FetchError {
    fn new(kind: FetchErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
            retry_after: None,
            attempts: 0,
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::Network, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::Timeout, message)
    }

    pub fn rate_limited(message: impl Into<String>, retry_after: Option<Duration>) -> Self {
        Self {
            retry_after,
            ..Self::new(FetchErrorKind::RateLimited, message)
        }
    }

    pub fn server(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::Server, message)
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::Auth, message)
    }

    pub fn malformed_request(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::MalformedRequest, message)
    }

    pub fn malformed_response(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::MalformedResponse, message)
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::Cancelled, message)
    }

    /// Classifies a non-success HTTP status. Returns `None` for 2xx.
    pub fn from_status(status: u16, retry_after: Option<Duration>) -> Option<Self> {
        let error = match status {
            200..=299 => return None,
            401 | 403 => Self::auth(format!("provider rejected credentials (status {status})")),
            408 => Self::timeout("provider reported request timeout (status 408)"),
            429 => Self::rate_limited("provider rate limit exceeded (status 429)", retry_after),
            500..=599 => Self::server(format!("provider server error (status {status})")),
            _ => Self::malformed_request(format!("provider rejected request (status {status})")),
        };
        Some(error.with_status(status))
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    pub const fn kind(&self) -> FetchErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.kind.retryable()
    }

    pub const fn status(&self) -> Option<u16> {
        self.status
    }

    /// Provider-supplied wait hint, only set for rate limiting.
    pub const fn retry_after(&self) -> Option<Duration> {
        self.retry_after
    }

    /// Number of attempts made before this error became terminal.
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    pub const fn code(&self) -> &'static str {
        self.kind.code()
    }
}

impl Display for FetchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())?;
        if self.attempts > 0 {
            write!(f, " after {} attempt(s)", self.attempts)?;
        }
        Ok(())
    }
}

impl std::error::Error for FetchError {}

impl Serialize for FetchError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("FetchError", 7)?;
        state.serialize_field("code", self.code())?;
        state.serialize_field("kind", &self.kind)?;
        state.serialize_field("message", &self.message)?;
        state.serialize_field("retryable", &self.retryable())?;
        state.serialize_field("attempts", &self.attempts)?;
        state.serialize_field("status", &self.status)?;
        state.serialize_field(
            "retry_after_ms",
            &self.retry_after.map(duration_ms::as_millis),
        )?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_statuses_into_taxonomy() {
        assert!(FetchError::from_status(200, None).is_none());

        let auth = FetchError::from_status(403, None).expect("error");
        assert_eq!(auth.kind(), FetchErrorKind::Auth);
        assert!(!auth.retryable());

        let limited = FetchError::from_status(429, Some(Duration::from_secs(7))).expect("error");
        assert_eq!(limited.kind(), FetchErrorKind::RateLimited);
        assert_eq!(limited.retry_after(), Some(Duration::from_secs(7)));
        assert!(limited.retryable());

        let server = FetchError::from_status(503, None).expect("error");
        assert_eq!(server.kind(), FetchErrorKind::Server);
        assert_eq!(server.status(), Some(503));

        let bad = FetchError::from_status(404, None).expect("error");
        assert_eq!(bad.kind(), FetchErrorKind::MalformedRequest);
        assert!(!bad.retryable());
    }

    #[test]
    fn display_includes_code_and_attempts() {
        let error = FetchError::server("boom").with_attempts(4);
        assert_eq!(error.to_string(), "boom (fetch.server) after 4 attempt(s)");
    }

    #[test]
    fn serializes_retryability() {
        let json = serde_json::to_value(FetchError::timeout("slow").with_attempts(2))
            .expect("serializable");
        assert_eq!(json["code"], "fetch.timeout");
        assert_eq!(json["retryable"], true);
        assert_eq!(json["attempts"], 2);
    }
}
