use thiserror::Error;

/// Failure modes of a single upstream call.
///
/// A `Status` error carries the upstream response verbatim so callers can
/// surface it unchanged. No variant implies a retry — every call is attempted
/// exactly once.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("upstream returned status {status}")]
    Status { status: u16, body: String },

    #[error("upstream unreachable: {0}")]
    Transport(String),

    #[error("upstream is not configured (set N8N_URL and N8N_API_KEY)")]
    NotConfigured,
}
