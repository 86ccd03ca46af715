pub mod checkin;
pub mod client;
pub mod events;
pub mod lab;
pub mod prescription;
pub mod report;

pub use checkin::*;
pub use client::*;
pub use events::*;
pub use lab::*;
pub use prescription::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Agent server is not reachable at {0}")]
    Connection(String),

    #[error("Agent request timed out after {0}s")]
    Timeout(u64),

    #[error("Session creation failed for {app} (status {status}): {body}")]
    SessionCreate { app: String, status: u16, body: String },

    #[error("Agent {app} run failed (status {status}): {body}")]
    RunFailed { app: String, status: u16, body: String },

    #[error("HTTP client error: {0}")]
    Http(String),

    #[error("Agent {app} returned no usable structured output")]
    MissingOutput { app: String },

    #[error("JSON decoding failed for key '{key}': {reason}")]
    Decode { key: String, reason: String },

    #[error("Report stage '{stage}' failed: {source}")]
    Stage {
        stage: &'static str,
        #[source]
        source: Box<AgentError>,
    },
}

/// Errors worth retrying with a fresh session + run.
///
/// Transport failures may be transient; a missing or undecodable output is
/// worth one more run because the model may produce valid JSON next time.
pub(crate) fn is_retryable(e: &AgentError) -> bool {
    matches!(
        e,
        AgentError::Connection(_)
            | AgentError::Timeout(_)
            | AgentError::Http(_)
            | AgentError::RunFailed { .. }
            | AgentError::MissingOutput { .. }
            | AgentError::Decode { .. }
    )
}
