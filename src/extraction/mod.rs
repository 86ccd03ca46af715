pub mod transcribe;
pub mod vision;

pub use transcribe::*;
pub use vision::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Vision API is not reachable at {0}")]
    Connection(String),

    #[error("Vision API returned error (status {status}): {body}")]
    VisionApi { status: u16, body: String },

    #[error("Vision request timed out after {0}s")]
    Timeout(u64),

    #[error("HTTP client error: {0}")]
    Http(String),

    #[error("Vision response contained no text")]
    EmptyText,

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),

    #[error("Transcriber '{command}' exited with {status}: {stderr}")]
    TranscriberFailed { command: String, status: String, stderr: String },

    #[error("Transcript output not found at {0}")]
    TranscriptMissing(String),

    #[error("Transcript JSON error: {0}")]
    TranscriptParse(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
