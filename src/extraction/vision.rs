//! Verbatim text extraction from document images via a vision LLM.
//!
//! Speaks the `generateContent` HTTP API: the image goes inline as base64
//! alongside an extraction prompt, and the response's text parts are the
//! extracted document text.

use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use serde_json::json;

use super::ExtractionError;

/// Request timeout (seconds).
const VISION_TIMEOUT_SECS: u64 = 120;

/// The extraction prompt: verbatim text only, no commentary.
const OCR_PROMPT: &str = "You are an assistant that extracts text from medical documents.\n\n\
Instructions:\n\
1) Extract the full text from the image verbatim.\n\
2) Preserve the structure and formatting as much as possible.\n\
3) Return ONLY the extracted text, no additional commentary.";

/// Vision OCR abstraction (allows mocking).
#[async_trait]
pub trait VisionExtractor: Send + Sync {
    async fn extract_text(&self, image: &[u8], mime_type: &str) -> Result<String, ExtractionError>;
}

/// HTTP client for a Gemini-style `generateContent` endpoint.
pub struct GeminiVisionClient {
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl GeminiVisionClient {
    pub fn new(base_url: &str, api_key: &str, model: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(VISION_TIMEOUT_SECS))
            .build()
            .expect("Failed to create HTTP client");
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            client,
        }
    }
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[async_trait]
impl VisionExtractor for GeminiVisionClient {
    async fn extract_text(&self, image: &[u8], mime_type: &str) -> Result<String, ExtractionError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );
        let encoded = base64::engine::general_purpose::STANDARD.encode(image);
        let body = json!({
            "contents": [{
                "parts": [
                    {"inline_data": {"mime_type": mime_type, "data": encoded}},
                    {"text": OCR_PROMPT}
                ]
            }]
        });

        let response = self.client.post(&url).json(&body).send().await.map_err(|e| {
            if e.is_connect() {
                ExtractionError::Connection(self.base_url.clone())
            } else if e.is_timeout() {
                ExtractionError::Timeout(VISION_TIMEOUT_SECS)
            } else {
                ExtractionError::Http(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExtractionError::VisionApi { status: status.as_u16(), body });
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ExtractionError::ResponseParsing(e.to_string()))?;

        let text = parsed
            .candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .filter_map(|p| p.text)
            .collect::<Vec<_>>()
            .join("\n");

        let text = text.trim().to_string();
        if text.is_empty() {
            return Err(ExtractionError::EmptyText);
        }
        tracing::info!(chars = text.len(), "Extracted text from image");
        Ok(text)
    }
}

/// Detect an uploaded image's MIME type from magic bytes.
pub fn detect_image_mime(bytes: &[u8]) -> &'static str {
    if bytes.len() >= 3 && bytes[0..3] == [0xFF, 0xD8, 0xFF] {
        "image/jpeg"
    } else if bytes.len() >= 8 && bytes[0..8] == [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A] {
        "image/png"
    } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        "image/webp"
    } else if bytes.len() >= 5 && &bytes[0..5] == b"%PDF-" {
        "application/pdf"
    } else {
        "application/octet-stream"
    }
}

/// Mock vision extractor for testing — returns a configured text.
pub struct MockVisionExtractor {
    text: String,
}

impl MockVisionExtractor {
    pub fn new(text: &str) -> Self {
        Self { text: text.to_string() }
    }
}

#[async_trait]
impl VisionExtractor for MockVisionExtractor {
    async fn extract_text(
        &self,
        _image: &[u8],
        _mime_type: &str,
    ) -> Result<String, ExtractionError> {
        if self.text.trim().is_empty() {
            return Err(ExtractionError::EmptyText);
        }
        Ok(self.text.clone())
    }
}
