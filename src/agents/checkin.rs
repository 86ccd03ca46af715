//! Check-in conversation summarization pipeline.
//!
//! Sends the diarized transcript JSON to the summarizer app and decodes
//! the structured daily-health reading it returns.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::client::{run_expect_key, AgentRunner};
use super::AgentError;
use crate::models::NewCheckIn;

pub const CHECKIN_APP: &str = "checkin_summarizer";
const CHECKIN_OUTPUT_KEY: &str = "checkin_summary";

/// Structured reading of one check-in conversation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckinSummary {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub mood: Option<String>,
    #[serde(default)]
    pub symptoms: Vec<String>,
    #[serde(default)]
    pub medications_taken: Vec<String>,
    #[serde(default)]
    pub sleep_quality: Option<String>,
    #[serde(default)]
    pub energy_level: Option<String>,
    #[serde(default)]
    pub concerns: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub ai_insights: Vec<String>,
    #[serde(default)]
    pub overall_score: Option<String>,
}

/// Summarize a check-in transcript into a structured daily reading.
pub async fn summarize_checkin(
    runner: &dyn AgentRunner,
    transcript: &Value,
) -> Result<CheckinSummary, AgentError> {
    let input = serde_json::to_string_pretty(transcript)
        .map_err(|e| AgentError::Http(format!("transcript serialization: {e}")))?;
    run_expect_key(runner, CHECKIN_APP, CHECKIN_OUTPUT_KEY, &input).await
}

/// Build the insert payload from the transcript and its summary.
pub fn to_new_checkin(audio_path: &str, transcript: Value, summary: &CheckinSummary) -> NewCheckIn {
    NewCheckIn {
        audio_path: audio_path.to_string(),
        transcript: Some(transcript),
        summary: summary.summary.clone(),
        mood: summary.mood.clone(),
        symptoms: summary.symptoms.clone(),
        medications_taken: summary.medications_taken.clone(),
        sleep_quality: summary.sleep_quality.clone(),
        energy_level: summary.energy_level.clone(),
        concerns: summary.concerns.clone(),
        ai_insights: summary.ai_insights.clone(),
        overall_score: summary.overall_score.clone(),
    }
}
