use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One voice check-in: the uploaded audio, its transcript, and the
/// summarizer agent's structured reading of it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckIn {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub audio_path: String,
    pub transcript: Option<Value>,
    pub summary: Option<String>,
    pub mood: Option<String>,
    pub symptoms: Vec<String>,
    pub medications_taken: Vec<String>,
    pub sleep_quality: Option<String>,
    pub energy_level: Option<String>,
    pub concerns: Option<String>,
    pub ai_insights: Vec<String>,
    pub overall_score: Option<String>,
}

/// Insert payload for a new check-in (id and created_at are assigned by
/// the repository).
#[derive(Debug, Clone, Default)]
pub struct NewCheckIn {
    pub audio_path: String,
    pub transcript: Option<Value>,
    pub summary: Option<String>,
    pub mood: Option<String>,
    pub symptoms: Vec<String>,
    pub medications_taken: Vec<String>,
    pub sleep_quality: Option<String>,
    pub energy_level: Option<String>,
    pub concerns: Option<String>,
    pub ai_insights: Vec<String>,
    pub overall_score: Option<String>,
}
