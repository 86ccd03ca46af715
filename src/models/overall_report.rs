use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A synthesized health report: one row per run of the report workflow.
/// Stage outputs are stored as JSON with the headline fields extracted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverallReport {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub pdf_file_path: String,
    pub timeline: Option<Value>,
    pub clinical_trends: Option<Value>,
    pub risk_and_severity: Option<Value>,
    pub overall_health_index: Option<f64>,
    pub overall_severity: Option<String>,
    pub possible_conditions: Option<Value>,
    pub medication_overview: Option<Value>,
    pub final_report: Option<Value>,
    pub patient_overview: Option<String>,
    pub risk_level: Option<String>,
    pub next_steps: Vec<String>,
    pub summary_comment: Option<String>,
    pub structured_data: Option<Value>,
}

#[derive(Debug, Clone, Default)]
pub struct NewOverallReport {
    pub pdf_file_path: String,
    pub timeline: Option<Value>,
    pub clinical_trends: Option<Value>,
    pub risk_and_severity: Option<Value>,
    pub overall_health_index: Option<f64>,
    pub overall_severity: Option<String>,
    pub possible_conditions: Option<Value>,
    pub medication_overview: Option<Value>,
    pub final_report: Option<Value>,
    pub patient_overview: Option<String>,
    pub risk_level: Option<String>,
    pub next_steps: Vec<String>,
    pub summary_comment: Option<String>,
    pub structured_data: Option<Value>,
}
