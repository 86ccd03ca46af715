use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A processed lab-report upload. Each JSON column holds one stage output
/// of the lab pipeline; the scalar columns are extracts for querying.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabReport {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub file_path: String,
    pub ocr_text: Option<String>,
    pub report_date: Option<String>,
    pub report_time: Option<String>,
    pub raw_lab_data: Option<Value>,
    pub lab_analysis: Option<Value>,
    pub lab_risk_scores: Option<Value>,
    pub overall_health_risk_index: Option<f64>,
    pub severity: Option<String>,
    pub critical_flags: Vec<String>,
    pub lab_summary_overview: Option<String>,
    pub key_findings: Vec<Value>,
    pub overall_risk: Option<String>,
    pub tone: Option<String>,
    pub recommendations: Vec<String>,
    pub critical_alerts: Vec<String>,
    pub structured_data: Option<Value>,
}

/// Partial update payload. Absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LabReportPatch {
    #[serde(default)]
    pub report_date: Option<String>,
    #[serde(default)]
    pub report_time: Option<String>,
    #[serde(default)]
    pub overall_health_risk_index: Option<f64>,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub lab_summary_overview: Option<String>,
    #[serde(default)]
    pub overall_risk: Option<String>,
    #[serde(default)]
    pub tone: Option<String>,
    #[serde(default)]
    pub recommendations: Option<Vec<String>>,
    #[serde(default)]
    pub critical_alerts: Option<Vec<String>>,
}

/// Insert payload. Also the create-endpoint body; every field except
/// `file_path` may be omitted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewLabReport {
    pub file_path: String,
    pub ocr_text: Option<String>,
    pub report_date: Option<String>,
    pub report_time: Option<String>,
    pub raw_lab_data: Option<Value>,
    pub lab_analysis: Option<Value>,
    pub lab_risk_scores: Option<Value>,
    pub overall_health_risk_index: Option<f64>,
    pub severity: Option<String>,
    pub critical_flags: Vec<String>,
    pub lab_summary_overview: Option<String>,
    pub key_findings: Vec<Value>,
    pub overall_risk: Option<String>,
    pub tone: Option<String>,
    pub recommendations: Vec<String>,
    pub critical_alerts: Vec<String>,
    pub structured_data: Option<Value>,
}
