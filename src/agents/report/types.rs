//! Stage output schemas for the health-report workflow.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimelineEvent {
    #[serde(default)]
    pub date: Option<String>,
    /// symptom_onset / doctor_visit / lab_test / medication_update
    #[serde(default)]
    pub event_type: String,
    #[serde(default)]
    pub description: String,
    /// conversation_transcript / lab_report
    #[serde(default)]
    pub source: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Timeline {
    #[serde(default, deserialize_with = "crate::agents::events::lenient_vec")]
    pub events: Vec<TimelineEvent>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricTrend {
    #[serde(default)]
    pub metric: String,
    #[serde(default)]
    pub previous_value: Option<f64>,
    #[serde(default)]
    pub current_value: Option<f64>,
    /// increasing / decreasing / stable / improving
    #[serde(default)]
    pub trend: String,
    /// normal / abnormal_high / abnormal_low
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub clinical_comment: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClinicalTrends {
    #[serde(default, deserialize_with = "crate::agents::events::lenient_vec")]
    pub trends: Vec<MetricTrend>,
    #[serde(default)]
    pub overall_summary: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiseaseRisk {
    #[serde(default)]
    pub disease: String,
    /// 0-100
    #[serde(default)]
    pub risk_score: f64,
    #[serde(default)]
    pub severity_level: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RiskAndSeverity {
    #[serde(default, deserialize_with = "crate::agents::events::lenient_vec")]
    pub disease_risks: Vec<DiseaseRisk>,
    /// 0-100, higher is better
    #[serde(default)]
    pub overall_health_index: Option<f64>,
    #[serde(default)]
    pub overall_severity: Option<String>,
    #[serde(default)]
    pub clinical_comment: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PossibleCondition {
    #[serde(default)]
    pub condition: String,
    /// 0-100
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub recommended_action: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PossibleConditions {
    #[serde(default, deserialize_with = "crate::agents::events::lenient_vec")]
    pub conditions: Vec<PossibleCondition>,
    #[serde(default)]
    pub summary_comment: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MedicationEntry {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub dosage: Option<String>,
    #[serde(default)]
    pub frequency: Option<String>,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub special_instructions: Option<String>,
    /// "prescription" or "conversation_summary"
    #[serde(default)]
    pub source: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MedicationOverview {
    #[serde(default, deserialize_with = "crate::agents::events::lenient_vec")]
    pub current_medications: Vec<MedicationEntry>,
    #[serde(default, deserialize_with = "crate::agents::events::lenient_vec")]
    pub past_medications: Vec<MedicationEntry>,
    #[serde(default, deserialize_with = "crate::agents::events::lenient_vec")]
    pub medication_timeline: Vec<MedicationEntry>,
    #[serde(default)]
    pub medication_summary: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FinalReport {
    #[serde(default)]
    pub patient_overview: String,
    #[serde(default)]
    pub risk_level: String,
    #[serde(default)]
    pub next_steps: Vec<String>,
    #[serde(default)]
    pub summary_comment: Option<String>,
}

/// The full synthesized health report: one field per workflow stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatientHealthReport {
    #[serde(default)]
    pub timeline: Timeline,
    #[serde(default)]
    pub clinical_trends: ClinicalTrends,
    #[serde(default)]
    pub risk_and_severity: RiskAndSeverity,
    #[serde(default)]
    pub possible_conditions: PossibleConditions,
    #[serde(default)]
    pub medication_overview: MedicationOverview,
    #[serde(default)]
    pub final_report: FinalReport,
}
