//! Lab-report analysis pipeline.
//!
//! The lab app is a server-side sequential pipeline (parse → analyze →
//! risk-score → summarize); each stage contributes one state delta. The
//! client merges the deltas and decodes the four keyed outputs.

use serde::{Deserialize, Serialize};

use super::client::AgentRunner;
use super::events::PipelineState;
use super::{is_retryable, AgentError};
use crate::models::NewLabReport;

pub const LAB_REPORT_APP: &str = "lab_report_agent";

/// State keys the server-side stages write, in pipeline order.
pub const LAB_STATE_KEYS: [&str; 4] =
    ["raw_lab_data", "lab_analysis", "lab_risk_scores", "lab_summary"];

/// Maximum extra run attempts for the full lab pipeline.
const MAX_RUN_RETRIES: usize = 2;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LabMetric {
    #[serde(default)]
    pub test_name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub reference_range: Option<String>,
    #[serde(default)]
    pub interpretation: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LabData {
    #[serde(default)]
    pub report_date: Option<String>,
    #[serde(default)]
    pub report_time: Option<String>,
    #[serde(default, deserialize_with = "crate::agents::events::lenient_vec")]
    pub metrics: Vec<LabMetric>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalyzedMetric {
    #[serde(default)]
    pub test_name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub reference_range: Option<String>,
    #[serde(default)]
    pub interpretation: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LabAnalysis {
    #[serde(default, deserialize_with = "crate::agents::events::lenient_vec")]
    pub analyzed_metrics: Vec<AnalyzedMetric>,
    #[serde(default)]
    pub pattern_insights: Vec<String>,
    #[serde(default)]
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryScore {
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub score: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LabRiskScores {
    #[serde(default, deserialize_with = "crate::agents::events::lenient_vec")]
    pub category_scores: Vec<CategoryScore>,
    #[serde(default)]
    pub overall_health_risk_index: Option<f64>,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub critical_flags: Vec<String>,
    #[serde(default)]
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeyFinding {
    #[serde(default)]
    pub metric: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub interpretation: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LabSummary {
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default, deserialize_with = "crate::agents::events::lenient_vec")]
    pub key_findings: Vec<KeyFinding>,
    #[serde(default)]
    pub overall_risk: Option<String>,
    #[serde(default)]
    pub tone: Option<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub critical_alerts: Vec<String>,
}

/// The four stage outputs, merged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FinalLabReport {
    #[serde(default)]
    pub raw_lab_data: LabData,
    #[serde(default)]
    pub lab_analysis: LabAnalysis,
    #[serde(default)]
    pub lab_risk_scores: LabRiskScores,
    #[serde(default)]
    pub lab_summary: LabSummary,
}

/// Run the lab pipeline on OCR text and merge its stage outputs.
///
/// Returns the typed report plus the raw merged state (persisted as the
/// JSON backup column).
pub async fn analyze_lab_report(
    runner: &dyn AgentRunner,
    ocr_text: &str,
) -> Result<(FinalLabReport, PipelineState), AgentError> {
    let mut last_error = AgentError::MissingOutput { app: LAB_REPORT_APP.to_string() };

    for attempt in 0..=MAX_RUN_RETRIES {
        let run = match runner.run(LAB_REPORT_APP, ocr_text).await {
            Ok(run) => run,
            Err(e) if is_retryable(&e) && attempt < MAX_RUN_RETRIES => {
                tracing::warn!(attempt = attempt + 1, error = %e, "Lab pipeline run failed, retrying");
                last_error = e;
                continue;
            }
            Err(e) => return Err(e),
        };

        let mut state = run.state();

        // Fallback: some responses carry the merged object in free text
        // instead of state deltas.
        if state.is_empty() {
            if let Some(obj) = run.recovered_json().into_iter().find(|v| v.is_object()) {
                if let Some(map) = obj.as_object() {
                    state.merge_delta(map);
                }
            }
        }

        if LAB_STATE_KEYS.iter().any(|k| state.get(k).is_some()) {
            let report = FinalLabReport {
                raw_lab_data: state.decode_or_default("raw_lab_data"),
                lab_analysis: state.decode_or_default("lab_analysis"),
                lab_risk_scores: state.decode_or_default("lab_risk_scores"),
                lab_summary: state.decode_or_default("lab_summary"),
            };
            return Ok((report, state));
        }

        last_error = AgentError::MissingOutput { app: LAB_REPORT_APP.to_string() };
        if attempt < MAX_RUN_RETRIES {
            tracing::warn!(attempt = attempt + 1, "Lab pipeline produced no stage outputs, retrying");
        }
    }

    Err(last_error)
}

/// Build the insert payload: stage blobs plus the queryable extracts.
pub fn to_new_lab_report(
    file_path: &str,
    ocr_text: &str,
    report: &FinalLabReport,
    state: &PipelineState,
) -> NewLabReport {
    NewLabReport {
        file_path: file_path.to_string(),
        ocr_text: Some(ocr_text.to_string()),
        report_date: report.raw_lab_data.report_date.clone(),
        report_time: report.raw_lab_data.report_time.clone(),
        raw_lab_data: serde_json::to_value(&report.raw_lab_data).ok(),
        lab_analysis: serde_json::to_value(&report.lab_analysis).ok(),
        lab_risk_scores: serde_json::to_value(&report.lab_risk_scores).ok(),
        overall_health_risk_index: report.lab_risk_scores.overall_health_risk_index,
        severity: report
            .lab_risk_scores
            .severity
            .as_deref()
            .map(crate::models::enums::canonicalize_severity),
        critical_flags: report.lab_risk_scores.critical_flags.clone(),
        lab_summary_overview: report.lab_summary.overview.clone(),
        key_findings: report
            .lab_summary
            .key_findings
            .iter()
            .filter_map(|f| serde_json::to_value(f).ok())
            .collect(),
        overall_risk: report
            .lab_summary
            .overall_risk
            .as_deref()
            .map(crate::models::enums::canonicalize_severity),
        tone: report.lab_summary.tone.clone(),
        recommendations: report.lab_summary.recommendations.clone(),
        critical_alerts: report.lab_summary.critical_alerts.clone(),
        structured_data: Some(state.as_value()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::client::MockAgentRunner;
    use serde_json::json;

    fn stage_events() -> Vec<serde_json::Value> {
        vec![
            MockAgentRunner::state_event(
                "raw_lab_data",
                json!({
                    "report_date": "2024-03-10",
                    "report_time": "09:15",
                    "metrics": [{"test_name": "Glucose", "value": 132.0, "unit": "mg/dL",
                                 "reference_range": "70-100 mg/dL"}]
                }),
            ),
            MockAgentRunner::state_event(
                "lab_analysis",
                json!({
                    "analyzed_metrics": [{"test_name": "Glucose", "status": "high", "value": 132.0,
                                          "unit": "mg/dL", "interpretation": "Above range"}],
                    "pattern_insights": ["Fasting glucose elevated"]
                }),
            ),
            MockAgentRunner::state_event(
                "lab_risk_scores",
                json!({
                    "category_scores": [{"category": "Metabolic", "score": 0.62}],
                    "overall_health_risk_index": 0.55,
                    "severity": "Moderate",
                    "critical_flags": ["Elevated fasting glucose"],
                    "summary": "Moderate metabolic risk"
                }),
            ),
            MockAgentRunner::state_event(
                "lab_summary",
                json!({
                    "overview": "Glucose above range; everything else normal.",
                    "key_findings": [{"metric": "Glucose", "value": "132 mg/dL", "interpretation": "High"}],
                    "overall_risk": "Moderate",
                    "tone": "Cautionary",
                    "recommendations": ["Repeat fasting glucose in 2 weeks"]
                }),
            ),
        ]
    }

    #[tokio::test]
    async fn merges_all_four_stage_outputs() {
        let mock = MockAgentRunner::new();
        mock.enqueue(LAB_REPORT_APP, stage_events());

        let (report, state) = analyze_lab_report(&mock, "lab ocr text").await.unwrap();
        assert_eq!(report.raw_lab_data.metrics.len(), 1);
        assert_eq!(report.lab_analysis.analyzed_metrics[0].status, "high");
        assert_eq!(report.lab_risk_scores.overall_health_risk_index, Some(0.55));
        assert_eq!(report.lab_summary.overall_risk.as_deref(), Some("Moderate"));
        assert!(state.get("lab_summary").is_some());
    }

    #[tokio::test]
    async fn partial_stage_outputs_default_the_rest() {
        let mock = MockAgentRunner::new();
        mock.enqueue(LAB_REPORT_APP, vec![stage_events().remove(0)]);

        let (report, _) = analyze_lab_report(&mock, "lab ocr text").await.unwrap();
        assert_eq!(report.raw_lab_data.report_date.as_deref(), Some("2024-03-10"));
        assert!(report.lab_analysis.analyzed_metrics.is_empty());
        assert!(report.lab_risk_scores.overall_health_risk_index.is_none());
    }

    #[tokio::test]
    async fn falls_back_to_recovered_json() {
        let mock = MockAgentRunner::new();
        let merged = json!({
            "raw_lab_data": {"report_date": "2024-01-05", "metrics": []},
            "lab_summary": {"overall_risk": "Low"}
        });
        let text = format!("```json\n{merged}\n```");
        mock.enqueue(
            LAB_REPORT_APP,
            vec![json!({"content": {"parts": [{"text": text}]}})],
        );

        let (report, _) = analyze_lab_report(&mock, "lab ocr text").await.unwrap();
        assert_eq!(report.raw_lab_data.report_date.as_deref(), Some("2024-01-05"));
        assert_eq!(report.lab_summary.overall_risk.as_deref(), Some("Low"));
    }

    #[tokio::test]
    async fn no_usable_output_errors_after_retries() {
        let mock = MockAgentRunner::new();
        for _ in 0..3 {
            mock.enqueue(
                LAB_REPORT_APP,
                vec![json!({"content": {"parts": [{"text": "nothing structured"}]}})],
            );
        }

        let result = analyze_lab_report(&mock, "lab ocr text").await;
        assert!(matches!(result, Err(AgentError::MissingOutput { .. })));
        assert_eq!(mock.calls().len(), 3);
    }

    #[tokio::test]
    async fn insert_payload_extracts_scalars() {
        let mock = MockAgentRunner::new();
        mock.enqueue(LAB_REPORT_APP, stage_events());
        let (report, state) = analyze_lab_report(&mock, "lab ocr text").await.unwrap();

        let new = to_new_lab_report("/uploads/lab_reports/cbc.jpg", "lab ocr text", &report, &state);
        assert_eq!(new.report_date.as_deref(), Some("2024-03-10"));
        assert_eq!(new.overall_health_risk_index, Some(0.55));
        assert_eq!(new.severity.as_deref(), Some("Moderate"));
        assert_eq!(new.critical_flags, vec!["Elevated fasting glucose"]);
        assert_eq!(new.key_findings[0]["metric"], "Glucose");
        assert!(new.structured_data.unwrap()["lab_risk_scores"]["severity"].is_string());
    }
}
