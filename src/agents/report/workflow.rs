//! The multi-stage health-report workflow.
//!
//! A fixed, ordered pipeline of agent stages. Sequencing lives here, not in
//! the agent server: every stage receives the full source data plus the
//! accumulated outputs of the stages before it, and its keyed output is
//! folded into the running state. A stage that fails after retries aborts
//! the workflow with a stage-tagged error.

use chrono::NaiveDate;
use rusqlite::Connection;
use serde::Serialize;
use serde_json::{json, Value};

use super::merge::{normalize_timeline, reconcile_medications};
use super::types::{MedicationOverview, PatientHealthReport};
use crate::agents::client::{run_expect_key, AgentRunner};
use crate::agents::events::PipelineState;
use crate::agents::AgentError;
use crate::db::repository::{list_all_checkins, list_all_lab_reports, list_all_prescriptions};
use crate::db::DatabaseError;
use crate::models::{CheckIn, LabReport, Prescription};

/// One stage of the report workflow.
#[derive(Debug, Clone, Copy)]
pub struct StageSpec {
    pub name: &'static str,
    pub app: &'static str,
    pub output_key: &'static str,
}

/// The fixed stage order. Each stage consumes the prior stages' outputs.
pub const REPORT_STAGES: &[StageSpec] = &[
    StageSpec { name: "timeline", app: "timeline_builder", output_key: "timeline" },
    StageSpec {
        name: "clinical trends",
        app: "clinical_trend_analyzer",
        output_key: "clinical_trends",
    },
    StageSpec { name: "risk scoring", app: "risk_scorer", output_key: "risk_and_severity" },
    StageSpec {
        name: "disease inference",
        app: "disease_inference",
        output_key: "possible_conditions",
    },
    StageSpec {
        name: "medication aggregation",
        app: "medication_aggregator",
        output_key: "medication_overview",
    },
    StageSpec { name: "report generation", app: "report_generator", output_key: "final_report" },
];

/// Everything the workflow reads: all stored check-ins, prescriptions, and
/// lab reports, formatted for the agents.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MedicalData {
    pub checkins: Vec<Value>,
    pub prescriptions: Vec<Value>,
    pub lab_reports: Vec<Value>,
}

impl MedicalData {
    pub fn is_empty(&self) -> bool {
        self.checkins.is_empty() && self.prescriptions.is_empty() && self.lab_reports.is_empty()
    }
}

/// Gather every stored record and format it for the workflow.
pub fn gather_medical_data(conn: &Connection) -> Result<MedicalData, DatabaseError> {
    let checkins = list_all_checkins(conn)?;
    let prescriptions = list_all_prescriptions(conn)?;
    let lab_reports = list_all_lab_reports(conn)?;

    tracing::info!(
        checkins = checkins.len(),
        prescriptions = prescriptions.len(),
        lab_reports = lab_reports.len(),
        "Gathered medical data for report workflow"
    );

    Ok(MedicalData {
        checkins: checkins.iter().map(checkin_payload).collect(),
        prescriptions: prescriptions.iter().map(prescription_payload).collect(),
        lab_reports: lab_reports.iter().map(lab_report_payload).collect(),
    })
}

fn checkin_payload(checkin: &CheckIn) -> Value {
    json!({
        "id": checkin.id,
        "timestamp": checkin.created_at.to_rfc3339(),
        "summary": checkin.summary,
        "mood": checkin.mood,
        "symptoms": checkin.symptoms,
        "medications_taken": checkin.medications_taken,
        "sleep_quality": checkin.sleep_quality,
        "energy_level": checkin.energy_level,
        "concerns": checkin.concerns,
        "ai_insights": checkin.ai_insights,
        "overall_score": checkin.overall_score,
    })
}

fn prescription_payload(prescription: &Prescription) -> Value {
    json!({
        "id": prescription.id,
        "timestamp": prescription.created_at.to_rfc3339(),
        "prescription_date": prescription.prescription_date,
        "doctor_name": prescription.doctor_name,
        "doctor_qualification": prescription.doctor_qualification,
        "hospital": prescription.hospital,
        "patient_name": prescription.patient_name,
        "patient_age": prescription.patient_age,
        "patient_gender": prescription.patient_gender,
        "medicines": prescription.medicines,
        "diagnosis": prescription.diagnosis,
        "symptoms": prescription.symptoms,
        "advice": prescription.advice,
        "follow_up": prescription.follow_up,
        "prescription_summary": prescription.prescription_summary,
    })
}

fn lab_report_payload(report: &LabReport) -> Value {
    json!({
        "id": report.id,
        "timestamp": report.created_at.to_rfc3339(),
        "report_date": report.report_date,
        "report_time": report.report_time,
        "raw_lab_data": report.raw_lab_data,
        "lab_analysis": report.lab_analysis,
        "lab_risk_scores": report.lab_risk_scores,
        "overall_health_risk_index": report.overall_health_risk_index,
        "severity": report.severity,
        "critical_flags": report.critical_flags,
        "lab_summary_overview": report.lab_summary_overview,
        "key_findings": report.key_findings,
        "overall_risk": report.overall_risk,
        "recommendations": report.recommendations,
        "critical_alerts": report.critical_alerts,
    })
}

/// Assemble one stage's input: the source data plus every prior output.
fn stage_input(source: &Value, state: &PipelineState) -> Result<String, AgentError> {
    let document = json!({
        "medical_data": source,
        "prior_outputs": state.as_value(),
    });
    serde_json::to_string_pretty(&document)
        .map_err(|e| AgentError::Http(format!("stage input serialization: {e}")))
}

/// Run the full workflow and decode the synthesized report.
///
/// Returns the typed report plus the final state (persisted as the JSON
/// backup column). `as_of` anchors the date-weighted medication merge.
pub async fn run_report_workflow(
    runner: &dyn AgentRunner,
    data: &MedicalData,
    as_of: NaiveDate,
) -> Result<(PatientHealthReport, PipelineState), AgentError> {
    let source = serde_json::to_value(data)
        .map_err(|e| AgentError::Http(format!("medical data serialization: {e}")))?;
    let mut state = PipelineState::default();

    for stage in REPORT_STAGES {
        let input = stage_input(&source, &state)?;
        tracing::info!(stage = stage.name, app = stage.app, "Running report stage");

        let output: Value = run_expect_key(runner, stage.app, stage.output_key, &input)
            .await
            .map_err(|e| AgentError::Stage { stage: stage.name, source: Box::new(e) })?;

        let output = if stage.output_key == "medication_overview" {
            reconcile_medication_output(output, as_of)
        } else {
            output
        };

        state.insert(stage.output_key, output);
    }

    let mut report = PatientHealthReport {
        timeline: state.decode_or_default("timeline"),
        clinical_trends: state.decode_or_default("clinical_trends"),
        risk_and_severity: state.decode_or_default("risk_and_severity"),
        possible_conditions: state.decode_or_default("possible_conditions"),
        medication_overview: state.decode_or_default("medication_overview"),
        final_report: state.decode_or_default("final_report"),
    };

    report.timeline = normalize_timeline(report.timeline);
    if let Ok(timeline) = serde_json::to_value(&report.timeline) {
        state.insert("timeline", timeline);
    }

    Ok((report, state))
}

/// Decode, reconcile, and re-serialize the aggregation stage's output.
/// An undecodable output passes through untouched.
fn reconcile_medication_output(output: Value, as_of: NaiveDate) -> Value {
    match serde_json::from_value::<MedicationOverview>(output.clone()) {
        Ok(overview) => {
            let reconciled = reconcile_medications(overview, as_of);
            serde_json::to_value(&reconciled).unwrap_or(output)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Medication overview not reconcilable, keeping agent output");
            output
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::client::MockAgentRunner;
    use crate::db::repository::{insert_checkin, insert_lab_report, insert_prescription};
    use crate::db::sqlite::open_memory_database;
    use crate::models::{NewCheckIn, NewLabReport, NewPrescription};

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn sample_data() -> MedicalData {
        MedicalData {
            checkins: vec![json!({"id": 1, "mood": "tired", "symptoms": ["fatigue"]})],
            prescriptions: vec![json!({"id": 1, "medicines": [{"name": "Amlodipine"}]})],
            lab_reports: vec![json!({"id": 1, "severity": "Moderate"})],
        }
    }

    fn enqueue_all_stages(mock: &MockAgentRunner) {
        mock.enqueue(
            "timeline_builder",
            vec![MockAgentRunner::state_event(
                "timeline",
                json!({"events": [
                    {"date": "2024-03-01", "event_type": "doctor_visit", "description": "Follow-up"},
                    {"date": "2024-01-15", "event_type": "lab_test", "description": "Fasting glucose"}
                ]}),
            )],
        );
        mock.enqueue(
            "clinical_trend_analyzer",
            vec![MockAgentRunner::state_event(
                "clinical_trends",
                json!({"trends": [{"metric": "Glucose", "trend": "increasing", "status": "abnormal_high"}]}),
            )],
        );
        mock.enqueue(
            "risk_scorer",
            vec![MockAgentRunner::state_event(
                "risk_and_severity",
                json!({
                    "disease_risks": [{"disease": "Diabetes", "risk_score": 58.0, "severity_level": "Moderate"}],
                    "overall_health_index": 67.0,
                    "overall_severity": "Moderate"
                }),
            )],
        );
        mock.enqueue(
            "disease_inference",
            vec![MockAgentRunner::state_event(
                "possible_conditions",
                json!({"conditions": [{"condition": "Type 2 Diabetes", "confidence": 62.0,
                        "recommended_action": "HbA1c test"}]}),
            )],
        );
        mock.enqueue(
            "medication_aggregator",
            vec![MockAgentRunner::state_event(
                "medication_overview",
                json!({
                    "current_medications": [
                        {"name": "Amlodipine", "start_date": "2023-10-01", "source": "conversation_summary"},
                        {"name": "amlodipine", "dosage": "5mg", "start_date": "2024-02-01", "source": "prescription"}
                    ],
                    "medication_summary": "One antihypertensive."
                }),
            )],
        );
        mock.enqueue(
            "report_generator",
            vec![MockAgentRunner::state_event(
                "final_report",
                json!({
                    "patient_overview": "Moderate metabolic risk.",
                    "risk_level": "Moderate",
                    "next_steps": ["HbA1c test", "Monitor blood pressure"]
                }),
            )],
        );
    }

    #[tokio::test]
    async fn runs_all_stages_in_order() {
        let mock = MockAgentRunner::new();
        enqueue_all_stages(&mock);

        let (report, state) = run_report_workflow(&mock, &sample_data(), as_of()).await.unwrap();

        let apps: Vec<_> = mock.calls().into_iter().map(|(app, _)| app).collect();
        assert_eq!(
            apps,
            vec![
                "timeline_builder",
                "clinical_trend_analyzer",
                "risk_scorer",
                "disease_inference",
                "medication_aggregator",
                "report_generator"
            ]
        );

        assert_eq!(report.final_report.risk_level, "Moderate");
        assert_eq!(report.risk_and_severity.overall_health_index, Some(67.0));
        assert!(state.get("final_report").is_some());
    }

    #[tokio::test]
    async fn each_stage_sees_prior_outputs() {
        let mock = MockAgentRunner::new();
        enqueue_all_stages(&mock);

        run_report_workflow(&mock, &sample_data(), as_of()).await.unwrap();
        let calls = mock.calls();

        // The first stage sees only the source data
        assert!(calls[0].1.contains("\"medical_data\""));
        assert!(!calls[0].1.contains("doctor_visit"));
        // The trend stage sees the timeline output
        assert!(calls[1].1.contains("doctor_visit"));
        // The last stage sees every prior output
        assert!(calls[5].1.contains("Type 2 Diabetes"));
        assert!(calls[5].1.contains("overall_health_index"));
    }

    #[tokio::test]
    async fn medication_duplicates_are_reconciled() {
        let mock = MockAgentRunner::new();
        enqueue_all_stages(&mock);

        let (report, _) = run_report_workflow(&mock, &sample_data(), as_of()).await.unwrap();
        let meds = &report.medication_overview;
        assert_eq!(meds.current_medications.len(), 1);
        assert_eq!(meds.current_medications[0].dosage.as_deref(), Some("5mg"));
        assert_eq!(meds.current_medications[0].start_date.as_deref(), Some("2024-02-01"));
    }

    #[tokio::test]
    async fn timeline_is_normalized_chronologically() {
        let mock = MockAgentRunner::new();
        enqueue_all_stages(&mock);

        let (report, state) = run_report_workflow(&mock, &sample_data(), as_of()).await.unwrap();
        assert_eq!(report.timeline.events[0].date.as_deref(), Some("2024-01-15"));
        // The persisted state sees the normalized ordering too
        assert_eq!(
            state.get("timeline").unwrap()["events"][0]["date"],
            "2024-01-15"
        );
    }

    #[tokio::test]
    async fn failing_stage_aborts_with_stage_tag() {
        let mock = MockAgentRunner::new();
        mock.enqueue(
            "timeline_builder",
            vec![MockAgentRunner::state_event("timeline", json!({"events": []}))],
        );
        // clinical_trend_analyzer has nothing queued → run failures, retries
        // exhausted, workflow aborts.

        let result = run_report_workflow(&mock, &sample_data(), as_of()).await;
        match result {
            Err(AgentError::Stage { stage, .. }) => assert_eq!(stage, "clinical trends"),
            other => panic!("expected stage error, got {other:?}"),
        }
        // 1 timeline call + 3 failed trend attempts, later stages never ran
        assert_eq!(mock.calls().len(), 4);
    }

    #[test]
    fn gather_formats_all_three_sources() {
        let conn = open_memory_database().unwrap();
        insert_checkin(
            &conn,
            &NewCheckIn {
                audio_path: "/a.wav".into(),
                mood: Some("tired".into()),
                symptoms: vec!["fatigue".into()],
                ..Default::default()
            },
        )
        .unwrap();
        insert_prescription(
            &conn,
            &NewPrescription {
                file_path: "/rx.jpg".into(),
                doctor_name: Some("Dr. A. Rao".into()),
                medicines: vec![json!({"name": "Amlodipine"})],
                ..Default::default()
            },
        )
        .unwrap();
        insert_lab_report(
            &conn,
            &NewLabReport {
                file_path: "/lab.jpg".into(),
                severity: Some("Moderate".into()),
                ..Default::default()
            },
        )
        .unwrap();

        let data = gather_medical_data(&conn).unwrap();
        assert!(!data.is_empty());
        assert_eq!(data.checkins[0]["mood"], "tired");
        assert_eq!(data.prescriptions[0]["doctor_name"], "Dr. A. Rao");
        assert_eq!(data.lab_reports[0]["severity"], "Moderate");
        // File paths stay out of the agent payload
        assert!(data.prescriptions[0].get("file_path").is_none());
    }

    #[test]
    fn empty_database_yields_empty_data() {
        let conn = open_memory_database().unwrap();
        let data = gather_medical_data(&conn).unwrap();
        assert!(data.is_empty());
    }
}
