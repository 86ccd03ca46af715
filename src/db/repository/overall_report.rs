use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};

use super::{json_column, opt_json_column, parse_string_array, parse_value};
use crate::db::DatabaseError;
use crate::models::{NewOverallReport, OverallReport};

pub fn insert_overall_report(
    conn: &Connection,
    new: &NewOverallReport,
) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO overall_reports (created_at, pdf_file_path, timeline, clinical_trends,
         risk_and_severity, overall_health_index, overall_severity, possible_conditions,
         medication_overview, final_report, patient_overview, risk_level, next_steps,
         summary_comment, structured_data)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
        params![
            Utc::now(),
            new.pdf_file_path,
            opt_json_column(&new.timeline)?,
            opt_json_column(&new.clinical_trends)?,
            opt_json_column(&new.risk_and_severity)?,
            new.overall_health_index,
            new.overall_severity,
            opt_json_column(&new.possible_conditions)?,
            opt_json_column(&new.medication_overview)?,
            opt_json_column(&new.final_report)?,
            new.patient_overview,
            new.risk_level,
            json_column(&new.next_steps)?,
            new.summary_comment,
            opt_json_column(&new.structured_data)?,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_overall_report(
    conn: &Connection,
    id: i64,
) -> Result<Option<OverallReport>, DatabaseError> {
    let mut stmt = conn.prepare(&format!("{SELECT_OVERALL_REPORT} WHERE id = ?1"))?;
    let mut rows = stmt.query_map(params![id], overall_report_from_row)?;
    match rows.next() {
        Some(row) => Ok(Some(row?)),
        None => Ok(None),
    }
}

/// Newest-first listing, capped at `limit`.
pub fn list_overall_reports(
    conn: &Connection,
    limit: u32,
) -> Result<Vec<OverallReport>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "{SELECT_OVERALL_REPORT} ORDER BY created_at DESC, id DESC LIMIT ?1"
    ))?;
    let rows = stmt.query_map(params![limit], overall_report_from_row)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}

pub fn delete_overall_report(conn: &Connection, id: i64) -> Result<(), DatabaseError> {
    let affected = conn.execute("DELETE FROM overall_reports WHERE id = ?1", params![id])?;
    if affected == 0 {
        return Err(DatabaseError::NotFound { entity_type: "overall_report".into(), id });
    }
    Ok(())
}

const SELECT_OVERALL_REPORT: &str = "SELECT id, created_at, pdf_file_path, timeline,
    clinical_trends, risk_and_severity, overall_health_index, overall_severity,
    possible_conditions, medication_overview, final_report, patient_overview, risk_level,
    next_steps, summary_comment, structured_data FROM overall_reports";

fn overall_report_from_row(row: &Row<'_>) -> Result<OverallReport, rusqlite::Error> {
    let created_at: DateTime<Utc> = row.get(1)?;
    Ok(OverallReport {
        id: row.get(0)?,
        created_at,
        pdf_file_path: row.get(2)?,
        timeline: parse_value(row.get(3)?),
        clinical_trends: parse_value(row.get(4)?),
        risk_and_severity: parse_value(row.get(5)?),
        overall_health_index: row.get(6)?,
        overall_severity: row.get(7)?,
        possible_conditions: parse_value(row.get(8)?),
        medication_overview: parse_value(row.get(9)?),
        final_report: parse_value(row.get(10)?),
        patient_overview: row.get(11)?,
        risk_level: row.get(12)?,
        next_steps: parse_string_array(row.get(13)?),
        summary_comment: row.get(14)?,
        structured_data: parse_value(row.get(15)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;
    use serde_json::json;

    fn sample() -> NewOverallReport {
        NewOverallReport {
            pdf_file_path: "/uploads/overall_reports/OverallReport_ab12cd34.pdf".into(),
            timeline: Some(json!({"events": [{"date": "2024-03-01", "event_type": "doctor_visit",
                "description": "Hypertension follow-up"}]})),
            clinical_trends: Some(json!({"trends": [{"metric": "Glucose", "trend": "increasing",
                "status": "abnormal_high"}]})),
            risk_and_severity: Some(json!({"overall_health_index": 68.0, "overall_severity": "Moderate"})),
            overall_health_index: Some(68.0),
            overall_severity: Some("Moderate".into()),
            possible_conditions: Some(json!({"conditions": [{"condition": "Type 2 Diabetes",
                "confidence": 62.0}]})),
            medication_overview: Some(json!({"current_medications": [{"name": "Amlodipine"}]})),
            final_report: Some(json!({"patient_overview": "Stable", "risk_level": "Moderate"})),
            patient_overview: Some("Stable with moderate metabolic risk.".into()),
            risk_level: Some("Moderate".into()),
            next_steps: vec!["Repeat fasting glucose".into(), "Monitor blood pressure".into()],
            summary_comment: Some("Glucose trending upward.".into()),
            structured_data: Some(json!({"final_report": {"risk_level": "Moderate"}})),
        }
    }

    #[test]
    fn insert_and_get_round_trip() {
        let conn = open_memory_database().unwrap();
        let id = insert_overall_report(&conn, &sample()).unwrap();

        let report = get_overall_report(&conn, id).unwrap().unwrap();
        assert_eq!(report.overall_health_index, Some(68.0));
        assert_eq!(report.risk_level.as_deref(), Some("Moderate"));
        assert_eq!(report.next_steps.len(), 2);
        assert_eq!(report.timeline.unwrap()["events"][0]["event_type"], "doctor_visit");
    }

    #[test]
    fn list_is_newest_first() {
        let conn = open_memory_database().unwrap();
        insert_overall_report(&conn, &sample()).unwrap();
        let latest = insert_overall_report(&conn, &sample()).unwrap();

        let listed = list_overall_reports(&conn, 10).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, latest);
    }

    #[test]
    fn delete_removes_row() {
        let conn = open_memory_database().unwrap();
        let id = insert_overall_report(&conn, &sample()).unwrap();
        delete_overall_report(&conn, id).unwrap();
        assert!(get_overall_report(&conn, id).unwrap().is_none());
        assert!(matches!(
            delete_overall_report(&conn, id).unwrap_err(),
            DatabaseError::NotFound { .. }
        ));
    }
}
