use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};

use super::{json_column, opt_json_column, parse_string_array, parse_value, parse_value_array};
use crate::db::DatabaseError;
use crate::models::{LabReport, LabReportPatch, NewLabReport};

pub fn insert_lab_report(conn: &Connection, new: &NewLabReport) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO lab_reports (created_at, file_path, ocr_text, report_date, report_time,
         raw_lab_data, lab_analysis, lab_risk_scores, overall_health_risk_index, severity,
         critical_flags, lab_summary_overview, key_findings, overall_risk, tone,
         recommendations, critical_alerts, structured_data)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
        params![
            Utc::now(),
            new.file_path,
            new.ocr_text,
            new.report_date,
            new.report_time,
            opt_json_column(&new.raw_lab_data)?,
            opt_json_column(&new.lab_analysis)?,
            opt_json_column(&new.lab_risk_scores)?,
            new.overall_health_risk_index,
            new.severity,
            json_column(&new.critical_flags)?,
            new.lab_summary_overview,
            json_column(&new.key_findings)?,
            new.overall_risk,
            new.tone,
            json_column(&new.recommendations)?,
            json_column(&new.critical_alerts)?,
            opt_json_column(&new.structured_data)?,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_lab_report(conn: &Connection, id: i64) -> Result<Option<LabReport>, DatabaseError> {
    let mut stmt = conn.prepare(&format!("{SELECT_LAB_REPORT} WHERE id = ?1"))?;
    let mut rows = stmt.query_map(params![id], lab_report_from_row)?;
    match rows.next() {
        Some(row) => Ok(Some(row?)),
        None => Ok(None),
    }
}

/// Newest-first listing, capped at `limit`.
pub fn list_lab_reports(conn: &Connection, limit: u32) -> Result<Vec<LabReport>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "{SELECT_LAB_REPORT} ORDER BY created_at DESC, id DESC LIMIT ?1"
    ))?;
    let rows = stmt.query_map(params![limit], lab_report_from_row)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}

/// All lab reports, newest first (report workflow source data).
pub fn list_all_lab_reports(conn: &Connection) -> Result<Vec<LabReport>, DatabaseError> {
    let mut stmt =
        conn.prepare(&format!("{SELECT_LAB_REPORT} ORDER BY created_at DESC, id DESC"))?;
    let rows = stmt.query_map([], lab_report_from_row)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}

/// Apply a partial update. Absent fields keep their stored value.
pub fn update_lab_report(
    conn: &Connection,
    id: i64,
    patch: &LabReportPatch,
) -> Result<(), DatabaseError> {
    let recommendations = patch.recommendations.as_ref().map(|r| json_column(r)).transpose()?;
    let critical_alerts = patch.critical_alerts.as_ref().map(|c| json_column(c)).transpose()?;
    let affected = conn.execute(
        "UPDATE lab_reports SET
            report_date = COALESCE(?2, report_date),
            report_time = COALESCE(?3, report_time),
            overall_health_risk_index = COALESCE(?4, overall_health_risk_index),
            severity = COALESCE(?5, severity),
            lab_summary_overview = COALESCE(?6, lab_summary_overview),
            overall_risk = COALESCE(?7, overall_risk),
            tone = COALESCE(?8, tone),
            recommendations = COALESCE(?9, recommendations),
            critical_alerts = COALESCE(?10, critical_alerts)
         WHERE id = ?1",
        params![
            id,
            patch.report_date,
            patch.report_time,
            patch.overall_health_risk_index,
            patch.severity,
            patch.lab_summary_overview,
            patch.overall_risk,
            patch.tone,
            recommendations,
            critical_alerts,
        ],
    )?;
    if affected == 0 {
        return Err(DatabaseError::NotFound { entity_type: "lab_report".into(), id });
    }
    Ok(())
}

pub fn delete_lab_report(conn: &Connection, id: i64) -> Result<(), DatabaseError> {
    let affected = conn.execute("DELETE FROM lab_reports WHERE id = ?1", params![id])?;
    if affected == 0 {
        return Err(DatabaseError::NotFound { entity_type: "lab_report".into(), id });
    }
    Ok(())
}

const SELECT_LAB_REPORT: &str = "SELECT id, created_at, file_path, ocr_text, report_date,
    report_time, raw_lab_data, lab_analysis, lab_risk_scores, overall_health_risk_index,
    severity, critical_flags, lab_summary_overview, key_findings, overall_risk, tone,
    recommendations, critical_alerts, structured_data FROM lab_reports";

fn lab_report_from_row(row: &Row<'_>) -> Result<LabReport, rusqlite::Error> {
    let created_at: DateTime<Utc> = row.get(1)?;
    Ok(LabReport {
        id: row.get(0)?,
        created_at,
        file_path: row.get(2)?,
        ocr_text: row.get(3)?,
        report_date: row.get(4)?,
        report_time: row.get(5)?,
        raw_lab_data: parse_value(row.get(6)?),
        lab_analysis: parse_value(row.get(7)?),
        lab_risk_scores: parse_value(row.get(8)?),
        overall_health_risk_index: row.get(9)?,
        severity: row.get(10)?,
        critical_flags: parse_string_array(row.get(11)?),
        lab_summary_overview: row.get(12)?,
        key_findings: parse_value_array(row.get(13)?),
        overall_risk: row.get(14)?,
        tone: row.get(15)?,
        recommendations: parse_string_array(row.get(16)?),
        critical_alerts: parse_string_array(row.get(17)?),
        structured_data: parse_value(row.get(18)?),
    })
}
