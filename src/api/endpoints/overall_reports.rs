//! Overall-report endpoints: run the multi-stage workflow over everything
//! stored, render the PDF, persist, and serve the results.

use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use super::checkins::ListQuery;
use super::{clamp_limit, MessageResponse};
use crate::agents::report::{gather_medical_data, run_report_workflow};
use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::db::repository::{
    delete_overall_report, get_overall_report, insert_overall_report, list_overall_reports,
};
use crate::models::enums::canonicalize_severity;
use crate::models::{NewOverallReport, OverallReport};
use crate::report_pdf::render_report_pdf;

#[derive(Serialize)]
pub struct GenerateReportResponse {
    pub id: i64,
    pub pdf_file_path: String,
    pub status: &'static str,
    pub structured_data: Value,
}

#[derive(Serialize)]
pub struct ListOverallReportsResponse {
    pub count: usize,
    pub reports: Vec<OverallReport>,
}

/// `POST /api/overall-reports/generate` — synthesize a new health report
/// from every stored check-in, prescription, and lab report.
pub async fn generate(
    State(ctx): State<ApiContext>,
) -> Result<Json<GenerateReportResponse>, ApiError> {
    let data = {
        let conn = ctx.lock_db()?;
        gather_medical_data(&conn)?
    };
    if data.is_empty() {
        return Err(ApiError::BadRequest(
            "no check-ins, prescriptions, or lab reports to report on".into(),
        ));
    }

    tracing::info!("Starting overall report generation");
    let (report, state) =
        run_report_workflow(ctx.agents.as_ref(), &data, Utc::now().date_naive()).await?;

    let generated_at = Utc::now().format("%Y-%m-%d %H:%M UTC").to_string();
    let pdf_bytes = render_report_pdf(&report, &generated_at)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    let dir = ctx.config.overall_report_dir();
    std::fs::create_dir_all(&dir).map_err(|e| ApiError::Internal(format!("report dir: {e}")))?;
    let file_name = format!("OverallReport_{}.pdf", &Uuid::new_v4().simple().to_string()[..8]);
    let pdf_path = dir.join(file_name);
    std::fs::write(&pdf_path, &pdf_bytes)
        .map_err(|e| ApiError::Internal(format!("failed to write PDF: {e}")))?;
    tracing::info!(path = %pdf_path.display(), "Report PDF written");

    let overview = (!report.final_report.patient_overview.is_empty())
        .then(|| report.final_report.patient_overview.clone());
    let risk_level = (!report.final_report.risk_level.is_empty())
        .then(|| canonicalize_severity(&report.final_report.risk_level));

    let new = NewOverallReport {
        pdf_file_path: pdf_path.to_string_lossy().into_owned(),
        timeline: state.get("timeline").cloned(),
        clinical_trends: state.get("clinical_trends").cloned(),
        risk_and_severity: state.get("risk_and_severity").cloned(),
        overall_health_index: report.risk_and_severity.overall_health_index,
        overall_severity: report
            .risk_and_severity
            .overall_severity
            .as_deref()
            .map(canonicalize_severity),
        possible_conditions: state.get("possible_conditions").cloned(),
        medication_overview: state.get("medication_overview").cloned(),
        final_report: state.get("final_report").cloned(),
        patient_overview: overview,
        risk_level,
        next_steps: report.final_report.next_steps.clone(),
        summary_comment: report.final_report.summary_comment.clone(),
        structured_data: Some(state.as_value()),
    };

    let id = {
        let conn = ctx.lock_db()?;
        insert_overall_report(&conn, &new)?
    };
    tracing::info!(id, "Overall report stored");

    Ok(Json(GenerateReportResponse {
        id,
        pdf_file_path: new.pdf_file_path,
        status: "success",
        structured_data: state.as_value(),
    }))
}

/// `GET /api/overall-reports` — recent reports, newest first.
pub async fn list(
    State(ctx): State<ApiContext>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListOverallReportsResponse>, ApiError> {
    let conn = ctx.lock_db()?;
    let reports = list_overall_reports(&conn, clamp_limit(query.limit))?;
    Ok(Json(ListOverallReportsResponse { count: reports.len(), reports }))
}

/// `GET /api/overall-reports/{id}`
pub async fn get(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
) -> Result<Json<OverallReport>, ApiError> {
    let conn = ctx.lock_db()?;
    let report = get_overall_report(&conn, id)?
        .ok_or_else(|| ApiError::NotFound(format!("overall report {id} not found")))?;
    Ok(Json(report))
}

/// `GET /api/overall-reports/{id}/pdf` — the rendered PDF.
pub async fn pdf(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let pdf_path = {
        let conn = ctx.lock_db()?;
        get_overall_report(&conn, id)?
            .ok_or_else(|| ApiError::NotFound(format!("overall report {id} not found")))?
            .pdf_file_path
    };

    let bytes = tokio::fs::read(&pdf_path)
        .await
        .map_err(|e| ApiError::NotFound(format!("report PDF missing: {e}")))?;
    Ok(([(header::CONTENT_TYPE, "application/pdf")], bytes))
}

/// `DELETE /api/overall-reports/{id}`
pub async fn delete(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    let conn = ctx.lock_db()?;
    delete_overall_report(&conn, id)?;
    Ok(Json(MessageResponse::new("Overall report deleted successfully")))
}
