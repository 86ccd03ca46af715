//! Lab-report endpoints: image upload → vision OCR → lab pipeline →
//! persist, plus CRUD over stored reports.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use super::checkins::ListQuery;
use super::{clamp_limit, MessageResponse};
use crate::agents::lab::{analyze_lab_report, to_new_lab_report, FinalLabReport};
use crate::api::error::ApiError;
use crate::api::types::{read_upload, save_upload, ApiContext};
use crate::db::repository::{
    delete_lab_report, get_lab_report, insert_lab_report, list_all_lab_reports, list_lab_reports,
    update_lab_report,
};
use crate::extraction::vision::detect_image_mime;
use crate::models::{LabReport, LabReportPatch, NewLabReport};

#[derive(Serialize)]
pub struct UploadLabReportResponse {
    pub id: i64,
    pub message: String,
    pub ocr_text: String,
    pub report: FinalLabReport,
}

#[derive(Serialize)]
pub struct ListLabReportsResponse {
    pub count: usize,
    pub reports: Vec<LabReport>,
}

/// `POST /api/lab-reports/upload` — process a lab-report image.
pub async fn upload(
    State(ctx): State<ApiContext>,
    mut multipart: Multipart,
) -> Result<Json<UploadLabReportResponse>, ApiError> {
    let upload = read_upload(&mut multipart).await?;
    let file_path = save_upload(&ctx.config.lab_report_dir(), &upload.file_name, &upload.bytes)?;
    tracing::info!(file = %file_path.display(), "Processing lab report upload");

    let mime = detect_image_mime(&upload.bytes);
    let ocr_text = ctx.vision.extract_text(&upload.bytes, mime).await?;
    let (report, state) = analyze_lab_report(ctx.agents.as_ref(), &ocr_text).await?;

    let new = to_new_lab_report(&file_path.to_string_lossy(), &ocr_text, &report, &state);
    let id = {
        let conn = ctx.lock_db()?;
        insert_lab_report(&conn, &new)?
    };
    tracing::info!(id, "Lab report stored");

    Ok(Json(UploadLabReportResponse {
        id,
        message: "Lab report processed successfully".into(),
        ocr_text,
        report,
    }))
}

/// `GET /api/lab-reports/summaries` — recent reports, newest first.
pub async fn summaries(
    State(ctx): State<ApiContext>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListLabReportsResponse>, ApiError> {
    let conn = ctx.lock_db()?;
    let reports = list_lab_reports(&conn, clamp_limit(query.limit))?;
    Ok(Json(ListLabReportsResponse { count: reports.len(), reports }))
}

/// `GET /api/lab-reports` — every stored report.
pub async fn list(State(ctx): State<ApiContext>) -> Result<Json<ListLabReportsResponse>, ApiError> {
    let conn = ctx.lock_db()?;
    let reports = list_all_lab_reports(&conn)?;
    Ok(Json(ListLabReportsResponse { count: reports.len(), reports }))
}

/// `GET /api/lab-reports/{id}`
pub async fn get(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
) -> Result<Json<LabReport>, ApiError> {
    let conn = ctx.lock_db()?;
    let report = get_lab_report(&conn, id)?
        .ok_or_else(|| ApiError::NotFound(format!("lab report {id} not found")))?;
    Ok(Json(report))
}

/// `POST /api/lab-reports` — create a record directly from JSON.
pub async fn create(
    State(ctx): State<ApiContext>,
    Json(new): Json<NewLabReport>,
) -> Result<(StatusCode, Json<LabReport>), ApiError> {
    if new.file_path.trim().is_empty() {
        return Err(ApiError::BadRequest("file_path is required".into()));
    }
    let conn = ctx.lock_db()?;
    let id = insert_lab_report(&conn, &new)?;
    let report = get_lab_report(&conn, id)?
        .ok_or_else(|| ApiError::Internal("created lab report vanished".into()))?;
    Ok((StatusCode::CREATED, Json(report)))
}

/// `PUT /api/lab-reports/{id}` — partial update.
pub async fn update(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
    Json(patch): Json<LabReportPatch>,
) -> Result<Json<LabReport>, ApiError> {
    let conn = ctx.lock_db()?;
    update_lab_report(&conn, id, &patch)?;
    let report = get_lab_report(&conn, id)?
        .ok_or_else(|| ApiError::NotFound(format!("lab report {id} not found")))?;
    Ok(Json(report))
}

/// `DELETE /api/lab-reports/{id}`
pub async fn delete(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    let conn = ctx.lock_db()?;
    delete_lab_report(&conn, id)?;
    Ok(Json(MessageResponse::new("Lab report deleted successfully")))
}
