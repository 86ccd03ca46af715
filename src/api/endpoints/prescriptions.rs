//! Prescription endpoints: image upload → vision OCR → extraction agent →
//! persist, plus CRUD over stored prescriptions.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use super::checkins::ListQuery;
use super::{clamp_limit, MessageResponse};
use crate::agents::prescription::{extract_prescription, to_new_prescription, PrescriptionData};
use crate::api::error::ApiError;
use crate::api::types::{read_upload, save_upload, ApiContext};
use crate::db::repository::{
    delete_prescription, get_prescription, insert_prescription, list_all_prescriptions,
    list_prescriptions, update_prescription,
};
use crate::extraction::vision::detect_image_mime;
use crate::models::{NewPrescription, Prescription, PrescriptionPatch};

#[derive(Serialize)]
pub struct UploadPrescriptionResponse {
    pub id: i64,
    pub message: String,
    pub ocr_text: String,
    pub data: PrescriptionData,
}

#[derive(Serialize)]
pub struct ListPrescriptionsResponse {
    pub count: usize,
    pub prescriptions: Vec<Prescription>,
}

/// `POST /api/prescriptions/upload` — process a prescription image.
pub async fn upload(
    State(ctx): State<ApiContext>,
    mut multipart: Multipart,
) -> Result<Json<UploadPrescriptionResponse>, ApiError> {
    let upload = read_upload(&mut multipart).await?;
    let file_path =
        save_upload(&ctx.config.prescription_dir(), &upload.file_name, &upload.bytes)?;
    tracing::info!(file = %file_path.display(), "Processing prescription upload");

    let mime = detect_image_mime(&upload.bytes);
    let ocr_text = ctx.vision.extract_text(&upload.bytes, mime).await?;
    let data = extract_prescription(ctx.agents.as_ref(), &ocr_text).await?;

    let new = to_new_prescription(&file_path.to_string_lossy(), &ocr_text, &data);
    let id = {
        let conn = ctx.lock_db()?;
        insert_prescription(&conn, &new)?
    };
    tracing::info!(id, "Prescription stored");

    Ok(Json(UploadPrescriptionResponse {
        id,
        message: "Prescription processed successfully".into(),
        ocr_text,
        data,
    }))
}

/// `GET /api/prescriptions/summaries` — recent prescriptions, newest first.
pub async fn summaries(
    State(ctx): State<ApiContext>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListPrescriptionsResponse>, ApiError> {
    let conn = ctx.lock_db()?;
    let prescriptions = list_prescriptions(&conn, clamp_limit(query.limit))?;
    Ok(Json(ListPrescriptionsResponse { count: prescriptions.len(), prescriptions }))
}

/// `GET /api/prescriptions` — every stored prescription.
pub async fn list(
    State(ctx): State<ApiContext>,
) -> Result<Json<ListPrescriptionsResponse>, ApiError> {
    let conn = ctx.lock_db()?;
    let prescriptions = list_all_prescriptions(&conn)?;
    Ok(Json(ListPrescriptionsResponse { count: prescriptions.len(), prescriptions }))
}

/// `GET /api/prescriptions/{id}`
pub async fn get(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
) -> Result<Json<Prescription>, ApiError> {
    let conn = ctx.lock_db()?;
    let prescription = get_prescription(&conn, id)?
        .ok_or_else(|| ApiError::NotFound(format!("prescription {id} not found")))?;
    Ok(Json(prescription))
}

/// `POST /api/prescriptions` — create a record directly from JSON.
pub async fn create(
    State(ctx): State<ApiContext>,
    Json(new): Json<NewPrescription>,
) -> Result<(StatusCode, Json<Prescription>), ApiError> {
    if new.file_path.trim().is_empty() {
        return Err(ApiError::BadRequest("file_path is required".into()));
    }
    let conn = ctx.lock_db()?;
    let id = insert_prescription(&conn, &new)?;
    let prescription = get_prescription(&conn, id)?
        .ok_or_else(|| ApiError::Internal("created prescription vanished".into()))?;
    Ok((StatusCode::CREATED, Json(prescription)))
}

/// `PUT /api/prescriptions/{id}` — partial update.
pub async fn update(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
    Json(patch): Json<PrescriptionPatch>,
) -> Result<Json<Prescription>, ApiError> {
    let conn = ctx.lock_db()?;
    update_prescription(&conn, id, &patch)?;
    let prescription = get_prescription(&conn, id)?
        .ok_or_else(|| ApiError::NotFound(format!("prescription {id} not found")))?;
    Ok(Json(prescription))
}

/// `DELETE /api/prescriptions/{id}`
pub async fn delete(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    let conn = ctx.lock_db()?;
    delete_prescription(&conn, id)?;
    Ok(Json(MessageResponse::new("Prescription deleted successfully")))
}
