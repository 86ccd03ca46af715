//! Check-in endpoints: audio upload → transcribe → summarize → persist,
//! plus listing and deletion. Also hosts the insurance-consultation
//! upload, which stops after transcription.

use axum::extract::{Multipart, Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{clamp_limit, MessageResponse};
use crate::agents::checkin::{summarize_checkin, to_new_checkin, CheckinSummary};
use crate::api::error::ApiError;
use crate::api::types::{read_upload, save_upload, ApiContext};
use crate::db::repository::{delete_checkin, get_checkin, insert_checkin, list_checkins};
use crate::extraction::transcribe::transcribe_audio;
use crate::models::CheckIn;

#[derive(Serialize)]
pub struct UploadCheckinResponse {
    pub id: i64,
    pub message: String,
    pub transcript: Value,
    pub summary: CheckinSummary,
}

#[derive(Serialize)]
pub struct UploadConsultationResponse {
    pub message: String,
    pub file_path: String,
    pub transcript: Value,
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub limit: Option<u32>,
}

#[derive(Serialize)]
pub struct ListCheckinsResponse {
    pub count: usize,
    pub checkins: Vec<CheckIn>,
}

/// `POST /upload-checkin` — upload and process a check-in recording.
pub async fn upload(
    State(ctx): State<ApiContext>,
    mut multipart: Multipart,
) -> Result<Json<UploadCheckinResponse>, ApiError> {
    let upload = read_upload(&mut multipart).await?;
    let audio_path =
        save_upload(&ctx.config.checkin_audio_dir(), &upload.file_name, &upload.bytes)?;
    tracing::info!(file = %audio_path.display(), "Transcribing check-in audio");

    let transcript = run_transcription(
        ctx.config.transcriber.clone(),
        audio_path.clone(),
        ctx.config.checkin_transcript_dir(),
    )
    .await?;

    let summary = summarize_checkin(ctx.agents.as_ref(), &transcript).await?;

    let new = to_new_checkin(&audio_path.to_string_lossy(), transcript.clone(), &summary);
    let id = {
        let conn = ctx.lock_db()?;
        insert_checkin(&conn, &new)?
    };
    tracing::info!(id, "Check-in stored");

    Ok(Json(UploadCheckinResponse {
        id,
        message: "Check-in stored successfully".into(),
        transcript,
        summary,
    }))
}

/// `POST /upload-insurance-consultation` — transcription only.
pub async fn upload_insurance_consultation(
    State(ctx): State<ApiContext>,
    mut multipart: Multipart,
) -> Result<Json<UploadConsultationResponse>, ApiError> {
    let upload = read_upload(&mut multipart).await?;
    let audio_path =
        save_upload(&ctx.config.insurance_audio_dir(), &upload.file_name, &upload.bytes)?;
    tracing::info!(file = %audio_path.display(), "Transcribing insurance consultation");

    let transcript = run_transcription(
        ctx.config.transcriber.clone(),
        audio_path.clone(),
        ctx.config.insurance_transcript_dir(),
    )
    .await?;

    Ok(Json(UploadConsultationResponse {
        message: "Insurance consultation stored successfully".into(),
        file_path: audio_path.to_string_lossy().into_owned(),
        transcript,
    }))
}

async fn run_transcription(
    transcriber: String,
    audio_path: std::path::PathBuf,
    output_dir: std::path::PathBuf,
) -> Result<Value, ApiError> {
    let transcript =
        tokio::task::spawn_blocking(move || transcribe_audio(&transcriber, &audio_path, &output_dir))
            .await
            .map_err(|e| ApiError::Internal(format!("transcription task: {e}")))??;
    Ok(transcript)
}

/// `GET /api/checkins/summaries` — recent check-ins, newest first.
pub async fn summaries(
    State(ctx): State<ApiContext>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListCheckinsResponse>, ApiError> {
    let conn = ctx.lock_db()?;
    let checkins = list_checkins(&conn, clamp_limit(query.limit))?;
    Ok(Json(ListCheckinsResponse { count: checkins.len(), checkins }))
}

/// `GET /api/checkins/{id}`
pub async fn get(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
) -> Result<Json<CheckIn>, ApiError> {
    let conn = ctx.lock_db()?;
    let checkin = get_checkin(&conn, id)?
        .ok_or_else(|| ApiError::NotFound(format!("checkin {id} not found")))?;
    Ok(Json(checkin))
}

/// `DELETE /api/checkins/{id}`
pub async fn delete(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    let conn = ctx.lock_db()?;
    delete_checkin(&conn, id)?;
    Ok(Json(MessageResponse::new("Check-in deleted successfully")))
}
