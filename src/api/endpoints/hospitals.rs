//! Hospital directory CRUD.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use super::MessageResponse;
use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::db::repository::{
    delete_hospital, get_hospital, insert_hospital, list_hospitals, update_hospital,
};
use crate::models::{Hospital, HospitalInput};

/// `GET /api/hospitals`
pub async fn list(State(ctx): State<ApiContext>) -> Result<Json<Vec<Hospital>>, ApiError> {
    let conn = ctx.lock_db()?;
    Ok(Json(list_hospitals(&conn)?))
}

/// `GET /api/hospitals/{id}`
pub async fn get(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
) -> Result<Json<Hospital>, ApiError> {
    let conn = ctx.lock_db()?;
    let hospital = get_hospital(&conn, id)?
        .ok_or_else(|| ApiError::NotFound(format!("hospital {id} not found")))?;
    Ok(Json(hospital))
}

/// `POST /api/hospitals`
pub async fn create(
    State(ctx): State<ApiContext>,
    Json(input): Json<HospitalInput>,
) -> Result<(StatusCode, Json<Hospital>), ApiError> {
    let conn = ctx.lock_db()?;
    let id = insert_hospital(&conn, &input)?;
    let hospital = get_hospital(&conn, id)?
        .ok_or_else(|| ApiError::Internal("created hospital vanished".into()))?;
    Ok((StatusCode::CREATED, Json(hospital)))
}

/// `PUT /api/hospitals/{id}`
pub async fn update(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
    Json(input): Json<HospitalInput>,
) -> Result<Json<Hospital>, ApiError> {
    let conn = ctx.lock_db()?;
    update_hospital(&conn, id, &input)?;
    let hospital = get_hospital(&conn, id)?
        .ok_or_else(|| ApiError::NotFound(format!("hospital {id} not found")))?;
    Ok(Json(hospital))
}

/// `DELETE /api/hospitals/{id}`
pub async fn delete(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    let conn = ctx.lock_db()?;
    delete_hospital(&conn, id)?;
    Ok(Json(MessageResponse::new("Hospital deleted successfully")))
}
