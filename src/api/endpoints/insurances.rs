//! Insurance plan directory CRUD.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use super::MessageResponse;
use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::db::repository::{
    delete_insurance, get_insurance, insert_insurance, list_insurances, update_insurance,
};
use crate::models::{Insurance, InsuranceInput};

/// `GET /api/insurances`
pub async fn list(State(ctx): State<ApiContext>) -> Result<Json<Vec<Insurance>>, ApiError> {
    let conn = ctx.lock_db()?;
    Ok(Json(list_insurances(&conn)?))
}

/// `GET /api/insurances/{id}`
pub async fn get(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
) -> Result<Json<Insurance>, ApiError> {
    let conn = ctx.lock_db()?;
    let insurance = get_insurance(&conn, id)?
        .ok_or_else(|| ApiError::NotFound(format!("insurance {id} not found")))?;
    Ok(Json(insurance))
}

/// `POST /api/insurances`
pub async fn create(
    State(ctx): State<ApiContext>,
    Json(input): Json<InsuranceInput>,
) -> Result<(StatusCode, Json<Insurance>), ApiError> {
    let conn = ctx.lock_db()?;
    let id = insert_insurance(&conn, &input)?;
    let insurance = get_insurance(&conn, id)?
        .ok_or_else(|| ApiError::Internal("created insurance vanished".into()))?;
    Ok((StatusCode::CREATED, Json(insurance)))
}

/// `PUT /api/insurances/{id}`
pub async fn update(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
    Json(input): Json<InsuranceInput>,
) -> Result<Json<Insurance>, ApiError> {
    let conn = ctx.lock_db()?;
    update_insurance(&conn, id, &input)?;
    let insurance = get_insurance(&conn, id)?
        .ok_or_else(|| ApiError::NotFound(format!("insurance {id} not found")))?;
    Ok(Json(insurance))
}

/// `DELETE /api/insurances/{id}`
pub async fn delete(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    let conn = ctx.lock_db()?;
    delete_insurance(&conn, id)?;
    Ok(Json(MessageResponse::new("Insurance deleted successfully")))
}
