// =============================================================================
// Farmstead Backend - Locations API
// =============================================================================
// Endpoints for managing farm/market/warehouse locations
// =============================================================================

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;

use crate::auth::{extract_token, validate_token};
use crate::db::{Location, LocationKind};
use crate::error::AppError;
use crate::AppState;

// =============================================================================
// Request Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateLocationRequest {
    #[serde(rename = "type")]
    pub kind: LocationKind,
    pub name: String,
    pub address: String,
}

/// Partial update: absent fields are left untouched.
#[derive(Debug, Deserialize)]
pub struct UpdateLocationRequest {
    #[serde(rename = "type")]
    pub kind: Option<LocationKind>,
    pub name: Option<String>,
    pub address: Option<String>,
}

// =============================================================================
// Handlers
// =============================================================================

/// Create a new location.
pub async fn create_location(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateLocationRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let token = extract_token(&headers).ok_or(AppError::InvalidToken)?;
    validate_token(&token, &state.config.jwt_secret)?;

    let id = state
        .db
        .create_location(req.kind, &req.name, &req.address)
        .await?;

    Ok(Json(serde_json::json!({
        "message": format!("Location created successfully with ID {}", id),
    })))
}

/// Get all locations.
pub async fn get_locations(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Location>>, AppError> {
    let token = extract_token(&headers).ok_or(AppError::InvalidToken)?;
    validate_token(&token, &state.config.jwt_secret)?;

    Ok(Json(state.db.get_locations().await?))
}

/// Get a single location by ID.
pub async fn get_location(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<Location>, AppError> {
    let token = extract_token(&headers).ok_or(AppError::InvalidToken)?;
    validate_token(&token, &state.config.jwt_secret)?;

    let location = state
        .db
        .find_location_by_id(id)
        .await?
        .ok_or(AppError::LocationNotFound)?;

    Ok(Json(location))
}

/// Apply a partial update to a location.
pub async fn update_location(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(req): Json<UpdateLocationRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let token = extract_token(&headers).ok_or(AppError::InvalidToken)?;
    validate_token(&token, &state.config.jwt_secret)?;

    let mut location = state
        .db
        .find_location_by_id(id)
        .await?
        .ok_or(AppError::LocationNotFound)?;

    if let Some(kind) = req.kind {
        location.kind = kind;
    }
    if let Some(name) = req.name {
        location.name = name;
    }
    if let Some(address) = req.address {
        location.address = address;
    }

    state.db.update_location(&location).await?;

    Ok(Json(serde_json::json!({
        "message": "Location updated successfully",
    })))
}

/// Delete a location.
pub async fn delete_location(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    let token = extract_token(&headers).ok_or(AppError::InvalidToken)?;
    validate_token(&token, &state.config.jwt_secret)?;

    if state.db.delete_location(id).await? == 0 {
        return Err(AppError::LocationNotFound);
    }

    Ok(Json(serde_json::json!({
        "message": "Location deleted successfully",
    })))
}
