// =============================================================================
// Farmstead Backend - Livestock API
// =============================================================================
// Endpoints for managing livestock records
// =============================================================================

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::auth::{extract_token, validate_token};
use crate::db::{Gender, Livestock};
use crate::error::AppError;
use crate::AppState;

// =============================================================================
// Request Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateLivestockRequest {
    pub name: String,
    pub breed: String,
    pub species: String,
    pub birthplace_id: i64,
    pub birthdate: NaiveDate,
    pub gender: Gender,
    pub location_id: i64,
}

/// Partial update: absent fields are left untouched.
#[derive(Debug, Deserialize)]
pub struct UpdateLivestockRequest {
    pub name: Option<String>,
    pub breed: Option<String>,
    pub species: Option<String>,
    pub birthplace_id: Option<i64>,
    pub birthdate: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub location_id: Option<i64>,
}

// =============================================================================
// Handlers
// =============================================================================

/// Create a new livestock record. Both referenced locations must exist.
pub async fn create_livestock(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateLivestockRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let token = extract_token(&headers).ok_or(AppError::InvalidToken)?;
    validate_token(&token, &state.config.jwt_secret)?;

    state
        .db
        .find_location_by_id(req.location_id)
        .await?
        .ok_or(AppError::LocationNotFound)?;
    state
        .db
        .find_location_by_id(req.birthplace_id)
        .await?
        .ok_or(AppError::LocationNotFound)?;

    let livestock = Livestock {
        id: uuid::Uuid::new_v4().to_string(),
        name: req.name,
        breed: req.breed,
        species: req.species,
        birthplace_id: req.birthplace_id,
        birthdate: req.birthdate,
        gender: req.gender,
        location_id: req.location_id,
    };
    state.db.create_livestock(&livestock).await?;

    Ok(Json(serde_json::json!({
        "message": format!("Livestock created successfully with ID {}", livestock.id),
    })))
}

/// Get all livestock records.
pub async fn get_livestock_list(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Livestock>>, AppError> {
    let token = extract_token(&headers).ok_or(AppError::InvalidToken)?;
    validate_token(&token, &state.config.jwt_secret)?;

    Ok(Json(state.db.get_livestock().await?))
}

/// Get a single livestock record by ID.
pub async fn get_livestock(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Livestock>, AppError> {
    let token = extract_token(&headers).ok_or(AppError::InvalidToken)?;
    validate_token(&token, &state.config.jwt_secret)?;

    let livestock = state
        .db
        .find_livestock_by_id(&id)
        .await?
        .ok_or(AppError::LivestockNotFound)?;

    Ok(Json(livestock))
}

/// Apply a partial update to a livestock record. Changed location references
/// are validated before anything is written.
pub async fn update_livestock(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<UpdateLivestockRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let token = extract_token(&headers).ok_or(AppError::InvalidToken)?;
    validate_token(&token, &state.config.jwt_secret)?;

    let mut livestock = state
        .db
        .find_livestock_by_id(&id)
        .await?
        .ok_or(AppError::LivestockNotFound)?;

    if let Some(location_id) = req.location_id {
        state
            .db
            .find_location_by_id(location_id)
            .await?
            .ok_or(AppError::LocationNotFound)?;
        livestock.location_id = location_id;
    }
    if let Some(birthplace_id) = req.birthplace_id {
        state
            .db
            .find_location_by_id(birthplace_id)
            .await?
            .ok_or(AppError::LocationNotFound)?;
        livestock.birthplace_id = birthplace_id;
    }
    if let Some(name) = req.name {
        livestock.name = name;
    }
    if let Some(breed) = req.breed {
        livestock.breed = breed;
    }
    if let Some(species) = req.species {
        livestock.species = species;
    }
    if let Some(birthdate) = req.birthdate {
        livestock.birthdate = birthdate;
    }
    if let Some(gender) = req.gender {
        livestock.gender = gender;
    }

    state.db.update_livestock(&livestock).await?;

    Ok(Json(serde_json::json!({
        "message": "Livestock updated successfully",
    })))
}

/// Delete a livestock record.
pub async fn delete_livestock(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let token = extract_token(&headers).ok_or(AppError::InvalidToken)?;
    validate_token(&token, &state.config.jwt_secret)?;

    if state.db.delete_livestock(&id).await? == 0 {
        return Err(AppError::LivestockNotFound);
    }

    Ok(Json(serde_json::json!({
        "message": "Livestock deleted successfully",
    })))
}
