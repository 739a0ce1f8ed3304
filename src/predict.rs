// =============================================================================
// Farmstead Backend - Population Trend Prediction
// =============================================================================
// Aggregates livestock birthdates into per-year counts, fits a least-squares
// line, and projects the herd size three years ahead.
// =============================================================================

use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::auth::{extract_token, validate_token};
use crate::db::BirthRecord;
use crate::error::AppError;
use crate::AppState;

/// Observed count per calendar year. Sparse: years with no records have no
/// entry.
pub type YearCountSeries = BTreeMap<i32, i64>;

/// Errors produced by the prediction core.
#[derive(Debug, thiserror::Error)]
pub enum TrendError {
    #[error("not enough data to predict")]
    InsufficientData,

    #[error("malformed birthdate: {0}")]
    MalformedDate(String),
}

impl From<TrendError> for AppError {
    fn from(err: TrendError) -> Self {
        match err {
            TrendError::MalformedDate(value) => AppError::MalformedDate(value),
            TrendError::InsufficientData => AppError::Internal,
        }
    }
}

/// Forecast response: the observed per-year counts plus the projected ones.
/// The data maps are omitted when there is not enough history to fit a line.
#[derive(Debug, Serialize)]
pub struct TrendReport {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_data: Option<YearCountSeries>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub predicted_data: Option<YearCountSeries>,
}

// -----------------------------------------------------------------------------
// Core Computation
// -----------------------------------------------------------------------------

/// Extract the calendar year from a stored ISO-8601 birthdate.
fn birth_year(birthdate: &str) -> Result<i32, TrendError> {
    NaiveDate::parse_from_str(birthdate, "%Y-%m-%d")
        .map(|date| date.year())
        .map_err(|_| TrendError::MalformedDate(birthdate.to_string()))
}

/// Group records by birth year, counting how many fall in each. When
/// `location_id` is given, only records at that location qualify. Corrupt
/// birthdates abort the whole aggregation rather than being skipped.
pub fn aggregate_by_year(
    records: &[BirthRecord],
    location_id: Option<i64>,
) -> Result<YearCountSeries, TrendError> {
    let mut counts = YearCountSeries::new();
    for record in records {
        if let Some(id) = location_id {
            if record.location_id != id {
                continue;
            }
        }
        let year = birth_year(&record.birthdate)?;
        *counts.entry(year).or_insert(0) += 1;
    }
    Ok(counts)
}

/// Ordinary least-squares fit of count over year. Returns (slope, intercept).
/// Callers guarantee at least two distinct years, so the variance of x is
/// never zero.
fn fit_line(series: &YearCountSeries) -> (f64, f64) {
    let n = series.len() as f64;
    let mean_x = series.keys().map(|&year| f64::from(year)).sum::<f64>() / n;
    let mean_y = series.values().map(|&count| count as f64).sum::<f64>() / n;

    let mut numerator = 0.0;
    let mut denominator = 0.0;
    for (&year, &count) in series {
        let dx = f64::from(year) - mean_x;
        numerator += dx * (count as f64 - mean_y);
        denominator += dx * dx;
    }

    let slope = numerator / denominator;
    let intercept = mean_y - slope * mean_x;
    (slope, intercept)
}

/// Project counts for the three years after the latest observed one by
/// evaluating the fitted line and flooring. The line is extrapolated
/// verbatim: a shrinking herd forecasts negative counts.
pub fn predict(series: &YearCountSeries) -> Result<YearCountSeries, TrendError> {
    if series.len() < 2 {
        return Err(TrendError::InsufficientData);
    }

    let (slope, intercept) = fit_line(series);
    let max_year = series
        .keys()
        .next_back()
        .copied()
        .ok_or(TrendError::InsufficientData)?;

    let mut predicted = YearCountSeries::new();
    for year in max_year + 1..=max_year + 3 {
        let fitted = slope * f64::from(year) + intercept;
        predicted.insert(year, fitted.floor() as i64);
    }
    Ok(predicted)
}

/// Aggregate then predict, folding the insufficient-data case into a normal
/// report. A filter matching no records and a single-year history produce
/// the same report; only corrupt stored dates surface as errors.
pub fn forecast_report(
    records: &[BirthRecord],
    location_id: Option<i64>,
) -> Result<TrendReport, TrendError> {
    let series = aggregate_by_year(records, location_id)?;
    match predict(&series) {
        Ok(predicted) => Ok(TrendReport {
            message: "Predicted data for 3 years ahead".into(),
            current_data: Some(series),
            predicted_data: Some(predicted),
        }),
        Err(TrendError::InsufficientData) => Ok(TrendReport {
            message: "Not enough data to predict".into(),
            current_data: None,
            predicted_data: None,
        }),
        Err(err) => Err(err),
    }
}

// -----------------------------------------------------------------------------
// Handlers
// -----------------------------------------------------------------------------

/// Forecast the population across all locations.
pub async fn predict_all(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<TrendReport>, AppError> {
    let token = extract_token(&headers).ok_or(AppError::InvalidToken)?;
    validate_token(&token, &state.config.jwt_secret)?;

    let records = state.db.birth_records().await?;
    let report = forecast_report(&records, None)?;
    Ok(Json(report))
}

/// Forecast the population at a single location.
pub async fn predict_for_location(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(location_id): Path<i64>,
) -> Result<Json<TrendReport>, AppError> {
    let token = extract_token(&headers).ok_or(AppError::InvalidToken)?;
    validate_token(&token, &state.config.jwt_secret)?;

    let records = state.db.birth_records().await?;
    let report = forecast_report(&records, Some(location_id))?;
    Ok(Json(report))
}
