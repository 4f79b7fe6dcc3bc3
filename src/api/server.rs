use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::api::types::{
    ErrorDto, GroundTrackDto, GroundTrackRequest, HealthDto, PassWindowDto, PassesDto,
    PassesRequest, PropagateRequest, SatelliteStateDto, TrackPointDto,
};
use crate::core::constants::MINUTES_PER_DAY;
use crate::core::frames::Geodetic;
use crate::core::orbit::Satellite;
use crate::core::service::{PropagationFailure, PropagationService, Stage};
use crate::predictors::passes::predict_passes;
use crate::predictors::track::ground_track;
use crate::predictors::{PredictionError, SampleWindow};

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<PropagationService>,
    pub max_samples: usize,
    pub max_resonant_offset_days: usize,
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Failure(PropagationFailure),
    Internal(String),
}

impl From<PropagationFailure> for ApiError {
    fn from(e: PropagationFailure) -> Self {
        ApiError::Failure(e)
    }
}

impl From<PredictionError> for ApiError {
    fn from(e: PredictionError) -> Self {
        match e {
            PredictionError::InvalidParameters(reason) => ApiError::BadRequest(reason),
            PredictionError::Propagation(failure) => ApiError::Failure(failure),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(error) => {
                (StatusCode::BAD_REQUEST, ErrorDto { error, stage: None })
            }
            ApiError::Failure(failure) => {
                let stage = failure.stage();
                let status = match stage {
                    Stage::Parse => StatusCode::BAD_REQUEST,
                    Stage::Initialization | Stage::Propagation => StatusCode::UNPROCESSABLE_ENTITY,
                };
                (status, ErrorDto { error: failure.to_string(), stage: Some(stage) })
            }
            ApiError::Internal(error) => {
                (StatusCode::INTERNAL_SERVER_ERROR, ErrorDto { error, stage: None })
            }
        };
        warn!(status = status.as_u16(), error = %body.error, "Request failed");
        (status, Json(body)).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/propagate", post(propagate))
        .route("/ground-track", post(get_ground_track))
        .route("/passes", post(get_passes))
        .with_state(state)
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
}

pub async fn run_server(state: AppState, addr: SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "API server listening");
    axum::serve(listener, router(state)).await
}

async fn health(State(state): State<AppState>) -> Json<HealthDto> {
    Json(HealthDto {
        status: "ok".to_string(),
        cached_element_sets: state.service.cached_element_sets(),
    })
}

async fn propagate(
    State(state): State<AppState>,
    Json(req): Json<PropagateRequest>,
) -> Result<Json<SatelliteStateDto>, ApiError> {
    let timestamp = req.timestamp.unwrap_or_else(Utc::now);
    let satellite = state
        .service
        .satellite(&req.line1, &req.line2)
        .map_err(PropagationFailure::from)?;
    let orbital = satellite.state_at(timestamp)?;
    Ok(Json(SatelliteStateDto {
        norad_id: satellite.norad_id(),
        name: satellite.name().map(str::to_string),
        state: orbital,
    }))
}

fn checked_window(
    state: &AppState,
    window: Result<SampleWindow, PredictionError>,
) -> Result<SampleWindow, ApiError> {
    let window = window?;
    let samples = window.sample_count();
    if samples > state.max_samples {
        return Err(ApiError::BadRequest(format!(
            "{samples} samples requested, limit is {}",
            state.max_samples
        )));
    }
    Ok(window)
}

/// Resonant orbits integrate from epoch on every sample, so scans over them
/// stay within `max_resonant_offset_days` of the epoch.
fn checked_epoch_offset(
    state: &AppState,
    satellite: &Satellite,
    window: &SampleWindow,
) -> Result<(), ApiError> {
    let resonant = satellite.propagator().is_ok_and(|p| p.is_resonant());
    if !resonant {
        return Ok(());
    }
    let furthest_days = [window.start(), window.end()]
        .into_iter()
        .map(|t| satellite.minutes_since_epoch(t).abs() / MINUTES_PER_DAY)
        .fold(0.0, f64::max);
    if furthest_days > state.max_resonant_offset_days as f64 {
        return Err(ApiError::BadRequest(format!(
            "window reaches {furthest_days:.1} days from epoch, limit for resonant orbits is {}",
            state.max_resonant_offset_days
        )));
    }
    Ok(())
}

async fn get_ground_track(
    State(state): State<AppState>,
    Json(req): Json<GroundTrackRequest>,
) -> Result<Json<GroundTrackDto>, ApiError> {
    let start = req.start.unwrap_or_else(Utc::now);
    let window = checked_window(
        &state,
        SampleWindow::new(start, req.duration_minutes, req.step_seconds),
    )?;
    let satellite = state
        .service
        .satellite(&req.line1, &req.line2)
        .map_err(PropagationFailure::from)?;
    checked_epoch_offset(&state, &satellite, &window)?;

    let norad_id = satellite.norad_id();
    let track = tokio::task::spawn_blocking(move || ground_track(&satellite, &window))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))??;

    Ok(Json(GroundTrackDto {
        norad_id,
        points: track.iter().map(TrackPointDto::from).collect(),
    }))
}

async fn get_passes(
    State(state): State<AppState>,
    Json(req): Json<PassesRequest>,
) -> Result<Json<PassesDto>, ApiError> {
    let start = req.start.unwrap_or_else(Utc::now);
    let window = checked_window(&state, SampleWindow::new(start, req.duration, req.step))?;
    let observer = Geodetic {
        latitude_deg: req.lat,
        longitude_deg: req.lon,
        altitude_km: req.alt_km,
    };
    let satellite = state
        .service
        .satellite(&req.line1, &req.line2)
        .map_err(PropagationFailure::from)?;
    checked_epoch_offset(&state, &satellite, &window)?;

    let norad_id = satellite.norad_id();
    let min_el = req.min_el;
    let windows = tokio::task::spawn_blocking(move || {
        predict_passes(&satellite, &observer, &window, min_el)
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))??;

    Ok(Json(PassesDto {
        norad_id,
        passes: windows.into_iter().map(PassWindowDto::from).collect(),
    }))
}
