use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::orbit::OrbitalState;
use crate::core::service::Stage;
use crate::predictors::passes::PassWindow;

#[derive(Debug, Deserialize)]
pub struct PropagateRequest {
    pub line1: String,
    pub line2: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct GroundTrackRequest {
    pub line1: String,
    pub line2: String,
    #[serde(default)]
    pub start: Option<DateTime<Utc>>,
    #[serde(default = "default_track_duration")]
    pub duration_minutes: i64,
    #[serde(default = "default_track_step")]
    pub step_seconds: i64,
}

fn default_track_duration() -> i64 { 90 }
fn default_track_step() -> i64 { 60 }

#[derive(Debug, Deserialize)]
pub struct PassesRequest {
    pub line1: String,
    pub line2: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub alt_km: f64,
    #[serde(default)]
    pub start: Option<DateTime<Utc>>,
    #[serde(default = "default_duration")]
    pub duration: i64,
    #[serde(default = "default_step")]
    pub step: i64,
    #[serde(default = "default_min_el")]
    pub min_el: f64,
}

fn default_duration() -> i64 { 120 }
fn default_step() -> i64 { 15 }
fn default_min_el() -> f64 { 10.0 }

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthDto {
    pub status: String,
    pub cached_element_sets: usize,
}

#[derive(Debug, Serialize)]
pub struct SatelliteStateDto {
    pub norad_id: u32,
    pub name: Option<String>,
    #[serde(flatten)]
    pub state: OrbitalState,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TrackPointDto {
    pub timestamp: DateTime<Utc>,
    pub lat: f64,
    pub lon: f64,
    pub alt_km: f64,
}

impl From<&OrbitalState> for TrackPointDto {
    fn from(state: &OrbitalState) -> Self {
        TrackPointDto {
            timestamp: state.timestamp,
            lat: state.latitude_deg,
            lon: state.longitude_deg,
            alt_km: state.altitude_km,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GroundTrackDto {
    pub norad_id: u32,
    pub points: Vec<TrackPointDto>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PassWindowDto {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub max_elevation_deg: f64,
    pub culmination: DateTime<Utc>,
}

impl From<PassWindow> for PassWindowDto {
    fn from(w: PassWindow) -> Self {
        PassWindowDto {
            start: w.start,
            end: w.end,
            max_elevation_deg: w.max_elevation_deg,
            culmination: w.culmination,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PassesDto {
    pub norad_id: u32,
    pub passes: Vec<PassWindowDto>,
}

/// Body of every failed request. `stage` is absent for invalid parameters.
#[derive(Debug, Serialize)]
pub struct ErrorDto {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
}
