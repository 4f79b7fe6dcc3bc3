use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::core::constants::GravityModel;
use crate::core::frames::{teme_to_ecef, to_geodetic};
use crate::core::service::PropagationFailure;
use crate::core::sgp4::{InitError, Propagator};
use crate::core::time::{
    greenwich_rotation_angle, minutes_since_epoch, to_time_instant, TimeInstant,
};
use crate::core::tle::OrbitalElements;

/// Full result of one propagation: TEME vectors plus the WGS84 sub-point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OrbitalState {
    pub timestamp: DateTime<Utc>,
    pub instant: TimeInstant,
    pub minutes_since_epoch: f64,
    pub position_km: [f64; 3],
    pub velocity_km_s: [f64; 3],
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub altitude_km: f64,
}

impl OrbitalState {
    /// Position rotated into the earth-fixed frame, km.
    pub fn ecef_position(&self) -> [f64; 3] {
        teme_to_ecef(&self.position_km, greenwich_rotation_angle(&self.instant))
    }

    pub fn speed_km_s(&self) -> f64 {
        let [vx, vy, vz] = self.velocity_km_s;
        (vx * vx + vy * vy + vz * vz).sqrt()
    }
}

/// A parsed element set and its SGP4 model, built on first use and reused by
/// every later query.
#[derive(Debug)]
pub struct Satellite {
    elements: OrbitalElements,
    gravity: GravityModel,
    propagator: OnceLock<Result<Propagator, InitError>>,
}

impl Satellite {
    pub fn new(elements: OrbitalElements) -> Self {
        Self::with_gravity(elements, GravityModel::default())
    }

    pub fn with_gravity(elements: OrbitalElements, gravity: GravityModel) -> Self {
        Satellite {
            elements,
            gravity,
            propagator: OnceLock::new(),
        }
    }

    pub fn elements(&self) -> &OrbitalElements {
        &self.elements
    }

    pub fn norad_id(&self) -> u32 {
        self.elements.norad_id
    }

    pub fn name(&self) -> Option<&str> {
        self.elements.object_name.as_deref()
    }

    /// Initializes at most once; a failed initialization is remembered too.
    pub fn propagator(&self) -> Result<&Propagator, InitError> {
        self.propagator
            .get_or_init(|| Propagator::with_gravity(&self.elements, self.gravity))
            .as_ref()
            .map_err(Clone::clone)
    }

    /// Signed time from the element set epoch to `timestamp`, minutes.
    pub fn minutes_since_epoch(&self, timestamp: DateTime<Utc>) -> f64 {
        minutes_since_epoch(&to_time_instant(timestamp), &self.elements.epoch)
    }

    pub fn state_at(&self, timestamp: DateTime<Utc>) -> Result<OrbitalState, PropagationFailure> {
        self.state_at_instant(timestamp, to_time_instant(timestamp))
    }

    fn state_at_instant(
        &self,
        timestamp: DateTime<Utc>,
        instant: TimeInstant,
    ) -> Result<OrbitalState, PropagationFailure> {
        let propagator = self.propagator()?;
        let minutes = minutes_since_epoch(&instant, &self.elements.epoch);
        debug!(norad = self.elements.norad_id, minutes, "Propagating elements");
        let prediction = propagator.propagate(minutes)?;
        let geodetic = to_geodetic(&prediction.position, &instant);

        Ok(OrbitalState {
            timestamp,
            instant,
            minutes_since_epoch: minutes,
            position_km: prediction.position,
            velocity_km_s: prediction.velocity,
            latitude_deg: geodetic.latitude_deg,
            longitude_deg: geodetic.longitude_deg,
            altitude_km: geodetic.altitude_km,
        })
    }
}
