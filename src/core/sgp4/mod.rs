//! Self-contained SGP4 propagator.
//!
//! `Propagator::new` recovers the Brouwer mean elements from a TLE and derives
//! every time-independent coefficient once; `Propagator::propagate` is then a
//! pure function of the elapsed minutes. Orbits with a period of 225 minutes or
//! more take the resonant branch, which adds the 12 h and 24 h geopotential
//! resonance terms but no lunar or solar perturbations.

mod init;
mod propagate;
mod resonance;

use serde::Serialize;
use thiserror::Error;

use crate::core::constants::GravityConstants;

pub use resonance::{Resonance, ResonantTerms};

/// Orbits at or above this period (minutes) take the resonant branch.
pub const RESONANT_PERIOD_MINUTES: f64 = 225.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum InitError {
    #[error("invalid orbital elements: {reason}")]
    InvalidElements { reason: String },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PropagationError {
    #[error("invalid elements at {minutes} min: {reason}")]
    InvalidElements { minutes: f64, reason: String },
    #[error("eccentricity {eccentricity} left [0, 1) at {minutes} min")]
    OrbitDiverged { minutes: f64, eccentricity: f64 },
    #[error("satellite has decayed at {minutes} min")]
    SatelliteDecayed { minutes: f64 },
    #[error(
        "Kepler solver did not converge after {iterations} iterations (last step {residual:e})"
    )]
    KeplerNonConvergence { iterations: u32, residual: f64 },
}

/// TEME position (km) and velocity (km/s).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Prediction {
    pub position: [f64; 3],
    pub velocity: [f64; 3],
}

/// Drag terms beyond first order. Dropped for perigees below 220 km and for
/// the resonant branch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HigherOrderDrag {
    pub(crate) d2: f64,
    pub(crate) d3: f64,
    pub(crate) d4: f64,
    pub(crate) t3cof: f64,
    pub(crate) t4cof: f64,
    pub(crate) t5cof: f64,
    pub(crate) omgcof: f64,
    pub(crate) xmcof: f64,
    pub(crate) eta: f64,
    pub(crate) delmo: f64,
    pub(crate) sinmao: f64,
}

/// Model branch, fixed at initialization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Branch {
    NearEarth { drag: Option<HigherOrderDrag> },
    Resonant(ResonantTerms),
}

/// Precomputed SGP4 state for one element set. Angles in radians, distances in
/// earth radii, time in minutes.
#[derive(Debug, Clone, PartialEq)]
pub struct Propagator {
    gravity: GravityConstants,

    inclination: f64,
    raan: f64,
    eccentricity: f64,
    argument_of_perigee: f64,
    mean_anomaly: f64,
    /// Un-Kozai'd mean motion, rad/min.
    mean_motion: f64,
    semi_major_axis: f64,
    bstar: f64,

    mdot: f64,
    argpdot: f64,
    nodedot: f64,
    nodecf: f64,

    cc1: f64,
    cc4: f64,
    cc5: f64,
    t2cof: f64,

    aycof: f64,
    xlcof: f64,

    con41: f64,
    x1mth2: f64,
    x7thm1: f64,

    branch: Branch,
}

impl Propagator {
    pub fn branch(&self) -> &Branch {
        &self.branch
    }

    /// Recovered mean semi-major axis, km.
    pub fn semi_major_axis_km(&self) -> f64 {
        self.semi_major_axis * self.gravity.radius_km
    }

    pub fn period_minutes(&self) -> f64 {
        std::f64::consts::TAU / self.mean_motion
    }

    pub fn is_resonant(&self) -> bool {
        matches!(self.branch, Branch::Resonant(_))
    }
}
