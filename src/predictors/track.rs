use tracing::debug;

use crate::core::orbit::{OrbitalState, Satellite};
use crate::predictors::{PredictionError, SampleWindow};

/// Sub-satellite points over the window. The first failing sample fails the
/// whole track.
pub fn ground_track(
    satellite: &Satellite,
    window: &SampleWindow,
) -> Result<Vec<OrbitalState>, PredictionError> {
    debug!(
        norad = satellite.norad_id(),
        samples = window.sample_count(),
        "Sampling ground track"
    );
    window
        .instants()
        .map(|t| satellite.state_at(t).map_err(PredictionError::from))
        .collect()
}
