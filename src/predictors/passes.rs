use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::core::frames::{look_angles, Geodetic};
use crate::core::orbit::Satellite;
use crate::predictors::{PredictionError, SampleWindow};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PassWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub max_elevation_deg: f64,
    pub culmination: DateTime<Utc>,
}

struct OpenPass {
    start: DateTime<Utc>,
    max_elevation_deg: f64,
    culmination: DateTime<Utc>,
}

impl OpenPass {
    fn close(self, end: DateTime<Utc>) -> PassWindow {
        PassWindow {
            start: self.start,
            end,
            max_elevation_deg: self.max_elevation_deg,
            culmination: self.culmination,
        }
    }
}

fn validate_observer(observer: &Geodetic) -> Result<(), PredictionError> {
    if !(-90.0..=90.0).contains(&observer.latitude_deg)
        || !(-180.0..=180.0).contains(&observer.longitude_deg)
        || !observer.altitude_km.is_finite()
    {
        return Err(PredictionError::InvalidParameters(format!(
            "observer out of range: lat {}, lon {}, alt {} km",
            observer.latitude_deg, observer.longitude_deg, observer.altitude_km
        )));
    }
    Ok(())
}

/// Scans the window for intervals where the satellite is at or above
/// `min_elevation_deg` as seen from `observer`. A pass opens on the first
/// sample at or above the threshold and closes on the first sample below it,
/// or at the end of the window.
pub fn predict_passes(
    satellite: &Satellite,
    observer: &Geodetic,
    window: &SampleWindow,
    min_elevation_deg: f64,
) -> Result<Vec<PassWindow>, PredictionError> {
    validate_observer(observer)?;
    if !min_elevation_deg.is_finite() {
        return Err(PredictionError::InvalidParameters(
            "minimum elevation must be finite".to_string(),
        ));
    }

    let mut windows = Vec::new();
    let mut current: Option<OpenPass> = None;

    for t in window.instants() {
        let state = satellite.state_at(t)?;
        let elevation = look_angles(observer, &state.ecef_position()).elevation_deg;

        if elevation >= min_elevation_deg {
            match current.as_mut() {
                None => {
                    current = Some(OpenPass {
                        start: t,
                        max_elevation_deg: elevation,
                        culmination: t,
                    })
                }
                Some(pass) if elevation > pass.max_elevation_deg => {
                    pass.max_elevation_deg = elevation;
                    pass.culmination = t;
                }
                Some(_) => {}
            }
        } else if let Some(pass) = current.take() {
            windows.push(pass.close(t));
        }
    }

    if let Some(pass) = current {
        windows.push(pass.close(window.end()));
    }

    debug!(
        norad = satellite.norad_id(),
        passes = windows.len(),
        "Predicted passes"
    );
    Ok(windows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tle::parse;
    use chrono::{Duration, TimeZone};

    const ISS_1: &str = "1 25544U 98067A   08264.51782528 -.00002182  00000-0 -11606-4 0  2927";
    const ISS_2: &str = "2 25544  51.6416 247.4627 0006703 130.5360 325.0288 15.72125391563537";
    const GEO_1: &str = "1 28626U 05008A   06176.46683397 -.00000205  00000-0  10000-3 0  2190";
    const GEO_2: &str = "2 28626   0.0019 286.9433 0000335  13.7918  55.6504  1.00270176  4891";

    fn sat(l1: &str, l2: &str) -> Satellite {
        Satellite::new(parse(l1, l2).unwrap())
    }

    fn ground_below(sat: &Satellite, t: DateTime<Utc>) -> Geodetic {
        let state = sat.state_at(t).unwrap();
        Geodetic {
            latitude_deg: state.latitude_deg,
            longitude_deg: state.longitude_deg,
            altitude_km: 0.0,
        }
    }

    #[test]
    fn overhead_pass_is_found_around_zenith() {
        let iss = sat(ISS_1, ISS_2);
        let zenith = Utc.with_ymd_and_hms(2008, 9, 20, 13, 0, 0).unwrap();
        let observer = ground_below(&iss, zenith);
        let window = SampleWindow::new(zenith - Duration::minutes(10), 20, 10).unwrap();

        let passes = predict_passes(&iss, &observer, &window, 10.0).unwrap();
        assert_eq!(passes.len(), 1);
        let pass = &passes[0];
        assert!(pass.start > window.start() && pass.end < window.end());
        assert!(pass.start < zenith && zenith < pass.end);
        assert!(pass.max_elevation_deg > 85.0, "{}", pass.max_elevation_deg);
        assert_eq!(pass.culmination, zenith);
    }

    #[test]
    fn passes_over_a_day_are_ordered_and_above_threshold() {
        let iss = sat(ISS_1, ISS_2);
        let observer = Geodetic {
            latitude_deg: 40.7128,
            longitude_deg: -74.006,
            altitude_km: 0.0,
        };
        let start = Utc.with_ymd_and_hms(2008, 9, 20, 0, 0, 0).unwrap();
        let window = SampleWindow::new(start, 1440, 15).unwrap();

        let passes = predict_passes(&iss, &observer, &window, 10.0).unwrap();
        assert!(!passes.is_empty());
        for pass in &passes {
            assert!(pass.start < pass.end);
            assert!(pass.max_elevation_deg >= 10.0);
            assert!(pass.start <= pass.culmination && pass.culmination < pass.end);
            // low orbit passes above 10 degrees are short
            assert!(pass.end - pass.start < Duration::minutes(15));
        }
        for pair in passes.windows(2) {
            assert!(pair[0].end <= pair[1].start);
        }
    }

    #[test]
    fn pass_still_open_closes_at_window_end() {
        let geo = sat(GEO_1, GEO_2);
        let start = Utc.with_ymd_and_hms(2006, 6, 25, 12, 0, 0).unwrap();
        let observer = ground_below(&geo, start);
        let window = SampleWindow::new(start, 360, 60).unwrap();

        let passes = predict_passes(&geo, &observer, &window, 10.0).unwrap();
        assert_eq!(passes.len(), 1);
        assert_eq!(passes[0].start, window.start());
        assert_eq!(passes[0].end, window.end());
    }

    #[test]
    fn far_side_observer_sees_nothing() {
        let geo = sat(GEO_1, GEO_2);
        let start = Utc.with_ymd_and_hms(2006, 6, 25, 12, 0, 0).unwrap();
        let below = ground_below(&geo, start);
        let observer = Geodetic {
            longitude_deg: crate::core::frames::wrap_longitude(below.longitude_deg + 180.0),
            ..below
        };
        let window = SampleWindow::new(start, 360, 60).unwrap();
        assert!(predict_passes(&geo, &observer, &window, 0.0).unwrap().is_empty());
    }

    #[test]
    fn observer_outside_the_globe_is_rejected() {
        let iss = sat(ISS_1, ISS_2);
        let observer = Geodetic {
            latitude_deg: 91.0,
            longitude_deg: 0.0,
            altitude_km: 0.0,
        };
        let start = Utc.with_ymd_and_hms(2008, 9, 20, 0, 0, 0).unwrap();
        let window = SampleWindow::new(start, 10, 10).unwrap();
        assert!(matches!(
            predict_passes(&iss, &observer, &window, 10.0),
            Err(PredictionError::InvalidParameters(_))
        ));
    }
}
