use serde::Serialize;

use crate::core::constants::{WGS84_A_KM, WGS84_F};
use crate::core::time::{greenwich_rotation_angle, TimeInstant};

/// Latitude iteration stops once the update falls below this (radians);
/// 1e-12 rad is well under a millimetre on the surface.
const LATITUDE_TOLERANCE: f64 = 1.0e-12;
const LATITUDE_MAX_ITERATIONS: usize = 10;
/// Distance from the polar axis (km) below which longitude is pinned to 0.
const POLAR_AXIS_EPSILON_KM: f64 = 1.0e-9;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Geodetic {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub altitude_km: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LookAngles {
    pub azimuth_deg: f64,
    pub elevation_deg: f64,
    pub range_km: f64,
}

fn eccentricity_squared() -> f64 {
    WGS84_F * (2.0 - WGS84_F)
}

/// Rotates a TEME vector about the polar axis by -θ (Greenwich angle) into ECEF.
pub fn teme_to_ecef(position: &[f64; 3], gmst_rad: f64) -> [f64; 3] {
    let (sin_t, cos_t) = gmst_rad.sin_cos();
    [
        cos_t * position[0] + sin_t * position[1],
        -sin_t * position[0] + cos_t * position[1],
        position[2],
    ]
}

/// Wraps degrees into (-180, 180].
pub fn wrap_longitude(deg: f64) -> f64 {
    let wrapped = (deg + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped <= -180.0 {
        wrapped + 360.0
    } else {
        wrapped
    }
}

/// Inverts the WGS84 ellipsoid by fixed-point iteration on geodetic latitude.
pub fn ecef_to_geodetic(ecef: &[f64; 3]) -> Geodetic {
    let [x, y, z] = *ecef;
    let e2 = eccentricity_squared();
    let p = x.hypot(y);

    if p < POLAR_AXIS_EPSILON_KM {
        let b = WGS84_A_KM * (1.0 - WGS84_F);
        let latitude_deg = if z >= 0.0 { 90.0 } else { -90.0 };
        return Geodetic {
            latitude_deg,
            longitude_deg: 0.0,
            altitude_km: z.abs() - b,
        };
    }

    let mut lat = z.atan2(p * (1.0 - e2));
    for _ in 0..LATITUDE_MAX_ITERATIONS {
        let sin_lat = lat.sin();
        let n = WGS84_A_KM / (1.0 - e2 * sin_lat * sin_lat).sqrt();
        let next = (z + n * e2 * sin_lat).atan2(p);
        let delta = (next - lat).abs();
        lat = next;
        if delta < LATITUDE_TOLERANCE {
            break;
        }
    }

    let (sin_lat, cos_lat) = lat.sin_cos();
    // valid at every latitude, unlike p / cos φ - N
    let altitude_km =
        p * cos_lat + z * sin_lat - WGS84_A_KM * (1.0 - e2 * sin_lat * sin_lat).sqrt();

    Geodetic {
        latitude_deg: lat.to_degrees(),
        longitude_deg: wrap_longitude(y.atan2(x).to_degrees()),
        altitude_km,
    }
}

/// Forward projection of a geodetic point onto ECEF (km).
pub fn geodetic_to_ecef(point: &Geodetic) -> [f64; 3] {
    let e2 = eccentricity_squared();
    let (sin_lat, cos_lat) = point.latitude_deg.to_radians().sin_cos();
    let (sin_lon, cos_lon) = point.longitude_deg.to_radians().sin_cos();
    let n = WGS84_A_KM / (1.0 - e2 * sin_lat * sin_lat).sqrt();
    [
        (n + point.altitude_km) * cos_lat * cos_lon,
        (n + point.altitude_km) * cos_lat * sin_lon,
        (n * (1.0 - e2) + point.altitude_km) * sin_lat,
    ]
}

/// Geodetic sub-point of a TEME position at `instant`.
pub fn to_geodetic(position: &[f64; 3], instant: &TimeInstant) -> Geodetic {
    let gmst = greenwich_rotation_angle(instant);
    ecef_to_geodetic(&teme_to_ecef(position, gmst))
}

/// Azimuth, elevation and range of an ECEF target seen from `observer`.
pub fn look_angles(observer: &Geodetic, target_ecef: &[f64; 3]) -> LookAngles {
    let site = geodetic_to_ecef(observer);
    let rx = target_ecef[0] - site[0];
    let ry = target_ecef[1] - site[1];
    let rz = target_ecef[2] - site[2];

    let (sin_lat, cos_lat) = observer.latitude_deg.to_radians().sin_cos();
    let (sin_lon, cos_lon) = observer.longitude_deg.to_radians().sin_cos();

    // local east, north, up
    let east = -sin_lon * rx + cos_lon * ry;
    let north = -sin_lat * cos_lon * rx - sin_lat * sin_lon * ry + cos_lat * rz;
    let up = cos_lat * cos_lon * rx + cos_lat * sin_lon * ry + sin_lat * rz;

    let range_km = (east * east + north * north + up * up).sqrt();
    LookAngles {
        azimuth_deg: east.atan2(north).to_degrees().rem_euclid(360.0),
        elevation_deg: up.atan2(east.hypot(north)).to_degrees(),
        range_km,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;

    fn assert_same_point(a: &[f64; 3], b: &[f64; 3], epsilon: f64) {
        for (x, y) in a.iter().zip(b) {
            assert_abs_diff_eq!(*x, *y, epsilon = epsilon);
        }
    }

    #[test]
    fn equator_prime_meridian_surface_point() {
        let g = ecef_to_geodetic(&[WGS84_A_KM, 0.0, 0.0]);
        assert_abs_diff_eq!(g.latitude_deg, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(g.longitude_deg, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(g.altitude_km, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn round_trip_reconstructs_position_below_a_metre() {
        let samples = [
            [6_778.0, 0.0, 0.0],
            [-4_083.9, -993.6, 5_243.6],
            [1_200.5, -6_100.2, -2_900.8],
            [-26_000.0, 30_000.0, 9_000.0],
            [0.5, 0.3, -6_400.0],
            [-6_300.0, -1.0e-3, 0.0],
            [3_000.0, 2_000.0, 1_000.0],
        ];
        for ecef in samples {
            let g = ecef_to_geodetic(&ecef);
            assert_same_point(&ecef, &geodetic_to_ecef(&g), 1e-3);
        }
    }

    proptest! {
        // shells from inside the crust out past geostationary altitude
        #[test]
        fn prop_ecef_round_trip_below_a_metre(
            r in 6_000.0f64..50_000.0,
            polar in 0.0f64..std::f64::consts::PI,
            azimuth in -std::f64::consts::PI..std::f64::consts::PI,
        ) {
            let ecef = [
                r * polar.sin() * azimuth.cos(),
                r * polar.sin() * azimuth.sin(),
                r * polar.cos(),
            ];

            let g = ecef_to_geodetic(&ecef);
            prop_assert!((-90.0..=90.0).contains(&g.latitude_deg), "{g:?}");
            prop_assert!(g.longitude_deg > -180.0 && g.longitude_deg <= 180.0, "{g:?}");

            let back = geodetic_to_ecef(&g);
            for (a, b) in ecef.iter().zip(&back) {
                prop_assert!((a - b).abs() < 1e-3, "{ecef:?} -> {g:?} -> {back:?}");
            }
        }

        #[test]
        fn prop_geodetic_round_trip(
            latitude_deg in -89.9f64..89.9,
            longitude_deg in -179.9f64..179.9,
            altitude_km in -10.0f64..40_000.0,
        ) {
            let g = Geodetic { latitude_deg, longitude_deg, altitude_km };
            let back = ecef_to_geodetic(&geodetic_to_ecef(&g));
            prop_assert!((back.latitude_deg - latitude_deg).abs() < 1e-9, "{g:?} -> {back:?}");
            prop_assert!((back.longitude_deg - longitude_deg).abs() < 1e-9, "{g:?} -> {back:?}");
            prop_assert!((back.altitude_km - altitude_km).abs() < 1e-6, "{g:?} -> {back:?}");
        }
    }

    #[test]
    fn polar_axis_defines_longitude_as_zero() {
        let north = ecef_to_geodetic(&[0.0, 0.0, 7_000.0]);
        assert_eq!(north.longitude_deg, 0.0);
        assert_eq!(north.latitude_deg, 90.0);
        assert_abs_diff_eq!(north.altitude_km, 7_000.0 - 6_356.752_314, epsilon = 1e-5);

        let south = ecef_to_geodetic(&[0.0, 0.0, -6_000.0]);
        assert_eq!(south.latitude_deg, -90.0);
        assert!(south.altitude_km < 0.0);
    }

    #[test]
    fn longitude_stays_in_half_open_range() {
        assert_eq!(wrap_longitude(-180.0), 180.0);
        assert_eq!(wrap_longitude(180.0), 180.0);
        assert_eq!(wrap_longitude(540.0), 180.0);
        assert_abs_diff_eq!(wrap_longitude(-190.0), 170.0, epsilon = 1e-12);
        let g = ecef_to_geodetic(&[-7_000.0, -0.0, 10.0]);
        assert!(g.longitude_deg > -180.0 && g.longitude_deg <= 180.0);
        assert_eq!(g.longitude_deg, 180.0);
    }

    #[test]
    fn points_inside_the_earth_report_negative_altitude() {
        let g = ecef_to_geodetic(&[6_000.0, 0.0, 0.0]);
        assert_abs_diff_eq!(g.altitude_km, -378.137, epsilon = 1e-9);
    }

    #[test]
    fn teme_rotation_preserves_norm_and_z() {
        let v = [4_000.0, -3_000.0, 1_234.0];
        let r = teme_to_ecef(&v, 1.234);
        let norm = |a: [f64; 3]| a.iter().map(|c| c * c).sum::<f64>().sqrt();
        assert_abs_diff_eq!(norm(r), norm(v), epsilon = 1e-9);
        assert_eq!(r[2], v[2]);
        let quarter = teme_to_ecef(&[1.0, 0.0, 0.0], std::f64::consts::FRAC_PI_2);
        assert_same_point(&quarter, &[0.0, -1.0, 0.0], 1e-15);
    }

    #[test]
    fn look_angles_for_overhead_and_horizon_targets() {
        let observer = Geodetic {
            latitude_deg: 40.7128,
            longitude_deg: -74.006,
            altitude_km: 0.0,
        };
        let overhead = geodetic_to_ecef(&Geodetic {
            altitude_km: 500.0,
            ..observer
        });
        let look = look_angles(&observer, &overhead);
        assert_abs_diff_eq!(look.elevation_deg, 90.0, epsilon = 1e-6);
        assert_abs_diff_eq!(look.range_km, 500.0, epsilon = 1e-6);

        let antipode = geodetic_to_ecef(&Geodetic {
            latitude_deg: -40.7128,
            longitude_deg: 105.994,
            altitude_km: 500.0,
        });
        assert!(look_angles(&observer, &antipode).elevation_deg < -80.0);
    }

    #[test]
    fn azimuth_of_northern_target_is_near_zero() {
        let observer = Geodetic {
            latitude_deg: 0.0,
            longitude_deg: 0.0,
            altitude_km: 0.0,
        };
        let target = geodetic_to_ecef(&Geodetic {
            latitude_deg: 5.0,
            longitude_deg: 0.0,
            altitude_km: 400.0,
        });
        let look = look_angles(&observer, &target);
        assert!(look.azimuth_deg < 1e-9 || look.azimuth_deg > 360.0 - 1e-9);
        assert!(look.elevation_deg > 0.0);
    }
}
