use std::f64::consts::PI;

pub const TWO_PI: f64 = 2.0 * PI;
pub const MINUTES_PER_DAY: f64 = 1440.0;
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Julian date of 1970-01-01T00:00:00 UTC.
pub const JD_UNIX_EPOCH: f64 = 2_440_587.5;
/// Julian date of J2000.0 (2000-01-01T12:00:00).
pub const JD_J2000: f64 = 2_451_545.0;

/// WGS84 reference ellipsoid, used for geodetic conversion only.
pub const WGS84_A_KM: f64 = 6378.137;
pub const WGS84_F: f64 = 1.0 / 298.257_223_563;

/// Earth gravity field constants consumed by SGP4.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GravityConstants {
    /// Equatorial radius, km.
    pub radius_km: f64,
    /// Gravitational parameter, km³/s².
    pub mu: f64,
    /// sqrt(mu) in earth radii^1.5 per minute.
    pub xke: f64,
    pub j2: f64,
    pub j3: f64,
    pub j4: f64,
}

impl GravityConstants {
    pub fn j3_over_j2(&self) -> f64 {
        self.j3 / self.j2
    }
}

/// Gravity models accepted by the propagator. TLEs are generated against WGS72,
/// which is therefore the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GravityModel {
    Wgs72Old,
    #[default]
    Wgs72,
    Wgs84,
}

impl GravityModel {
    pub fn constants(self) -> GravityConstants {
        match self {
            GravityModel::Wgs72Old => GravityConstants {
                radius_km: 6378.135,
                mu: 398_600.799_64,
                xke: 0.074_366_916_1,
                j2: 0.001_082_616,
                j3: -0.000_002_538_81,
                j4: -0.000_001_655_97,
            },
            GravityModel::Wgs72 => {
                let radius_km: f64 = 6378.135;
                let mu: f64 = 398_600.8;
                GravityConstants {
                    radius_km,
                    mu,
                    xke: 60.0 / (radius_km.powi(3) / mu).sqrt(),
                    j2: 0.001_082_616,
                    j3: -0.000_002_538_81,
                    j4: -0.000_001_655_97,
                }
            }
            GravityModel::Wgs84 => {
                let radius_km: f64 = 6378.137;
                let mu: f64 = 398_600.5;
                GravityConstants {
                    radius_km,
                    mu,
                    xke: 60.0 / (radius_km.powi(3) / mu).sqrt(),
                    j2: 0.001_082_629_989_05,
                    j3: -0.000_002_532_153_06,
                    j4: -0.000_001_610_987_61,
                }
            }
        }
    }
}
