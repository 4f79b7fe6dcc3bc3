//! Time bases used by the propagator: two-part Julian dates, TLE epochs and the
//! Greenwich rotation angle.
//!
//! UTC is treated as continuous and UT1 is taken equal to UTC. No leap-second
//! table is consulted; this matches how TLEs are produced and stays inside the
//! accuracy envelope of SGP4.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::constants::{
    JD_J2000, JD_UNIX_EPOCH, MINUTES_PER_DAY, SECONDS_PER_DAY, TWO_PI,
};

/// Two-digit TLE years below this pivot belong to the 21st century.
const TLE_YEAR_PIVOT: u32 = 57;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeScale {
    Utc,
    Ut1,
}

/// An absolute instant as a two-part Julian date.
///
/// `jd` always ends in `.5` (midnight) and `fraction` is the day fraction in
/// `[0, 1)`, which keeps sub-microsecond resolution over centuries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimeInstant {
    jd: f64,
    fraction: f64,
    scale: TimeScale,
}

impl TimeInstant {
    fn new(jd: f64, fraction: f64, scale: TimeScale) -> Self {
        // fold whole days carried in the fraction back into `jd`
        let carry = fraction.floor();
        TimeInstant {
            jd: jd + carry,
            fraction: fraction - carry,
            scale,
        }
    }

    pub fn jd(&self) -> f64 {
        self.jd
    }

    pub fn fraction(&self) -> f64 {
        self.fraction
    }

    pub fn scale(&self) -> TimeScale {
        self.scale
    }

    /// Retags the instant as UT1, the scale the analytic model assumes.
    pub fn to_ut1(self) -> Self {
        TimeInstant {
            scale: TimeScale::Ut1,
            ..self
        }
    }

    /// Converts back to a civil UTC timestamp, rounded to the nanosecond.
    /// Returns `None` outside chrono's representable range.
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        let days = (self.jd - JD_UNIX_EPOCH).round() as i64;
        let nanos_of_day = (self.fraction * SECONDS_PER_DAY * 1e9).round() as i64;
        let secs = days
            .checked_mul(SECONDS_PER_DAY as i64)?
            .checked_add(nanos_of_day.div_euclid(1_000_000_000))?;
        DateTime::from_timestamp(secs, nanos_of_day.rem_euclid(1_000_000_000) as u32)
    }
}

/// Converts a civil UTC timestamp into a `TimeInstant`.
pub fn to_time_instant(timestamp: DateTime<Utc>) -> TimeInstant {
    let secs = timestamp.timestamp();
    let days = secs.div_euclid(SECONDS_PER_DAY as i64);
    let secs_of_day = secs.rem_euclid(SECONDS_PER_DAY as i64) as f64
        + f64::from(timestamp.timestamp_subsec_nanos()) * 1e-9;
    TimeInstant::new(
        JD_UNIX_EPOCH + days as f64,
        secs_of_day / SECONDS_PER_DAY,
        TimeScale::Utc,
    )
}

/// Element set epoch: four-digit year and fractional day of year (1.0 is
/// January 1st, 00:00 UTC).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Epoch {
    pub year: i32,
    pub day_of_year: f64,
}

impl Epoch {
    /// Expands the TLE two-digit year with the fixed 1957 pivot.
    pub fn from_tle_fields(two_digit_year: u32, day_of_year: f64) -> Self {
        let year = if two_digit_year < TLE_YEAR_PIVOT {
            2000 + two_digit_year
        } else {
            1900 + two_digit_year
        };
        Epoch {
            year: year as i32,
            day_of_year,
        }
    }

    pub fn to_instant(&self) -> TimeInstant {
        let whole_day = self.day_of_year.floor();
        TimeInstant::new(
            julian_date_of_january_first(self.year) + whole_day - 1.0,
            self.day_of_year - whole_day,
            TimeScale::Utc,
        )
    }
}

/// Julian date at 00:00 on January 1st. Valid for 1901-2099, which covers
/// every year a TLE can encode.
fn julian_date_of_january_first(year: i32) -> f64 {
    let y = f64::from(year);
    367.0 * y - (7.0 * y / 4.0).floor() + 31.0 + 1_721_013.5
}

/// Minutes from the element set epoch to `instant`; negative before epoch.
pub fn minutes_since_epoch(instant: &TimeInstant, epoch: &Epoch) -> f64 {
    let epoch = epoch.to_instant();
    ((instant.jd - epoch.jd) + (instant.fraction - epoch.fraction)) * MINUTES_PER_DAY
}

/// Greenwich mean sidereal angle (IAU-82) in radians, `[0, 2π)`.
pub fn greenwich_rotation_angle(instant: &TimeInstant) -> f64 {
    let ut1 = instant.to_ut1();
    let t = ((ut1.jd - JD_J2000) + ut1.fraction) / 36_525.0;
    let seconds = -6.2e-6 * t * t * t
        + 0.093_104 * t * t
        + (876_600.0 * 3600.0 + 8_640_184.812_866) * t
        + 67_310.548_41;
    // 240 seconds of sidereal time per degree
    (seconds / 240.0).to_radians().rem_euclid(TWO_PI)
}
