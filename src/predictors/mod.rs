pub mod passes;
pub mod track;

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::core::service::PropagationFailure;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredictionError {
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),
    #[error(transparent)]
    Propagation(#[from] PropagationFailure),
}

/// Evenly spaced sample times over `[start, start + duration]`, both ends
/// included.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    step: Duration,
}

impl SampleWindow {
    pub fn new(
        start: DateTime<Utc>,
        duration_minutes: i64,
        step_seconds: i64,
    ) -> Result<Self, PredictionError> {
        if step_seconds <= 0 {
            return Err(PredictionError::InvalidParameters(format!(
                "step must be positive, got {step_seconds} s"
            )));
        }
        if duration_minutes < 0 {
            return Err(PredictionError::InvalidParameters(format!(
                "duration must not be negative, got {duration_minutes} min"
            )));
        }
        let out_of_range =
            || PredictionError::InvalidParameters("time window out of range".to_string());
        let step = Duration::try_seconds(step_seconds).ok_or_else(out_of_range)?;
        let end = Duration::try_minutes(duration_minutes)
            .and_then(|d| start.checked_add_signed(d))
            .ok_or_else(out_of_range)?;
        Ok(SampleWindow { start, end, step })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn sample_count(&self) -> usize {
        let span = (self.end - self.start).num_milliseconds();
        (span / self.step.num_milliseconds()) as usize + 1
    }

    pub fn instants(&self) -> impl Iterator<Item = DateTime<Utc>> + '_ {
        let step = self.step;
        let end = self.end;
        std::iter::successors(Some(self.start), move |t| t.checked_add_signed(step))
            .take_while(move |t| *t <= end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn window_includes_both_ends() {
        let window = SampleWindow::new(start(), 90, 60).unwrap();
        let times: Vec<_> = window.instants().collect();
        assert_eq!(times.len(), 91);
        assert_eq!(window.sample_count(), 91);
        assert_eq!(times[0], start());
        assert_eq!(*times.last().unwrap(), window.end());
    }

    #[test]
    fn uneven_step_stops_before_end() {
        let window = SampleWindow::new(start(), 10, 420).unwrap();
        let times: Vec<_> = window.instants().collect();
        assert_eq!(times.len(), 2);
        assert_eq!(window.sample_count(), 2);
        assert!(*times.last().unwrap() < window.end());
    }

    #[test]
    fn zero_duration_is_a_single_sample() {
        let window = SampleWindow::new(start(), 0, 15).unwrap();
        assert_eq!(window.instants().count(), 1);
    }

    #[test]
    fn non_positive_step_is_rejected() {
        assert!(matches!(
            SampleWindow::new(start(), 90, 0),
            Err(PredictionError::InvalidParameters(_))
        ));
        assert!(SampleWindow::new(start(), 90, -5).is_err());
        assert!(SampleWindow::new(start(), -1, 60).is_err());
    }
}
