//! Cached propagation façade.
//!
//! The service maps the exact text of a TLE pair to a shared [`Satellite`].
//! The map itself sits behind an `RwLock`; each entry is an `Arc<OnceLock<_>>`
//! so the parse runs outside the map lock and at most once per key, even when
//! many threads miss on the same pair at the same time. Pairs that fail to
//! parse are evicted again, so only valid element sets stay resident.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::core::orbit::{OrbitalState, Satellite};
use crate::core::sgp4::{InitError, PropagationError};
use crate::core::tle::{parse, TleError};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PropagationFailure {
    #[error("TLE parse failed: {0}")]
    Parse(#[from] TleError),
    #[error("SGP4 initialization failed: {0}")]
    Initialization(#[from] InitError),
    #[error("propagation failed: {0}")]
    Propagation(#[from] PropagationError),
}

/// Pipeline stage a failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Parse,
    Initialization,
    Propagation,
}

impl PropagationFailure {
    pub fn stage(&self) -> Stage {
        match self {
            PropagationFailure::Parse(_) => Stage::Parse,
            PropagationFailure::Initialization(_) => Stage::Initialization,
            PropagationFailure::Propagation(_) => Stage::Propagation,
        }
    }
}

type CacheKey = (String, String);
type CacheEntry = Arc<OnceLock<Result<Arc<Satellite>, TleError>>>;

#[derive(Debug, Default)]
pub struct PropagationService {
    cache: RwLock<HashMap<CacheKey, CacheEntry>>,
}

impl PropagationService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses (or reuses) the element set and propagates it to `timestamp`.
    pub fn propagate(
        &self,
        line1: &str,
        line2: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<OrbitalState, PropagationFailure> {
        self.satellite(line1, line2)?.state_at(timestamp)
    }

    /// Shared satellite for the exact pair of lines. Text that fails to parse
    /// is not kept; threads racing on the same bad pair still parse it once.
    pub fn satellite(&self, line1: &str, line2: &str) -> Result<Arc<Satellite>, TleError> {
        let key = (line1.to_owned(), line2.to_owned());
        let entry = self.entry(&key);
        let parsed = entry
            .get_or_init(|| {
                let parsed =
                    parse(line1, line2).map(|elements| Arc::new(Satellite::new(elements)));
                match &parsed {
                    Ok(sat) => info!(norad = sat.norad_id(), "Cached element set"),
                    Err(e) => debug!(error = %e, "Rejected element set"),
                }
                parsed
            })
            .clone();

        if parsed.is_err() {
            self.evict(&key, &entry);
        }
        parsed
    }

    /// Number of element sets currently held.
    pub fn cached_element_sets(&self) -> usize {
        self.cache.read().len()
    }

    fn entry(&self, key: &CacheKey) -> CacheEntry {
        let existing = self.cache.read().get(key).cloned();
        if let Some(entry) = existing {
            return entry;
        }
        Arc::clone(self.cache.write().entry(key.clone()).or_default())
    }

    fn evict(&self, key: &CacheKey, entry: &CacheEntry) {
        let mut map = self.cache.write();
        // another thread may already have replaced the slot
        if map.get(key).is_some_and(|current| Arc::ptr_eq(current, entry)) {
            map.remove(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tle::checksum;
    use chrono::TimeZone;
    use std::thread;

    const ISS_1: &str = "1 25544U 98067A   08264.51782528 -.00002182  00000-0 -11606-4 0  2927";
    const ISS_2: &str = "2 25544  51.6416 247.4627 0006703 130.5360 325.0288 15.72125391563537";
    const VANGUARD_1: &str = "1 00005U 58002B   00179.78495062  .00000023  00000-0  28098-4 0  4753";
    const VANGUARD_2: &str = "2 00005  34.2682 348.7242 1859667 331.7664  19.3264 10.82419157413667";

    fn with_checksum(body: &str) -> String {
        let mut line = body[..68].to_string();
        let digit = checksum(&line);
        line.push(char::from(b'0' + digit));
        line
    }

    fn iss_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2008, 9, 20, 12, 25, 40).unwrap()
    }

    #[test]
    fn repeated_queries_are_bit_identical() {
        let service = PropagationService::new();
        let a = service.propagate(ISS_1, ISS_2, iss_time()).unwrap();
        let b = service.propagate(ISS_1, ISS_2, iss_time()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.position_km[0].to_bits(), b.position_km[0].to_bits());
        assert_eq!(service.cached_element_sets(), 1);
    }

    #[test]
    fn cached_satellite_is_shared() {
        let service = PropagationService::new();
        let a = service.satellite(ISS_1, ISS_2).unwrap();
        let b = service.satellite(ISS_1, ISS_2).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn concurrent_queries_on_one_element_set_agree() {
        let service = Arc::new(PropagationService::new());
        let expected = PropagationService::new()
            .propagate(ISS_1, ISS_2, iss_time())
            .unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let service = Arc::clone(&service);
                thread::spawn(move || service.propagate(ISS_1, ISS_2, iss_time()).unwrap())
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
        assert_eq!(service.cached_element_sets(), 1);
    }

    #[test]
    fn concurrent_queries_on_different_sets_are_independent() {
        let service = Arc::new(PropagationService::new());
        let handles: Vec<_> = (0..6)
            .map(|i| {
                let service = Arc::clone(&service);
                thread::spawn(move || {
                    if i % 2 == 0 {
                        service.propagate(ISS_1, ISS_2, iss_time()).map(|s| s.altitude_km)
                    } else {
                        let t = Utc.with_ymd_and_hms(2000, 6, 28, 0, 0, 0).unwrap();
                        service.propagate(VANGUARD_1, VANGUARD_2, t).map(|s| s.altitude_km)
                    }
                })
            })
            .collect();

        for handle in handles {
            let altitude = handle.join().unwrap().unwrap();
            assert!(altitude > 300.0);
        }
        assert_eq!(service.cached_element_sets(), 2);
    }

    #[test]
    fn failures_report_their_stage() {
        let service = PropagationService::new();

        let mut bad = ISS_1.to_string();
        bad.replace_range(68..69, "0");
        let err = service.propagate(&bad, ISS_2, iss_time()).unwrap_err();
        assert_eq!(err.stage(), Stage::Parse);
        assert!(matches!(err, PropagationFailure::Parse(TleError::ChecksumMismatch { .. })));

        // BSTAR 0.05 brings the station down within a month
        let draggy = with_checksum(&ISS_1.replace("-11606-4", " 50000-1"));
        assert!(service.propagate(&draggy, ISS_2, iss_time()).is_ok());
        let late = iss_time() + chrono::Duration::days(30);
        let err = service.propagate(&draggy, ISS_2, late).unwrap_err();
        assert_eq!(err.stage(), Stage::Propagation);
        assert!(matches!(
            err,
            PropagationFailure::Propagation(PropagationError::SatelliteDecayed { .. })
        ));
    }

    #[test]
    fn rejected_text_is_not_kept() {
        let service = PropagationService::new();
        let first = service.satellite("garbage", ISS_2).unwrap_err();
        let second = service.satellite("garbage", ISS_2).unwrap_err();
        assert_eq!(first, second);
        assert_eq!(service.cached_element_sets(), 0);
    }

    #[test]
    fn junk_requests_do_not_grow_the_cache() {
        let service = PropagationService::new();
        service.satellite(ISS_1, ISS_2).unwrap();
        for i in 0..1_000 {
            assert!(service.satellite(&format!("junk{i}"), "x").is_err());
        }
        assert_eq!(service.cached_element_sets(), 1);
    }

    #[test]
    fn concurrent_rejections_leave_no_entries() {
        let service = Arc::new(PropagationService::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let service = Arc::clone(&service);
                thread::spawn(move || {
                    for j in 0..50 {
                        let line = format!("bad {}", (i + j) % 5);
                        assert!(service.satellite(&line, ISS_2).is_err());
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(service.cached_element_sets(), 0);
    }
}
