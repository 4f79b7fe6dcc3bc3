//! TLE-based orbit propagation: a self-contained SGP4 engine, WGS84 geodetic
//! conversion, a cached propagation service and a small JSON API over it.

pub mod api;
pub mod core;
pub mod predictors;
pub mod utils;
