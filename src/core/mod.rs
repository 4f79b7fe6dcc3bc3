pub mod constants;
pub mod frames;
pub mod orbit;
pub mod service;
pub mod sgp4;
pub mod time;
pub mod tle;
