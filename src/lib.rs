//! Air-quality telemetry from public-transport routes: queries the
//! time-series store and turns raw readings into map, chart and table data.
pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod presentation;
