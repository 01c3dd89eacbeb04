//! Per-zoom city label generation on the Web Mercator slippy-map grid.
//!
//! For each zoom level the covered area is cut into tiles; every tile keeps
//! its most populous places, and each place is written to that zoom's
//! label CSV with a font size scaled by population.

pub mod config;
pub mod data;
pub mod dispatch;
pub mod error;
pub mod geo;
pub mod job;
pub mod label;
pub mod map;
pub mod output;
pub mod select;
