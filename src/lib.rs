//! busflow library
//!
//! Turns geotagged fare transactions into per-section boarding/alighting
//! counts, merges nearby stops into clusters and derives the heatmap and
//! route overlay a map renderer draws.

pub mod domain;
pub mod infra;
pub mod io;
pub mod services;
