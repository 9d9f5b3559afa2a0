//! Services - aggregation, clustering and overlay building
//!
//! - `aggregator` - per-section boarding/alighting counts
//! - `clusterer` - greedy seed-based proximity clustering
//! - `grouping` - per-section / proximity / demo grouping strategies
//! - `overlay` - markers, heatmap weights and route plan for a renderer
//! - `pipeline` - end-to-end run wiring the above together

pub mod aggregator;
pub mod clusterer;
pub mod grouping;
pub mod overlay;
pub mod pipeline;

// Re-export commonly used types
pub use aggregator::{aggregate_by_section, sort_by_section};
pub use clusterer::{cluster, ProximityClusterer, DEFAULT_RADIUS_KM};
pub use grouping::{group_stops, GroupingKind, StopGrouping};
pub use overlay::{build_overlay, DisplayMode, OverlayDocument, ViewSettings};
pub use pipeline::{Pipeline, PipelineOutput};
