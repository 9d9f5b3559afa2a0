//! Domain models - value types and geometry
//!
//! - `types` - records, stop summaries, clusters and their identifiers
//! - `geo` - haversine distance

pub mod geo;
pub mod types;

// Re-export commonly used types at module level
pub use geo::{distance_km, haversine_km, EARTH_RADIUS_KM};
pub use types::{
    Cluster, LatLng, MemberSections, SectionId, StopSummary, TransactionRecord, TypeCode,
    TypeCodes,
};
