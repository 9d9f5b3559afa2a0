//! Shared value types for transaction records, stops and clusters

use serde::{Deserialize, Serialize};
use smallvec::{smallvec, SmallVec};

/// Newtype wrapper for section (stop/zone) identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct SectionId(pub i64);

impl std::fmt::Display for SectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Newtype wrapper for transaction type codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct TypeCode(pub i32);

impl std::fmt::Display for TypeCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The pair of type codes that mark a record as boarding or alighting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeCodes {
    pub boarding: TypeCode,
    pub alighting: TypeCode,
}

impl TypeCodes {
    pub fn new(boarding: i32, alighting: i32) -> Self {
        Self { boarding: TypeCode(boarding), alighting: TypeCode(alighting) }
    }
}

impl Default for TypeCodes {
    fn default() -> Self {
        Self::new(627, 624)
    }
}

/// Latitude/longitude in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    #[inline]
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }

    /// GeoJSON coordinate order
    #[inline]
    pub fn to_lng_lat(self) -> [f64; 2] {
        [self.lng, self.lat]
    }
}

/// One raw fare transaction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransactionRecord {
    pub section: SectionId,
    pub type_code: TypeCode,
    pub position: LatLng,
}

impl TransactionRecord {
    pub fn new(section: i64, type_code: i32, lat: f64, lng: f64) -> Self {
        Self { section: SectionId(section), type_code: TypeCode(type_code), position: LatLng::new(lat, lng) }
    }
}

/// Aggregate of all records sharing a section
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StopSummary {
    pub section: SectionId,
    pub position: LatLng,
    pub boarding_count: u32,
    pub alighting_count: u32,
}

impl StopSummary {
    pub fn new(section: i64, lat: f64, lng: f64, boarding_count: u32, alighting_count: u32) -> Self {
        Self { section: SectionId(section), position: LatLng::new(lat, lng), boarding_count, alighting_count }
    }
}

/// Member list for a cluster; most clusters hold a handful of sections
pub type MemberSections = SmallVec<[SectionId; 4]>;

/// One or more stops merged around a seed stop
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cluster {
    /// Merge order; the seed section is always first
    pub member_sections: MemberSections,
    /// Seed stop position, not a centroid
    pub position: LatLng,
    pub boarding_count: u32,
    pub alighting_count: u32,
}

impl Cluster {
    /// Open a cluster seeded with `stop`
    pub fn seeded(stop: &StopSummary) -> Self {
        Self {
            member_sections: smallvec![stop.section],
            position: stop.position,
            boarding_count: stop.boarding_count,
            alighting_count: stop.alighting_count,
        }
    }

    /// Merge another stop's section and counts; position stays at the seed
    pub fn absorb(&mut self, stop: &StopSummary) {
        self.member_sections.push(stop.section);
        self.boarding_count += stop.boarding_count;
        self.alighting_count += stop.alighting_count;
    }

    #[inline]
    pub fn seed_section(&self) -> SectionId {
        self.member_sections[0]
    }

    #[inline]
    pub fn is_singleton(&self) -> bool {
        self.member_sections.len() == 1
    }
}
