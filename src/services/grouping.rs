//! Stop grouping strategies
//!
//! Decides how per-section stops become the clusters that get drawn:
//! - `PerSection` - every stop is its own singleton cluster
//! - `Proximity` - greedy seed-based merge within a radius
//! - `Demo` - a fixed set of demo stops, input is ignored

use crate::domain::types::{Cluster, StopSummary};
use crate::services::clusterer::{ProximityClusterer, DEFAULT_RADIUS_KM};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Grouping strategy selector as written in config and on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupingKind {
    PerSection,
    #[default]
    Proximity,
    Demo,
}

impl GroupingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupingKind::PerSection => "per_section",
            GroupingKind::Proximity => "proximity",
            GroupingKind::Demo => "demo",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "per_section" | "per-section" | "section" => Some(Self::PerSection),
            "proximity" | "cluster" | "clustered" => Some(Self::Proximity),
            "demo" => Some(Self::Demo),
            _ => None,
        }
    }
}

/// Resolved grouping strategy
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StopGrouping {
    PerSection,
    Proximity { radius_km: f64 },
    Demo,
}

impl Default for StopGrouping {
    fn default() -> Self {
        Self::Proximity { radius_km: DEFAULT_RADIUS_KM }
    }
}

impl StopGrouping {
    pub fn from_kind(kind: GroupingKind, radius_km: f64) -> Self {
        match kind {
            GroupingKind::PerSection => Self::PerSection,
            GroupingKind::Proximity => Self::Proximity { radius_km },
            GroupingKind::Demo => Self::Demo,
        }
    }

    pub fn kind(&self) -> GroupingKind {
        match self {
            Self::PerSection => GroupingKind::PerSection,
            Self::Proximity { .. } => GroupingKind::Proximity,
            Self::Demo => GroupingKind::Demo,
        }
    }
}

/// Turn stops into clusters according to `grouping`
pub fn group_stops(stops: &[StopSummary], grouping: StopGrouping) -> Vec<Cluster> {
    let clusters = match grouping {
        StopGrouping::PerSection => stops.iter().map(Cluster::seeded).collect(),
        StopGrouping::Proximity { radius_km } => ProximityClusterer::new(radius_km).cluster(stops),
        StopGrouping::Demo => demo_stops().iter().map(Cluster::seeded).collect(),
    };
    debug!(grouping = %grouping.kind().as_str(), clusters = %clusters.len(), "stops_grouped");
    clusters
}

/// Fixed demo stops around central Buenos Aires
pub fn demo_stops() -> Vec<StopSummary> {
    vec![
        StopSummary::new(1, -34.6037, -58.3816, 45, 12),
        StopSummary::new(2, -34.6051, -58.3787, 25, 18),
        StopSummary::new(3, -34.6083, -58.3712, 32, 27),
        StopSummary::new(4, -34.6118, -58.3960, 18, 35),
        StopSummary::new(5, -34.6158, -58.4333, 40, 22),
        StopSummary::new(6, -34.5875, -58.3974, 15, 41),
    ]
}
