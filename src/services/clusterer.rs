//! Greedy fixed-radius proximity clustering of stops
//!
//! Stops are visited in input order. Each stop not yet consumed seeds a new
//! cluster, and every other unconsumed stop within `radius_km` of that seed
//! is merged into it. Membership is always measured from the seed, never
//! from stops merged earlier, so the result depends on input order and is
//! not a connected-components clustering.

use crate::domain::geo::distance_km;
use crate::domain::types::{Cluster, StopSummary};
use tracing::debug;

/// Default merge radius
pub const DEFAULT_RADIUS_KM: f64 = 2.5;

/// Seed-based proximity clusterer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProximityClusterer {
    radius_km: f64,
}

impl Default for ProximityClusterer {
    fn default() -> Self {
        Self { radius_km: DEFAULT_RADIUS_KM }
    }
}

impl ProximityClusterer {
    /// `radius_km` must be finite and non-negative
    pub fn new(radius_km: f64) -> Self {
        Self { radius_km }
    }

    pub fn radius_km(&self) -> f64 {
        self.radius_km
    }

    /// Partition `stops` into clusters, in the order clusters were opened
    pub fn cluster(&self, stops: &[StopSummary]) -> Vec<Cluster> {
        let mut consumed = vec![false; stops.len()];
        let mut clusters = Vec::new();

        for (i, seed) in stops.iter().enumerate() {
            if consumed[i] {
                continue;
            }
            consumed[i] = true;
            let mut cluster = Cluster::seeded(seed);

            for (j, other) in stops.iter().enumerate() {
                if consumed[j] {
                    continue;
                }
                // Inclusive boundary
                if distance_km(seed.position, other.position) <= self.radius_km {
                    cluster.absorb(other);
                    consumed[j] = true;
                }
            }

            clusters.push(cluster);
        }

        debug!(
            stops = %stops.len(),
            clusters = %clusters.len(),
            radius_km = %self.radius_km,
            "stops_clustered"
        );
        clusters
    }
}

/// Cluster `stops` with the given radius
pub fn cluster(stops: &[StopSummary], radius_km: f64) -> Vec<Cluster> {
    ProximityClusterer::new(radius_km).cluster(stops)
}
