//! Renderer-facing overlay derived from clusters
//!
//! A renderer draws one marker per cluster, a heatmap weighted by the
//! selected display mode and a route through the clusters in order. This
//! module only computes that data; nothing here talks to a map SDK.

use crate::domain::types::{Cluster, LatLng, SectionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which count feeds the heatmap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    #[default]
    Boarding,
    Alighting,
}

impl DisplayMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisplayMode::Boarding => "boarding",
            DisplayMode::Alighting => "alighting",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "boarding" | "on" => Some(Self::Boarding),
            "alighting" | "off" => Some(Self::Alighting),
            _ => None,
        }
    }

    #[inline]
    pub fn weight(&self, cluster: &Cluster) -> u32 {
        match self {
            DisplayMode::Boarding => cluster.boarding_count,
            DisplayMode::Alighting => cluster.alighting_count,
        }
    }
}

/// Heatmap layer styling passed through to the renderer
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HeatmapStyle {
    pub radius: u32,
    pub opacity: f64,
}

impl Default for HeatmapStyle {
    fn default() -> Self {
        Self { radius: 60, opacity: 0.7 }
    }
}

/// View settings for one overlay build
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewSettings {
    pub display_mode: DisplayMode,
    pub zoom: u8,
    pub heatmap: HeatmapStyle,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self { display_mode: DisplayMode::default(), zoom: 13, heatmap: HeatmapStyle::default() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MapView {
    pub center: LatLng,
    pub zoom: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub title: String,
    pub sections: Vec<SectionId>,
    pub position: LatLng,
    pub boarding: u32,
    pub alighting: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HeatPoint {
    pub position: LatLng,
    pub weight: u32,
}

/// Origin, ordered waypoints and destination for a directions lookup
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutePlan {
    pub origin: LatLng,
    pub waypoints: Vec<LatLng>,
    pub destination: LatLng,
}

impl RoutePlan {
    /// Every point in travel order
    pub fn path(&self) -> Vec<LatLng> {
        let mut path = Vec::with_capacity(self.waypoints.len() + 2);
        path.push(self.origin);
        path.extend_from_slice(&self.waypoints);
        path.push(self.destination);
        path
    }
}

/// Everything a renderer needs to draw the map
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlayDocument {
    pub generated_at: DateTime<Utc>,
    pub display_mode: DisplayMode,
    pub heatmap_style: HeatmapStyle,
    pub map: Option<MapView>,
    pub markers: Vec<Marker>,
    pub heatmap: Vec<HeatPoint>,
    pub route: Option<RoutePlan>,
}

impl OverlayDocument {
    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }
}

/// Marker title: `Section N` or `Sections A, B, ...`
pub fn marker_title(cluster: &Cluster) -> String {
    if cluster.is_singleton() {
        format!("Section {}", cluster.seed_section())
    } else {
        let ids: Vec<String> = cluster.member_sections.iter().map(|s| s.to_string()).collect();
        format!("Sections {}", ids.join(", "))
    }
}

pub fn heatmap_points(clusters: &[Cluster], mode: DisplayMode) -> Vec<HeatPoint> {
    clusters.iter().map(|c| HeatPoint { position: c.position, weight: mode.weight(c) }).collect()
}

/// Route through clusters in their given order
pub fn route_plan(clusters: &[Cluster]) -> Option<RoutePlan> {
    let first = clusters.first()?;
    let last = clusters.last()?;
    let waypoints = if clusters.len() > 2 {
        clusters[1..clusters.len() - 1].iter().map(|c| c.position).collect()
    } else {
        Vec::new()
    };
    Some(RoutePlan { origin: first.position, waypoints, destination: last.position })
}

/// Overlay for `clusters`, stamped with `generated_at`
pub fn build_overlay(clusters: &[Cluster], view: &ViewSettings, generated_at: DateTime<Utc>) -> OverlayDocument {
    let markers = clusters
        .iter()
        .map(|c| Marker {
            title: marker_title(c),
            sections: c.member_sections.to_vec(),
            position: c.position,
            boarding: c.boarding_count,
            alighting: c.alighting_count,
        })
        .collect();

    OverlayDocument {
        generated_at,
        display_mode: view.display_mode,
        heatmap_style: view.heatmap,
        map: clusters.first().map(|c| MapView { center: c.position, zoom: view.zoom }),
        markers,
        heatmap: heatmap_points(clusters, view.display_mode),
        route: route_plan(clusters),
    }
}
