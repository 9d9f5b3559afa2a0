//! Overlay egress - writes the overlay document to file
//!
//! Two formats: a GeoJSON FeatureCollection (markers as points, route as a
//! line string) or the overlay document serialized as plain JSON.

use crate::services::overlay::{Marker, OverlayDocument};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum EgressError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON encoding failed")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    GeoJson,
    Json,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::GeoJson => "geojson",
            OutputFormat::Json => "json",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "geojson" => Some(Self::GeoJson),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

fn marker_feature(marker: &Marker, weight: u32) -> Value {
    json!({
        "type": "Feature",
        "geometry": {
            "type": "Point",
            "coordinates": marker.position.to_lng_lat(),
        },
        "properties": {
            "kind": "stop",
            "title": marker.title,
            "sections": marker.sections,
            "boarding": marker.boarding,
            "alighting": marker.alighting,
            "weight": weight,
        }
    })
}

/// Build a GeoJSON FeatureCollection from an overlay document
pub fn to_geojson(doc: &OverlayDocument) -> Value {
    let mut features: Vec<Value> = doc
        .markers
        .iter()
        .zip(&doc.heatmap)
        .map(|(marker, point)| marker_feature(marker, point.weight))
        .collect();

    if let Some(route) = &doc.route {
        let coordinates: Vec<[f64; 2]> = route.path().into_iter().map(|p| p.to_lng_lat()).collect();
        features.push(json!({
            "type": "Feature",
            "geometry": {
                "type": "LineString",
                "coordinates": coordinates,
            },
            "properties": { "kind": "route" }
        }));
    }

    json!({
        "type": "FeatureCollection",
        "features": features,
        "properties": {
            "display_mode": doc.display_mode,
            "map": doc.map,
            "heatmap_style": doc.heatmap_style,
            "generated_at": doc.generated_at.to_rfc3339(),
        }
    })
}

/// Render the document in the given format
pub fn render(doc: &OverlayDocument, format: OutputFormat) -> Result<String, EgressError> {
    let text = match format {
        OutputFormat::GeoJson => serde_json::to_string_pretty(&to_geojson(doc))?,
        OutputFormat::Json => serde_json::to_string_pretty(doc)?,
    };
    Ok(text)
}

/// Write the document to `path`, replacing any existing file
pub fn write_overlay<P: AsRef<Path>>(
    path: P,
    doc: &OverlayDocument,
    format: OutputFormat,
) -> Result<(), EgressError> {
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }

    let text = render(doc, format)?;
    fs::write(path, &text)?;
    debug!(file = %path.display(), bytes = %text.len(), "overlay_written");
    info!(
        file = %path.display(),
        format = %format.as_str(),
        markers = %doc.markers.len(),
        "overlay_egressed"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{Cluster, StopSummary};
    use crate::services::overlay::{build_overlay, DisplayMode, ViewSettings};
    use chrono::{DateTime, TimeZone, Utc};
    use tempfile::tempdir;

    fn stamp() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn sample_doc() -> OverlayDocument {
        let mut merged = Cluster::seeded(&StopSummary::new(1, -34.6037, -58.3816, 45, 10));
        merged.absorb(&StopSummary::new(2, -34.6051, -58.3787, 25, 5));
        let clusters = vec![
            merged,
            Cluster::seeded(&StopSummary::new(3, -34.6158, -58.4333, 0, 8)),
            Cluster::seeded(&StopSummary::new(4, -34.5875, -58.3974, 12, 0)),
        ];
        build_overlay(&clusters, &ViewSettings::default(), stamp())
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!(OutputFormat::parse("GeoJSON"), Some(OutputFormat::GeoJson));
        assert_eq!(OutputFormat::parse("json"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::parse("xml"), None);
        assert_eq!(OutputFormat::default().as_str(), "geojson");
    }

    #[test]
    fn test_geojson_structure() {
        let value = to_geojson(&sample_doc());
        assert_eq!(value["type"], "FeatureCollection");

        let features = value["features"].as_array().unwrap();
        // Three markers plus the route
        assert_eq!(features.len(), 4);

        let first = &features[0];
        assert_eq!(first["geometry"]["type"], "Point");
        assert_eq!(first["geometry"]["coordinates"][0], -58.3816);
        assert_eq!(first["geometry"]["coordinates"][1], -34.6037);
        assert_eq!(first["properties"]["title"], "Sections 1, 2");
        assert_eq!(first["properties"]["weight"], 70);
        assert_eq!(first["properties"]["sections"][1], 2);

        let route = &features[3];
        assert_eq!(route["geometry"]["type"], "LineString");
        assert_eq!(route["geometry"]["coordinates"].as_array().unwrap().len(), 3);

        assert_eq!(value["properties"]["display_mode"], "boarding");
        assert_eq!(value["properties"]["generated_at"], "2024-03-01T12:00:00+00:00");
        assert_eq!(value["properties"]["map"]["zoom"], 13);
    }

    #[test]
    fn test_geojson_empty_document() {
        let doc = build_overlay(&[], &ViewSettings::default(), stamp());
        let value = to_geojson(&doc);
        assert!(value["features"].as_array().unwrap().is_empty());
        assert!(value["properties"]["map"].is_null());
    }

    #[test]
    fn test_json_render() {
        let mut doc = sample_doc();
        doc.display_mode = DisplayMode::Alighting;
        let text = render(&doc, OutputFormat::Json).unwrap();
        let parsed: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["display_mode"], "alighting");
        assert_eq!(parsed["markers"].as_array().unwrap().len(), 3);
        assert_eq!(parsed["route"]["waypoints"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_write_overlay_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let nested_path = dir.path().join("nested").join("dir").join("overlay.geojson");

        write_overlay(&nested_path, &sample_doc(), OutputFormat::GeoJson).unwrap();
        assert!(nested_path.exists());

        let content = fs::read_to_string(&nested_path).unwrap();
        let parsed: Value = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed["type"], "FeatureCollection");
    }

    #[test]
    fn test_write_overlay_overwrites() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("overlay.json");
        fs::write(&file_path, "{\"existing\":\"data\"}\n").unwrap();

        write_overlay(&file_path, &sample_doc(), OutputFormat::Json).unwrap();

        let content = fs::read_to_string(&file_path).unwrap();
        assert!(!content.contains("existing"));
        assert!(content.contains("markers"));
    }

    #[test]
    fn test_same_input_renders_identically() {
        let first = render(&sample_doc(), OutputFormat::GeoJson).unwrap();
        let second = render(&sample_doc(), OutputFormat::GeoJson).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_io_cause_printed_once_in_chain() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();

        let err = write_overlay(blocker.join("overlay.json"), &sample_doc(), OutputFormat::Json).unwrap_err();
        assert!(matches!(err, EgressError::Io(_)));
        let chain = format!("{:#}", anyhow::Error::new(err));
        assert_eq!(chain.matches("os error").count(), 1, "{}", chain);
    }
}
