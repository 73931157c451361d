// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

use crate::model::{BoundingBox, Position, Ring};
use crate::IndexError;
use geo::{BoundingRect, LineString, Simplify};
use geojson::{GeoJson, JsonObject, Value};
use log::{debug, info};
use serde::{Deserialize, Deserializer};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// ~100 m at Bolivian latitudes. Recompute for other regions.
pub const DEFAULT_TOLERANCE: f64 = 0.001;

/// Feed envelope. Each feature's geometry is read on its own, so one bad
/// geometry costs that feature and not the whole feed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeatureCollection {
    #[serde(default)]
    pub features: Vec<Feature>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Feature {
    #[serde(default)]
    pub properties: Option<JsonObject>,
    #[serde(default, deserialize_with = "geometry_value")]
    pub geometry: Option<Value>,
}

fn geometry_value<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Value>, D::Error> {
    let raw: Option<serde_json::Value> = Option::deserialize(d)?;
    Ok(raw.and_then(read_geometry))
}

fn read_geometry(raw: serde_json::Value) -> Option<Value> {
    match GeoJson::from_json_value(raw) {
        Ok(GeoJson::Geometry(g)) => Some(g.value),
        // Some exports wrap the geometry in another Feature.
        Ok(GeoJson::Feature(f)) => f.geometry.map(|g| g.value),
        Ok(GeoJson::FeatureCollection(_)) => None,
        Err(e) => {
            debug!("Ignoring unreadable feature geometry — {}", e);
            None
        }
    }
}

impl Feature {
    fn property(&self, key: &str) -> Option<&serde_json::Value> {
        self.properties.as_ref().and_then(|p| p.get(key))
    }

    /// `properties.id`, string or number, trimmed.
    pub fn ine_code(&self) -> String {
        match self.property("id") {
            Some(serde_json::Value::String(s)) => s.trim().to_string(),
            Some(serde_json::Value::Number(n)) => n.to_string(),
            _ => String::new(),
        }
    }

    /// `properties.nombre`, trimmed.
    pub fn raw_name(&self) -> String {
        self.property("nombre")
            .and_then(|v| v.as_str())
            .map(|s| s.trim().to_string())
            .unwrap_or_default()
    }
}

impl FeatureCollection {
    pub fn from_json(json: &str) -> Result<Self, IndexError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Loads the geometry feed from an `http(s)://` URL or a local path.
    pub fn load(source: &str) -> Result<Self, IndexError> {
        let body = if source.starts_with("http://") || source.starts_with("https://") {
            info!("Fetching geometry feed — url={}", source);
            let client = reqwest::blocking::Client::builder()
                .timeout(Duration::from_secs(120))
                .build()?;
            let response = client
                .get(source)
                .header("Accept", "application/json")
                .send()?;
            let status = response.status();
            if !status.is_success() {
                return Err(IndexError::Http(format!("geometry fetch failed with {}", status)));
            }
            response.text()?
        } else {
            info!("Reading geometry feed — path={}", source);
            fs::read_to_string(Path::new(source))?
        };

        debug!("Geometry feed body — bytes={}", body.len());
        let collection = Self::from_json(&body)?;
        info!("Geometry feed loaded — features={}", collection.features.len());
        Ok(collection)
    }
}

// Positions may carry altitude; anything shorter than [lon, lat] is dropped.
fn to_ring(raw: &[Vec<f64>]) -> Ring {
    raw.iter()
        .filter(|p| p.len() >= 2)
        .map(|p| [p[0], p[1]])
        .collect()
}

fn to_line(ring: &[Position]) -> LineString<f64> {
    ring.iter().copied().collect()
}

/// Exterior ring of a Polygon, or the ring with the most vertices of a
/// MultiPolygon. Holes and secondary landmasses are dropped.
pub fn extract_exterior_ring(geometry: &Value) -> Option<Ring> {
    let ring = match geometry {
        Value::Polygon(rings) => to_ring(rings.first()?),
        Value::MultiPolygon(polygons) => {
            let mut best: Option<&Vec<Vec<f64>>> = None;
            for exterior in polygons.iter().filter_map(|poly| poly.first()) {
                if best.map_or(true, |b| exterior.len() > b.len()) {
                    best = Some(exterior);
                }
            }
            to_ring(best?)
        }
        _ => return None,
    };
    Some(ring).filter(|r| !r.is_empty())
}

/// Douglas–Peucker simplification of a ring.
///
/// Rings of four points or fewer are returned unchanged. A ring whose ends
/// drifted apart is closed again.
pub fn simplify_ring(ring: &[Position], tolerance: f64) -> Ring {
    if ring.len() <= 4 {
        return ring.to_vec();
    }

    let mut simplified: Ring = to_line(ring)
        .simplify(&tolerance)
        .0
        .into_iter()
        .map(|c| [c.x, c.y])
        .collect();

    if let Some(&first) = simplified.first() {
        if simplified.last() != Some(&first) {
            simplified.push(first);
        }
    }
    simplified
}

/// Axis-aligned bounds of a ring; `None` for an empty ring.
pub fn compute_bbox(ring: &[Position]) -> Option<BoundingBox> {
    let rect = to_line(ring).bounding_rect()?;
    Some(BoundingBox::new(rect.min().y, rect.max().y, rect.min().x, rect.max().x))
}
