// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

use serde::{Deserialize, Serialize};

/// A single `[lon, lat]` coordinate, GeoJSON order.
pub type Position = [f64; 2];

/// Closed ring of positions; first point equals last point.
pub type Ring = Vec<Position>;

/// Query coordinate in geolocation order.
///
/// Polygons store `[lon, lat]`; every crossing between the two conventions
/// goes through [`LatLon::to_position`] / [`LatLon::from_position`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn to_position(self) -> Position {
        [self.lon, self.lat]
    }

    pub fn from_position(p: Position) -> Self {
        Self { lat: p[1], lon: p[0] }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    pub fn new(min_lat: f64, max_lat: f64, min_lon: f64, max_lon: f64) -> Self {
        Self {
            min_lat,
            max_lat,
            min_lon,
            max_lon,
        }
    }

    /// Inclusive on every edge.
    pub fn contains(&self, point: LatLon) -> bool {
        point.lat >= self.min_lat
            && point.lat <= self.max_lat
            && point.lon >= self.min_lon
            && point.lon <= self.max_lon
    }
}

/// One row of the Geo-Index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MunicipalityEntry {
    /// Registry entity id.
    pub id: String,
    /// Display name, verbatim from the geometry feed.
    pub name: String,
    pub ine_code: String,
    pub department: String,
    pub bbox: BoundingBox,
    pub polygon: Ring,
}

pub const UNKNOWN_DEPARTMENT: &str = "Bolivia";

const DEPARTMENTS: [(&str, &str); 9] = [
    ("01", "Chuquisaca"),
    ("02", "La Paz"),
    ("03", "Cochabamba"),
    ("04", "Oruro"),
    ("05", "Potosí"),
    ("06", "Tarija"),
    ("07", "Santa Cruz"),
    ("08", "Beni"),
    ("09", "Pando"),
];

/// Department name from the first two digits of an INE code.
pub fn department_for_code(ine_code: &str) -> &'static str {
    let prefix = ine_code.get(..2).unwrap_or("");
    DEPARTMENTS
        .iter()
        .find(|(code, _)| *code == prefix)
        .map(|(_, name)| *name)
        .unwrap_or(UNKNOWN_DEPARTMENT)
}
