// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

use super::{ClientError, GeoIndexClient};
use crate::model::{LatLon, MunicipalityEntry, Position};

/// Even-odd ray cast against a `[lon, lat]` ring; the ring is treated as
/// closed whether or not the last point repeats the first.
///
/// Boundary points are half-open: a point on a western or southern edge (or
/// vertex) is inside, on an eastern or northern one outside. Two rings sharing
/// an edge therefore never both claim a point on it.
pub fn point_in_ring(point: LatLon, ring: &[Position]) -> bool {
    let [x, y] = point.to_position();
    let mut inside = false;

    let mut j = match ring.len() {
        0 => return false,
        n => n - 1,
    };
    for i in 0..ring.len() {
        let [xi, yi] = ring[i];
        let [xj, yj] = ring[j];
        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }

    inside
}

/// First entry, in index order, whose polygon contains `point`.
///
/// Bounding boxes reject most entries before any ray cast.
pub fn locate(index: &[MunicipalityEntry], point: LatLon) -> Option<&MunicipalityEntry> {
    index
        .iter()
        .filter(|m| m.bbox.contains(point))
        .find(|m| point_in_ring(point, &m.polygon))
}

impl GeoIndexClient {
    /// Municipality containing `(lat, lon)`. No network access beyond the
    /// cache load in [`GeoIndexClient::get_index`].
    pub async fn find_by_coordinates(
        &self,
        lat: f64,
        lon: f64,
    ) -> Result<Option<MunicipalityEntry>, ClientError> {
        let index = self.get_index().await?;
        Ok(locate(&index, LatLon::new(lat, lon)).cloned())
    }
}
