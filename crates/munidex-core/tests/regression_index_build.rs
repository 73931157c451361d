// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

use munidex_core::geometry::FeatureCollection;
use munidex_core::overrides::OverrideTable;
use munidex_core::registry::{EntityRecord, EntityRegistry, RegistrySource};
use munidex_core::{IndexBuilder, IndexError};
use serde_json::json;

/// Serves a fixed entity list in pages, like the documents endpoint.
struct FixedRegistry(Vec<EntityRecord>);

impl RegistrySource for FixedRegistry {
    fn fetch_page(&self, cursor: Option<&str>, limit: usize) -> Result<Vec<EntityRecord>, IndexError> {
        let start = match cursor {
            Some(c) => self.0.iter().position(|r| r.id == c).map_or(self.0.len(), |i| i + 1),
            None => 0,
        };
        Ok(self.0.iter().skip(start).take(limit).cloned().collect())
    }
}

fn record(id: &str, label: &str) -> EntityRecord {
    EntityRecord {
        id: id.to_string(),
        label: Some(label.to_string()),
    }
}

fn square_feature(code: &str, name: &str, lon: f64, lat: f64) -> serde_json::Value {
    json!({
        "type": "Feature",
        "properties": { "id": code, "nombre": name },
        "geometry": {
            "type": "Polygon",
            "coordinates": [[
                [lon, lat], [lon, lat + 0.5], [lon + 0.5, lat + 0.5], [lon + 0.5, lat], [lon, lat]
            ]]
        }
    })
}

fn collection(features: Vec<serde_json::Value>) -> FeatureCollection {
    let doc = json!({ "type": "FeatureCollection", "features": features });
    FeatureCollection::from_json(&doc.to_string()).unwrap()
}

fn registry() -> EntityRegistry {
    let source = FixedRegistry(vec![
        record("abc123", "Municipio de La Paz"),
        record("esp001", "Municipio de Nueva Esperanza"),
        record("man002", "Municipio de Nuevo Manoa (Pando)"),
        record("dep999", "Departamento de La Paz"),
        record("cob003", "Municipio de Cobija"),
    ]);
    EntityRegistry::collect(&source, 2, "municipio").unwrap()
}

#[test]
fn test_la_paz_end_to_end() {
    let features = collection(vec![square_feature("020101", "LA PAZ", -68.25, -16.5)]);
    let report = IndexBuilder::default().build(&features, &registry());

    assert_eq!(report.entries.len(), 1);
    assert!(report.unmatched.is_empty());

    let entry = serde_json::to_value(&report.entries[0]).unwrap();
    assert_eq!(entry["id"], "abc123");
    assert_eq!(entry["name"], "LA PAZ");
    assert_eq!(entry["ineCode"], "020101");
    assert_eq!(entry["department"], "La Paz");
    assert_eq!(entry["bbox"]["minLat"], -16.5);
    assert_eq!(entry["bbox"]["maxLon"], -67.75);
    assert_eq!(entry["polygon"].as_array().unwrap().len(), 5);
}

#[test]
fn test_override_beats_own_name() {
    // Both "nueva esperanza" and the override target exist; the override wins.
    let features = collection(vec![square_feature("090501", "NUEVA ESPERANZA", -66.0, -10.0)]);
    let report = IndexBuilder::default().build(&features, &registry());

    assert_eq!(report.entries.len(), 1);
    assert_eq!(report.entries[0].id, "man002");
    assert_eq!(report.entries[0].department, "Pando");
    assert!(report.unused_registry_keys.contains(&"nueva esperanza".to_string()));
    assert!(!report.unused_registry_keys.contains(&"nuevo manoa".to_string()));
}

#[test]
fn test_sentinel_is_silent() {
    let features = collection(vec![square_feature("051204", "CHUQUIHUTA", -66.5, -18.5)]);
    let report = IndexBuilder::default().build(&features, &registry());

    assert!(report.entries.is_empty());
    assert!(report.unmatched.is_empty());
    assert_eq!(report.excluded, 1);
}

#[test]
fn test_direct_id_skips_registry() {
    let features = collection(vec![square_feature("050901", "ANY NAME AT ALL", -65.0, -20.0)]);
    let report = IndexBuilder::default().build(&features, &EntityRegistry::default());

    assert_eq!(report.entries.len(), 1);
    assert_eq!(report.entries[0].id, "69839a45243b68c069b3");
    assert_eq!(report.entries[0].department, "Potosí");
}

#[test]
fn test_mixed_feed_report() {
    let mut degenerate = square_feature("090101", "COBIJA", -68.8, -11.1);
    degenerate["geometry"]["coordinates"] = json!([[[-68.8, -11.1], [-68.7, -11.1], [-68.8, -11.1]]]);

    let features = collection(vec![
        square_feature("020101", "LA PAZ", -68.25, -16.5),
        json!({ "type": "Feature", "properties": { "id": "020102" }, "geometry": null }),
        square_feature("070101", "SANTA CRUZ DE LA SIERRA", -63.2, -17.8),
        degenerate,
    ]);
    let report = IndexBuilder::new(OverrideTable::empty()).build(&features, &registry());

    assert_eq!(report.entries.len(), 1);
    assert_eq!(report.unmatched, vec!["SANTA CRUZ DE LA SIERRA (070101)".to_string()]);
    assert_eq!(report.degenerate, vec!["COBIJA (090101)".to_string()]);
    assert_eq!(report.excluded, 0);
    // Departments are not municipalities and never enter the registry.
    assert!(!report.unused_registry_keys.iter().any(|k| k.contains("departamento")));
    assert!(report.stale_override_codes.is_empty());
}

#[test]
fn test_null_properties_feature_is_skipped() {
    let features = collection(vec![
        json!({ "type": "Feature", "properties": null, "geometry": null }),
        square_feature("020101", "LA PAZ", -68.25, -16.5),
    ]);
    let report = IndexBuilder::default().build(&features, &registry());

    assert_eq!(report.entries.len(), 1);
    assert_eq!(report.entries[0].id, "abc123");
    assert!(report.unmatched.is_empty());
    assert!(report.degenerate.is_empty());
}
