// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

use munidex_core::builder::write_index;
use munidex_core::client::{search, FileFetcher, FileStore, NoStore, DEFAULT_SEARCH_LIMIT};
use munidex_core::geometry::FeatureCollection;
use munidex_core::registry::EntityRegistry;
use munidex_core::{ClientError, GeoIndexClient, IndexBuilder, INDEX_FILE_NAME};
use serde_json::json;
use tempfile::tempdir;

fn feed() -> FeatureCollection {
    let doc = json!({
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": { "id": "020101", "nombre": "LA PAZ" },
                "geometry": { "type": "Polygon", "coordinates": [[
                    [-68.25, -16.75], [-68.25, -16.25], [-67.75, -16.25], [-67.75, -16.75], [-68.25, -16.75]
                ]] }
            },
            {
                "type": "Feature",
                "properties": { "id": "020105", "nombre": "EL ALTO" },
                "geometry": { "type": "MultiPolygon", "coordinates": [
                    [[[-68.5, -16.75], [-68.5, -16.25], [-68.25, -16.25], [-68.25, -16.75], [-68.5, -16.75]]],
                    [[[-70.0, -20.0], [-70.0, -19.9], [-69.9, -20.0], [-70.0, -20.0]]]
                ] }
            },
            {
                "type": "Feature",
                "properties": { "id": 50101, "nombre": "POTOSÍ" },
                "geometry": { "type": "Polygon", "coordinates": [[
                    [-66.0, -19.75, 4000.0], [-66.0, -19.5], [-65.5, -19.5], [-65.5, -19.75], [-66.0, -19.75]
                ]] }
            }
        ]
    });
    FeatureCollection::from_json(&doc.to_string()).unwrap()
}

fn registry() -> EntityRegistry {
    EntityRegistry::from_pairs([
        ("la paz", "lpz"),
        ("el alto", "alt"),
        ("potosi", "pts"),
    ])
}

#[tokio::test]
async fn test_build_write_then_lookup() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("public").join(INDEX_FILE_NAME);

    let report = IndexBuilder::default().build(&feed(), &registry());
    assert_eq!(report.entries.len(), 3);
    let bytes = write_index(&path, &report.entries).unwrap();
    assert!(bytes > 0);

    let client = GeoIndexClient::new(FileFetcher::new(&path), NoStore);

    let lpz = client.find_by_coordinates(-16.5, -68.0).await.unwrap().unwrap();
    assert_eq!(lpz.id, "lpz");
    assert_eq!(lpz.department, "La Paz");

    // The shared edge at lon -68.25 belongs to exactly one side.
    let edge = client.find_by_coordinates(-16.5, -68.25).await.unwrap().unwrap();
    assert_eq!(edge.id, "lpz");

    let alto = client.find_by_coordinates(-16.5, -68.4).await.unwrap().unwrap();
    assert_eq!(alto.id, "alt");
    // Only the largest MultiPolygon part survives.
    assert!(client.find_by_coordinates(-19.98, -69.98).await.unwrap().is_none());

    // Numeric codes arrive as written.
    let pts = client.find_by_coordinates(-19.6, -65.75).await.unwrap().unwrap();
    assert_eq!(pts.ine_code, "50101");
    assert_eq!(pts.department, "Bolivia");

    assert!(client.find_by_coordinates(0.0, 0.0).await.unwrap().is_none());

    let index = client.get_index().await.unwrap();
    let hits = search(&index, "potosi", DEFAULT_SEARCH_LIMIT);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].name, "POTOSÍ");
    assert_eq!(search(&index, "", 2).len(), 2);
}

#[tokio::test]
async fn test_missing_index_reports_error() {
    let dir = tempdir().unwrap();
    let client = GeoIndexClient::new(FileFetcher::new(dir.path().join("absent.json")), NoStore);

    let err = client.find_by_coordinates(-16.5, -68.0).await.unwrap_err();
    assert!(matches!(err, ClientError::Io(_)));
    assert!(client.memory_snapshot().is_none());
}

#[tokio::test]
async fn test_store_survives_new_client() {
    let dir = tempdir().unwrap();
    let index_path = dir.path().join(INDEX_FILE_NAME);
    let store_path = dir.path().join("cache").join("municipality_index_v1.json");

    let report = IndexBuilder::default().build(&feed(), &registry());
    write_index(&index_path, &report.entries).unwrap();

    let first = GeoIndexClient::new(FileFetcher::new(&index_path), FileStore::new(&store_path));
    assert_eq!(first.get_index().await.unwrap().len(), 3);
    assert!(store_path.exists());

    // Source gone: a fresh client still answers from the persisted copy.
    std::fs::remove_file(&index_path).unwrap();
    let second = GeoIndexClient::new(FileFetcher::new(&index_path), FileStore::new(&store_path));
    let hit = second.find_by_coordinates(-16.5, -68.0).await.unwrap().unwrap();
    assert_eq!(hit.id, "lpz");
}
