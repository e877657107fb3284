use serde_json::json;
use tempfile::TempDir;

use questmap::{
    config::ControllerConfig,
    map::recording::RecordingSurface,
    marker::{MARKER_COLLECTION, MarkerDraft, MarkerRecord},
    persist::{DocumentStore, StoreError, sqlite::SqliteDocumentStore},
    runtime::controller::spawn_controller,
    types::LatLng,
};

#[test]
fn insert_assigns_id_and_creation_time() {
    let mut store = SqliteDocumentStore::open_in_memory().expect("open sqlite");

    let id = store
        .insert(MARKER_COLLECTION, MarkerDraft::new(LatLng::new(1.5, -2.5)).to_fields())
        .expect("insert");
    assert!(!id.is_empty());

    let docs = store.get_all(MARKER_COLLECTION).expect("get all");
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].id, id);

    let record = MarkerRecord::from_document(&docs[0]).expect("well-formed");
    assert_eq!(record.location, LatLng::new(1.5, -2.5));
    assert!(record.created_at.is_some());
    assert_eq!(record.next, None);
}

#[test]
fn collections_are_isolated() {
    let mut store = SqliteDocumentStore::open_in_memory().expect("open sqlite");
    store
        .insert(MARKER_COLLECTION, json!({ "location": { "lat": 0.0, "lng": 0.0 } }))
        .expect("insert quest");
    store
        .insert("drafts", json!({ "location": { "lat": 1.0, "lng": 1.0 } }))
        .expect("insert draft");

    assert_eq!(store.count(MARKER_COLLECTION).expect("count"), 1);
    assert_eq!(store.count("drafts").expect("count"), 1);
    let quest_ids: Vec<String> = store
        .get_all(MARKER_COLLECTION)
        .expect("get all")
        .into_iter()
        .map(|d| d.id)
        .collect();
    store
        .batch_delete(MARKER_COLLECTION, &quest_ids)
        .expect("batch delete");
    assert_eq!(store.count(MARKER_COLLECTION).expect("count"), 0);
    assert_eq!(store.count("drafts").expect("count"), 1);
}

#[test]
fn non_object_fields_are_rejected() {
    let mut store = SqliteDocumentStore::open_in_memory().expect("open sqlite");
    let err = store
        .insert(MARKER_COLLECTION, json!([1, 2]))
        .expect_err("array fields");
    assert!(matches!(err, StoreError::InvalidFields(_)));
    assert_eq!(store.count(MARKER_COLLECTION).expect("count"), 0);
}

#[test]
fn deletes_survive_reopen_and_ignore_missing_ids() {
    let tmp = TempDir::new().expect("tmp");
    let db_path = tmp.path().join("markers.db");

    let mut store = SqliteDocumentStore::open(&db_path).expect("open sqlite");
    let mut ids = Vec::new();
    for i in 0..4 {
        let id = store
            .insert(MARKER_COLLECTION, MarkerDraft::new(LatLng::new(f64::from(i), 0.0)).to_fields())
            .expect("insert");
        ids.push(id);
    }

    store.delete(MARKER_COLLECTION, &ids[0]).expect("delete");
    store
        .delete(MARKER_COLLECTION, &"missing".to_string())
        .expect("delete missing");
    store
        .batch_delete(MARKER_COLLECTION, &[ids[1].clone(), "missing".to_string()])
        .expect("batch delete");
    drop(store);

    let mut reopened = SqliteDocumentStore::open(&db_path).expect("reopen");
    let mut left: Vec<String> = reopened
        .get_all(MARKER_COLLECTION)
        .expect("get all")
        .into_iter()
        .map(|d| d.id)
        .collect();
    left.sort();
    let mut expected = vec![ids[2].clone(), ids[3].clone()];
    expected.sort();
    assert_eq!(left, expected);
}

#[tokio::test]
async fn markers_created_through_controller_reload_after_restart() {
    let tmp = TempDir::new().expect("tmp");
    let db_path = tmp.path().join("quests.db");

    let store = SqliteDocumentStore::open(&db_path).expect("open sqlite");
    let handle = spawn_controller(Box::new(store), ControllerConfig::default());
    handle
        .initialize(Box::new(RecordingSurface::new()))
        .await
        .expect("initialize");
    let first = handle
        .map_click(LatLng::new(10.0, 20.0))
        .await
        .expect("click")
        .expect("created");
    let second = handle
        .map_click(LatLng::new(-10.0, -20.0))
        .await
        .expect("click")
        .expect("created");
    handle.shutdown().await.expect("shutdown");

    let store = SqliteDocumentStore::open(&db_path).expect("reopen");
    let surface = RecordingSurface::new();
    let handle = spawn_controller(Box::new(store), ControllerConfig::default());
    let held = handle
        .initialize(Box::new(surface.clone()))
        .await
        .expect("initialize");
    assert_eq!(held, 2);

    let mut ids = handle.view().await.expect("view").ids();
    ids.sort();
    let mut expected = vec![first, second];
    expected.sort();
    assert_eq!(ids, expected);

    let mut positions: Vec<(f64, f64)> = surface
        .overlays()
        .into_iter()
        .map(|(_, o)| (o.position.lat, o.position.lng))
        .collect();
    positions.sort_by(|a, b| a.0.total_cmp(&b.0));
    assert_eq!(positions, vec![(-10.0, -20.0), (10.0, 20.0)]);

    assert_eq!(handle.delete_all().await.expect("delete all"), 2);
    handle.shutdown().await.expect("shutdown");

    let store = SqliteDocumentStore::open(&db_path).expect("reopen");
    assert_eq!(store.count(MARKER_COLLECTION).expect("count"), 0);
}
