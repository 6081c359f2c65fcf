//! Dashboards split into `_meta.yaml` and numbered view files.

use hasync_core::{EntityKind, KindId, PullOptions, PushOptions, Scope, SyncEngine, build_kind};
use hasync_test_utils::{Call, MemoryRemote, TestWorkspace, record};
use pretty_assertions::assert_eq;
use serde_json::json;

fn dashboards(ws: &TestWorkspace, remote: &MemoryRemote) -> Box<dyn EntityKind> {
    build_kind(&KindId::Dashboards, &ws.config(), remote.boxed())
}

fn energy() -> serde_json::Value {
    json!({
        "title": "Energy",
        "url_path": "dashboard-energy",
        "show_in_sidebar": true,
        "config": {
            "views": [
                {"title": "Main", "path": "main", "cards": [{"type": "entities", "entities": ["sensor.a"]}]},
                {"title": "Second Floor"}
            ]
        }
    })
}

#[test]
fn test_pull_splits_views_into_files() {
    let ws = TestWorkspace::new();
    let remote = MemoryRemote::declared()
        .with_entity("energy", record(energy()))
        .with_entity("lovelace", record(json!({"title": "Home", "config": {"views": [{"title": "Home"}]}})));
    let mut kind = dashboards(&ws, &remote);
    let mut engine = SyncEngine::new(kind.as_mut());

    let result = engine.pull(&PullOptions::default()).unwrap();

    assert_eq!(result.created, vec!["energy".to_string(), "lovelace".to_string()]);
    assert_eq!(
        ws.files("dashboards/energy"),
        vec!["01_main.yaml", "02_second_floor.yaml", "_meta.yaml"]
    );
    assert_eq!(
        ws.read_record("dashboards/energy/_meta.yaml"),
        record(json!({"title": "Energy", "url_path": "dashboard-energy"}))
    );
    assert_eq!(ws.read_record("dashboards/energy/02_second_floor.yaml"), record(json!({"position": 2, "title": "Second Floor"})));
    ws.assert_file_exists("dashboards/lovelace/01_home.yaml");

    assert!(engine.diff(&Scope::all()).unwrap().is_empty());
}

#[test]
fn test_strategy_dashboard_keeps_config_in_meta() {
    let ws = TestWorkspace::new();
    let remote = MemoryRemote::declared().with_entity(
        "map",
        record(json!({"title": "Map", "url_path": "dashboard-map", "config": {"strategy": {"type": "map"}}})),
    );
    let mut kind = dashboards(&ws, &remote);
    let mut engine = SyncEngine::new(kind.as_mut());

    engine.pull(&PullOptions::default()).unwrap();

    assert_eq!(ws.files("dashboards/map"), vec!["_meta.yaml"]);
    assert_eq!(
        ws.read_record("dashboards/map/_meta.yaml")["config"],
        json!({"strategy": {"type": "map"}})
    );
    assert!(engine.diff(&Scope::all()).unwrap().is_empty());
}

#[test]
fn test_reordered_views_push_and_renumber() {
    let ws = TestWorkspace::new();
    let remote = MemoryRemote::declared().with_entity("energy", record(energy()));
    let mut kind = dashboards(&ws, &remote);
    let mut engine = SyncEngine::new(kind.as_mut());
    engine.pull(&PullOptions::default()).unwrap();

    ws.write("dashboards/energy/01_main.yaml", "position: 3\ntitle: Main\npath: main\n");
    let result = engine.push(&PushOptions::default()).unwrap();

    assert_eq!(result.updated, vec!["energy".to_string()]);
    assert_eq!(
        ws.files("dashboards/energy"),
        vec!["01_second_floor.yaml", "02_main.yaml", "_meta.yaml"]
    );
    let pushed = remote.record("energy").unwrap();
    assert_eq!(pushed["config"]["views"][0]["title"], "Second Floor");
    assert_eq!(pushed["config"]["views"][1].get("position"), None);
    assert!(engine.diff(&Scope::all()).unwrap().is_empty());
}

#[test]
fn test_new_dashboard_gets_default_url_path() {
    let ws = TestWorkspace::new();
    ws.write("dashboards/garden/_meta.yaml", "title: Garden\n");
    ws.write("dashboards/garden/01_beds.yaml", "position: 1\ntitle: Beds\n");
    let remote = MemoryRemote::declared();
    let mut kind = dashboards(&ws, &remote);

    let result = SyncEngine::new(kind.as_mut()).push(&PushOptions::default()).unwrap();

    assert_eq!(result.created, vec!["garden".to_string()]);
    assert_eq!(remote.mutations()[0], Call::Create("garden".into()));
    assert_eq!(remote.record("garden").unwrap()["url_path"], "dashboard-garden");
}

#[test]
fn test_scope_inside_dashboard_directory() {
    let ws = TestWorkspace::new();
    ws.write("dashboards/garden/_meta.yaml", "title: Garden\n");
    ws.write("dashboards/shed/_meta.yaml", "title: Shed\n");
    let remote = MemoryRemote::declared();
    let mut kind = dashboards(&ws, &remote);

    let items = SyncEngine::new(kind.as_mut())
        .diff(&Scope::under(ws.path("dashboards/garden/_meta.yaml")))
        .unwrap();

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].key, "garden");
}
