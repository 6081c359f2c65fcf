//! The four reference scenarios for diff, pull and push.

use hasync_core::{
    DiffStatus, EntityKind, KindId, PullOptions, PushOptions, Scope, SyncEngine, build_kind,
};
use hasync_test_utils::{MemoryRemote, TestWorkspace, record};
use pretty_assertions::assert_eq;
use serde_json::json;

fn automations(ws: &TestWorkspace, remote: &MemoryRemote) -> Box<dyn EntityKind> {
    build_kind(&KindId::Automations, &ws.config(), remote.boxed())
}

#[test]
fn scenario_a_pull_creates_missing_file() {
    let ws = TestWorkspace::new();
    let remote = MemoryRemote::declared().with_entity("a", record(json!({"id": "a", "alias": "Foo"})));
    let mut kind = automations(&ws, &remote);

    let result = SyncEngine::new(kind.as_mut()).pull(&PullOptions::default()).unwrap();

    assert_eq!(result.created, vec!["a".to_string()]);
    assert!(result.errors.is_empty());
    assert_eq!(ws.read_record("automations/a.yaml"), record(json!({"id": "a", "alias": "Foo"})));
}

#[test]
fn scenario_b_edited_id_is_a_single_rename() {
    let ws = TestWorkspace::new();
    ws.write("automations/b1.yaml", "id: b2\nalias: Bee\n");
    let remote = MemoryRemote::declared().with_entity("b1", record(json!({"id": "b1", "alias": "Bee"})));
    let mut kind = automations(&ws, &remote);

    let items = SyncEngine::new(kind.as_mut()).diff(&Scope::all()).unwrap();

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].status, DiffStatus::Renamed);
    assert_eq!(items[0].key, "b1");
    assert_eq!(items[0].new_key.as_deref(), Some("b2"));
}

#[test]
fn scenario_c_field_order_is_not_a_difference() {
    let ws = TestWorkspace::new();
    ws.write("automations/c.yaml", "mode: single\nalias: Sea\nid: c\n");
    let remote = MemoryRemote::declared().with_entity("c", record(json!({"id": "c", "alias": "Sea"})));
    let mut kind = automations(&ws, &remote);

    let items = SyncEngine::new(kind.as_mut()).diff(&Scope::all()).unwrap();

    assert!(items.is_empty(), "unexpected items: {items:?}");
}

#[test]
fn scenario_d_dry_run_push_sends_nothing() {
    let ws = TestWorkspace::new();
    ws.write("automations/d.yaml", "id: d\nalias: Dee\n");
    let remote = MemoryRemote::declared();
    let mut kind = automations(&ws, &remote);
    let mut engine = SyncEngine::new(kind.as_mut());

    let result = engine
        .push(&PushOptions {
            dry_run: true,
            ..Default::default()
        })
        .unwrap();
    assert_eq!(result.created, vec!["d".to_string()]);
    assert!(remote.mutations().is_empty());

    let items = engine.diff(&Scope::all()).unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].status, DiffStatus::Added);
    assert_eq!(items[0].key, "d");
}
