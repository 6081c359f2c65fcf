//! Kinds whose keys are assigned by the remote.

use hasync_core::{
    DiffStatus, EntityKind, KindId, PullOptions, PushOptions, Scope, SyncEngine, build_kind,
};
use hasync_test_utils::{Call, MemoryRemote, TestWorkspace, record};
use pretty_assertions::assert_eq;
use serde_json::json;

fn templates(ws: &TestWorkspace, remote: &MemoryRemote) -> Box<dyn EntityKind> {
    build_kind(&KindId::Templates, &ws.config(), remote.boxed())
}

fn template_remote() -> MemoryRemote {
    MemoryRemote::opaque().with_external_field("id")
}

const POWER: &str = "name: Power\nstate: \"{{ states('sensor.a') | float * 2 }}\"\nid: power_doubled\n";

#[test]
fn test_create_embeds_assigned_key() {
    let ws = TestWorkspace::new();
    ws.write("helpers/template/sensor/power.yaml", POWER);
    let remote = template_remote();
    let mut kind = templates(&ws, &remote);
    let mut engine = SyncEngine::new(kind.as_mut());

    let result = engine.push(&PushOptions::default()).unwrap();

    assert_eq!(result.created, vec!["sensor/mem-1".to_string()]);
    assert!(result.errors.is_empty(), "{:?}", result.errors);
    let written = ws.read_record("helpers/template/sensor/power.yaml");
    assert_eq!(written["entry_id"], "mem-1");
    assert_eq!(written["id"], "sensor.power_doubled");
    assert_eq!(
        remote.mutations(),
        vec![
            Call::Create("sensor/new:power".into()),
            Call::AssignName("sensor/mem-1".into(), "sensor.power_doubled".into()),
            Call::Reload
        ]
    );
    // The external name is applied separately, never sent in the payload
    assert_eq!(remote.record("sensor/mem-1").unwrap()["id"], "sensor.power_doubled");

    assert!(engine.diff(&Scope::all()).unwrap().is_empty());
}

#[test]
fn test_second_push_creates_nothing() {
    let ws = TestWorkspace::new();
    ws.write("helpers/template/sensor/power.yaml", POWER);
    let remote = template_remote();
    let mut kind = templates(&ws, &remote);
    let mut engine = SyncEngine::new(kind.as_mut());

    engine.push(&PushOptions::default()).unwrap();
    remote.clear_calls();
    let again = engine.push(&PushOptions::default()).unwrap();

    assert!(!again.has_changes());
    assert!(remote.mutations().is_empty());
    assert_eq!(remote.keys().len(), 1);
}

#[test]
fn test_entity_id_of_other_domain_is_an_error() {
    let ws = TestWorkspace::new();
    ws.write(
        "helpers/template/sensor/power.yaml",
        "name: Power\nstate: \"1\"\nid: binary_sensor.power\n",
    );
    let remote = template_remote();
    let mut kind = templates(&ws, &remote);

    let result = SyncEngine::new(kind.as_mut()).push(&PushOptions::default()).unwrap();

    assert!(result.created.is_empty());
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].1.contains("does not match"), "{:?}", result.errors);
    assert!(remote.mutations().is_empty());
}

#[test]
fn test_changed_entity_id_is_renamed() {
    let ws = TestWorkspace::new();
    ws.write(
        "helpers/template/sensor/power.yaml",
        "entry_id: mem-1\nname: Power\nstate: \"1\"\nid: power_new\n",
    );
    let remote = template_remote().with_entity(
        "sensor/mem-1",
        record(json!({"entry_id": "mem-1", "name": "Power", "state": "1", "id": "sensor.power_old"})),
    );
    let mut kind = templates(&ws, &remote);

    let result = SyncEngine::new(kind.as_mut()).push(&PushOptions::default()).unwrap();

    assert_eq!(result.updated, vec!["sensor/mem-1".to_string()]);
    assert_eq!(
        result.renamed,
        vec![("sensor.power_old".to_string(), "sensor.power_new".to_string())]
    );
}

#[test]
fn test_pull_names_files_and_suffixes_collisions() {
    let ws = TestWorkspace::new();
    let remote = template_remote()
        .with_entity("sensor/mem-1", record(json!({"entry_id": "mem-1", "name": "Power", "state": "1"})))
        .with_entity("sensor/mem-2", record(json!({"entry_id": "mem-2", "name": "Power", "state": "2"})));
    let mut kind = templates(&ws, &remote);
    let mut engine = SyncEngine::new(kind.as_mut());

    let result = engine.pull(&PullOptions::default()).unwrap();

    assert_eq!(result.created.len(), 2);
    assert_eq!(
        ws.files("helpers/template/sensor"),
        vec!["power-mem-2.yaml".to_string(), "power.yaml".to_string()]
    );
    assert_eq!(ws.read_record("helpers/template/sensor/power.yaml")["entry_id"], "mem-1");
    assert!(engine.diff(&Scope::all()).unwrap().is_empty());

    // A second pull keeps both files where they are
    let again = engine.pull(&PullOptions::default()).unwrap();
    assert!(!again.has_changes(), "{again:?}");
}

#[test]
fn test_pull_moves_file_when_name_changes() {
    let ws = TestWorkspace::new();
    ws.write("helpers/template/sensor/power.yaml", "entry_id: mem-1\nname: Power\nstate: \"1\"\n");
    let remote = template_remote()
        .with_entity("sensor/mem-1", record(json!({"entry_id": "mem-1", "name": "Energy", "state": "1"})));
    let mut kind = templates(&ws, &remote);

    let result = SyncEngine::new(kind.as_mut()).pull(&PullOptions::default()).unwrap();

    assert_eq!(
        result.renamed,
        vec![("sensor/mem-1".to_string(), "sensor/mem-1".to_string())]
    );
    ws.assert_file_exists("helpers/template/sensor/energy.yaml");
    ws.assert_file_not_exists("helpers/template/sensor/power.yaml");
}

#[test]
fn test_pull_does_not_overwrite_unpushed_file() {
    let ws = TestWorkspace::new();
    ws.write("helpers/template/sensor/power.yaml", "name: Power\nstate: \"local\"\n");
    let remote = template_remote()
        .with_entity("sensor/mem-7", record(json!({"entry_id": "mem-7", "name": "Power", "state": "1"})));
    let mut kind = templates(&ws, &remote);

    let result = SyncEngine::new(kind.as_mut()).pull(&PullOptions::default()).unwrap();

    assert_eq!(result.created, vec!["sensor/mem-7".to_string()]);
    assert_eq!(result.orphaned, vec!["sensor/new:power".to_string()]);
    assert_eq!(ws.read_record("helpers/template/sensor/power.yaml")["state"], "local");
    ws.assert_file_exists("helpers/template/sensor/power-mem-7.yaml");
}

#[test]
fn test_unknown_subtype_warns_once_and_passes_through() {
    let ws = TestWorkspace::new();
    let remote = template_remote()
        .with_entity("weather/mem-1", record(json!({"entry_id": "mem-1", "name": "Forecast", "condition": "sunny"})))
        .with_entity("weather/mem-2", record(json!({"entry_id": "mem-2", "name": "Backup"})));
    let mut kind = templates(&ws, &remote);

    let items = SyncEngine::new(kind.as_mut()).diff(&Scope::all()).unwrap();

    assert_eq!(items.len(), 2);
    assert!(items.iter().all(|i| i.status == DiffStatus::Deleted));
    assert_eq!(kind.unknown_types(), vec!["weather".to_string()]);
}

#[test]
fn test_config_entry_helper_is_flat_and_opaque() {
    let ws = TestWorkspace::new();
    let remote = MemoryRemote::opaque().with_entity(
        "mem-3",
        record(json!({"entry_id": "mem-3", "name": "Daily energy", "source": "sensor.energy", "cycle": "daily"})),
    );
    let mut kind = build_kind(&KindId::Helper("utility_meter".into()), &ws.config(), remote.boxed());
    let mut engine = SyncEngine::new(kind.as_mut());

    let result = engine.pull(&PullOptions::default()).unwrap();

    assert_eq!(result.created, vec!["mem-3".to_string()]);
    ws.assert_file_exists("helpers/utility_meter/daily_energy.yaml");
    assert!(engine.diff(&Scope::all()).unwrap().is_empty());
}
