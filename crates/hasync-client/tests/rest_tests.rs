//! REST bindings against a mock server.

use hasync_client::{ConfigDomain, ConfigStore, HaClient, StateQuery};
use hasync_core::{Error, RemoteStore};
use mockito::{Matcher, Server};
use pretty_assertions::assert_eq;
use serde_json::json;

fn client(server: &Server) -> HaClient {
    HaClient::new(&server.url(), "secret").unwrap()
}

#[test]
fn test_status_and_server_info() {
    let mut server = Server::new();
    let status = server
        .mock("GET", "/api/")
        .match_header("authorization", "Bearer secret")
        .with_header("content-type", "application/json")
        .with_body(r#"{"message": "API running."}"#)
        .create();
    server
        .mock("GET", "/api/config")
        .with_header("content-type", "application/json")
        .with_body(r#"{"version": "2024.6.1", "location_name": "Home", "time_zone": "UTC"}"#)
        .create();

    let client = client(&server);
    assert_eq!(client.api_status().unwrap(), "API running.");
    let info = client.server_info().unwrap();
    assert_eq!(info.version, "2024.6.1");
    assert_eq!(info.location_name, "Home");
    status.assert();
}

#[test]
fn test_entity_state_lookup() {
    let mut server = Server::new();
    server
        .mock("GET", "/api/states/light.porch")
        .with_body(
            json!({
                "entity_id": "light.porch",
                "state": "on",
                "last_changed": "2024-06-01T07:00:00+00:00",
                "attributes": {"friendly_name": "Front Porch", "brightness": 180}
            })
            .to_string(),
        )
        .create();
    server
        .mock("GET", "/api/states/light.attic")
        .with_status(404)
        .with_body(r#"{"message": "Entity not found."}"#)
        .create();

    let client = client(&server);
    let porch = client.state("light.porch").unwrap().unwrap();
    assert_eq!(porch.state, "on");
    assert_eq!(porch.friendly_name(), "Front Porch");
    assert_eq!(porch.attributes["brightness"], json!(180));
    assert_eq!(client.state("light.attic").unwrap(), None);
}

#[test]
fn test_search_filters_listed_states() {
    let mut server = Server::new();
    server
        .mock("GET", "/api/states")
        .with_body(
            json!([
                {"entity_id": "switch.porch_light", "state": "off", "attributes": {}},
                {"entity_id": "light.porch", "state": "on", "attributes": {"friendly_name": "Front Porch"}},
                {"entity_id": "sun.sun", "state": "above_horizon"}
            ])
            .to_string(),
        )
        .create();

    let states = client(&server).states().unwrap();
    assert_eq!(states.len(), 3);
    let found = StateQuery::new("porch").unwrap().filter(states);
    let ids: Vec<_> = found.iter().map(|s| s.entity_id.as_str()).collect();
    assert_eq!(ids, vec!["light.porch", "switch.porch_light"]);
}

#[test]
fn test_list_skips_entities_without_stored_config() {
    let mut server = Server::new();
    server
        .mock("GET", "/api/states")
        .with_body(
            json!([
                {"entity_id": "automation.morning", "attributes": {"id": "morning"}},
                {"entity_id": "automation.from_yaml", "attributes": {"id": "from_yaml"}},
                {"entity_id": "sun.sun", "attributes": {}}
            ])
            .to_string(),
        )
        .create();
    server
        .mock("GET", "/api/config/automation/config/morning")
        .with_body(r#"{"id": "morning", "alias": "Morning", "triggers": [], "actions": []}"#)
        .create();
    server
        .mock("GET", "/api/config/automation/config/from_yaml")
        .with_status(404)
        .with_body("Resource not found")
        .create();

    let mut store = ConfigStore::new(client(&server), ConfigDomain::Automation);
    let listed = store.list().unwrap();

    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].0, "morning");
    assert_eq!(listed[0].1["alias"], "Morning");
}

#[test]
fn test_save_and_reload() {
    let mut server = Server::new();
    let save = server
        .mock("POST", "/api/config/script/config/wake_up")
        .match_body(Matcher::Json(json!({"alias": "Wake up", "sequence": []})))
        .with_body(r#"{"result": "ok"}"#)
        .create();
    let reload = server
        .mock("POST", "/api/services/script/reload")
        .with_body("[]")
        .create();

    let mut store = ConfigStore::new(client(&server), ConfigDomain::Script);
    let payload = json!({"id": "wake_up", "alias": "Wake up", "sequence": []})
        .as_object()
        .cloned()
        .unwrap();
    assert_eq!(store.create("wake_up", &payload).unwrap(), "wake_up");
    store.reload().unwrap();

    save.assert();
    reload.assert();
}

#[test]
fn test_rejected_save_is_a_remote_error() {
    let mut server = Server::new();
    server
        .mock("POST", "/api/config/automation/config/bad")
        .with_status(400)
        .with_body(r#"{"message": "Message malformed: required key not provided @ data['triggers']"}"#)
        .create();

    let mut store = ConfigStore::new(client(&server), ConfigDomain::Automation);
    let err = store.update("bad", &serde_json::Map::new()).unwrap_err();

    match err {
        Error::Remote { operation, message } => {
            assert_eq!(operation, "save automation");
            assert!(message.contains("400"), "{message}");
            assert!(message.contains("triggers"), "{message}");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_render_template() {
    let mut server = Server::new();
    server
        .mock("POST", "/api/template")
        .match_body(Matcher::Json(json!({"template": "{{ 1 + 1 }}"})))
        .with_body("2")
        .create();
    server
        .mock("POST", "/api/template")
        .match_body(Matcher::Json(json!({"template": "{{ nope( }}"})))
        .with_status(400)
        .with_body(r#"{"message": "Error rendering template: TemplateSyntaxError"}"#)
        .create();

    let client = client(&server);
    assert_eq!(client.render_template("{{ 1 + 1 }}").unwrap(), "2");
    assert!(client.render_template("{{ nope( }}").is_err());
}
