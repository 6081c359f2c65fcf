//! Home Assistant bindings for ha-sync
//!
//! [`HaClient`] wraps the REST API (`reqwest`, blocking) and the WebSocket API
//! (`tungstenite`). Each entity kind gets its own [`RemoteStore`] from
//! [`remote_for`]; all of them share the client's connection.

pub mod client;
pub mod config_entries;
pub mod config_store;
pub mod dashboards;
pub mod error;
pub mod socket;
pub mod states;
pub mod storage;

pub use client::{HaClient, ServerInfo};
pub use config_entries::ConfigEntrySource;
pub use config_store::{ConfigDomain, ConfigStore};
pub use dashboards::DashboardStore;
pub use error::{ClientError, Result};
pub use states::{EntityState, StateQuery};
pub use storage::StorageHelperStore;

use hasync_core::kind::STORAGE_HELPER_TYPES;
use hasync_core::{ContainerRemote, KindId, RemoteStore};
use serde_json::Value;

/// Field of template and group records holding the desired entity id.
const ENTITY_ID_FIELD: &str = "id";

/// The remote store serving `kind`.
pub fn remote_for(kind: &KindId, client: &HaClient) -> Box<dyn RemoteStore> {
    let client = client.clone();
    match kind {
        KindId::Automations => Box::new(ConfigStore::new(client, ConfigDomain::Automation)),
        KindId::Scripts => Box::new(ConfigStore::new(client, ConfigDomain::Script)),
        KindId::Scenes => Box::new(ConfigStore::new(client, ConfigDomain::Scene)),
        KindId::InputHelpers => Box::new(StorageHelperStore::new(client, STORAGE_HELPER_TYPES)),
        KindId::Templates => Box::new(
            ContainerRemote::new(ConfigEntrySource::subtyped(client, "template")).with_external_field(ENTITY_ID_FIELD),
        ),
        KindId::Groups => Box::new(
            ContainerRemote::new(ConfigEntrySource::subtyped(client, "group")).with_external_field(ENTITY_ID_FIELD),
        ),
        KindId::Helper(domain) => Box::new(ContainerRemote::new(ConfigEntrySource::new(client, domain.clone()))),
        KindId::Dashboards => Box::new(DashboardStore::new(client)),
    }
}

/// Which of `known` helper domains have config entries on the server, in
/// the order of `known`.
pub fn discover_helper_domains(client: &HaClient, known: &[String]) -> Result<Vec<String>> {
    let entries = client.ws("config_entries/get", Value::Null)?;
    let present: Vec<&str> = client::as_array(&entries, "config_entries/get")?
        .iter()
        .filter_map(|entry| entry.get("domain").and_then(Value::as_str))
        .collect();
    Ok(known
        .iter()
        .filter(|domain| present.contains(&domain.as_str()))
        .cloned()
        .collect())
}
