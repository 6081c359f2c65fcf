//! Config-entry helpers through config flows, options flows and the entity
//! registry
//!
//! A config entry's options are only exposed as the suggested values of its
//! options-flow form, so reading one means opening that flow, reading the form
//! and aborting it. Creating walks the config flow (picking the subtype from
//! the menu for template and group helpers); updating submits the options flow
//! and renames the entry if its title changed.

use std::collections::HashMap;

use hasync_core::{Container, ContainerSource};
use hasync_meta::Record;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::client::{HaClient, as_array};
use crate::{ClientError, Result};

const CONFIG_FLOW: &str = "api/config/config_entries/flow";
const OPTIONS_FLOW: &str = "api/config/config_entries/options/flow";
const MAX_STEPS: usize = 6;

/// One step of a data-entry flow.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowStep {
    Form {
        flow_id: String,
        step_id: String,
        schema: Vec<Value>,
        errors: Record,
    },
    Menu {
        flow_id: String,
        options: Vec<String>,
    },
    Created {
        entry_id: Option<String>,
    },
    Abort {
        reason: String,
    },
}

impl FlowStep {
    pub fn parse(value: &Value) -> Result<Self> {
        let text = |field: &str| value.get(field).and_then(Value::as_str).unwrap_or_default().to_string();
        match value.get("type").and_then(Value::as_str) {
            Some("form") => Ok(Self::Form {
                flow_id: text("flow_id"),
                step_id: text("step_id"),
                schema: value
                    .get("data_schema")
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default(),
                errors: value
                    .get("errors")
                    .and_then(Value::as_object)
                    .cloned()
                    .unwrap_or_default(),
            }),
            Some("menu") => {
                let options = match value.get("menu_options") {
                    Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).map(str::to_string).collect(),
                    Some(Value::Object(map)) => map.keys().cloned().collect(),
                    _ => Vec::new(),
                };
                Ok(Self::Menu {
                    flow_id: text("flow_id"),
                    options,
                })
            }
            Some("create_entry") => Ok(Self::Created {
                entry_id: value
                    .pointer("/result/entry_id")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            }),
            Some("abort") => Ok(Self::Abort { reason: text("reason") }),
            other => Err(ClientError::protocol(format!(
                "unknown flow step type {}",
                other.unwrap_or("<missing>")
            ))),
        }
    }
}

/// Current values of a flow form: suggested values, else defaults.
///
/// Collapsible sections become nested mappings under the section name.
pub fn form_values(schema: &[Value]) -> Record {
    let mut values = Record::new();
    for field in schema {
        let Some(name) = field.get("name").and_then(Value::as_str) else {
            continue;
        };
        if field.get("type").and_then(Value::as_str) == Some("expandable") {
            let inner = field.get("schema").and_then(Value::as_array).map(Vec::as_slice).unwrap_or_default();
            let section = form_values(inner);
            if !section.is_empty() {
                values.insert(name.to_string(), Value::Object(section));
            }
            continue;
        }
        let value = field
            .pointer("/description/suggested_value")
            .or_else(|| field.get("default"))
            .filter(|v| !v.is_null());
        if let Some(value) = value {
            values.insert(name.to_string(), value.clone());
        }
    }
    values
}

/// The part of `payload` a form accepts, minus `skip`.
pub fn form_input(schema: &[Value], payload: &Record, skip: &[&str]) -> Record {
    let mut input = Record::new();
    for field in schema {
        let Some(name) = field.get("name").and_then(Value::as_str) else {
            continue;
        };
        if skip.contains(&name) {
            continue;
        }
        if let Some(value) = payload.get(name) {
            input.insert(name.to_string(), value.clone());
        }
    }
    let dropped: Vec<&str> = payload
        .keys()
        .map(String::as_str)
        .filter(|key| !skip.contains(key) && !input.contains_key(*key))
        .collect();
    if !dropped.is_empty() {
        debug!(fields = ?dropped, "fields not in form");
    }
    input
}

/// Config entries of one integration domain.
pub struct ConfigEntrySource {
    client: HaClient,
    domain: String,
    /// Entries carry a subtype picked from the config-flow menu.
    subtyped: bool,
    options: HashMap<String, Record>,
    titles: HashMap<String, String>,
    /// `(config entry id, entity id)` pairs from the entity registry.
    registry: Option<Vec<(String, String)>>,
}

impl ConfigEntrySource {
    pub fn new(client: HaClient, domain: impl Into<String>) -> Self {
        Self {
            client,
            domain: domain.into(),
            subtyped: false,
            options: HashMap::new(),
            titles: HashMap::new(),
            registry: None,
        }
    }

    /// Source for template or group helpers, whose entries have a subtype.
    pub fn subtyped(client: HaClient, domain: impl Into<String>) -> Self {
        Self {
            subtyped: true,
            ..Self::new(client, domain)
        }
    }

    fn post_step(&self, path: &str, body: &Value) -> Result<FlowStep> {
        FlowStep::parse(&self.client.post(path, body)?)
    }

    fn abort(&self, base: &str, flow_id: &str) {
        if let Err(e) = self.client.delete(&format!("{base}/{flow_id}")) {
            debug!(flow_id, error = %e, "could not abort flow");
        }
    }

    /// Step id and current values of the options form of `entry_id`.
    fn read_options(&self, entry_id: &str) -> Result<(String, Record)> {
        let step = self.post_step(OPTIONS_FLOW, &json!({"handler": entry_id, "show_advanced_options": true}))?;
        match step {
            FlowStep::Form {
                flow_id,
                step_id,
                schema,
                ..
            } => {
                self.abort(OPTIONS_FLOW, &flow_id);
                Ok((step_id, form_values(&schema)))
            }
            FlowStep::Menu { flow_id, .. } => {
                self.abort(OPTIONS_FLOW, &flow_id);
                Err(ClientError::flow(entry_id, "options flow starts with a menu"))
            }
            FlowStep::Abort { reason } => Err(ClientError::flow(entry_id, format!("options flow aborted: {reason}"))),
            FlowStep::Created { .. } => Err(ClientError::flow(entry_id, "options flow has no form")),
        }
    }

    /// Drive a flow from its first step, answering menus with `choice` and
    /// forms with `payload`.
    fn run_flow(
        &self,
        base: &str,
        first: FlowStep,
        choice: Option<&str>,
        payload: &Record,
        skip: &[&str],
    ) -> Result<Option<String>> {
        let handler = self.domain.as_str();
        let mut step = first;
        let mut submitted = false;
        for _ in 0..MAX_STEPS {
            step = match step {
                FlowStep::Created { entry_id } => return Ok(entry_id),
                FlowStep::Abort { reason } => {
                    return Err(ClientError::flow(handler, format!("aborted: {reason}")));
                }
                FlowStep::Menu { flow_id, options } => {
                    let Some(next) = choice.filter(|c| options.iter().any(|o| o == c)) else {
                        self.abort(base, &flow_id);
                        return Err(ClientError::flow(
                            handler,
                            format!("menu offers [{}], none matches {}", options.join(", "), choice.unwrap_or("<none>")),
                        ));
                    };
                    self.post_step(&format!("{base}/{flow_id}"), &json!({"next_step_id": next}))?
                }
                FlowStep::Form {
                    flow_id,
                    step_id,
                    schema,
                    errors,
                } => {
                    if submitted && !errors.is_empty() {
                        self.abort(base, &flow_id);
                        return Err(ClientError::flow(
                            handler,
                            format!("{step_id} rejected input: {}", Value::Object(errors)),
                        ));
                    }
                    submitted = true;
                    let input = form_input(&schema, payload, skip);
                    self.post_step(&format!("{base}/{flow_id}"), &Value::Object(input))?
                }
            };
        }
        Err(ClientError::flow(handler, format!("no result after {MAX_STEPS} steps")))
    }

    fn registry(&mut self) -> Result<&[(String, String)]> {
        if self.registry.is_none() {
            let entries = self.client.ws("config/entity_registry/list", Value::Null)?;
            let pairs = as_array(&entries, "config/entity_registry/list")?
                .iter()
                .filter_map(|entry| {
                    let config_entry = entry.get("config_entry_id")?.as_str()?;
                    let entity_id = entry.get("entity_id")?.as_str()?;
                    Some((config_entry.to_string(), entity_id.to_string()))
                })
                .collect();
            self.registry = Some(pairs);
        }
        Ok(self.registry.as_deref().unwrap_or_default())
    }

    fn entity_for(&mut self, entry_id: &str) -> Result<Option<String>> {
        Ok(self
            .registry()?
            .iter()
            .find_map(|(entry, entity)| (entry == entry_id).then(|| entity.clone())))
    }
}

impl ContainerSource for ConfigEntrySource {
    fn list_containers(&mut self) -> hasync_core::Result<Vec<Container>> {
        self.options.clear();
        self.titles.clear();
        self.registry = None;

        let entries = self
            .client
            .ws("config_entries/get", json!({"domain": self.domain}))
            .map_err(|e| e.during(format!("list {} entries", self.domain)))?;
        let mut containers = Vec::new();
        for entry in as_array(&entries, "config_entries/get")? {
            let Some(entry_id) = entry.get("entry_id").and_then(Value::as_str) else {
                continue;
            };
            let title = entry.get("title").and_then(Value::as_str).unwrap_or_default().to_string();
            let (step_id, options) = match self.read_options(entry_id) {
                Ok(read) => read,
                Err(e) => {
                    warn!(domain = %self.domain, entry_id, error = %e, "skipping entry without readable options");
                    continue;
                }
            };
            self.options.insert(entry_id.to_string(), options);
            self.titles.insert(entry_id.to_string(), title.clone());
            containers.push(Container {
                id: entry_id.to_string(),
                title,
                group: self.subtyped.then_some(step_id),
            });
        }
        debug!(domain = %self.domain, count = containers.len(), "listed config entries");
        Ok(containers)
    }

    fn container_options(&mut self, container: &Container) -> hasync_core::Result<Record> {
        if let Some(options) = self.options.get(&container.id) {
            return Ok(options.clone());
        }
        let (_, options) = self
            .read_options(&container.id)
            .map_err(|e| e.during("read options"))?;
        Ok(options)
    }

    fn external_name(&mut self, container: &Container) -> hasync_core::Result<Option<String>> {
        self.entity_for(&container.id)
            .map_err(|e| e.during("read entity registry"))
    }

    fn create(&mut self, group: Option<&str>, payload: &Record) -> hasync_core::Result<String> {
        let operation = format!("create {} entry", self.domain);
        let first = self
            .post_step(CONFIG_FLOW, &json!({"handler": self.domain, "show_advanced_options": true}))
            .map_err(|e| e.during(&operation))?;
        let entry_id = self
            .run_flow(CONFIG_FLOW, first, group, payload, &[])
            .map_err(|e| e.during(&operation))?
            .ok_or_else(|| hasync_core::Error::remote(&operation, "flow finished without an entry id"))?;
        self.registry = None;
        info!(domain = %self.domain, entry_id = %entry_id, "created config entry");
        Ok(entry_id)
    }

    fn update(&mut self, id: &str, payload: &Record) -> hasync_core::Result<()> {
        let operation = format!("update {} entry", self.domain);
        let first = self
            .post_step(OPTIONS_FLOW, &json!({"handler": id, "show_advanced_options": true}))
            .map_err(|e| e.during(&operation))?;
        self.run_flow(OPTIONS_FLOW, first, None, payload, &["name"])
            .map_err(|e| e.during(&operation))?;

        if let Some(name) = payload.get("name").and_then(Value::as_str)
            && self.titles.get(id).is_none_or(|title| title != name)
        {
            self.client
                .ws("config_entries/update", json!({"entry_id": id, "title": name}))
                .map_err(|e| e.during(format!("rename {} entry", self.domain)))?;
            self.titles.insert(id.to_string(), name.to_string());
        }
        self.registry = None;
        info!(domain = %self.domain, entry_id = id, "updated config entry");
        Ok(())
    }

    fn delete(&mut self, id: &str) -> hasync_core::Result<()> {
        self.client
            .delete(&format!("api/config/config_entries/entry/{id}"))
            .map_err(|e| e.during(format!("delete {} entry", self.domain)))?;
        info!(domain = %self.domain, entry_id = id, "deleted config entry");
        Ok(())
    }

    fn assign_external_name(&mut self, id: &str, desired: &str) -> hasync_core::Result<Option<String>> {
        let during = |e: ClientError| e.during("rename entity");
        let Some(current) = self.entity_for(id).map_err(during)? else {
            debug!(entry_id = id, "entry has no entities yet");
            return Ok(None);
        };
        if current == desired {
            return Ok(None);
        }
        self.client
            .ws(
                "config/entity_registry/update",
                json!({"entity_id": current, "new_entity_id": desired}),
            )
            .map_err(during)?;
        self.registry = None;
        info!(from = %current, to = desired, "renamed entity");
        Ok(Some(current))
    }
}
