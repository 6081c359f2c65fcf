//! [`MemoryRemote`]: a remote entity store held in memory.
//!
//! Handles are cheap clones sharing one state, so a test can box one handle
//! into a kind and keep another for assertions.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use hasync_core::{Error, RemoteStore, Result};
use hasync_meta::{Record, ensure_leading};
use serde_json::Value;

/// How the store assigns keys on create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPolicy {
    /// The caller's key is kept.
    Declared,
    /// The store assigns `mem-N` ids and embeds them under `field`.
    Opaque { field: &'static str },
}

/// One call made against the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    List,
    Create(String),
    Update(String),
    Delete(String),
    Reload,
    AssignName(String, String),
}

#[derive(Debug)]
struct State {
    policy: KeyPolicy,
    external_field: Option<&'static str>,
    entities: Vec<(String, Record)>,
    next_id: usize,
    failing: HashSet<String>,
    fail_list: bool,
    fail_reload: bool,
    empty_keys: bool,
    upsert: bool,
    calls: Vec<Call>,
}

#[derive(Debug, Clone)]
pub struct MemoryRemote {
    state: Rc<RefCell<State>>,
}

impl MemoryRemote {
    pub fn new(policy: KeyPolicy) -> Self {
        Self {
            state: Rc::new(RefCell::new(State {
                policy,
                external_field: None,
                entities: Vec::new(),
                next_id: 1,
                failing: HashSet::new(),
                fail_list: false,
                fail_reload: false,
                empty_keys: false,
                upsert: false,
                calls: Vec::new(),
            })),
        }
    }

    /// Store with caller-chosen keys.
    pub fn declared() -> Self {
        Self::new(KeyPolicy::Declared)
    }

    /// Store that assigns ids under `entry_id`.
    pub fn opaque() -> Self {
        Self::new(KeyPolicy::Opaque { field: "entry_id" })
    }

    /// Accept external name assignments, stored under `field`.
    pub fn with_external_field(self, field: &'static str) -> Self {
        self.state.borrow_mut().external_field = Some(field);
        self
    }

    /// Let `create` overwrite an existing key, as config saves do.
    pub fn upserting(self) -> Self {
        self.state.borrow_mut().upsert = true;
        self
    }

    /// Seed an entity without logging a call.
    pub fn with_entity(self, key: &str, record: Record) -> Self {
        self.insert(key, record);
        self
    }

    pub fn insert(&self, key: &str, record: Record) {
        let mut state = self.state.borrow_mut();
        match state.entities.iter_mut().find(|(k, _)| k == key) {
            Some((_, existing)) => *existing = record,
            None => state.entities.push((key.to_string(), record)),
        }
    }

    /// Make every mutation of `key` fail.
    pub fn fail_on(&self, key: &str) {
        self.state.borrow_mut().failing.insert(key.to_string());
    }

    pub fn fail_list(&self) {
        self.state.borrow_mut().fail_list = true;
    }

    pub fn fail_reload(&self) {
        self.state.borrow_mut().fail_reload = true;
    }

    /// Make `create` report success with an empty key.
    pub fn return_empty_keys(&self) {
        self.state.borrow_mut().empty_keys = true;
    }

    pub fn boxed(&self) -> Box<dyn RemoteStore> {
        Box::new(self.clone())
    }

    pub fn keys(&self) -> Vec<String> {
        self.state.borrow().entities.iter().map(|(k, _)| k.clone()).collect()
    }

    pub fn record(&self, key: &str) -> Option<Record> {
        self.state
            .borrow()
            .entities
            .iter()
            .find_map(|(k, r)| (k == key).then(|| r.clone()))
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.borrow().calls.clone()
    }

    /// Calls other than `List`.
    pub fn mutations(&self) -> Vec<Call> {
        self.calls().into_iter().filter(|c| *c != Call::List).collect()
    }

    pub fn clear_calls(&self) {
        self.state.borrow_mut().calls.clear();
    }
}

fn check(state: &State, operation: &str, key: &str) -> Result<()> {
    if state.failing.contains(key) {
        return Err(Error::remote(operation, format!("{key}: injected failure")));
    }
    Ok(())
}

impl RemoteStore for MemoryRemote {
    fn list(&mut self) -> Result<Vec<(String, Record)>> {
        let mut state = self.state.borrow_mut();
        state.calls.push(Call::List);
        if state.fail_list {
            return Err(Error::remote("list", "injected failure"));
        }
        Ok(state.entities.clone())
    }

    fn create(&mut self, local_key: &str, payload: &Record) -> Result<String> {
        let mut state = self.state.borrow_mut();
        state.calls.push(Call::Create(local_key.to_string()));
        check(&state, "create", local_key)?;
        if state.empty_keys {
            return Ok(String::new());
        }
        let policy = state.policy;
        let (key, record) = match policy {
            KeyPolicy::Declared => (local_key.to_string(), payload.clone()),
            KeyPolicy::Opaque { field } => {
                let id = format!("mem-{}", state.next_id);
                state.next_id += 1;
                let key = match local_key.split_once('/') {
                    Some((group, _)) => format!("{group}/{id}"),
                    None => id.clone(),
                };
                (key, ensure_leading(payload, field, Value::String(id)))
            }
        };
        let upsert = state.upsert;
        match state.entities.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) if upsert => *existing = record,
            Some(_) => return Err(Error::remote("create", format!("{key} already exists"))),
            None => state.entities.push((key.clone(), record)),
        }
        Ok(key)
    }

    fn update(&mut self, key: &str, payload: &Record) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.calls.push(Call::Update(key.to_string()));
        check(&state, "update", key)?;
        let policy = state.policy;
        let external_field = state.external_field;
        let Some((_, existing)) = state.entities.iter_mut().find(|(k, _)| k == key) else {
            return Err(Error::remote("update", format!("{key} not found")));
        };
        let mut record = match policy {
            KeyPolicy::Declared => payload.clone(),
            KeyPolicy::Opaque { field } => {
                let id = existing.get(field).cloned().unwrap_or(Value::Null);
                ensure_leading(payload, field, id)
            }
        };
        if let Some(field) = external_field
            && let Some(name) = existing.get(field)
        {
            record.insert(field.to_string(), name.clone());
        }
        *existing = record;
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.calls.push(Call::Delete(key.to_string()));
        check(&state, "delete", key)?;
        let before = state.entities.len();
        state.entities.retain(|(k, _)| k != key);
        if state.entities.len() == before {
            return Err(Error::remote("delete", format!("{key} not found")));
        }
        Ok(())
    }

    fn reload(&mut self) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.calls.push(Call::Reload);
        if state.fail_reload {
            return Err(Error::remote("reload", "injected failure"));
        }
        Ok(())
    }

    fn assign_external_name(&mut self, key: &str, desired: &str) -> Result<Option<String>> {
        let mut state = self.state.borrow_mut();
        state
            .calls
            .push(Call::AssignName(key.to_string(), desired.to_string()));
        let Some(field) = state.external_field else {
            return Err(Error::remote("assign external name", "not supported"));
        };
        let Some((_, existing)) = state.entities.iter_mut().find(|(k, _)| k == key) else {
            return Err(Error::remote("assign external name", format!("{key} not found")));
        };
        let previous = existing.get(field).and_then(Value::as_str).map(str::to_string);
        existing.insert(field.to_string(), Value::String(desired.to_string()));
        Ok(previous.filter(|p| p != desired))
    }
}
