//! Entity states from `GET /api/states`, and filtering them for search.

use hasync_meta::Record;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use crate::client::{HaClient, as_array};
use crate::{ClientError, Result};

/// One entity's current state.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EntityState {
    pub entity_id: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub last_changed: String,
    #[serde(default)]
    pub attributes: Record,
}

impl EntityState {
    pub fn domain(&self) -> &str {
        self.entity_id.split_once('.').map_or("", |(domain, _)| domain)
    }

    pub fn friendly_name(&self) -> &str {
        self.attributes
            .get("friendly_name")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }
}

impl HaClient {
    pub fn states(&self) -> Result<Vec<EntityState>> {
        let body = self.get("api/states")?;
        as_array(&body, "api/states")?
            .iter()
            .map(|state| {
                serde_json::from_value(state.clone()).map_err(|e| ClientError::protocol(format!("api/states: {e}")))
            })
            .collect()
    }

    /// State of `entity_id`, `None` when the server does not know it.
    pub fn state(&self, entity_id: &str) -> Result<Option<EntityState>> {
        let Some(body) = self.get_optional(&format!("api/states/{entity_id}"))? else {
            return Ok(None);
        };
        serde_json::from_value(body)
            .map(Some)
            .map_err(|e| ClientError::protocol(format!("api/states/{entity_id}: {e}")))
    }

    /// Entity ids the entity registry lists under config entry `entry_id`.
    pub fn entities_for_entry(&self, entry_id: &str) -> Result<Vec<String>> {
        let entries = self.ws("config/entity_registry/list", Value::Null)?;
        Ok(as_array(&entries, "config/entity_registry/list")?
            .iter()
            .filter(|entry| entry.get("config_entry_id").and_then(Value::as_str) == Some(entry_id))
            .filter_map(|entry| entry.get("entity_id").and_then(Value::as_str))
            .map(str::to_string)
            .collect())
    }
}

/// Case-insensitive match on entity id or friendly name.
///
/// A query containing `*` or `?` is a glob over the whole text; anything
/// else matches as a substring.
#[derive(Debug, Clone)]
pub struct StateQuery {
    matcher: Matcher,
    domain: Option<String>,
    state: Option<String>,
}

#[derive(Debug, Clone)]
enum Matcher {
    Substring(String),
    Glob(Regex),
}

impl Matcher {
    fn new(query: &str) -> Result<Self> {
        let query = query.to_lowercase();
        if !query.contains(['*', '?']) {
            return Ok(Self::Substring(query));
        }
        let mut pattern = String::from("^");
        for c in query.chars() {
            match c {
                '*' => pattern.push_str(".*"),
                '?' => pattern.push('.'),
                c => pattern.push_str(&regex::escape(c.encode_utf8(&mut [0; 4]))),
            }
        }
        pattern.push('$');
        Regex::new(&pattern)
            .map(Self::Glob)
            .map_err(|e| ClientError::protocol(format!("bad search pattern '{query}': {e}")))
    }

    fn is_match(&self, text: &str) -> bool {
        let text = text.to_lowercase();
        match self {
            Self::Substring(needle) => text.contains(needle.as_str()),
            Self::Glob(regex) => regex.is_match(&text),
        }
    }
}

impl StateQuery {
    pub fn new(query: &str) -> Result<Self> {
        Ok(Self {
            matcher: Matcher::new(query)?,
            domain: None,
            state: None,
        })
    }

    /// Only entities of `domain` (`light`, `switch`, ...).
    pub fn in_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Only entities whose state is exactly `state`.
    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    pub fn matches(&self, entity: &EntityState) -> bool {
        if let Some(domain) = &self.domain
            && entity.domain() != domain
        {
            return false;
        }
        if let Some(state) = &self.state
            && &entity.state != state
        {
            return false;
        }
        self.matcher.is_match(&entity.entity_id) || self.matcher.is_match(entity.friendly_name())
    }

    /// Matching entities sorted by entity id.
    pub fn filter(&self, states: Vec<EntityState>) -> Vec<EntityState> {
        let mut found: Vec<_> = states.into_iter().filter(|s| self.matches(s)).collect();
        found.sort_by(|a, b| a.entity_id.cmp(&b.entity_id));
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    fn entity(entity_id: &str, state: &str, name: &str) -> EntityState {
        serde_json::from_value(json!({
            "entity_id": entity_id,
            "state": state,
            "attributes": {"friendly_name": name}
        }))
        .unwrap()
    }

    fn house() -> Vec<EntityState> {
        vec![
            entity("switch.kitchen_fan", "off", "Kitchen Fan"),
            entity("light.kitchen", "on", "Kitchen Ceiling"),
            entity("light.porch", "off", "Front Porch"),
            entity("sensor.kitchen_temp", "21.5", "Kitchen Temperature"),
        ]
    }

    fn ids(found: &[EntityState]) -> Vec<&str> {
        found.iter().map(|s| s.entity_id.as_str()).collect()
    }

    #[rstest]
    #[case("kitchen", &["light.kitchen", "sensor.kitchen_temp", "switch.kitchen_fan"])]
    #[case("PORCH", &["light.porch"])]
    #[case("ceiling", &["light.kitchen"])]
    #[case("light.*", &["light.kitchen", "light.porch"])]
    #[case("*fan", &["switch.kitchen_fan"])]
    #[case("light.porc?", &["light.porch"])]
    #[case("kitchen*", &["light.kitchen", "sensor.kitchen_temp", "switch.kitchen_fan"])]
    #[case("garage", &[])]
    fn test_query_matching(#[case] query: &str, #[case] expected: &[&str]) {
        let found = StateQuery::new(query).unwrap().filter(house());
        assert_eq!(ids(&found), expected);
    }

    #[test]
    fn test_domain_and_state_filters() {
        let found = StateQuery::new("kitchen").unwrap().in_domain("light").filter(house());
        assert_eq!(ids(&found), vec!["light.kitchen"]);

        let found = StateQuery::new("*").unwrap().with_state("off").filter(house());
        assert_eq!(ids(&found), vec!["light.porch", "switch.kitchen_fan"]);
    }

    #[test]
    fn test_glob_escapes_regex_syntax() {
        let query = StateQuery::new("sensor.(a)*").unwrap();
        assert!(query.matches(&entity("sensor.(a)_b", "1", "")));
        assert!(!query.matches(&entity("sensor.a_b", "1", "")));
    }

    #[test]
    fn test_missing_fields_default() {
        let state: EntityState = serde_json::from_value(json!({"entity_id": "sun.sun"})).unwrap();
        assert_eq!(state.domain(), "sun");
        assert_eq!(state.friendly_name(), "");
        assert_eq!(state.state, "");
    }
}
