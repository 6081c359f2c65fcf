//! The closed set of entity kinds and how paths select them

use std::fmt;

use hasync_fs::NormalizedPath;
use hasync_meta::catalog;

use super::{DashboardKind, EntityKind, FileKind, Keying, KindSpec, Layout, Schemas};
use crate::config::SyncConfig;
use crate::remote::RemoteStore;
use crate::{Error, Result};

/// Storage-collection helper types kept under `helpers/<type>/`.
pub const STORAGE_HELPER_TYPES: &[&str] = &[
    "input_boolean",
    "input_number",
    "input_select",
    "input_text",
    "input_datetime",
    "input_button",
    "timer",
    "schedule",
    "counter",
];

/// Config-entry helper domains managed without extra configuration.
pub const CONFIG_ENTRY_DOMAINS: &[&str] = &[
    "integration",
    "utility_meter",
    "threshold",
    "tod",
    "derivative",
    "min_max",
    "filter",
    "switch_as_x",
    "generic_thermostat",
    "generic_hygrostat",
    "bayesian",
    "trend",
    "random",
    "statistics",
];

const AUTOMATION_REQUIRED: &[&str] = &["id", "trigger|triggers", "action|actions"];
const AUTOMATION_RECOMMENDED: &[&str] = &["alias"];
const SCRIPT_REQUIRED: &[&str] = &["sequence"];
const SCENE_REQUIRED: &[&str] = &["id", "name"];
const NAME_REQUIRED: &[&str] = &["name"];
const NONE: &[&str] = &[];

const TEMPLATE_DIR: &str = "template";
const GROUP_DIR: &str = "group";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KindId {
    Automations,
    Scripts,
    Scenes,
    /// Storage-collection helpers, nested by type.
    InputHelpers,
    Templates,
    Groups,
    /// Config-entry helpers of one domain.
    Helper(String),
    Dashboards,
}

impl fmt::Display for KindId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Automations => f.write_str("automations"),
            Self::Scripts => f.write_str("scripts"),
            Self::Scenes => f.write_str("scenes"),
            Self::InputHelpers => f.write_str("helpers"),
            Self::Templates => write!(f, "helpers/{TEMPLATE_DIR}"),
            Self::Groups => write!(f, "helpers/{GROUP_DIR}"),
            Self::Helper(domain) => write!(f, "helpers/{domain}"),
            Self::Dashboards => f.write_str("dashboards"),
        }
    }
}

impl KindId {
    /// Every kind, with config-entry helpers for `domains`.
    pub fn all(domains: &[String]) -> Vec<KindId> {
        let mut kinds = vec![Self::Automations, Self::Scripts, Self::Scenes];
        kinds.extend(Self::helpers(domains));
        kinds.push(Self::Dashboards);
        kinds
    }

    /// Every helper kind, with config-entry helpers for `domains`.
    pub fn helpers(domains: &[String]) -> Vec<KindId> {
        let mut kinds = vec![Self::InputHelpers, Self::Templates, Self::Groups];
        kinds.extend(domains.iter().cloned().map(Self::Helper));
        kinds
    }

    pub fn root(&self, config: &SyncConfig) -> NormalizedPath {
        match self {
            Self::Automations => config.automations_dir(),
            Self::Scripts => config.scripts_dir(),
            Self::Scenes => config.scenes_dir(),
            Self::InputHelpers => config.helpers_dir(),
            Self::Templates => config.helpers_dir().join(TEMPLATE_DIR),
            Self::Groups => config.helpers_dir().join(GROUP_DIR),
            Self::Helper(domain) => config.helpers_dir().join(domain),
            Self::Dashboards => config.dashboards_dir(),
        }
    }

    /// Dispatch entry for file-per-entity kinds; `None` for dashboards.
    pub fn spec(&self, config: &SyncConfig) -> Option<KindSpec> {
        let entry_id = Keying::Opaque {
            field: "entry_id",
            name_field: "name",
            external_name: Some("id"),
        };
        let (layout, keying, schemas, required, recommended): (_, _, _, &'static [&'static str], &'static [&'static str]) =
            match self {
                Self::Automations => (
                    Layout::Flat,
                    Keying::Declared { field: "id" },
                    Schemas::Single(catalog::automation()),
                    AUTOMATION_REQUIRED,
                    AUTOMATION_RECOMMENDED,
                ),
                Self::Scripts => (
                    Layout::Flat,
                    Keying::Declared { field: "id" },
                    Schemas::Single(catalog::script()),
                    SCRIPT_REQUIRED,
                    NONE,
                ),
                Self::Scenes => (
                    Layout::Flat,
                    Keying::Declared { field: "id" },
                    Schemas::Single(catalog::scene()),
                    SCENE_REQUIRED,
                    NONE,
                ),
                Self::InputHelpers => (
                    Layout::Nested {
                        groups: Some(STORAGE_HELPER_TYPES),
                    },
                    Keying::Declared { field: "id" },
                    Schemas::PerGroup(catalog::input_helper),
                    NAME_REQUIRED,
                    NONE,
                ),
                Self::Templates => (
                    Layout::Nested { groups: None },
                    entry_id,
                    Schemas::PerGroup(catalog::template),
                    NAME_REQUIRED,
                    NONE,
                ),
                Self::Groups => (
                    Layout::Nested { groups: None },
                    entry_id,
                    Schemas::PerGroup(catalog::group),
                    NAME_REQUIRED,
                    NONE,
                ),
                Self::Helper(domain) => (
                    Layout::Flat,
                    Keying::Opaque {
                        field: "entry_id",
                        name_field: "name",
                        external_name: None,
                    },
                    catalog::config_entry(domain).map_or(Schemas::None, Schemas::Single),
                    NAME_REQUIRED,
                    NONE,
                ),
                Self::Dashboards => return None,
            };
        Some(KindSpec {
            name: self.to_string(),
            root: self.root(config),
            layout,
            keying,
            schemas,
            required,
            recommended,
        })
    }
}

/// Config-entry helper domains `path` may name.
pub fn known_helper_domains(config: &SyncConfig) -> Vec<String> {
    let mut domains: Vec<String> = CONFIG_ENTRY_DOMAINS.iter().map(|d| d.to_string()).collect();
    for extra in &config.extra_domains {
        if !domains.contains(extra) {
            domains.push(extra.clone());
        }
    }
    domains
}

/// Build the adapter for `id`, talking to `remote`.
pub fn build_kind(id: &KindId, config: &SyncConfig, remote: Box<dyn RemoteStore>) -> Box<dyn EntityKind> {
    match id.spec(config) {
        Some(spec) => Box::new(FileKind::new(spec, remote)),
        None => Box::new(DashboardKind::new(id.root(config), remote)),
    }
}

/// One kind selected by a path, optionally narrowed to a sub-path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub kind: KindId,
    pub filter: Option<NormalizedPath>,
}

impl Selection {
    fn whole(kind: KindId) -> Self {
        Self { kind, filter: None }
    }
}

/// Map a command-line path to the kinds it covers.
///
/// `path` may be absolute or relative to the workspace root. `domains` are
/// the config-entry helper domains covered by selections of every helper.
pub fn resolve_path(config: &SyncConfig, path: Option<&str>, domains: &[String]) -> Result<Vec<Selection>> {
    let Some(raw) = path.map(str::trim).filter(|p| !p.is_empty() && *p != ".") else {
        return Ok(KindId::all(domains).into_iter().map(Selection::whole).collect());
    };

    let given = NormalizedPath::new(raw);
    let target = if given.starts_with(&config.root) && given.to_native().is_absolute() {
        given
    } else {
        config.root.join(raw.trim_start_matches("./"))
    };
    let unknown = || Error::UnknownPath {
        path: raw.to_string(),
    };

    let narrowed = |kind: KindId, root: NormalizedPath| {
        let filter = (target != root).then(|| target.clone());
        Selection { kind, filter }
    };

    for kind in [KindId::Automations, KindId::Scripts, KindId::Scenes, KindId::Dashboards] {
        let root = kind.root(config);
        if target.starts_with(&root) {
            return Ok(vec![narrowed(kind, root)]);
        }
    }

    let helpers = config.helpers_dir();
    if target == helpers {
        return Ok(KindId::helpers(domains).into_iter().map(Selection::whole).collect());
    }
    let Some(rest) = target.relative_to(&helpers) else {
        return Err(unknown());
    };
    let first = rest.split('/').next().unwrap_or_default();
    let kind = match first {
        TEMPLATE_DIR => KindId::Templates,
        GROUP_DIR => KindId::Groups,
        ty if STORAGE_HELPER_TYPES.contains(&ty) => {
            return Ok(vec![Selection {
                kind: KindId::InputHelpers,
                filter: Some(target.clone()),
            }]);
        }
        domain if known_helper_domains(config).iter().any(|d| d == domain) => {
            KindId::Helper(domain.to_string())
        }
        _ => return Err(unknown()),
    };
    let root = kind.root(config);
    Ok(vec![narrowed(kind, root)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn config() -> SyncConfig {
        SyncConfig::new("/ws")
    }

    fn domains() -> Vec<String> {
        vec!["utility_meter".to_string()]
    }

    #[test]
    fn test_no_path_selects_everything() {
        let kinds: Vec<_> = resolve_path(&config(), None, &domains())
            .unwrap()
            .into_iter()
            .map(|s| s.kind.to_string())
            .collect();
        assert_eq!(
            kinds,
            vec![
                "automations",
                "scripts",
                "scenes",
                "helpers",
                "helpers/template",
                "helpers/group",
                "helpers/utility_meter",
                "dashboards"
            ]
        );
    }

    #[rstest]
    #[case("automations", KindId::Automations, None)]
    #[case("automations/morning.yaml", KindId::Automations, Some("/ws/automations/morning.yaml"))]
    #[case("/ws/scenes", KindId::Scenes, None)]
    #[case("helpers/input_boolean", KindId::InputHelpers, Some("/ws/helpers/input_boolean"))]
    #[case("helpers/template", KindId::Templates, None)]
    #[case("helpers/group/light", KindId::Groups, Some("/ws/helpers/group/light"))]
    #[case("helpers/threshold", KindId::Helper("threshold".into()), None)]
    #[case("dashboards/energy", KindId::Dashboards, Some("/ws/dashboards/energy"))]
    fn test_single_selection(#[case] path: &str, #[case] kind: KindId, #[case] filter: Option<&str>) {
        let selections = resolve_path(&config(), Some(path), &domains()).unwrap();
        assert_eq!(
            selections,
            vec![Selection {
                kind,
                filter: filter.map(NormalizedPath::new),
            }]
        );
    }

    #[test]
    fn test_helpers_selects_all_helper_kinds() {
        let selections = resolve_path(&config(), Some("helpers"), &domains()).unwrap();
        assert_eq!(selections.len(), 4);
        assert!(selections.iter().all(|s| s.filter.is_none()));
    }

    #[rstest]
    #[case("blueprints")]
    #[case("helpers/not_a_domain")]
    fn test_unknown_path(#[case] path: &str) {
        let err = resolve_path(&config(), Some(path), &domains()).unwrap_err();
        assert!(matches!(err, Error::UnknownPath { .. }));
    }

    #[test]
    fn test_extra_domain_is_resolvable() {
        let mut config = config();
        config.extra_domains.push("history_stats".into());
        let selections = resolve_path(&config, Some("helpers/history_stats"), &[]).unwrap();
        assert_eq!(selections[0].kind, KindId::Helper("history_stats".into()));
    }

    #[test]
    fn test_dashboards_have_no_file_spec() {
        assert!(KindId::Dashboards.spec(&config()).is_none());
        let spec = KindId::Templates.spec(&config()).unwrap();
        assert_eq!(spec.root, NormalizedPath::new("/ws/helpers/template"));
        assert_eq!(spec.name, "helpers/template");
    }
}
