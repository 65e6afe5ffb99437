//! Configuration Management
//!
//! Named store files, resolved with a fixed precedence:
//! 1. Explicit path supplied by the caller (highest priority, never touches
//!    the registries)
//! 2. Local registry: `.tabula/config.json` (team-shareable, per-project)
//! 3. Global registry: `<config_dir>/tabula/stores.json` (per-user)
//!
//! A missing registry file is treated as an empty registry.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, TabulaError};
use crate::store::StoreConfig;

/// Where to save a store entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLocation {
    /// `.tabula/config.json` in the project directory
    Local,
    /// `<config_dir>/tabula/stores.json`
    Global,
}

/// One saved store entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredStore {
    /// Database file path
    pub file: PathBuf,
}

/// Registry of named stores with an optional default pointer
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StoreRegistry {
    /// Named stores
    #[serde(default)]
    pub stores: HashMap<String, StoredStore>,

    /// Name of the default store (must exist in `stores`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

impl StoreRegistry {
    fn get(&self, name: &str) -> Option<StoreConfig> {
        self.stores.get(name).map(|s| StoreConfig::new(&s.file))
    }

    fn default_store(&self) -> Option<StoreConfig> {
        self.default.as_deref().and_then(|name| self.get(name))
    }
}

const LOCAL_CONFIG_DIR: &str = ".tabula";
const LOCAL_CONFIG_FILE: &str = "config.json";

fn local_config_path(project: &Path) -> PathBuf {
    project.join(LOCAL_CONFIG_DIR).join(LOCAL_CONFIG_FILE)
}

fn global_config_path() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join("tabula").join("stores.json"))
        .ok_or_else(|| TabulaError::config_error("could not determine user config directory"))
}

fn project_dir(project: Option<&Path>) -> Result<PathBuf> {
    match project {
        Some(path) => Ok(path.to_path_buf()),
        None => std::env::current_dir()
            .map_err(|e| TabulaError::config_error(format!("cannot resolve working directory: {e}"))),
    }
}

fn load_registry(path: &Path) -> Result<StoreRegistry> {
    if !path.exists() {
        return Ok(StoreRegistry::default());
    }
    let contents = fs::read_to_string(path)
        .map_err(|e| TabulaError::config_error(format!("cannot read {}: {e}", path.display())))?;
    serde_json::from_str(&contents)
        .map_err(|e| TabulaError::config_error(format!("invalid config {}: {e}", path.display())))
}

fn save_registry(path: &Path, registry: &StoreRegistry) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            TabulaError::config_error(format!("cannot create {}: {e}", parent.display()))
        })?;
    }
    let contents = serde_json::to_string_pretty(registry)
        .map_err(|e| TabulaError::config_error(format!("cannot serialize registry: {e}")))?;
    fs::write(path, contents)
        .map_err(|e| TabulaError::config_error(format!("cannot write {}: {e}", path.display())))
}

/// Save a store under a name; the first saved store becomes the default
pub fn save_store(
    project: Option<&Path>,
    name: &str,
    file: &Path,
    location: ConfigLocation,
) -> Result<()> {
    let path = match location {
        ConfigLocation::Local => local_config_path(&project_dir(project)?),
        ConfigLocation::Global => global_config_path()?,
    };

    let mut registry = load_registry(&path)?;
    registry.stores.insert(name.to_string(), StoredStore { file: file.to_path_buf() });
    if registry.default.is_none() {
        registry.default = Some(name.to_string());
    }
    save_registry(&path, &registry)
}

/// Resolve a store by name, or the default store when no name is given
///
/// Local registry entries shadow global ones.
pub fn resolve_store(project: Option<&Path>, name: Option<&str>) -> Result<StoreConfig> {
    let local = load_registry(&local_config_path(&project_dir(project)?))?;

    match name {
        Some(name) => {
            if let Some(store) = local.get(name) {
                return Ok(store);
            }
            let global = load_registry(&global_config_path()?)?;
            global
                .get(name)
                .ok_or_else(|| TabulaError::config_error(format!("no saved store named \"{name}\"")))
        }
        None => {
            if let Some(store) = local.default_store() {
                return Ok(store);
            }
            let global = load_registry(&global_config_path()?)?;
            global.default_store().ok_or_else(|| {
                TabulaError::config_error(
                    "no default store configured; pass --db or save a store first",
                )
            })
        }
    }
}

/// List saved stores as (name, entry, scope) tuples, local entries first
pub fn list_stores(project: Option<&Path>) -> Result<Vec<(String, StoredStore, &'static str)>> {
    let local = load_registry(&local_config_path(&project_dir(project)?))?;
    let global = load_registry(&global_config_path()?)?;

    let mut entries: Vec<(String, StoredStore, &'static str)> = Vec::new();
    let mut names: Vec<&String> = local.stores.keys().collect();
    names.sort();
    for name in names {
        entries.push((name.clone(), local.stores[name].clone(), "local"));
    }
    let mut names: Vec<&String> = global.stores.keys().collect();
    names.sort();
    for name in names {
        if !local.stores.contains_key(name) {
            entries.push((name.clone(), global.stores[name].clone(), "global"));
        }
    }
    Ok(entries)
}
