//! JSON-backed grant map

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Permissions seeded on first use
pub const DEFAULT_PERMISSIONS: &[(&str, bool)] = &[
    ("system_admin", false),
    ("file_access", true),
    ("process_management", false),
    ("network_access", true),
    ("system_control", false),
    ("security_operations", false),
    ("automation_operations", false),
    ("monitoring_operations", true),
    ("low_level_os", false),
    ("code_execution", false),
];

/// `permission_name -> granted` map, optionally mirrored to a file
#[derive(Debug, Clone)]
pub struct PermissionStore {
    path: Option<PathBuf>,
    grants: BTreeMap<String, bool>,
}

impl PermissionStore {
    /// Load from `path`, seeding defaults when the file is missing or unreadable
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut store = Self {
            path: Some(path.clone()),
            grants: default_grants(),
        };

        if !path.exists() {
            tracing::info!("[Permissions] No store at {}, seeding defaults", path.display());
            if let Err(e) = store.save() {
                tracing::error!("[Permissions] Failed to save permissions: {:#}", e);
            }
            return store;
        }

        match read_grants(&path) {
            Ok(grants) => store.grants.extend(grants),
            Err(e) => {
                tracing::warn!("[Permissions] Failed to load permissions, using defaults: {:#}", e);
            }
        }
        store
    }

    /// A store that never touches disk
    pub fn in_memory() -> Self {
        Self {
            path: None,
            grants: default_grants(),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Grant state; unknown names are not granted
    pub fn get(&self, name: &str) -> bool {
        self.grants.get(name).copied().unwrap_or(false)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.grants.contains_key(name)
    }

    pub fn set(&mut self, name: &str, granted: bool) {
        self.grants.insert(name.to_string(), granted);
    }

    /// Replace every grant with the default seed
    pub fn reset(&mut self) {
        self.grants = default_grants();
    }

    pub fn snapshot(&self) -> BTreeMap<String, bool> {
        self.grants.clone()
    }

    /// Rewrite the whole file, pretty-printed
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let json = serde_json::to_string_pretty(&self.grants)?;
        fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }
}

fn default_grants() -> BTreeMap<String, bool> {
    DEFAULT_PERMISSIONS
        .iter()
        .map(|(name, granted)| (name.to_string(), *granted))
        .collect()
}

fn read_grants(path: &Path) -> Result<BTreeMap<String, bool>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let grants = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(grants)
}
