//! Permission manager implementation
//!
//! Grants are boolean per permission name. Requests follow a tiered policy:
//! - Safe: granted silently
//! - Auto-grant: granted silently, logged
//! - Interactive: granted only on an affirmative answer from the prompt

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use super::prompt::{is_affirmative, ConsentPrompt, ConsolePrompt, DenyPrompt};
use super::store::PermissionStore;
use super::PermissionCheck;
use crate::config::Config;
use crate::tools::ToolMetadata;

/// Risk level of a permission
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionLevel {
    None,
    Read,
    Write,
    Execute,
    Admin,
}

impl PermissionLevel {
    /// Level of a permission name; unknown names are treated as execute
    pub fn of(permission: &str) -> Self {
        match permission {
            "system_info" | "monitoring_operations" | "network_access" => PermissionLevel::Read,
            "file_access" => PermissionLevel::Write,
            "system_admin" | "system_control" | "security_operations" => PermissionLevel::Admin,
            _ => PermissionLevel::Execute,
        }
    }
}

/// How a missing permission is obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantTier {
    /// Granted without asking
    Safe,
    /// Granted without asking, announced in the log
    AutoGrant,
    /// Needs an affirmative answer
    Interactive,
}

impl GrantTier {
    pub fn of(permission: &str) -> Self {
        match permission {
            "file_access" | "monitoring_operations" => GrantTier::Safe,
            "process_management" | "system_info" | "low_level_os" => GrantTier::AutoGrant,
            _ => GrantTier::Interactive,
        }
    }
}

/// A permission as seen by a caller, derived on demand
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRequest {
    pub permission: String,
    pub level: PermissionLevel,
    pub description: String,
    pub required: bool,
    pub granted: bool,
}

/// Human description of a permission name
pub fn describe_permission(permission: &str) -> String {
    let text = match permission {
        "system_admin" => "Administrative control of the system",
        "file_access" => "Read, write and organize files",
        "process_management" => "Inspect and control running processes",
        "network_access" => "Inspect network interfaces and connectivity",
        "system_control" => "Power, volume and other system controls",
        "security_operations" => "Security scans and policy changes",
        "automation_operations" => "Run scheduled and automated workflows",
        "monitoring_operations" => "Monitor system resources",
        "low_level_os" => "Low-level operating system inspection",
        "code_execution" => "Generate and execute code",
        "system_info" => "Read hardware and system information",
        other => return format!("Access to {}", other.replace('_', " ")),
    };
    text.to_string()
}

/// Single source of truth for "is operation X allowed"
///
/// Mutation and the file flush happen under one lock, so concurrent
/// sessions sharing a manager see a consistent store.
pub struct PermissionManager {
    store: Mutex<PermissionStore>,
    prompt: Arc<dyn ConsentPrompt>,
}

impl PermissionManager {
    /// Manager persisting to `path`, prompting on the terminal
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            store: Mutex::new(PermissionStore::load(path)),
            prompt: Arc::new(ConsolePrompt),
        }
    }

    /// Manager for the configured directory and interactivity
    pub fn from_config(config: &Config) -> Self {
        let prompt: Arc<dyn ConsentPrompt> = if config.security.interactive {
            Arc::new(ConsolePrompt)
        } else {
            Arc::new(DenyPrompt)
        };
        Self::new(config.permissions_file()).with_prompt(prompt)
    }

    /// Manager that never touches disk
    pub fn in_memory() -> Self {
        Self {
            store: Mutex::new(PermissionStore::in_memory()),
            prompt: Arc::new(DenyPrompt),
        }
    }

    /// Replace the consent prompt
    pub fn with_prompt(mut self, prompt: Arc<dyn ConsentPrompt>) -> Self {
        self.prompt = prompt;
        self
    }

    fn store(&self) -> MutexGuard<'_, PermissionStore> {
        self.store.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn set_and_flush(&self, permission: &str, granted: bool) {
        let mut store = self.store();
        store.set(permission, granted);
        if let Err(e) = store.save() {
            tracing::error!("[Permissions] Could not save permissions: {:#}", e);
        }
    }

    /// Whether `permission` is granted; unknown names are not
    pub fn has_permission(&self, permission: &str) -> bool {
        self.store().get(permission)
    }

    /// Grant a permission
    ///
    /// Without a confirmation the grant is unconditional. With one, only an
    /// affirmative token (y, yes, grant, allow) grants.
    pub fn grant_permission(&self, permission: &str, confirmation: Option<&str>) -> bool {
        if let Some(answer) = confirmation {
            if !is_affirmative(answer) {
                tracing::info!("[Permissions] '{}' not granted", permission);
                return false;
            }
        }

        self.set_and_flush(permission, true);
        tracing::info!("[Permissions] Granted '{}'", permission);
        true
    }

    /// Revoke a permission; always succeeds
    pub fn revoke_permission(&self, permission: &str) -> bool {
        self.set_and_flush(permission, false);
        tracing::info!("[Permissions] Revoked '{}'", permission);
        true
    }

    /// Obtain a permission through the tiered policy
    ///
    /// Returns immediately when already granted. Interactive-tier
    /// permissions block on the consent prompt.
    pub fn request_permission(&self, permission: &str, description: Option<&str>) -> bool {
        if self.has_permission(permission) {
            return true;
        }

        match GrantTier::of(permission) {
            GrantTier::Safe => self.grant_permission(permission, None),
            GrantTier::AutoGrant => {
                tracing::info!("[Permissions] Auto-granting '{}'", permission);
                self.grant_permission(permission, None)
            }
            GrantTier::Interactive => {
                let description = description
                    .map(str::to_string)
                    .unwrap_or_else(|| describe_permission(permission));
                match self.prompt.ask(permission, &description) {
                    Some(answer) => self.grant_permission(permission, Some(&answer)),
                    None => false,
                }
            }
        }
    }

    /// Set a permission that is already known; unknown names are rejected
    pub fn update_permission(&self, permission: &str, granted: bool) -> bool {
        let mut store = self.store();
        if !store.contains(permission) {
            return false;
        }
        store.set(permission, granted);
        if let Err(e) = store.save() {
            tracing::error!("[Permissions] Could not save permissions: {:#}", e);
        }
        true
    }

    /// Restore the default seed
    pub fn reset_permissions(&self) {
        let mut store = self.store();
        store.reset();
        if let Err(e) = store.save() {
            tracing::error!("[Permissions] Could not save permissions: {:#}", e);
        }
        tracing::info!("[Permissions] Reset to defaults");
    }

    /// Snapshot of every known grant
    pub fn get_permission_status(&self) -> BTreeMap<String, bool> {
        self.store().snapshot()
    }

    /// Every known permission with level and grant state
    pub fn list_permissions(&self) -> Vec<PermissionRequest> {
        self.get_permission_status()
            .into_iter()
            .map(|(permission, granted)| PermissionRequest {
                level: PermissionLevel::of(&permission),
                description: describe_permission(&permission),
                required: false,
                granted,
                permission,
            })
            .collect()
    }

    /// Permissions a handler declares, with their current state
    pub fn get_required_permissions(&self, tool: &ToolMetadata) -> Vec<PermissionRequest> {
        tool.permissions
            .iter()
            .map(|permission| PermissionRequest {
                permission: permission.clone(),
                level: PermissionLevel::of(permission),
                description: describe_permission(permission),
                required: true,
                granted: self.has_permission(permission),
            })
            .collect()
    }

    /// File backing the store, if any
    pub fn store_path(&self) -> Option<PathBuf> {
        self.store().path().map(|p| p.to_path_buf())
    }
}

impl PermissionCheck for PermissionManager {
    /// Request every declared permission; false on the first refusal
    fn check_tool_permissions(&self, tool: &ToolMetadata) -> bool {
        for permission in &tool.permissions {
            let description = format!("using {}", tool.name);
            if !self.request_permission(permission, Some(&description)) {
                tracing::info!(
                    "[Permissions] '{}' refused for {}",
                    permission,
                    tool.name
                );
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolCategory;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct PanicPrompt;

    impl ConsentPrompt for PanicPrompt {
        fn ask(&self, permission: &str, _description: &str) -> Option<String> {
            panic!("unexpected prompt for {}", permission);
        }
    }

    struct ScriptedPrompt {
        answer: &'static str,
        asked: AtomicUsize,
    }

    impl ConsentPrompt for ScriptedPrompt {
        fn ask(&self, _permission: &str, _description: &str) -> Option<String> {
            self.asked.fetch_add(1, Ordering::SeqCst);
            Some(self.answer.to_string())
        }
    }

    fn scripted(answer: &'static str) -> Arc<ScriptedPrompt> {
        Arc::new(ScriptedPrompt {
            answer,
            asked: AtomicUsize::new(0),
        })
    }

    fn manager(dir: &TempDir) -> PermissionManager {
        PermissionManager::new(dir.path().join("permissions.json")).with_prompt(Arc::new(PanicPrompt))
    }

    fn on_disk(dir: &TempDir) -> BTreeMap<String, bool> {
        let content = std::fs::read_to_string(dir.path().join("permissions.json")).unwrap();
        serde_json::from_str(&content).unwrap()
    }

    #[test]
    fn test_defaults() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir);
        assert!(manager.has_permission("file_access"));
        assert!(manager.has_permission("network_access"));
        assert!(!manager.has_permission("system_admin"));
        assert!(!manager.has_permission("unknown"));
    }

    #[test]
    fn test_grant_round_trip() {
        let dir = TempDir::new().unwrap();
        assert!(manager(&dir).grant_permission("system_control", None));

        let fresh = manager(&dir);
        assert!(fresh.has_permission("system_control"));
    }

    #[test]
    fn test_grant_with_confirmation() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir);
        assert!(!manager.grant_permission("system_admin", Some("no")));
        assert!(!manager.has_permission("system_admin"));
        assert!(manager.grant_permission("system_admin", Some("Yes")));
        assert!(manager.has_permission("system_admin"));
    }

    #[test]
    fn test_revoke_idempotent() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir);

        for _ in 0..2 {
            assert!(manager.revoke_permission("file_access"));
            assert!(!manager.has_permission("file_access"));
            assert_eq!(on_disk(&dir).get("file_access"), Some(&false));
        }
    }

    #[test]
    fn test_request_safe_tier_does_not_prompt() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir);
        manager.revoke_permission("file_access");

        assert!(manager.request_permission("file_access", None));
        assert!(manager.has_permission("file_access"));
        assert_eq!(on_disk(&dir).get("file_access"), Some(&true));
    }

    #[test]
    fn test_request_auto_tier_does_not_prompt() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir);
        assert!(manager.request_permission("system_info", None));
        assert!(manager.request_permission("process_management", None));
        assert!(manager.has_permission("system_info"));
    }

    #[test]
    fn test_request_interactive_tier() {
        let dir = TempDir::new().unwrap();
        let refuse = scripted("n");
        let manager = PermissionManager::new(dir.path().join("permissions.json"))
            .with_prompt(refuse.clone());
        assert!(!manager.request_permission("system_admin", None));
        assert_eq!(refuse.asked.load(Ordering::SeqCst), 1);

        let accept = scripted("allow");
        let manager = manager.with_prompt(accept.clone());
        assert!(manager.request_permission("system_admin", None));
        assert!(manager.request_permission("system_admin", None));
        assert_eq!(accept.asked.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_update_known_only() {
        let manager = PermissionManager::in_memory();
        assert!(manager.update_permission("code_execution", true));
        assert!(manager.has_permission("code_execution"));
        assert!(!manager.update_permission("teleport", true));
        assert!(!manager.get_permission_status().contains_key("teleport"));
    }

    #[test]
    fn test_reset() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir);
        manager.grant_permission("system_admin", None);
        manager.revoke_permission("file_access");

        manager.reset_permissions();
        assert!(!manager.has_permission("system_admin"));
        assert!(manager.has_permission("file_access"));
        assert_eq!(on_disk(&dir).get("system_admin"), Some(&false));
    }

    #[test]
    fn test_check_tool_permissions() {
        let manager = PermissionManager::in_memory();
        let file_tool = ToolMetadata::new("file_tool", "Files", ToolCategory::File)
            .with_permissions(["file_access", "system_info"]);
        assert!(manager.check_tool_permissions(&file_tool));
        assert!(manager.has_permission("system_info"));

        let admin_tool = ToolMetadata::new("admin_tool", "Admin", ToolCategory::System)
            .with_permissions(["file_access", "system_admin"]);
        assert!(!manager.check_tool_permissions(&admin_tool));

        let required = manager.get_required_permissions(&admin_tool);
        assert_eq!(required.len(), 2);
        assert!(required[0].granted);
        assert_eq!(required[1].level, PermissionLevel::Admin);
        assert!(!required[1].granted);
    }

    #[test]
    fn test_list_permissions_levels() {
        let manager = PermissionManager::in_memory();
        let listed = manager.list_permissions();
        let file = listed.iter().find(|p| p.permission == "file_access").unwrap();
        assert_eq!(file.level, PermissionLevel::Write);
        assert!(file.granted);
        assert_eq!(PermissionLevel::of("something_new"), PermissionLevel::Execute);
        assert_eq!(GrantTier::of("low_level_os"), GrantTier::AutoGrant);
    }

    #[test]
    fn test_unwritable_store_keeps_memory_grant() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "file").unwrap();

        let manager = PermissionManager::new(blocker.join("permissions.json"));
        assert!(manager.grant_permission("system_control", None));
        assert!(manager.has_permission("system_control"));
    }
}
