//! Tool registry for managing available handlers
//!
//! The registry maps a handler's metadata name to the handler instance.
//! Entries are created at startup and live for the process lifetime; share
//! the registry behind an `Arc` once populated.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::tool::{Handler, Tool, ToolHandler, ToolMetadata};
use crate::core::RegistryError;

/// Registry that holds all available handlers
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Handler>>,
}

impl ToolRegistry {
    /// Create a new empty tool registry
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    /// Register a typed tool
    ///
    /// Returns the handler previously registered under the same name, if any.
    pub fn register<T: Tool + 'static>(&mut self, tool: T) -> Option<Arc<dyn Handler>> {
        self.register_handler(Arc::new(ToolHandler(tool)))
    }

    /// Register an already type-erased handler
    ///
    /// Last registration wins; shadowing is logged.
    pub fn register_handler(&mut self, handler: Arc<dyn Handler>) -> Option<Arc<dyn Handler>> {
        let name = handler.metadata().name.clone();
        tracing::info!("[ToolRegistry] Registering tool: {}", name);

        let previous = self.tools.insert(name.clone(), handler);
        if previous.is_some() {
            tracing::warn!("[ToolRegistry] Tool '{}' was already registered and is now shadowed", name);
        }
        previous
    }

    /// Register a typed tool, rejecting duplicate names
    pub fn try_register<T: Tool + 'static>(&mut self, tool: T) -> Result<(), RegistryError> {
        let name = tool.metadata().name.clone();
        if self.tools.contains_key(&name) {
            return Err(RegistryError::DuplicateTool(name));
        }
        self.register(tool);
        Ok(())
    }

    /// Get a handler by its exact name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Handler>> {
        self.tools.get(name).cloned()
    }

    /// Get a handler by a loosely written name
    ///
    /// Tries the exact name, then lower-cased, then with spaces and dashes
    /// turned into underscores, then with a `_tool` suffix, then ignoring
    /// separators entirely.
    pub fn resolve(&self, name: &str) -> Option<Arc<dyn Handler>> {
        if let Some(handler) = self.get(name) {
            return Some(handler);
        }

        let lowered = name.trim().to_lowercase();
        if let Some(handler) = self.get(&lowered) {
            return Some(handler);
        }

        let normalized = normalize(&lowered);
        if normalized.is_empty() {
            return None;
        }
        if let Some(handler) = self.get(&normalized) {
            return Some(handler);
        }

        if !normalized.ends_with("_tool") {
            if let Some(handler) = self.get(&format!("{}_tool", normalized)) {
                return Some(handler);
            }
        }

        let squashed = squash(&normalized);
        let found = self
            .tools
            .iter()
            .find(|(registered, _)| {
                let candidate = squash(registered);
                candidate == squashed || candidate == format!("{}tool", squashed)
            })
            .map(|(_, handler)| handler.clone());

        if let Some(handler) = &found {
            tracing::debug!(
                "[ToolRegistry] Resolved '{}' to '{}'",
                name,
                handler.metadata().name
            );
        }
        found
    }

    /// Check whether a name resolves to a handler
    pub fn contains(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }

    /// Registered names, sorted
    pub fn tool_names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    /// Metadata of a registered handler
    pub fn metadata(&self, name: &str) -> Option<ToolMetadata> {
        self.resolve(name).map(|h| h.metadata().clone())
    }

    /// Permissions a handler declares
    pub fn required_permissions(&self, name: &str) -> Option<Vec<String>> {
        self.resolve(name).map(|h| h.metadata().permissions.clone())
    }

    /// One line per handler with its actions, for prompts and help output
    pub fn describe(&self) -> String {
        self.tools
            .values()
            .map(|handler| {
                let metadata = handler.metadata();
                format!(
                    "- {}: {} (actions: {})",
                    metadata.name,
                    metadata.description,
                    handler.actions().join(", ")
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Get the number of registered handlers
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

fn normalize(name: &str) -> String {
    name.split(|c: char| c.is_whitespace() || c == '-' || c == '_')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

fn squash(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
        .collect::<String>()
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ToolError;
    use crate::tools::tool::{Params, ToolAction, ToolCategory, ToolOutput};
    use async_trait::async_trait;

    #[derive(Debug, Clone, Copy)]
    enum PingAction {
        Ping,
    }

    impl ToolAction for PingAction {
        const ALL: &'static [Self] = &[PingAction::Ping];
        const DEFAULT: Self = PingAction::Ping;

        fn as_str(&self) -> &'static str {
            "ping"
        }
    }

    struct PingTool {
        metadata: ToolMetadata,
    }

    impl PingTool {
        fn named(name: &str, description: &str) -> Self {
            Self {
                metadata: ToolMetadata::new(name, description, ToolCategory::Network)
                    .with_permissions(["network_access"]),
            }
        }
    }

    #[async_trait]
    impl Tool for PingTool {
        type Action = PingAction;

        fn metadata(&self) -> &ToolMetadata {
            &self.metadata
        }

        async fn run(&self, _action: PingAction, _params: &Params) -> Result<ToolOutput, ToolError> {
            Ok(ToolOutput::new(self.metadata.description.clone()))
        }
    }

    #[test]
    fn test_register_and_get() {
        let mut registry = ToolRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.register(PingTool::named("ping_tool", "Ping")).is_none());

        assert_eq!(registry.len(), 1);
        assert!(registry.get("ping_tool").is_some());
        assert!(registry.get("PING_TOOL").is_none());
        assert_eq!(
            registry.required_permissions("ping_tool"),
            Some(vec!["network_access".to_string()])
        );
    }

    #[test]
    fn test_register_shadows() {
        let mut registry = ToolRegistry::new();
        registry.register(PingTool::named("ping_tool", "first"));
        let previous = registry.register(PingTool::named("ping_tool", "second"));

        assert_eq!(previous.map(|h| h.metadata().description.clone()), Some("first".into()));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.metadata("ping_tool").map(|m| m.description), Some("second".into()));
    }

    #[test]
    fn test_try_register_rejects_duplicate() {
        let mut registry = ToolRegistry::new();
        registry.try_register(PingTool::named("ping_tool", "first")).unwrap();
        let err = registry
            .try_register(PingTool::named("ping_tool", "second"))
            .unwrap_err();
        assert_eq!(err, RegistryError::DuplicateTool("ping_tool".into()));
        assert_eq!(registry.metadata("ping_tool").map(|m| m.description), Some("first".into()));
    }

    #[test]
    fn test_resolve_ladder() {
        let mut registry = ToolRegistry::new();
        registry.register(PingTool::named("ping_tool", "Ping"));
        registry.register(PingTool::named("system_info_tool", "Info"));

        for name in ["ping_tool", "Ping_Tool", "ping tool", "ping-tool", "ping", "PING", "pingtool"] {
            assert_eq!(
                registry.resolve(name).map(|h| h.metadata().name.clone()),
                Some("ping_tool".to_string()),
                "{} should resolve",
                name
            );
        }

        assert_eq!(
            registry.resolve("system info").map(|h| h.metadata().name.clone()),
            Some("system_info_tool".to_string())
        );
        assert!(registry.resolve("firewall").is_none());
        assert!(registry.resolve("   ").is_none());
    }

    #[test]
    fn test_names_sorted_and_describe() {
        let mut registry = ToolRegistry::new();
        registry.register(PingTool::named("zeta_tool", "Z"));
        registry.register(PingTool::named("alpha_tool", "A"));

        assert_eq!(registry.tool_names(), vec!["alpha_tool", "zeta_tool"]);
        let description = registry.describe();
        assert!(description.starts_with("- alpha_tool: A (actions: ping)"));
        assert!(description.contains("- zeta_tool: Z"));
    }
}
