//! Tool Executor
//!
//! Resolves a handler by name and runs it through the permission gate.
//! Every outcome, including a missing handler, is a `ToolResult`.

use std::sync::Arc;
use std::time::Instant;

use serde_json::{json, Value};

use crate::permissions::PermissionCheck;
use crate::tools::{Params, ToolRegistry, ToolResult};

/// Handles permission-checked tool execution
pub struct ToolExecutor {
    registry: Arc<ToolRegistry>,
    permissions: Option<Arc<dyn PermissionCheck>>,
    dry_run: bool,
}

impl ToolExecutor {
    /// Executor without a permission checker
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            permissions: None,
            dry_run: false,
        }
    }

    /// Gate every call through `checker`
    pub fn with_permissions(mut self, checker: Arc<dyn PermissionCheck>) -> Self {
        self.permissions = Some(checker);
        self
    }

    /// Check permissions but never invoke handlers
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Execute `action` on the handler registered as `name`
    ///
    /// Never fails: an unknown name yields a "not found" result, a refused
    /// permission yields a "permission denied" result.
    pub async fn execute_tool(&self, name: &str, action: &str, params: &Params) -> ToolResult {
        let started = Instant::now();

        let Some(handler) = self.registry.resolve(name) else {
            tracing::info!("[Executor] Tool '{}' not found", name);
            return ToolResult::not_found(name).timed(started.elapsed());
        };
        let tool_name = handler.metadata().name.clone();
        let checker = self.permissions.as_deref();

        if self.dry_run {
            if let Some(checker) = checker {
                if !checker.check_tool_permissions(handler.metadata()) {
                    tracing::info!("[Executor] Permission denied for {} (dry run)", tool_name);
                    return ToolResult::permission_denied(&tool_name).timed(started.elapsed());
                }
            }
            tracing::info!("[Executor] Dry run: {}.{}", tool_name, action);
            return dry_run_preview(&tool_name, action, params).timed(started.elapsed());
        }

        tracing::info!("[Executor] Executing {}.{}", tool_name, action);
        let shown = Value::Object(params.clone());
        tracing::debug!("[Executor] Parameters: {}", shown);

        let result = handler.execute(action, checker, params).await;

        tracing::debug!(
            "[Executor] {} completed. Success: {}",
            tool_name,
            result.success
        );
        result.timed(started.elapsed())
    }
}

fn dry_run_preview(tool: &str, action: &str, params: &Params) -> ToolResult {
    let mut data = Params::new();
    data.insert("dry_run".into(), json!(true));
    data.insert("tool".into(), json!(tool));
    data.insert("action".into(), json!(action));
    data.insert("parameters".into(), Value::Object(params.clone()));

    ToolResult::success(format!("[dry run] Would execute {}.{}", tool, action)).with_data(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ToolError;
    use crate::tools::{Tool, ToolAction, ToolCategory, ToolMetadata, ToolOutput};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, Copy)]
    enum CountAction {
        Bump,
    }

    impl ToolAction for CountAction {
        const ALL: &'static [Self] = &[CountAction::Bump];
        const DEFAULT: Self = CountAction::Bump;

        fn as_str(&self) -> &'static str {
            "bump"
        }
    }

    struct CountingTool {
        metadata: ToolMetadata,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Tool for CountingTool {
        type Action = CountAction;

        fn metadata(&self) -> &ToolMetadata {
            &self.metadata
        }

        async fn run(&self, _action: CountAction, _params: &Params) -> Result<ToolOutput, ToolError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(ToolOutput::new("bumped").with("count", n))
        }
    }

    struct Verdict(bool);

    impl PermissionCheck for Verdict {
        fn check_tool_permissions(&self, _tool: &ToolMetadata) -> bool {
            self.0
        }
    }

    fn registry() -> (Arc<ToolRegistry>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = ToolRegistry::new();
        registry.register(CountingTool {
            metadata: ToolMetadata::new("counter_tool", "Counts", ToolCategory::Custom)
                .with_permissions(["automation_operations"]),
            calls: calls.clone(),
        });
        (Arc::new(registry), calls)
    }

    #[tokio::test]
    async fn test_unknown_tool_not_found() {
        let (registry, _) = registry();
        let executor = ToolExecutor::new(registry);

        let result = executor.execute_tool("teleporter", "default", &Params::new()).await;
        assert!(!result.success);
        assert_eq!(result.message, "Tool 'teleporter' not found");
        assert_eq!(result.error.as_deref(), Some("Unknown tool: teleporter"));
        assert!(result.execution_time.is_some());
    }

    #[tokio::test]
    async fn test_executes_resolved_name() {
        let (registry, calls) = registry();
        let executor = ToolExecutor::new(registry).with_permissions(Arc::new(Verdict(true)));

        let result = executor.execute_tool("Counter", "bump", &Params::new()).await;
        assert!(result.success);
        assert_eq!(result.data["count"], json!(1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_denied_never_invokes() {
        let (registry, calls) = registry();
        let executor = ToolExecutor::new(registry).with_permissions(Arc::new(Verdict(false)));

        let result = executor.execute_tool("counter_tool", "bump", &Params::new()).await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("Insufficient permissions"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_dry_run_previews() {
        let (registry, calls) = registry();
        let executor = ToolExecutor::new(registry)
            .with_permissions(Arc::new(Verdict(true)))
            .with_dry_run(true);

        let mut params = Params::new();
        params.insert("n".into(), json!(3));
        let result = executor.execute_tool("counter_tool", "bump", &params).await;
        assert!(result.success);
        assert_eq!(result.data["dry_run"], json!(true));
        assert_eq!(result.data["parameters"], json!({"n": 3}));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let executor = ToolExecutor::new(executor.registry().clone())
            .with_permissions(Arc::new(Verdict(false)))
            .with_dry_run(true);
        let result = executor.execute_tool("counter_tool", "bump", &params).await;
        assert!(!result.success);
    }
}
