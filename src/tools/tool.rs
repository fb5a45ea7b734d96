//! Handler contract
//!
//! Every capability handler implements [`Tool`]: static metadata plus a
//! closed enum of actions. The registry stores handlers behind the object
//! safe [`Handler`] trait, which adds the permission gate, error conversion
//! and timing that every call goes through.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::ToolError;
use crate::permissions::PermissionCheck;

/// Free-form parameters passed through to a handler
pub type Params = Map<String, Value>;

/// Result of executing a tool
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolResult {
    /// Whether the tool succeeded
    pub success: bool,
    /// Structured payload
    pub data: Map<String, Value>,
    /// Human-readable summary
    pub message: String,
    /// Machine-readable error, set on failure
    pub error: Option<String>,
    /// Wall time of the whole call, set by `Handler::execute`
    pub execution_time: Option<Duration>,
}

impl ToolResult {
    /// Create a successful tool result
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Map::new(),
            message: message.into(),
            error: None,
            execution_time: None,
        }
    }

    /// Create a failed tool result
    pub fn failure(message: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: Map::new(),
            message: message.into(),
            error: Some(error.into()),
            execution_time: None,
        }
    }

    /// Result for a handler whose required permissions were not granted
    pub fn permission_denied(tool_name: &str) -> Self {
        Self::failure(
            format!("Permission denied for {}", tool_name),
            "Insufficient permissions",
        )
    }

    /// Result for a name the registry cannot resolve
    pub fn not_found(tool_name: &str) -> Self {
        Self::failure(
            format!("Tool '{}' not found", tool_name),
            format!("Unknown tool: {}", tool_name),
        )
    }

    /// Attach a payload
    pub fn with_data(mut self, data: Map<String, Value>) -> Self {
        self.data = data;
        self
    }

    /// Record elapsed time
    pub fn timed(mut self, elapsed: Duration) -> Self {
        self.execution_time = Some(elapsed);
        self
    }
}

impl From<ToolOutput> for ToolResult {
    fn from(output: ToolOutput) -> Self {
        Self::success(output.message).with_data(output.data)
    }
}

impl From<ToolError> for ToolResult {
    fn from(err: ToolError) -> Self {
        Self::failure(err.message(), err.to_string())
    }
}

/// Successful output of an action body
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    pub message: String,
    pub data: Map<String, Value>,
}

impl ToolOutput {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            data: Map::new(),
        }
    }

    /// Add one key to the payload
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.data.insert(key.to_string(), value.into());
        self
    }
}

/// Handler categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCategory {
    File,
    System,
    Process,
    Network,
    App,
    Scheduler,
    Service,
    Clipboard,
    Auth,
    Screenshot,
    Voice,
    Vision,
    Custom,
    Security,
    Automation,
    Monitoring,
    CodeGeneration,
    OsIntelligence,
    LowLevel,
}

/// Static description of a handler, fixed at registration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolMetadata {
    /// Unique registry key
    pub name: String,
    pub description: String,
    pub category: ToolCategory,
    /// Permissions that must all be granted before the handler runs
    pub permissions: Vec<String>,
    pub version: String,
}

impl ToolMetadata {
    pub fn new(name: impl Into<String>, description: impl Into<String>, category: ToolCategory) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            category,
            permissions: Vec::new(),
            version: "1.0.0".to_string(),
        }
    }

    /// Declare required permissions (duplicates are dropped)
    pub fn with_permissions<I, S>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for permission in permissions {
            let permission = permission.into();
            if !self.permissions.contains(&permission) {
                self.permissions.push(permission);
            }
        }
        self
    }
}

/// Closed set of actions a handler supports
pub trait ToolAction: Copy + Send + Sync + 'static {
    /// Every action, in the order advertised to the LLM
    const ALL: &'static [Self];
    /// Action used when the caller asks for `"default"` or nothing
    const DEFAULT: Self;

    /// Wire name of the action
    fn as_str(&self) -> &'static str;

    /// Parse a wire name, case-insensitively
    fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|action| action.as_str().eq_ignore_ascii_case(name))
    }
}

/// Trait implemented by capability handlers
#[async_trait]
pub trait Tool: Send + Sync {
    /// The handler's actions
    type Action: ToolAction;

    /// Metadata used as the registry key and permission source
    fn metadata(&self) -> &ToolMetadata;

    /// Run one action
    async fn run(&self, action: Self::Action, params: &Params) -> Result<ToolOutput, ToolError>;
}

/// Object-safe view of a handler, as stored in the registry
#[async_trait]
pub trait Handler: Send + Sync {
    fn metadata(&self) -> &ToolMetadata;

    /// Wire names of the supported actions
    fn actions(&self) -> Vec<&'static str>;

    /// Route an action string to the handler body
    async fn dispatch(&self, action: &str, params: &Params) -> Result<ToolOutput, ToolError>;

    /// Permission-gated, timed execution
    ///
    /// When a checker is supplied and refuses, the handler body never runs.
    /// Handler errors become failure results; this never returns an error.
    async fn execute(
        &self,
        action: &str,
        permissions: Option<&dyn PermissionCheck>,
        params: &Params,
    ) -> ToolResult {
        let started = Instant::now();
        let metadata = self.metadata();

        if let Some(checker) = permissions {
            if !checker.check_tool_permissions(metadata) {
                tracing::info!("[Tool] Permission denied for {}", metadata.name);
                return ToolResult::permission_denied(&metadata.name).timed(started.elapsed());
            }
        }

        let result = match self.dispatch(action, params).await {
            Ok(output) => ToolResult::from(output),
            Err(e) => {
                tracing::debug!("[Tool] {}.{} failed: {}", metadata.name, action, e);
                ToolResult::from(e)
            }
        };

        result.timed(started.elapsed())
    }
}

/// Adapter from a typed [`Tool`] to the registry's [`Handler`]
pub struct ToolHandler<T>(pub T);

#[async_trait]
impl<T: Tool> Handler for ToolHandler<T> {
    fn metadata(&self) -> &ToolMetadata {
        self.0.metadata()
    }

    fn actions(&self) -> Vec<&'static str> {
        T::Action::ALL.iter().map(|a| a.as_str()).collect()
    }

    async fn dispatch(&self, action: &str, params: &Params) -> Result<ToolOutput, ToolError> {
        let parsed = if action.trim().is_empty() || action.eq_ignore_ascii_case("default") {
            Some(T::Action::DEFAULT)
        } else {
            T::Action::parse(action)
        };

        match parsed {
            Some(action) => self.0.run(action, params).await,
            None => Err(ToolError::UnsupportedAction {
                tool: self.0.metadata().name.clone(),
                action: action.to_string(),
            }),
        }
    }
}

/// Deserialize an action's parameters into its typed input
pub fn parse_params<T: DeserializeOwned>(params: &Params) -> Result<T, ToolError> {
    serde_json::from_value(Value::Object(params.clone()))
        .map_err(|e| ToolError::invalid("parameters", e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum EchoAction {
        Say,
        Fail,
    }

    impl ToolAction for EchoAction {
        const ALL: &'static [Self] = &[EchoAction::Say, EchoAction::Fail];
        const DEFAULT: Self = EchoAction::Say;

        fn as_str(&self) -> &'static str {
            match self {
                EchoAction::Say => "say",
                EchoAction::Fail => "fail",
            }
        }
    }

    struct EchoTool {
        metadata: ToolMetadata,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Tool for EchoTool {
        type Action = EchoAction;

        fn metadata(&self) -> &ToolMetadata {
            &self.metadata
        }

        async fn run(&self, action: EchoAction, params: &Params) -> Result<ToolOutput, ToolError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match action {
                EchoAction::Say => Ok(ToolOutput::new("said").with("params", Value::Object(params.clone()))),
                EchoAction::Fail => Err(ToolError::failed("echo failed", "boom")),
            }
        }
    }

    struct Refuse;

    impl PermissionCheck for Refuse {
        fn check_tool_permissions(&self, _tool: &ToolMetadata) -> bool {
            false
        }
    }

    fn echo() -> (ToolHandler<EchoTool>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let tool = EchoTool {
            metadata: ToolMetadata::new("echo_tool", "Echo", ToolCategory::Custom)
                .with_permissions(["file_access", "file_access"]),
            calls: calls.clone(),
        };
        (ToolHandler(tool), calls)
    }

    #[test]
    fn test_tool_result_success() {
        let result = ToolResult::success("output");
        assert!(result.success);
        assert_eq!(result.message, "output");
        assert!(result.error.is_none());
    }

    #[test]
    fn test_tool_result_failure() {
        let result = ToolResult::failure("message", "error");
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("error"));
    }

    #[test]
    fn test_metadata_dedups_permissions() {
        let (handler, _) = echo();
        assert_eq!(handler.metadata().permissions, vec!["file_access".to_string()]);
        assert_eq!(handler.metadata().version, "1.0.0");
    }

    #[test]
    fn test_action_parse_case_insensitive() {
        assert_eq!(EchoAction::parse("SAY"), Some(EchoAction::Say));
        assert_eq!(EchoAction::parse(" fail "), Some(EchoAction::Fail));
        assert_eq!(EchoAction::parse("dance"), None);
    }

    #[tokio::test]
    async fn test_execute_success_is_timed() {
        let (handler, calls) = echo();
        let mut params = Params::new();
        params.insert("x".into(), json!(1));

        let result = handler.execute("say", None, &params).await;
        assert!(result.success);
        assert_eq!(result.data["params"], json!({"x": 1}));
        assert!(result.execution_time.is_some());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_execute_default_action() {
        let (handler, _) = echo();
        let result = handler.execute("default", None, &Params::new()).await;
        assert!(result.success);
        assert_eq!(result.message, "said");
    }

    #[tokio::test]
    async fn test_execute_unsupported_action() {
        let (handler, calls) = echo();
        let result = handler.execute("dance", None, &Params::new()).await;
        assert!(!result.success);
        assert_eq!(result.message, "Unknown action: dance");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_execute_error_becomes_failure() {
        let (handler, _) = echo();
        let result = handler.execute("fail", None, &Params::new()).await;
        assert!(!result.success);
        assert_eq!(result.message, "echo failed");
        assert_eq!(result.error.as_deref(), Some("boom"));
        assert!(result.execution_time.is_some());
    }

    #[tokio::test]
    async fn test_execute_denied_skips_body() {
        let (handler, calls) = echo();
        let result = handler.execute("say", Some(&Refuse), &Params::new()).await;
        assert!(!result.success);
        assert_eq!(result.message, "Permission denied for echo_tool");
        assert_eq!(result.error.as_deref(), Some("Insufficient permissions"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_parse_params_reports_invalid() {
        #[derive(Debug, Deserialize)]
        struct Input {
            #[allow(dead_code)]
            path: String,
        }

        let mut params = Params::new();
        params.insert("path".into(), json!(5));
        let err = parse_params::<Input>(&params).unwrap_err();
        assert!(matches!(err, ToolError::InvalidParameter { .. }));
    }
}
