//! Command pipeline
//!
//! `Agent::process_command` takes one line of free text through:
//! 1. context creation
//! 2. the destructive-pattern gate
//! 3. LLM resolution when a provider is configured
//! 4. the keyword rule ladder, directly or as the LLM fallback
//! 5. execution and aggregation into one `AgentResult`
//!
//! Nothing in here returns an error to the caller.

use std::sync::Arc;
use std::time::Instant;

use serde_json::{json, Map};

use super::executor::ToolExecutor;
use super::plan::{self, Plan};
use super::rules::{self, Intent, PermissionTarget};
use super::safety;
use crate::audit::AuditLog;
use crate::config::Config;
use crate::core::{AgentError, AgentResult, AgentResultOf, CommandContext};
use crate::llm::{ChatRequest, LlmProvider, ProviderChain};
use crate::permissions::{PermissionCheck, PermissionManager};
use crate::tools::{register_defaults, Params, ToolMetadata, ToolRegistry};

const GRANT_PREPOSITIONS: &[&str] = &["for", "to", "on"];
const REVOKE_PREPOSITIONS: &[&str] = &["for", "from", "on"];

const CHAT_FALLBACK_REPLY: &str = "I understand your request but don't need to use any tools for this. \
                                   How can I help you with system operations?";

/// What a grant/revoke target turned out to be
enum Subject {
    Tool(ToolMetadata),
    Permission(String),
}

/// The dispatch engine
pub struct Agent {
    config: Arc<Config>,
    executor: ToolExecutor,
    permissions: Arc<PermissionManager>,
    llm: Option<Arc<dyn LlmProvider>>,
    audit: AuditLog,
    session_id: String,
}

impl Agent {
    /// Agent over an explicit registry and permission manager
    ///
    /// The LLM chain is built from `config.agent`; with no usable provider
    /// the agent resolves by rules only.
    pub fn new(config: Config, registry: ToolRegistry, permissions: Arc<PermissionManager>) -> Self {
        let llm = ProviderChain::from_settings(&config.agent)
            .map(|chain| Arc::new(chain) as Arc<dyn LlmProvider>);
        let audit = if config.security.audit_logging {
            AuditLog::in_dir(&config.logs_dir())
        } else {
            AuditLog::disabled()
        };
        let checker: Arc<dyn PermissionCheck> = permissions.clone();
        let executor = ToolExecutor::new(Arc::new(registry))
            .with_permissions(checker)
            .with_dry_run(config.security.dry_run);
        let session_id = uuid::Uuid::new_v4().to_string();

        tracing::info!(
            "[Agent] Session {} started with {} tools (dry run: {})",
            session_id,
            executor.registry().len(),
            executor.is_dry_run()
        );

        Self {
            config: Arc::new(config),
            executor,
            permissions,
            llm,
            audit,
            session_id,
        }
    }

    /// Agent with the built-in handlers and the configured permission file
    pub fn with_defaults(config: Config) -> Self {
        let mut registry = ToolRegistry::new();
        register_defaults(&mut registry);
        let permissions = Arc::new(PermissionManager::from_config(&config));
        Self::new(config, registry, permissions)
    }

    /// Replace the LLM provider; `None` forces rule-only resolution
    pub fn with_llm(mut self, llm: Option<Arc<dyn LlmProvider>>) -> Self {
        self.llm = llm;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &ToolRegistry {
        self.executor.registry()
    }

    pub fn permissions(&self) -> &Arc<PermissionManager> {
        &self.permissions
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn has_llm(&self) -> bool {
        self.llm.is_some()
    }

    /// Process one line of free text
    pub async fn process_command(&self, user_input: &str) -> AgentResult {
        let started = Instant::now();
        let ctx = CommandContext::new(
            user_input,
            self.permissions.get_permission_status(),
            self.config.clone(),
            self.session_id.as_str(),
        );
        tracing::info!("[Agent] Processing command: {}", ctx.user_input);

        let result = match self.run_pipeline(&ctx).await {
            Ok(result) => result,
            Err(AgentError::DangerousCommand) => {
                AgentResult::failure("Command blocked for safety", AgentError::DangerousCommand.to_string())
            }
            Err(e) => {
                tracing::error!("[Agent] Command failed: {}", e);
                AgentResult::failure(format!("Failed to process command: {}", e), e.to_string())
            }
        }
        .timed(started.elapsed());

        tracing::info!(
            "[Agent] Completed in {:?}. Success: {}, tools: {:?}",
            result.execution_time,
            result.success,
            result.tools_used
        );
        self.audit.record_command(&ctx, &result);
        result
    }

    async fn run_pipeline(&self, ctx: &CommandContext) -> AgentResultOf<AgentResult> {
        safety::check_input(&ctx.user_input, ctx.config.security.guardrails_enabled)?;

        if let Some(llm) = &self.llm {
            match self.resolve_with_llm(llm.as_ref(), ctx).await {
                Ok(plan) => return Ok(self.run_plan(plan).await),
                Err(e) => tracing::warn!("[Agent] LLM resolution failed, using rules: {}", e),
            }
        }

        Ok(self.resolve_with_rules(ctx).await)
    }

    async fn resolve_with_llm(&self, llm: &dyn LlmProvider, ctx: &CommandContext) -> AgentResultOf<Plan> {
        let settings = &ctx.config.agent;
        let request = ChatRequest {
            system_prompt: plan::system_prompt(self.executor.registry(), ctx.platform),
            user_prompt: plan::user_prompt(&ctx.user_input),
            model: settings.model.clone(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        };

        tracing::debug!("[Agent] Asking {} for a plan", llm.provider_name());
        let text = llm.complete(&request).await.map_err(AgentError::provider)?;
        let plan = plan::parse_plan(&text)?;
        tracing::debug!("[Agent] Plan has {} call(s)", plan.calls.len());
        Ok(plan)
    }

    /// Execute planned calls in order, stopping at the first failure
    ///
    /// Calls naming a tool the registry cannot resolve are dropped first.
    async fn run_plan(&self, mut plan: Plan) -> AgentResult {
        let registry = self.executor.registry();
        plan.calls.retain(|call| {
            let known = registry.resolve(&call.tool).is_some();
            if !known {
                tracing::warn!("[Agent] Skipping unknown tool in plan: {}", call.tool);
            }
            known
        });

        if plan.calls.is_empty() {
            let reply = plan.explanation.unwrap_or_else(|| CHAT_FALLBACK_REPLY.to_string());
            return AgentResult::success(reply);
        }

        let mut data = Map::new();
        let mut tools_used = Vec::with_capacity(plan.calls.len());

        for call in &plan.calls {
            let result = self
                .executor
                .execute_tool(&call.tool, &call.action, &call.parameters)
                .await;
            tools_used.push(call.tool.clone());

            if !result.success {
                tracing::info!("[Agent] {} failed, stopping plan", call.tool);
                let error = result.error.unwrap_or_else(|| result.message.clone());
                return AgentResult::failure(format!("Tool execution failed: {}", result.message), error)
                    .with_data(result.data)
                    .with_tools(tools_used);
            }
            data.extend(result.data);
        }

        let message = plan.explanation.unwrap_or_else(|| {
            format!("Executed {} tool(s): {}", tools_used.len(), tools_used.join(", "))
        });
        AgentResult::success(message).with_data(data).with_tools(tools_used)
    }

    async fn resolve_with_rules(&self, ctx: &CommandContext) -> AgentResult {
        let input = ctx.user_input.as_str();
        let intent = rules::classify(input);
        tracing::debug!("[Agent] Rule intent: {:?}", intent);

        match intent {
            Intent::Call { tool, action } => {
                let result = self.executor.execute_tool(tool, action, &Params::new()).await;
                AgentResult {
                    success: result.success,
                    message: result.message,
                    data: result.data,
                    error: result.error,
                    execution_time: Default::default(),
                    tools_used: vec![tool.to_string()],
                }
            }
            Intent::GrantPermission => self.grant_from_text(input),
            Intent::RevokePermission => self.revoke_from_text(input),
            Intent::ConfigHelp => AgentResult::success(config_help(&self.config)),
            Intent::Greeting => AgentResult::success(greeting()),
            Intent::Unknown => AgentResult::failure(
                "I understand you want to do something, but I'm not sure what. Try being more specific:\n\
                 - 'Show system information'\n\
                 - 'List files in this directory'\n\
                 - 'Clean up temp files'\n\
                 - 'What's my CPU usage?'\n\
                 - 'Grant permissions for file_tool'",
                "Command not understood",
            ),
        }
    }

    /// Resolve a grant/revoke target: a tool first, then a permission name
    fn subject(&self, target: &str) -> Option<Subject> {
        if let Some(handler) = self.executor.registry().resolve(target) {
            return Some(Subject::Tool(handler.metadata().clone()));
        }

        let permission: String = target
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("_")
            .replace('-', "_");
        if self.permissions.get_permission_status().contains_key(&permission) {
            Some(Subject::Permission(permission))
        } else {
            None
        }
    }

    fn grant_from_text(&self, input: &str) -> AgentResult {
        let target = match rules::parse_permission_command(input, "grant", GRANT_PREPOSITIONS) {
            PermissionTarget::Named(target) => target,
            PermissionTarget::Missing => {
                return AgentResult::failure(
                    "Please specify which tool to grant permissions for. Example: 'grant permissions for file_tool'",
                    "No tool specified",
                )
            }
            PermissionTarget::Malformed => {
                return AgentResult::failure(
                    "Usage: 'grant permissions for <tool>' or 'grant permission: <name>'",
                    "Invalid permission command",
                )
            }
        };

        match self.subject(&target) {
            Some(Subject::Tool(tool)) => {
                let description = format!("using {}", tool.name);
                let mut granted = 0usize;
                for permission in &tool.permissions {
                    if self.permissions.has_permission(permission) {
                        continue;
                    }
                    if !self.permissions.request_permission(permission, Some(&description)) {
                        return AgentResult::failure(
                            format!("Permission '{}' was not granted for {}", permission, tool.name),
                            "Permission denied",
                        )
                        .with_data(tool_data(&tool.name, "permissions_granted", granted));
                    }
                    self.audit.record_permission(&self.session_id, permission, true);
                    granted += 1;
                }

                let message = if granted > 0 {
                    format!("Successfully granted {} permission(s) for {}", granted, tool.name)
                } else {
                    format!("No new permissions needed for {}", tool.name)
                };
                AgentResult::success(message).with_data(tool_data(&tool.name, "permissions_granted", granted))
            }
            Some(Subject::Permission(permission)) => {
                if self.permissions.request_permission(&permission, None) {
                    self.audit.record_permission(&self.session_id, &permission, true);
                    AgentResult::success(format!("Granted permission '{}'", permission))
                } else {
                    AgentResult::failure(format!("Permission '{}' was not granted", permission), "Permission denied")
                }
            }
            None => AgentResult::failure(
                format!(
                    "Tool '{}' not found. Available tools: {}",
                    target,
                    self.executor.registry().tool_names().join(", ")
                ),
                "Tool not found",
            ),
        }
    }

    fn revoke_from_text(&self, input: &str) -> AgentResult {
        let target = match rules::parse_permission_command(input, "revoke", REVOKE_PREPOSITIONS) {
            PermissionTarget::Named(target) => target,
            PermissionTarget::Missing => {
                return AgentResult::failure(
                    "Please specify which tool to revoke permissions for. Example: 'revoke permissions for file_tool'",
                    "No tool specified",
                )
            }
            PermissionTarget::Malformed => {
                return AgentResult::failure(
                    "Usage: 'revoke permissions for <tool>' or 'revoke permission: <name>'",
                    "Invalid permission command",
                )
            }
        };

        match self.subject(&target) {
            Some(Subject::Tool(tool)) => {
                let mut revoked = 0usize;
                for permission in &tool.permissions {
                    if self.permissions.has_permission(permission) {
                        self.permissions.revoke_permission(permission);
                        self.audit.record_permission(&self.session_id, permission, false);
                        revoked += 1;
                    }
                }

                let message = if revoked > 0 {
                    format!("Successfully revoked {} permission(s) for {}", revoked, tool.name)
                } else {
                    format!("No permissions were revoked for {}", tool.name)
                };
                AgentResult::success(message).with_data(tool_data(&tool.name, "permissions_revoked", revoked))
            }
            Some(Subject::Permission(permission)) => {
                self.permissions.revoke_permission(&permission);
                self.audit.record_permission(&self.session_id, &permission, false);
                AgentResult::success(format!("Revoked permission '{}'", permission))
            }
            None => AgentResult::failure(format!("Tool '{}' not found", target), "Tool not found"),
        }
    }

    /// Usage text for front-ends
    pub fn help_text(&self) -> String {
        let mut text = String::from(
            "SysAgent Help\n\
             \n\
             Available Commands:\n\
             - System Information: \"show system info\", \"cpu usage\", \"memory status\"\n\
             - File Operations: \"list files\", \"clean up files\", \"organize files\"\n\
             - Processes: \"running processes\"\n\
             - Network: \"network status\", \"internet connection\"\n\
             - System: \"uptime\", \"battery\", \"performance\"\n\
             - Permissions: \"grant permissions for file_tool\", \"revoke permissions for file_tool\"\n\
             \n\
             Registered tools:\n",
        );
        text.push_str(&self.executor.registry().describe());
        text.push_str(
            "\n\nExamples:\n  \
             sysagent run \"show me system info\"\n  \
             sysagent run \"clean up temp files\"\n  \
             sysagent repl",
        );
        text
    }

    /// Example phrasings the rule ladder understands
    pub fn available_commands(&self) -> Vec<&'static str> {
        vec![
            "Show system information",
            "List files in directory",
            "Clean up temporary files",
            "Organize files by type",
            "Search for files",
            "Show CPU usage",
            "Show memory usage",
            "Show disk usage",
            "Show running processes",
            "Show network information",
            "Show battery status",
            "Show system uptime",
            "Show performance metrics",
            "Show hardware information",
        ]
    }
}

fn tool_data(tool: &str, key: &str, count: usize) -> Map<String, serde_json::Value> {
    let mut data = Map::new();
    data.insert("tool".into(), json!(tool));
    data.insert(key.into(), json!(count));
    data
}

fn greeting() -> String {
    "Hello! I'm SysAgent, your command-line assistant. I can help you with:\n\
     - System information (CPU, memory, disk, processes)\n\
     - File operations (list, clean, organize)\n\
     - Network diagnostics\n\
     - Permission management\n\
     \n\
     Try asking me something like:\n\
     - 'Show me system info'\n\
     - 'List files in current directory'\n\
     - 'Clean up temporary files'\n\
     - 'What's using the most CPU?'"
        .to_string()
}

fn config_help(config: &Config) -> String {
    format!(
        "Configuration is read from SYSAGENT_* environment variables:\n\
         - SYSAGENT_LLM_PROVIDER (openai, ollama, none), currently {}\n\
         - SYSAGENT_LLM_FALLBACK (comma list of providers)\n\
         - SYSAGENT_MODEL, currently {}\n\
         - SYSAGENT_OPENAI_API_KEY / SYSAGENT_OPENAI_BASE_URL\n\
         - SYSAGENT_OLLAMA_BASE_URL / SYSAGENT_OLLAMA_MODEL\n\
         - SYSAGENT_TEMPERATURE, SYSAGENT_MAX_TOKENS, SYSAGENT_TIMEOUT\n\
         - SYSAGENT_DRY_RUN, currently {}\n\
         - SYSAGENT_AUDIT_LOG, SYSAGENT_VERBOSE, SYSAGENT_DEBUG\n\
         - SYSAGENT_CONFIG_DIR, currently {}",
        config.agent.provider,
        config.agent.model,
        config.security.dry_run,
        config.config_dir().display()
    )
}
