use colored::*;
use serde_json::Value;
use std::io::{self, Write};
use std::time::Duration;

use crate::core::AgentResult;
use crate::permissions::{PermissionLevel, PermissionRequest};
use crate::tools::ToolRegistry;

/// Longest data dump printed before truncating
const MAX_DATA_CHARS: usize = 4000;

/// Console handles all terminal I/O with colored formatting
pub struct Console {
    prompt_color: Color,
    success_color: Color,
    tool_color: Color,
    /// Print the result's data map after the message
    show_data: bool,
}

impl Console {
    /// Create a new Console with default colors
    pub fn new() -> Self {
        Self {
            prompt_color: Color::Cyan,
            success_color: Color::Green,
            tool_color: Color::Magenta,
            show_data: false,
        }
    }

    /// Also print structured data
    pub fn with_data(mut self, show_data: bool) -> Self {
        self.show_data = show_data;
        self
    }

    /// Print one command outcome
    pub fn print_result(&self, result: &AgentResult) {
        if result.success {
            println!("{} {}", "✓".color(self.success_color).bold(), result.message);
        } else {
            println!("{} {}", "✗".red().bold(), result.message);
            if let Some(error) = &result.error {
                println!("  {} {}", "Error:".red(), error.bright_black());
            }
        }

        if !result.tools_used.is_empty() {
            println!(
                "  {} {}",
                "Tools:".color(self.tool_color),
                result.tools_used.join(", ").color(self.tool_color)
            );
        }

        if self.show_data && !result.data.is_empty() {
            let rendered = serde_json::to_string_pretty(&Value::Object(result.data.clone()))
                .unwrap_or_else(|_| "<unprintable data>".to_string());
            println!("{}", truncate(&rendered, MAX_DATA_CHARS).bright_black());
        }

        println!("  {}", format_duration(result.execution_time).bright_black());
    }

    /// Print a system message (errors, info, etc.)
    pub fn print_system(&self, message: &str) {
        println!("{} {}", "System:".yellow().bold(), message);
    }

    /// Print an error message
    pub fn print_error(&self, error: &str) {
        eprintln!("{} {}", "Error:".red().bold(), error);
    }

    /// Read a line of input; `None` on end of input
    pub fn read_input(&self) -> io::Result<Option<String>> {
        print!("{} ", "sysagent>".color(self.prompt_color).bold());
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            return Ok(None);
        }
        Ok(Some(input.trim().to_string()))
    }

    /// Print a welcome banner
    pub fn print_banner(&self, session_id: &str, llm: bool) {
        println!("{}", "=".repeat(60).bright_blue());
        println!("{}", "  SysAgent - natural-language OS automation".bright_blue().bold());
        println!("{}", "=".repeat(60).bright_blue());
        println!();
        println!(
            "Session {} ({})",
            session_id.bright_black(),
            if llm { "LLM + rules" } else { "rules only" }
        );
        println!("Type a request and press Enter. Type 'help' for examples, 'exit' or 'quit' to end the session.");
        println!();
    }

    /// Print a separator line
    pub fn print_separator(&self) {
        println!("{}", "-".repeat(60).bright_black());
    }

    /// Print the registered tools
    pub fn print_tools(&self, registry: &ToolRegistry) {
        for name in registry.tool_names() {
            let Some(metadata) = registry.metadata(&name) else {
                continue;
            };
            println!(
                "{} {}",
                name.color(self.tool_color).bold(),
                format!("v{}", metadata.version).bright_black()
            );
            println!("  {}", metadata.description);
            if !metadata.permissions.is_empty() {
                println!("  {} {}", "requires:".bright_black(), metadata.permissions.join(", "));
            }
        }
    }

    /// Print a permission table
    pub fn print_permissions(&self, permissions: &[PermissionRequest]) {
        for request in permissions {
            let state = if request.granted {
                "granted".green()
            } else {
                "denied".red()
            };
            println!(
                "{:<24} {:<8} {:<8} {}",
                request.permission.bold(),
                state,
                level_label(request.level).color(level_color(request.level)),
                request.description.bright_black()
            );
        }
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}

fn level_label(level: PermissionLevel) -> &'static str {
    match level {
        PermissionLevel::None => "none",
        PermissionLevel::Read => "read",
        PermissionLevel::Write => "write",
        PermissionLevel::Execute => "execute",
        PermissionLevel::Admin => "admin",
    }
}

fn level_color(level: PermissionLevel) -> Color {
    match level {
        PermissionLevel::None | PermissionLevel::Read => Color::BrightBlack,
        PermissionLevel::Write => Color::Yellow,
        PermissionLevel::Execute | PermissionLevel::Admin => Color::Red,
    }
}

/// Elapsed time as shown under each result
pub fn format_duration(elapsed: Duration) -> String {
    if elapsed.as_secs() >= 1 {
        format!("{:.2}s", elapsed.as_secs_f64())
    } else {
        format!("{}ms", elapsed.as_millis())
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...\n(output truncated)", &text[..cut]),
        None => text.to_string(),
    }
}
