//! Interactive consent

use std::io::{self, BufRead, Write};

use colored::Colorize;

/// Source of yes/no answers for higher-risk permissions
pub trait ConsentPrompt: Send + Sync {
    /// Ask for `permission`; `None` means no answer could be obtained
    fn ask(&self, permission: &str, description: &str) -> Option<String>;
}

/// Blocking prompt on the terminal
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsolePrompt;

impl ConsentPrompt for ConsolePrompt {
    fn ask(&self, permission: &str, description: &str) -> Option<String> {
        let mut stdout = io::stdout();
        let _ = writeln!(
            stdout,
            "\n{} {}",
            "Permission required:".yellow().bold(),
            permission.bold()
        );
        let _ = writeln!(stdout, "  {}", description.dimmed());
        let _ = write!(stdout, "{} ", "Grant? [y/N]".cyan());
        let _ = stdout.flush();

        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(answer.trim().to_string()),
        }
    }
}

/// Prompt for non-interactive sessions: never consents
#[derive(Debug, Default, Clone, Copy)]
pub struct DenyPrompt;

impl ConsentPrompt for DenyPrompt {
    fn ask(&self, permission: &str, _description: &str) -> Option<String> {
        tracing::info!("[Permissions] Non-interactive session, refusing '{}'", permission);
        None
    }
}

/// Whether an answer counts as consent
pub fn is_affirmative(answer: &str) -> bool {
    matches!(
        answer.trim().to_lowercase().as_str(),
        "y" | "yes" | "grant" | "allow"
    )
}
