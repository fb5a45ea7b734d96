use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};

use sysagent::cli::Console;
use sysagent::logging::{self, LoggingOptions};
use sysagent::{Agent, Config};

#[derive(Parser)]
#[command(name = "sysagent")]
#[command(about = "Natural-language OS automation", long_about = None)]
struct Cli {
    /// Directory holding permissions.json and logs
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    /// Check permissions and show what would run, without running it
    #[arg(long, global = true)]
    dry_run: bool,

    /// Echo info-level logs and result data
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Debug-level logging
    #[arg(long, global = true)]
    debug: bool,

    /// Resolve with the keyword rules only
    #[arg(long, global = true)]
    no_llm: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Process one command and exit
    Run {
        /// The request, e.g. "show me cpu usage"
        #[arg(required = true, trailing_var_arg = true)]
        text: Vec<String>,
    },
    /// Interactive session
    Repl,
    /// List registered tools
    Tools,
    /// Inspect or change stored permissions
    Permissions {
        #[command(subcommand)]
        action: PermissionsCommand,
    },
}

#[derive(Subcommand)]
enum PermissionsCommand {
    /// Show every permission and its state
    List,
    /// Grant a permission, or every permission a tool needs
    Grant { name: String },
    /// Revoke a permission, or every permission a tool needs
    Revoke { name: String },
    /// Restore the defaults
    Reset,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = Config::from_env();
    if cli.dry_run {
        config = config.with_dry_run(true);
    }
    if let Some(dir) = &cli.config_dir {
        config = config.with_config_dir(dir);
    }
    config.verbose |= cli.verbose;
    config.debug |= cli.debug;

    let _log_guard = logging::init_logging(&LoggingOptions::from_config(&config))?;
    tracing::info!("=== SysAgent Starting ===");

    let console = Console::new().with_data(config.verbose);
    let mut agent = Agent::with_defaults(config);
    if cli.no_llm {
        agent = agent.with_llm(None);
    }

    let code = match cli.command {
        Command::Run { text } => {
            let result = agent.process_command(&text.join(" ")).await;
            console.print_result(&result);
            if result.success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Command::Repl => {
            run_repl(&agent, &console).await?;
            ExitCode::SUCCESS
        }
        Command::Tools => {
            console.print_tools(agent.registry());
            ExitCode::SUCCESS
        }
        Command::Permissions { action } => match run_permissions(&agent, &console, action) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                console.print_error(&format!("{:#}", e));
                ExitCode::FAILURE
            }
        },
    };

    tracing::info!("=== SysAgent Shutting Down ===");
    Ok(code)
}

async fn run_repl(agent: &Agent, console: &Console) -> Result<()> {
    console.print_banner(agent.session_id(), agent.has_llm());

    while let Some(line) = console.read_input()? {
        match line.as_str() {
            "" => continue,
            "exit" | "quit" => break,
            "help" => console.print_system(&agent.help_text()),
            _ => {
                let result = agent.process_command(&line).await;
                console.print_result(&result);
                console.print_separator();
            }
        }
    }

    console.print_system("Goodbye.");
    Ok(())
}

fn run_permissions(agent: &Agent, console: &Console, action: PermissionsCommand) -> Result<()> {
    let permissions = agent.permissions();

    match action {
        PermissionsCommand::List => {
            if let Some(path) = permissions.store_path() {
                console.print_system(&format!("Permissions file: {}", path.display()));
            }
            console.print_permissions(&permissions.list_permissions());
        }
        PermissionsCommand::Grant { name } => {
            for permission in targets(agent, &name)? {
                permissions.grant_permission(&permission, None);
                console.print_system(&format!("Granted {}", permission));
            }
        }
        PermissionsCommand::Revoke { name } => {
            for permission in targets(agent, &name)? {
                permissions.revoke_permission(&permission);
                console.print_system(&format!("Revoked {}", permission));
            }
        }
        PermissionsCommand::Reset => {
            permissions.reset_permissions();
            console.print_system("Permissions reset to defaults");
        }
    }
    Ok(())
}

/// Permission names behind a tool name or a permission name
fn targets(agent: &Agent, name: &str) -> Result<Vec<String>> {
    if let Some(handler) = agent.registry().resolve(name) {
        return Ok(handler.metadata().permissions.clone());
    }
    if agent.permissions().get_permission_status().contains_key(name) {
        return Ok(vec![name.to_string()]);
    }
    bail!("'{}' is neither a tool nor a known permission", name)
}
