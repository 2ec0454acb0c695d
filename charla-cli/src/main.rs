//! CLI entry point for charla

mod input;
mod tui;

use anyhow::Result;
use charla_chat::{ChatSettings, Conversation, SubmitOutcome};
use charla_core::config::{Config, ConfigLoader};
use charla_core::logging::{init_logging, LogTarget};
use charla_core::SessionManager;
use charla_providers::AnthropicClient;
use clap::{Parser, Subcommand};
use console::style;
use dialoguer::{Input, Password};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::tui::ChatExit;

const LOGIN_ATTEMPTS: usize = 3;

#[derive(Parser)]
#[command(name = "charla")]
#[command(about = "Terminal chat client for the Anthropic Messages API")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration directory
    #[arg(short, long, global = true)]
    config_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and save the session
    Login {
        #[arg(short, long)]
        username: Option<String>,
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Remove the saved session
    Logout,
    /// Show the current user and endpoint configuration
    Status,
    /// Send a single message and print the reply
    Ask {
        /// Message to send
        #[arg(short, long)]
        message: String,
    },
    /// Open the interactive chat view
    Chat,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_loader = if let Some(dir) = cli.config_dir {
        ConfigLoader::with_dir(dir)
    } else {
        ConfigLoader::new()
    };
    let config = config_loader.load()?;

    let target = match cli.command {
        Commands::Chat => LogTarget::FileOnly,
        _ => LogTarget::Console,
    };
    let _log_guard = init_logging(&config.logging, target);

    // restores any saved session
    let session = SessionManager::from_config(&config, config_loader.config_dir());

    match cli.command {
        Commands::Login { username, password } => {
            info!("Running login command");
            run_login(&session, username, password).await?;
        }
        Commands::Logout => {
            info!("Running logout command");
            session.logout();
            println!("{}", style("Logged out.").green());
        }
        Commands::Status => run_status(&config, &config_loader, &session),
        Commands::Ask { message } => {
            info!("Running ask command");
            run_ask(&config, &session, &message).await?;
        }
        Commands::Chat => {
            info!("Starting chat");
            run_chat(&config, &session).await?;
        }
    }

    Ok(())
}

fn build_conversation(config: &Config) -> Conversation {
    let provider = Arc::new(AnthropicClient::from_config(&config.provider));
    Conversation::new(provider, ChatSettings::from(&config.chat))
}

async fn login_with_spinner(session: &SessionManager, username: &str, password: &str) -> bool {
    let spinner = ProgressBar::new_spinner();
    if let Ok(spinner_style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        spinner.set_style(spinner_style);
    }
    spinner.set_message("Checking credentials...");
    spinner.enable_steady_tick(Duration::from_millis(80));

    let ok = session.login(username, password).await;
    spinner.finish_and_clear();
    ok
}

/// Prompt for credentials until a login succeeds or attempts run out
async fn interactive_login(session: &SessionManager, attempts: usize) -> Result<bool> {
    for attempt in 1..=attempts {
        let username: String = Input::new().with_prompt("Username").interact_text()?;
        let password = Password::new().with_prompt("Password").interact()?;

        if login_with_spinner(session, &username, &password).await {
            return Ok(true);
        }
        warn!("Login attempt {}/{} failed", attempt, attempts);
        println!("{}", style("Invalid username or password.").red());
    }
    Ok(false)
}

async fn run_login(
    session: &SessionManager,
    username: Option<String>,
    password: Option<String>,
) -> Result<()> {
    let ok = match (username, password) {
        (Some(username), Some(password)) => {
            login_with_spinner(session, &username, &password).await
        }
        (Some(username), None) => {
            let password = Password::new().with_prompt("Password").interact()?;
            login_with_spinner(session, &username, &password).await
        }
        _ => interactive_login(session, LOGIN_ATTEMPTS).await?,
    };

    if !ok {
        anyhow::bail!("Invalid username or password");
    }

    let user = session.username().unwrap_or_default();
    println!("{} {}", style("Logged in as").green(), style(user).bold());
    Ok(())
}

fn run_status(config: &Config, loader: &ConfigLoader, session: &SessionManager) {
    println!("{}", style("charla status").bold().cyan());
    println!("Config dir: {}", loader.config_dir().display());

    match session.current() {
        Some(current) => println!(
            "User:       {} ({})",
            style(&current.username).green(),
            current.email.as_deref().unwrap_or("no email")
        ),
        None => println!("User:       {}", style("not logged in").yellow()),
    }

    println!("Model:      {}", config.chat.model);
    println!("Endpoint:   {}", config.provider.api_base);
    let key_state = if AnthropicClient::from_config(&config.provider).is_configured() {
        style("configured").green()
    } else {
        style("missing").red()
    };
    println!("API key:    {}", key_state);
}

async fn run_ask(config: &Config, session: &SessionManager, message: &str) -> Result<()> {
    if !session.is_authenticated() {
        anyhow::bail!("Not logged in. Run `charla login` first");
    }

    let conversation = build_conversation(config);
    match conversation.submit(message).await {
        SubmitOutcome::Replied(reply) => {
            println!("{}", reply.content);
            Ok(())
        }
        SubmitOutcome::Failed(failure) => {
            anyhow::bail!("{}", failure.message)
        }
        SubmitOutcome::Ignored => anyhow::bail!("Message is empty"),
        SubmitOutcome::Discarded => anyhow::bail!("Conversation closed before the reply arrived"),
    }
}

async fn run_chat(config: &Config, session: &SessionManager) -> Result<()> {
    if !session.is_authenticated() {
        println!("{}", style("Please log in to start chatting.").cyan());
        if !interactive_login(session, LOGIN_ATTEMPTS).await? {
            anyhow::bail!("Too many failed login attempts");
        }
    }

    let conversation = build_conversation(config);
    match tui::run_chat(&conversation, session).await? {
        ChatExit::LoggedOut => println!("{}", style("Logged out.").green()),
        ChatExit::Quit => {}
    }
    Ok(())
}
