use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tokio::io::{stdin, AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use studyabroad::api::{ApiError, ChatHistoryItem};
use studyabroad::app::{AppConfig, AppState};
use studyabroad::chat::{ChatMessage, Conversation};
use studyabroad::platform::AppPaths;

mod cli;

use cli::{Cli, Commands};

const LOG_FILE_PREFIX: &str = "studyabroad.log";

type Input = Lines<BufReader<Stdin>>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut cli = Cli::parse();

    let paths = AppPaths::new()?;
    paths.ensure_dirs_exist()?;
    let _guard = init_logging(&paths, cli.debug);

    info!("Starting studyabroad {}", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::load(&paths, cli.config.as_deref(), cli.api_url.take())
        .context("Failed to load configuration")?;
    let state = AppState::new(config, paths)?;
    let mut input = BufReader::new(stdin()).lines();

    let command = cli.command_or_default();
    if let Err(e) = run(&state, command, &mut input).await {
        error!("Command failed: {:#}", e);
        eprintln!("{}", user_message(&e));
        std::process::exit(1);
    }

    Ok(())
}

/// API failures print their normalized message without the underlying cause.
fn user_message(error: &anyhow::Error) -> String {
    if let Some(api_error) = error.downcast_ref::<ApiError>() {
        return api_error.message().to_string();
    }
    match error.downcast_ref::<studyabroad::Error>() {
        Some(app_error) => app_error.user_message(),
        None => format!("{:#}", error),
    }
}

fn init_logging(paths: &AppPaths, debug: bool) -> WorkerGuard {
    let default_directive = if debug { "studyabroad=debug" } else { "studyabroad=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    let appender = tracing_appender::rolling::daily(paths.logs_dir(), LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();

    guard
}

async fn run(state: &AppState, command: Commands, input: &mut Input) -> anyhow::Result<()> {
    match command {
        Commands::Signup { email, password } => {
            let password = password_or_prompt(password, input).await?;
            let user = state.auth().signup(&email, &password).await?;
            println!("Account created. Logged in as {}", user.email);
        }
        Commands::Login { email, password } => {
            let password = password_or_prompt(password, input).await?;
            let user = state.auth().login(&email, &password).await?;
            println!("Logged in as {}", user.email);
        }
        Commands::Logout => {
            state.auth().logout().await?;
            println!("Logged out");
        }
        Commands::Whoami => match state.auth().restore().await {
            Some(user) => println!("{} (member since {})", user.email, user.created_at.format("%Y-%m-%d")),
            None => println!("Not logged in"),
        },
        Commands::Ask { question, country } => {
            require_login(state).await?;
            let country = country.or_else(|| state.config().ui.default_country.clone());
            let response = state.client().send_message(&question, country.as_deref()).await?;
            println!("{}", response.answer);
        }
        Commands::Chat { country } => {
            require_login(state).await?;
            let country = country.or_else(|| state.config().ui.default_country.clone());
            chat_loop(state, country, input).await?;
        }
        Commands::History { limit, offset } => {
            require_login(state).await?;
            let items = match limit {
                Some(limit) => state.client().get_chat_history_page(limit, offset).await?,
                None => state.client().get_chat_history().await?,
            };
            if items.is_empty() {
                println!("No chat history yet");
            }
            for item in &items {
                print_history_item(item);
            }
        }
        Commands::DeleteHistory { id } => {
            require_login(state).await?;
            let response = state.client().delete_chat_history(id).await?;
            println!("{}", response.message);
        }
        Commands::Countries => {
            let list = state.client().get_countries().await?;
            for country in list.countries {
                println!("{}", country);
            }
        }
        Commands::Health => {
            let health = state.client().health().await?;
            println!("status: {}", health.status);
            if let Some(database) = health.database {
                println!("database: {}", database);
            }
            if let Some(api) = health.api {
                println!("api: {}", api);
            }
        }
    }

    Ok(())
}

async fn require_login(state: &AppState) -> anyhow::Result<()> {
    if state.auth().restore().await.is_none() {
        anyhow::bail!("Please log in first: studyabroad login <email>");
    }
    Ok(())
}

async fn password_or_prompt(password: Option<String>, input: &mut Input) -> anyhow::Result<String> {
    if let Some(password) = password {
        return Ok(password);
    }
    prompt("Password: ")?;
    let line = input.next_line().await?.unwrap_or_default();
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn prompt(text: &str) -> anyhow::Result<()> {
    print!("{}", text);
    std::io::stdout().flush()?;
    Ok(())
}

async fn chat_loop(state: &AppState, mut country: Option<String>, input: &mut Input) -> anyhow::Result<()> {
    let client = state.client();
    let mut conversation = Conversation::new();

    let loaded = conversation.load_history(client).await;
    if loaded > 0 {
        println!("Loaded {} previous exchanges", loaded);
        conversation.messages().iter().for_each(print_message);
    }
    println!("Ask a question, or /help for commands");

    loop {
        prompt("> ")?;
        let Some(line) = input.next_line().await? else {
            break;
        };
        let line = line.trim();

        match line.split_once(' ').unwrap_or((line, "")) {
            ("/quit", _) | ("/exit", _) => break,
            ("/help", _) => print_chat_help(),
            ("/retry", _) => match conversation.retry(client).await {
                Some(reply) => print_message(reply),
                None => println!("Nothing to retry"),
            },
            ("/clear", _) => {
                conversation.clear();
                println!("Conversation cleared");
            }
            ("/search", query) => {
                let hits = conversation.search(query.trim());
                if hits.is_empty() {
                    println!("No messages match '{}'", query.trim());
                }
                hits.into_iter().for_each(print_message);
            }
            ("/export", target) => {
                let path = match target.trim() {
                    "" => PathBuf::from(Conversation::export_file_name()),
                    target => PathBuf::from(target),
                };
                match conversation.export() {
                    Ok(transcript) => {
                        tokio::fs::write(&path, transcript)
                            .await
                            .with_context(|| format!("Failed to write {}", path.display()))?;
                        println!("Exported to {}", path.display());
                    }
                    Err(e) => println!("{}", e.user_message()),
                }
            }
            ("/country", name) => {
                country = match name.trim() {
                    "" | "none" => None,
                    name => Some(name.to_string()),
                };
                match &country {
                    Some(name) => println!("Answering for {}", name),
                    None => println!("Answering for all countries"),
                }
            }
            (command, _) if command.starts_with('/') => println!("Unknown command {}", command),
            _ => {
                if let Some(reply) = conversation.send(client, line, country.as_deref()).await {
                    print_message(reply);
                }
                if conversation.pending_retry().is_some() {
                    println!("Type /retry to send it again");
                }
            }
        }

        if state.needs_login() {
            println!("Please log in again: studyabroad login <email>");
            break;
        }
    }

    Ok(())
}

fn print_chat_help() {
    println!("/retry            resend the last failed question");
    println!("/clear            clear the conversation");
    println!("/search <text>    show messages containing text");
    println!("/export [path]    save the conversation as text");
    println!("/country <name>   restrict answers to a country, or 'none'");
    println!("/quit             leave the chat");
}

fn print_message(message: &ChatMessage) {
    let country = message
        .country
        .as_ref()
        .map(|c| format!(" [{}]", c))
        .unwrap_or_default();
    let marker = if message.error { " (error)" } else { "" };
    println!("{}{}{}: {}", message.role.display_name(), country, marker, message.content);
}

fn print_history_item(item: &ChatHistoryItem) {
    let country = item.country.as_deref().unwrap_or("General");
    println!("#{} {} [{}]", item.id, item.created_at.format("%Y-%m-%d %H:%M"), country);
    println!("  Q: {}", item.question);
    println!("  A: {}", item.answer);
}
