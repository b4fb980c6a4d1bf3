use anyhow::Result;
use cadence_core::db;
use cadence_core::error::CoreError;
use clap::Parser;
use owo_colors::{OwoColorize, Style};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod cli;
mod commands;
mod config;
mod parser;
mod timezone;
mod util;
mod views;

use cli::{Cli, Commands};
use config::Config;
use util::open_session;

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        handle_error(err);
        std::process::exit(1);
    }
}

/// Tracing is opt-in via `CADENCE_LOG` or `RUST_LOG`; output goes to stderr.
fn init_tracing() {
    let filter = std::env::var("CADENCE_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .ok()
        .and_then(|raw| {
            let raw = raw.trim();
            if raw.is_empty() {
                return None;
            }
            EnvFilter::try_new(raw).ok()
        })
        .unwrap_or_else(|| EnvFilter::new("off"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::new()?;
    let materialization = config.materialization()?;
    let timezone = materialization.timezone;

    let pool = db::establish_connection(&config.database_path).await?;
    let user_name = cli.user.as_deref().unwrap_or(&config.user);
    let repo = open_session(pool, user_name, materialization).await?;
    tracing::debug!(user = user_name, timezone = %timezone, "session opened");

    match cli.command {
        Commands::Add(command) => commands::add::add_todo(&repo, command, &timezone).await,
        Commands::List(command) => commands::list::list_todos(&repo, command, &timezone).await,
        Commands::Calendar(command) => commands::calendar::show_calendar(&repo, command, &timezone).await,
        Commands::Do(command) => commands::r#do::do_todo(&repo, command).await,
        Commands::Undo(command) => commands::undo::undo_todo(&repo, command).await,
        Commands::Edit(command) => commands::edit::edit_todo(&repo, command, &timezone).await,
        Commands::Delete(command) => commands::delete::delete_todo(&repo, command).await,
        Commands::Project(command) => commands::project::project_command(&repo, command).await,
        Commands::Tag(command) => commands::tag::tag_command(&repo, command).await,
        Commands::Recur(command) => commands::recurrence::recurrence_command(&repo, command, &timezone).await,
        Commands::Stats => commands::stats::show_stats(&repo).await,
    }
}

fn handle_error(err: anyhow::Error) {
    let error_style = Style::new().red().bold();

    if let Some(core_error) = err.downcast_ref::<CoreError>() {
        match core_error {
            CoreError::NotFound(s) => {
                eprintln!("{} {} not found.", "Error:".style(error_style), s);
            }
            CoreError::AmbiguousId(todos) => {
                eprintln!("{}", "Error: Ambiguous ID.".style(error_style));
                eprintln!("Did you mean one of these?");
                for (id, title) in todos {
                    eprintln!("  {} ({})", id.yellow(), title);
                }
            }
            CoreError::InvalidInput(s) => {
                eprintln!("{} Invalid input: {}", "Error:".style(error_style), s);
            }
            CoreError::DuplicateName { kind, name } => {
                eprintln!(
                    "{} {} '{}' already exists.",
                    "Error:".style(error_style),
                    kind,
                    name.yellow()
                );
            }
            CoreError::NotAuthenticated => {
                eprintln!("{} No user selected. Set one with --user.", "Error:".style(error_style));
            }
            _ => eprintln!("{} {:#}", "Error:".style(error_style), err),
        }
    } else {
        eprintln!("{} {:#}", "Error:".style(error_style), err);
    }
}
