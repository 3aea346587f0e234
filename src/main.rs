use anyhow::Result;
use clap::{Arg, Command};
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;

use cloud_deck::api::ApiClient;
use cloud_deck::app::App;
use cloud_deck::ui::run_app;

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Command::new("Cloud Deck")
        .version("0.1.0")
        .about("Terminal management console for Linode-style cloud resources")
        .arg(
            Arg::new("dry-run")
                .long("dry-run")
                .help("Browse a sample fleet without making network calls")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("token")
                .long("token")
                .help("API personal access token (defaults to the LINODE_TOKEN env var)")
                .value_name("TOKEN"),
        )
        .get_matches();

    let dry_run_mode = matches.get_flag("dry-run");

    let token = match matches.get_one::<String>("token") {
        Some(token) => token.clone(),
        None if dry_run_mode => String::new(),
        None => ApiClient::token_from_env()?,
    };

    run_tui_app(token, dry_run_mode).await?;

    Ok(())
}

async fn run_tui_app(token: String, dry_run_mode: bool) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Create app and run it
    let client = Box::new(ApiClient::new(token));
    let app = App::new(client, dry_run_mode);
    let res = run_app(&mut terminal, app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("{err:?}");
    }

    Ok(())
}
