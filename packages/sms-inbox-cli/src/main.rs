//! SMS Inbox terminal client
//!
//! Browse conversations, read threads and send messages through the inbox
//! server. Authentication happens in the browser; the client reuses the
//! resulting session cookie.
//!
//! ## Layout
//!
//! - `client` - REST data layer, one method per server resource
//! - `task` - background requests and their results
//! - `event` - terminal input and task results on one channel
//! - `app` - screen state and the reducer
//! - `ui` - ratatui rendering

mod app;
mod client;
mod event;
mod task;
mod ui;

use std::time::Instant;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};
use ratatui::DefaultTerminal;

use app::App;
use client::InboxClient;
use event::{Event, EventLoop};

#[derive(Parser, Debug)]
#[command(name = "sms-inbox", version, about = "Terminal client for the SMS inbox")]
struct Args {
    /// Inbox server URL, including its base path
    #[arg(
        long,
        default_value = "http://localhost:3001/twilio-sms-web",
        env = "SMS_INBOX_URL"
    )]
    server: String,

    /// Session cookie value from a browser login
    #[arg(long, env = "SMS_INBOX_SESSION", hide_env_values = true)]
    session: Option<String>,

    /// Write logs to this file (the terminal is taken by the UI)
    #[arg(long, env = "SMS_INBOX_LOG")]
    log_file: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the signed-in user
    Whoami,
    /// Print the account's SMS-capable numbers
    Numbers,
    /// Print the app's sync document as JSON
    Document,
}

fn init_logging(path: Option<&std::path::Path>) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .wrap_err_with(|| format!("opening log file {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sms_inbox=info,sms_inbox_core=info".into()),
        )
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

async fn run_command(client: &InboxClient, command: Command) -> Result<()> {
    match command {
        Command::Whoami => {
            let user = client.me().await?;
            println!("{} ({})", user.display_name(), user.id);
        }
        Command::Numbers => {
            for number in client.phone_numbers().await? {
                println!("{}", number);
            }
        }
        Command::Document => {
            let document = client.sync_document().await?;
            println!("{}", serde_json::to_string_pretty(&document)?);
        }
    }
    Ok(())
}

async fn run(mut terminal: DefaultTerminal, client: InboxClient) -> Result<()> {
    let mut app = App::new(client.login_url(), client.logout_url());
    let mut events = EventLoop::new();
    events.start_input();
    let tx = events.sender();

    while !app.should_quit {
        for task in app.take_tasks() {
            task::spawn(client.clone(), task, tx.clone());
        }
        app.tick(Instant::now());
        terminal.draw(|frame| ui::draw(frame, &app))?;

        let Some(event) = events.next().await else {
            break;
        };
        match event {
            Event::Key(key) => app.handle_key(key),
            Event::Task(result) => app.apply(result),
            Event::Resize | Event::Tick => {}
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    init_logging(args.log_file.as_deref())?;

    let client = InboxClient::new(&args.server, args.session);
    if let Some(command) = args.command {
        return run_command(&client, command).await;
    }

    tracing::info!(server = args.server.as_str(), "Starting SMS inbox client");
    if !client.has_session() {
        tracing::info!("No session cookie configured, sign-in required");
    }
    let terminal = ratatui::init();
    let result = run(terminal, client).await;
    ratatui::restore();
    result
}
