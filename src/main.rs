//! Streaming chat server and terminal client.
//!
//! Entry point for `stream-chat serve | ask | chat`.

use mimalloc::MiMalloc;

/// Global allocator for improved performance (M-MIMALLOC-APPS).
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use dotenvy::dotenv;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use stream_chat::config::{AppConfig, Cli, Command};
use stream_chat::controller::{AbortHandle, ChatController, SubmitOutcome};
use stream_chat::llm::LlmSettings;
use stream_chat::server::start_server;
use stream_chat::transport::HttpTransport;
use stream_chat::view::{ChatView, TerminalView};

/// Conventional exit status after SIGINT.
const EXIT_INTERRUPTED: u8 = 130;

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env (if present)
    let _ = dotenv();

    // Initialize tracing (M-LOG-STRUCTURED)
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = match AppConfig::from_cli(&cli) {
        Ok(c) => Arc::new(c),
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command.clone().unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Ask { query } => ask(&config, &query.join(" ")).await,
        Command::Chat => chat(&config).await,
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "Fatal error");
            ExitCode::FAILURE
        }
    }
}

async fn serve(config: Arc<AppConfig>) -> anyhow::Result<ExitCode> {
    let settings = match LlmSettings::from_env() {
        Ok(s) => s,
        Err(msg) => {
            eprintln!("Configuration error: {msg}");
            return Ok(ExitCode::FAILURE);
        }
    };

    start_server(config, settings).await?;
    Ok(ExitCode::SUCCESS)
}

/// One question, answer streamed to stdout.
async fn ask(config: &AppConfig, query: &str) -> anyhow::Result<ExitCode> {
    let view = TerminalView::new(std::io::stdout(), &config.client.bot_label).without_prompt();
    let transport = HttpTransport::new(&config.client.endpoint)?;
    let mut chat = ChatController::new(view, transport, config.client.controller_options());

    let abort = chat.abort_handle();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            abort.abort();
        }
    });

    let outcome = chat.submit_query(query).await;
    interrupt.abort();

    Ok(match outcome {
        SubmitOutcome::Completed => ExitCode::SUCCESS,
        SubmitOutcome::Cancelled => ExitCode::from(EXIT_INTERRUPTED),
        SubmitOutcome::Ignored | SubmitOutcome::Failed => ExitCode::FAILURE,
    })
}

/// Interactive loop over stdin lines.
async fn chat(config: &AppConfig) -> anyhow::Result<ExitCode> {
    let view = TerminalView::new(std::io::stdout(), &config.client.bot_label);
    let transport = HttpTransport::new(&config.client.endpoint)?;
    info!(endpoint = %transport.endpoint(), "Interactive chat started");
    let mut chat = ChatController::new(view, transport, config.client.controller_options());

    tokio::spawn(interrupt_loop(chat.abort_handle()));

    chat.view_mut().focus_input();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        chat.view_mut().set_input(line);
        if chat.submit().await == SubmitOutcome::Ignored {
            chat.view_mut().clear_input();
            chat.view_mut().focus_input();
        }
    }

    // EOF: leave the prompt line
    let mut stdout = chat.into_view().into_inner();
    writeln!(stdout)?;
    Ok(ExitCode::SUCCESS)
}

/// Ctrl-C aborts the streaming answer, or exits when nothing is streaming.
async fn interrupt_loop(abort: AbortHandle) {
    while tokio::signal::ctrl_c().await.is_ok() {
        if !abort.abort() {
            std::process::exit(i32::from(EXIT_INTERRUPTED));
        }
    }
}
