//! capsearch: search video archives from the terminal

mod cli;
mod render;

use std::io::{self, IsTerminal};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use capsearch_core::{
    extract_video_id, FeedRenderer, FeedTransport, FinderConfig, HttpTransport, ReplayTransport,
    SessionController, SessionEvent,
};

use cli::{Cli, OutputFormat};
use render::{EventLogRenderer, JsonRenderer, TextRenderer};

const EXIT_OK: u8 = 0;
/// Transport failure or invalid input
const EXIT_FAILURE: u8 = 1;
/// Search finished but at least one source reported an error
const EXIT_SOURCE_ERRORS: u8 = 2;
/// Interrupted or timed out
const EXIT_CANCELLED: u8 = 130;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

/// Logs go to stderr so stdout stays machine-readable
fn init_tracing(verbose: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(match verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        })
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

async fn run(cli: Cli) -> Result<u8> {
    let mut config = FinderConfig::load().context("failed to load configuration")?;
    cli.apply(&mut config);
    debug!("Effective config: {:?}", config);

    let video_id = extract_video_id(&cli.target)?;
    if video_id != cli.target.trim() {
        eprintln!("Interpreting that as video ID {}", video_id);
    }

    let renderer = make_renderer(&cli);
    match &cli.replay {
        Some(path) => {
            let transport = ReplayTransport::from_file(path)
                .with_context(|| format!("failed to read {}", path.display()))?
                .chunk_size(cli.chunk_size);
            search(transport, &config, video_id, cli.timeout(), renderer).await
        }
        None => {
            let transport = HttpTransport::new(&config)?;
            search(transport, &config, video_id, cli.timeout(), renderer).await
        }
    }
}

fn make_renderer(cli: &Cli) -> Box<dyn FeedRenderer> {
    let stdout = io::stdout();
    match cli.format {
        OutputFormat::Text => {
            let color = !cli.no_color
                && std::env::var_os("NO_COLOR").is_none()
                && stdout.is_terminal();
            Box::new(TextRenderer::new(stdout, color))
        }
        OutputFormat::Json => Box::new(JsonRenderer::new(stdout)),
        OutputFormat::Events => Box::new(EventLogRenderer::new(stdout)),
    }
}

async fn search<T: FeedTransport>(
    transport: T,
    config: &FinderConfig,
    video_id: String,
    timeout: Option<Duration>,
    mut renderer: Box<dyn FeedRenderer>,
) -> Result<u8> {
    let mut controller = SessionController::new(transport).with_strict(config.strict);
    let mut handle = controller.start(video_id)?;
    debug!("Waiting for session #{} events", handle.id());

    let deadline = async {
        match timeout {
            Some(duration) => tokio::time::sleep(duration).await,
            None => std::future::pending::<()>().await,
        }
    };

    let terminal = tokio::select! {
        terminal = handle.drive(renderer.as_mut()) => terminal,
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                warn!("Failed to listen for interrupt: {}", e);
            }
            eprintln!("Interrupted.");
            None
        }
        _ = deadline => {
            eprintln!("Timed out.");
            None
        }
    };

    let code = match terminal {
        Some(SessionEvent::Finished(summary)) => {
            if summary.errored().next().is_some() {
                EXIT_SOURCE_ERRORS
            } else {
                EXIT_OK
            }
        }
        Some(SessionEvent::Failed(e)) => {
            debug!("Session failed: {}", e);
            EXIT_FAILURE
        }
        Some(SessionEvent::Protocol(_)) | None => {
            controller.cancel(&handle);
            EXIT_CANCELLED
        }
    };

    controller.join().await;
    Ok(code)
}
