mod commands;

use anyhow::Context;
use commands::{parse_command, Command};
use dashboard::{render_summary, DashboardController, RefreshOutcome, SkipReason};
use gamepulse_client::GamePulseApiClient;
use gamepulse_core::{ErrorExt, ErrorReporter, GamePulseConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = GamePulseConfig::load().context("failed to load configuration")?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting GamePulse dashboard against {}", config.api.base_url);

    let client = Arc::new(GamePulseApiClient::new(&config.api)?);
    let controller = Arc::new(DashboardController::from_config(client.clone(), &config));
    let reporter = ErrorReporter::new();

    // Render every state publication as one line
    let mut updates = controller.subscribe();
    tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let summary = render_summary(&updates.borrow_and_update());
            println!("{summary}");
        }
    });

    match controller.start().await {
        Ok(RefreshOutcome::Skipped(SkipReason::NotReady)) => match &config.load {
            Some(request) => {
                if let Err(e) = controller.load_data(request).await {
                    reporter.report_error(&e);
                }
            }
            None => info!("No [load] section configured, waiting for backend data"),
        },
        Ok(_) => {}
        Err(e) => reporter.report_error(&e),
    }

    let (events, receiver) = mpsc::channel(32);
    let event_loop = tokio::spawn(controller.clone().run(receiver));

    if let Some(secs) = config.dashboard.status_poll_secs {
        let controller = controller.clone();
        tokio::spawn(async move {
            match controller.poll_until_ready(Duration::from_secs(secs)).await {
                Ok(outcome) => info!(?outcome, "Status poll finished"),
                Err(e) => warn!("Refresh after status poll failed: {}", e.user_friendly_message()),
            }
        });
    }

    println!("{}", commands::USAGE);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("Ctrl+C received");
                break;
            }
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) if line.trim().is_empty() => {}
                Ok(Some(line)) => match parse_command(&line) {
                    Ok(Command::Quit) => break,
                    Ok(Command::Analyze(text)) => match client.analyze_comment(&text).await {
                        Ok(analysis) => println!("{}", commands::describe_analysis(&analysis)),
                        Err(e) => reporter.report_error(&e),
                    },
                    Ok(Command::Event(event)) => {
                        if events.send(event).await.is_err() {
                            break;
                        }
                    }
                    Err(usage) => println!("{usage}"),
                },
                Ok(None) => {
                    info!("stdin closed, press Ctrl+C to exit");
                    stdin_open = false;
                }
                Err(e) => {
                    warn!("Failed to read command: {}", e);
                    stdin_open = false;
                }
            },
        }
    }

    controller.shutdown();
    drop(events);
    if let Err(e) = event_loop.await {
        warn!("Controller event loop ended abnormally: {}", e);
    }

    let metrics = client.get_metrics().await;
    info!(
        total = metrics.total_requests,
        failed = metrics.failed_requests,
        timed_out = metrics.timed_out_requests,
        "API usage for this session"
    );
    info!("GamePulse dashboard stopped");

    Ok(())
}
