use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use diamond_sale_watcher::browser::{BlockingRenderer, ChromeLauncher};
use diamond_sale_watcher::config::LoggingConfig;
use diamond_sale_watcher::ocr::TesseractEngine;
use diamond_sale_watcher::plugins::notifiers::DiscordNotifier;
use diamond_sale_watcher::scheduler::SaleScheduler;
use diamond_sale_watcher::{AppConfig, Watcher};

#[derive(Parser, Debug)]
#[command(name = "diamond-sale-watcher", version, about)]
struct Args {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Announce, scan the sale page and check prices (default)
    Run,
    /// Scan the sale page once
    Sales,
    /// Check item prices; uses the configured URLs when none are given
    Price { urls: Vec<String> },
}

fn init_tracing(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .context("invalid log filter")?;
    let registry = tracing_subscriber::registry().with(filter).with(fmt::layer());

    match &config.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, "diamond-sale-watcher.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            registry
                .with(fmt::layer().with_writer(writer).with_ansi(false))
                .try_init()?;
            Ok(Some(guard))
        }
        None => {
            registry.try_init()?;
            Ok(None)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let config = AppConfig::load(args.config.as_deref()).context("failed to load configuration")?;
    let _guard = init_tracing(&config.logging)?;

    info!("Starting Diamond Sale Watcher...");

    let notifier = Arc::new(DiscordNotifier::new(&config.discord)?);
    let ocr = TesseractEngine::new(&config.ocr);
    if let Err(e) = ocr.ensure_available().await {
        warn!(error = %e, "Tesseract is not available; sale images will be posted without text");
    }
    let renderer = BlockingRenderer::new(ChromeLauncher::new(
        config.price_check.chrome_path.clone(),
        config.site.user_agent.clone(),
    ));
    let watcher = Arc::new(Watcher::new(&config, notifier, Arc::new(ocr), Arc::new(renderer))?);

    match args.command.unwrap_or(Command::Run) {
        Command::Run => {
            watcher.on_ready().await?;

            if let Some(schedule) = &config.sales.schedule {
                let mut scheduler = SaleScheduler::new().await?;
                scheduler.schedule_sales(Arc::clone(&watcher), schedule).await?;
                scheduler.start().await?;

                tokio::signal::ctrl_c().await?;
                info!("Shutting down...");
                scheduler.shutdown().await?;
            }
        }
        Command::Sales => {
            let report = watcher.sales().check_sales().await;
            info!(posted = report.posted, pictures = report.pictures, "Sale scan done");
        }
        Command::Price { urls } => {
            let urls = if urls.is_empty() { config.price_check.item_urls.clone() } else { urls };
            let report = watcher.prices().check_all(&urls).await;
            info!(sent = report.sent, failed = report.failures.len(), "Price check done");
        }
    }

    Ok(())
}
