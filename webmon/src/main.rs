//! webmon Entry Point

use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};
use webmon::cli::Cli;
use webmon::config::{SinkConfig, WatchConfig};
use webmon::lifecycle::{LifecycleController, MonitorTarget};
use webmon::logging;
use webmon::observer::{ChatObserver, ConsoleObserver, MailObserver, Observer, StoreObserver};
use webmon::shutdown::{StopController, STOP_PROMPT};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = logging::init(cli.verbose) {
        eprintln!("Error: failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = run(cli).await {
        error!(error = %e, "webmon terminated with an error");
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = WatchConfig::from_cli(&cli)?;
    info!(
        urls = ?config.urls,
        interval_secs = config.interval.as_secs(),
        console = config.sinks.console,
        store = config.sinks.store.is_some(),
        mail = config.sinks.mail.is_some(),
        chat = config.sinks.chat.is_some(),
        "Starting webmon"
    );

    let targets = build_targets(&config.urls, &config.sinks)?;
    let controller = LifecycleController::start(targets, config.interval)
        .await
        .context("failed to start monitors")?;

    let stop = StopController::default();
    stop.listen_ctrl_c();
    stop.listen_stdin().context("failed to watch standard input")?;

    println!("{}", STOP_PROMPT);
    stop.wait().await;
    println!("Exiting...");

    controller
        .stop_all()
        .await
        .context("failed to stop monitors")?;
    println!("exited.");
    Ok(())
}

/// URLごとに専用のオブザーバー列を組み立てる（console → store → mail → chat）
///
/// SQLiteストアは全Monitorで1インスタンスを共有する。
fn build_targets(urls: &[String], sinks: &SinkConfig) -> anyhow::Result<Vec<MonitorTarget>> {
    let store = sinks
        .store
        .as_ref()
        .map(|config| Arc::new(StoreObserver::new(&config.path)));

    urls.iter()
        .map(|url| {
            let mut observers: Vec<Box<dyn Observer>> = Vec::new();
            if sinks.console {
                observers.push(Box::new(ConsoleObserver::new()));
            }
            if let Some(store) = &store {
                observers.push(Box::new(Arc::clone(store)));
            }
            if let Some(mail) = &sinks.mail {
                let observer = MailObserver::new(mail).context("invalid mail configuration")?;
                observers.push(Box::new(observer));
            }
            if let Some(chat) = &sinks.chat {
                observers.push(Box::new(ChatObserver::from_config(chat)));
            }
            Ok(MonitorTarget::new(url.clone(), observers))
        })
        .collect()
}
