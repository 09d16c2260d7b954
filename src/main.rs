#![allow(missing_docs)]

//! exabgp-notify CLI entry point.
//!
//! Usage (typically from a systemd unit):
//!
//! ```text
//! tail -F /var/log/exabgp/exabgp.log | exabgp-notify --config /etc/exabgp-notify/exabgp-notify.cfg
//! ```

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tokio::io::BufReader;
use tracing::{info, warn};

use exabgp_notify::config::{Settings, DEFAULT_CONFIG_PATH};
use exabgp_notify::logging;
use exabgp_notify::matcher::LineMatcher;
use exabgp_notify::notify::email::EmailNotifier;
use exabgp_notify::notify::telegram::TelegramNotifier;
use exabgp_notify::notify::Notifier;
use exabgp_notify::pipeline::Pipeline;

/// Send Telegram/email notifications for ExaBGP route changes read from stdin.
#[derive(Parser)]
#[command(name = "exabgp-notify", version, about)]
struct Cli {
    /// Path to the KEY=VALUE config file.
    #[arg(long, value_name = "PATH", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;

    logging::init(settings.verbose);

    for w in &settings.warnings {
        warn!(key = w.key, value = %w.value, "{}", w.reason);
    }

    let notifiers = build_notifiers(&settings)?;

    info!(
        config = %cli.config.display(),
        dry_run = settings.dry_run,
        telegram = settings.telegram.is_some(),
        email = settings.smtp.is_some(),
        throttle_window_sec = settings.noise.throttle_window_secs,
        throttle_max = settings.noise.throttle_max,
        dedup_ttl_sec = settings.noise.dedup_ttl_secs,
        "exabgp-notify started"
    );

    let matcher = LineMatcher::new().context("failed to compile log line pattern")?;
    let mut pipeline = Pipeline::new(settings, matcher, notifiers);

    pipeline
        .run(BufReader::new(tokio::io::stdin()))
        .await
        .context("failed to read stdin")?;

    let stats = pipeline.stats();
    info!(
        lines = stats.lines,
        matched = stats.matched,
        filtered = stats.filtered,
        duplicates = stats.duplicates,
        throttled = stats.throttled,
        dispatched = stats.dispatched,
        dry_run = stats.dry_run,
        send_failures = stats.send_failures,
        "exabgp-notify stopped"
    );

    Ok(())
}

/// Instantiate the channels that are fully configured.
fn build_notifiers(settings: &Settings) -> anyhow::Result<Vec<Box<dyn Notifier>>> {
    let mut notifiers: Vec<Box<dyn Notifier>> = Vec::new();

    if let Some(tg) = &settings.telegram {
        let notifier = TelegramNotifier::new(tg).context("failed to create Telegram client")?;
        notifiers.push(Box::new(notifier));
    }
    if let Some(smtp) = &settings.smtp {
        notifiers.push(Box::new(EmailNotifier::new(smtp.clone())));
    }

    if notifiers.is_empty() && !settings.dry_run {
        warn!("no notification channel configured; admitted events will be dropped");
    }
    Ok(notifiers)
}
