//! Line-at-a-time driver: match, filter, suppress, dispatch.
//!
//! Every line is fully processed, including awaiting each notifier, before
//! the next one is read. Noise-control state is owned by the pipeline and
//! lives for the process lifetime only.

use std::future::Future;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::event::RouteEvent;
use crate::matcher::LineMatcher;
use crate::noise::{self, Admission, NoiseControl};
use crate::notify::{Delivery, Notifier};

/// What happened to a single input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    /// Blank line, skipped.
    Empty,
    /// Not a route change.
    Rejected,
    /// Matched, but its action is excluded by `ONLY_ACTIONS`.
    Filtered(RouteEvent),
    /// Suppressed by the deduplicator.
    Duplicate(RouteEvent),
    /// Suppressed by the rate limiter.
    Throttled(RouteEvent),
    /// Admitted in dry-run mode; traced instead of sent.
    DryRun(RouteEvent),
    /// Admitted and handed to the notifiers.
    Dispatched(RouteEvent),
}

/// Counters accumulated over the pipeline's lifetime.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Lines read, including blank ones.
    pub lines: u64,
    /// Blank lines.
    pub empty: u64,
    /// Lines that did not match.
    pub rejected: u64,
    /// Lines that produced an event.
    pub matched: u64,
    /// Events excluded by `ONLY_ACTIONS`.
    pub filtered: u64,
    /// Events suppressed as duplicates.
    pub duplicates: u64,
    /// Events suppressed by throttling.
    pub throttled: u64,
    /// Events traced in dry-run mode.
    pub dry_run: u64,
    /// Events handed to the notifiers.
    pub dispatched: u64,
    /// Failed channel deliveries.
    pub send_failures: u64,
    /// Deliveries where some mail recipients were refused.
    pub partial_deliveries: u64,
}

/// The processing pipeline.
pub struct Pipeline {
    settings: Settings,
    matcher: LineMatcher,
    noise: NoiseControl,
    notifiers: Vec<Box<dyn Notifier>>,
    stats: PipelineStats,
}

impl Pipeline {
    /// Build a pipeline from settings, a matcher and the enabled notifiers.
    pub fn new(
        settings: Settings,
        matcher: LineMatcher,
        notifiers: Vec<Box<dyn Notifier>>,
    ) -> Self {
        let noise = NoiseControl::new(&settings.noise);
        Self {
            settings,
            matcher,
            noise,
            notifiers,
            stats: PipelineStats::default(),
        }
    }

    /// Counters so far.
    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }

    /// Noise-control state, for inspection.
    pub fn noise(&self) -> &NoiseControl {
        &self.noise
    }

    /// Decide what to do with `line` at `now` without sending anything.
    ///
    /// Updates noise-control state exactly as live processing would.
    pub fn evaluate(&mut self, line: &str, now: i64) -> LineOutcome {
        self.stats.lines = self.stats.lines.saturating_add(1);

        let line = line.trim();
        if line.is_empty() {
            self.stats.empty = self.stats.empty.saturating_add(1);
            return LineOutcome::Empty;
        }

        let Some(event) = self.matcher.parse(line) else {
            self.stats.rejected = self.stats.rejected.saturating_add(1);
            debug!(line, "no match");
            return LineOutcome::Rejected;
        };
        self.stats.matched = self.stats.matched.saturating_add(1);

        debug!(
            action = %event.action,
            prefix = %event.prefix,
            nh = %event.next_hop,
            neighbor = %event.neighbor,
            "MATCH"
        );

        if !self.settings.wants(event.action) {
            self.stats.filtered = self.stats.filtered.saturating_add(1);
            debug!(action = %event.action, "FILTERED by ONLY_ACTIONS");
            return LineOutcome::Filtered(event);
        }

        match self.noise.admit_at(event.dedup_key(), now) {
            Admission::Duplicate => {
                self.stats.duplicates = self.stats.duplicates.saturating_add(1);
                debug!(key = %event.dedup_key(), "SUPPRESSED by dedup");
                LineOutcome::Duplicate(event)
            }
            Admission::Throttled => {
                self.stats.throttled = self.stats.throttled.saturating_add(1);
                debug!(key = %event.dedup_key(), "SUPPRESSED by throttling");
                LineOutcome::Throttled(event)
            }
            Admission::Admitted if self.settings.dry_run => {
                self.stats.dry_run = self.stats.dry_run.saturating_add(1);
                LineOutcome::DryRun(event)
            }
            Admission::Admitted => {
                self.stats.dispatched = self.stats.dispatched.saturating_add(1);
                LineOutcome::Dispatched(event)
            }
        }
    }

    /// Process one line at `now`, dispatching or tracing admitted events.
    pub async fn process_line(&mut self, line: &str, now: i64) -> LineOutcome {
        let outcome = self.evaluate(line, now);
        match &outcome {
            LineOutcome::DryRun(event) => {
                let notification = event.notification();
                info!(subject = %notification.subject, "[DRY_RUN] {}", notification.plain.replace('\n', " | "));
            }
            LineOutcome::Dispatched(event) => self.dispatch(event).await,
            _ => {}
        }
        outcome
    }

    /// Send `event` through every notifier; failures are logged per channel.
    pub async fn dispatch(&mut self, event: &RouteEvent) {
        let notification = event.notification();
        for notifier in &self.notifiers {
            let channel = notifier.channel();
            debug!(channel, prefix = %event.prefix, "sending notification");
            match notifier.send(&notification).await {
                Ok(Delivery::Complete) => {
                    debug!(channel, "notification delivered");
                }
                Ok(Delivery::Partial { refused }) => {
                    self.stats.partial_deliveries = self.stats.partial_deliveries.saturating_add(1);
                    let refused: Vec<String> = refused
                        .iter()
                        .map(|(addr, reason)| format!("{addr} ({reason})"))
                        .collect();
                    warn!(channel, refused = %refused.join(", "), "some recipients refused");
                }
                Err(e) => {
                    self.stats.send_failures = self.stats.send_failures.saturating_add(1);
                    warn!(channel, error = %e, "dispatch failed");
                }
            }
        }
    }

    /// Read lines until end of input or an interrupt, processing each with
    /// the current wall-clock time.
    ///
    /// # Errors
    ///
    /// Returns an error if reading the input fails.
    pub async fn run<R>(&mut self, reader: R) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        self.run_until(reader, shutdown_signal()).await
    }

    /// Read lines until end of input or until `shutdown` resolves.
    ///
    /// Lines are decoded lossily, so invalid UTF-8 is rejected by the
    /// matcher instead of ending the stream.
    ///
    /// # Errors
    ///
    /// Returns an error if reading the input fails.
    pub async fn run_until<R, S>(&mut self, mut reader: R, shutdown: S) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        // Partial reads stay in `buf` if the select is cancelled.
        let mut buf = Vec::new();

        loop {
            tokio::select! {
                read = reader.read_until(b'\n', &mut buf) => {
                    if read? == 0 {
                        debug!("end of input");
                        break;
                    }
                    let line = String::from_utf8_lossy(&buf).into_owned();
                    buf.clear();
                    self.process_line(&line, noise::now_secs()).await;
                }
                () = &mut shutdown => {
                    info!("received shutdown signal");
                    break;
                }
            }
        }
        Ok(())
    }
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
