//! ---
//! tie_section: "05-feed-orchestration"
//! tie_subsection: "module"
//! tie_type: "source"
//! tie_scope: "code"
//! tie_description: "Paced feed driver tying records, messages and channels together."
//! tie_version: "v0.1.0"
//! tie_owner: "tbd"
//! ---
use std::future::Future;
use std::time::Duration;

use tie_common::config::AppConfig;
use tie_msg::{to_display, MessageBuilder};
use tie_records::{PatientRecord, PatientRecords};
use tie_transport::{Channel, ConsoleSink, DeliveryOutcome};
use tokio::time::sleep;
use tracing::{debug, info, instrument};

use crate::Result;

/// Counters for one feed run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedSummary {
    /// Messages built and handed to the channel.
    pub attempted: usize,
    /// Printed or accepted by the peer.
    pub delivered: usize,
    /// Reported as `[ERROR]` and skipped.
    pub failed: usize,
    /// The shutdown signal ended the run early.
    pub interrupted: bool,
}

impl FeedSummary {
    fn record(&mut self, outcome: &DeliveryOutcome) {
        self.attempted += 1;
        if outcome.is_delivered() {
            self.delivered += 1;
        } else {
            self.failed += 1;
        }
    }
}

/// Loaded records plus everything needed to stream them.
pub struct Feed {
    records: PatientRecords,
    builder: MessageBuilder,
    channel: Channel,
    console: ConsoleSink,
    interval: Duration,
    skip_final_record: bool,
}

impl Feed {
    /// Feed over already loaded parts, pacing at 500 ms and delivering every record.
    pub fn new(
        records: PatientRecords,
        builder: MessageBuilder,
        channel: Channel,
        console: ConsoleSink,
    ) -> Self {
        Self {
            records,
            builder,
            channel,
            console,
            interval: Duration::from_millis(500),
            skip_final_record: false,
        }
    }

    /// Read the input named by `config.feed.input` and wire up the configured channel.
    pub fn load(config: &AppConfig, console: ConsoleSink) -> Result<Self> {
        let records = tie_records::load(&config.feed.input)?;
        let builder = match config.feed.seed {
            Some(seed) => MessageBuilder::seeded(config.identity.clone(), seed),
            None => MessageBuilder::new(config.identity.clone()),
        };
        let channel = Channel::from_config(&config.transport, console.clone())?;
        info!(
            input = %config.feed.input.display(),
            records = records.len(),
            mode = %channel.mode(),
            channel = %channel,
            "feed loaded"
        );
        Ok(Self::new(records, builder, channel, console)
            .with_interval(config.feed.interval)
            .with_skip_final_record(config.feed.skip_final_record))
    }

    /// Pause applied after each delivery.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Stop one record short of the end, reproducing the legacy feed's exclusive bound.
    pub fn with_skip_final_record(mut self, skip: bool) -> Self {
        self.skip_final_record = skip;
        self
    }

    /// Number of records a complete run attempts.
    pub fn planned(&self) -> usize {
        if self.skip_final_record {
            self.records.len().saturating_sub(1)
        } else {
            self.records.len()
        }
    }

    /// Stream the records in order until drained or `shutdown` resolves.
    ///
    /// Delivery failures are reported and skipped. On shutdown a single
    /// `[INFO] Exiting` line is written and the summary is returned with
    /// `interrupted` set.
    pub async fn run<F>(&mut self, shutdown: F) -> Result<FeedSummary>
    where
        F: Future,
    {
        tokio::pin!(shutdown);
        let planned = self.planned();
        let Feed {
            records,
            builder,
            channel,
            console,
            interval,
            ..
        } = self;
        let mut summary = FeedSummary::default();

        for (index, record) in records.iter().take(planned).enumerate() {
            let position = index + 1;
            let delivery = tokio::select! {
                biased;
                _ = &mut shutdown => None,
                result = deliver_one(builder, channel, console, position, record) => Some(result),
            };
            let Some(outcome) = delivery.transpose()? else {
                return Ok(interrupt(console, summary));
            };
            summary.record(&outcome);

            let paused = tokio::select! {
                biased;
                _ = &mut shutdown => false,
                _ = sleep(*interval) => true,
            };
            if !paused {
                return Ok(interrupt(console, summary));
            }
        }

        info!(
            attempted = summary.attempted,
            delivered = summary.delivered,
            failed = summary.failed,
            "feed drained"
        );
        Ok(summary)
    }
}

#[instrument(skip_all, fields(position = position))]
async fn deliver_one(
    builder: &mut MessageBuilder,
    channel: &Channel,
    console: &ConsoleSink,
    position: usize,
    record: &PatientRecord,
) -> Result<DeliveryOutcome> {
    let message = builder.render(record)?;
    let outcome = channel.deliver(&message).await;
    debug!(nhs_number = %record.nhs_number, outcome = ?outcome, "delivery attempted");
    report(console, &outcome, &message);
    Ok(outcome)
}

fn interrupt(console: &ConsoleSink, mut summary: FeedSummary) -> FeedSummary {
    summary.interrupted = true;
    console.emit("[INFO] Exiting");
    info!(attempted = summary.attempted, "feed interrupted");
    summary
}

/// Echo an outcome to the console.
///
/// Printed messages were already written by the console channel; network sends are
/// confirmed with the message in display form.
pub fn report(console: &ConsoleSink, outcome: &DeliveryOutcome, message: &str) {
    match outcome {
        DeliveryOutcome::Printed => {}
        DeliveryOutcome::Sent { .. } => {
            console.emit(&format!("[INFO] Sent message: {}", to_display(message)));
        }
        DeliveryOutcome::Failed(failure) => {
            console.emit(&format!("[ERROR] {}", failure));
        }
    }
}
