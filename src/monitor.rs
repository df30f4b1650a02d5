//! Turns notifications into stored samples.

use std::time::Duration;

use anyhow::anyhow;
use futures_util::StreamExt;
use log::{debug, error, info, trace};
use tokio::time::{interval, MissedTickBehavior};

use crate::controller_client::ControllerClient;
use crate::error::DecodeError;
use crate::message::telemetry::TelemetryMessage;
use crate::sample::Sample;
use crate::sink::Sink;

/// How a single notification was handled
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Decoded and stored
    Stored(Sample),
    /// Decoded but the sink refused it
    SinkFailed(Sample),
    /// A write acknowledgement
    Acknowledgement,
    /// A malformed header, expected while the controller is not ready
    Suppressed,
    /// Any other decode failure
    Rejected(DecodeError),
}

pub struct Monitor<S> {
    sink: S,
    stored: u64,
}

impl<S: Sink> Monitor<S> {
    /// Log every this many stored samples
    const LOG_EVERY: u64 = 100;

    pub fn new(sink: S) -> Self {
        Self { sink, stored: 0 }
    }

    /// Number of samples the sink has accepted
    pub fn stored(&self) -> u64 {
        self.stored
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Decode one notification and forward any sample to the sink.
    pub async fn handle_notification(&mut self, data: &[u8]) -> Outcome {
        trace!("RX notification: 0x{}", hex::encode(data));

        let sample = match TelemetryMessage::parse(data) {
            TelemetryMessage::Sample(sample) => sample,
            TelemetryMessage::NotTelemetry => return Outcome::Acknowledgement,
            TelemetryMessage::Malformed(err) if err.is_suppressible() => {
                trace!("ignoring frame: {err}");
                return Outcome::Suppressed;
            }
            TelemetryMessage::Malformed(err) => {
                error!("failed to handle response data: {err}");
                return Outcome::Rejected(err);
            }
        };

        if let Err(err) = self.sink.send(&sample).await {
            error!("failed to send sample to sink: {err:#}");
            return Outcome::SinkFailed(sample);
        }

        if self.stored % Self::LOG_EVERY == 0 {
            info!("received sample: {sample}");
        }
        self.stored += 1;
        Outcome::Stored(sample)
    }

    /// Poll the controller every `period` and handle its notifications until
    /// the transport fails.
    pub async fn run(&mut self, client: &ControllerClient, period: Duration) -> anyhow::Result<()> {
        let mut notifications = client.notifications().await?;
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    client.try_connect().await?;
                    debug!("polling controller");
                    client.poll().await?;
                }
                notification = notifications.next() => match notification {
                    Some(Ok(data)) => {
                        self.handle_notification(&data).await;
                    }
                    Some(Err(err)) => {
                        error!("notification error: {err}");
                        return Err(err.into());
                    }
                    None => return Err(anyhow!("end of notification stream")),
                },
            }
        }
    }
}
