//! Destinations for decoded samples.

use std::fmt::Write as _;
use std::time::Duration;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::Client;

use crate::config::InfluxDbConfig;
use crate::sample::Sample;

/// Somewhere a [`Sample`] can be stored
#[async_trait]
pub trait Sink: Send + Sync {
    async fn send(&self, sample: &Sample) -> anyhow::Result<()>;
}

/// Writes samples to an InfluxDB 2.x bucket using the line protocol.
///
/// Points carry no timestamp, the server assigns its receive time.
pub struct InfluxDbSink {
    client: Client,
    write_url: String,
    token: String,
    org: String,
    bucket: String,
    measurement: String,
}

impl InfluxDbSink {
    const REQUEST_TIMEOUT_S: u64 = 10;

    pub fn new(config: &InfluxDbConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(Self::REQUEST_TIMEOUT_S))
            .build()
            .context("failed to build reqwest client")?;
        Ok(Self {
            client,
            write_url: format!("{}/api/v2/write", config.url.trim_end_matches('/')),
            token: config.token.clone(),
            org: config.org.clone(),
            bucket: config.bucket.clone(),
            measurement: config.measurement.clone(),
        })
    }
}

#[async_trait]
impl Sink for InfluxDbSink {
    async fn send(&self, sample: &Sample) -> anyhow::Result<()> {
        let body = line_protocol(&self.measurement, sample);
        let response = self
            .client
            .post(&self.write_url)
            .query(&[("org", self.org.as_str()), ("bucket", self.bucket.as_str())])
            .header(AUTHORIZATION, format!("Token {}", self.token))
            .body(body)
            .send()
            .await
            .with_context(|| format!("failed to reach InfluxDB at {}", self.write_url))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(anyhow!("InfluxDB write rejected with {status}: {detail}"));
        }
        Ok(())
    }
}

/// Render a sample as one line of InfluxDB line protocol.
///
/// Integer fields get the `i` suffix so they are stored as integers.
pub fn line_protocol(measurement: &str, sample: &Sample) -> String {
    let mut line = escape_measurement(measurement);
    let floats = [
        ("battery_voltage", sample.battery_voltage),
        ("battery_current", sample.battery_current),
        ("controller_temperature", sample.controller_temperature),
        ("load_voltage", sample.load_voltage),
        ("load_current", sample.load_current),
        ("load_power", sample.load_power),
        ("panel_voltage", sample.panel_voltage),
    ];
    let integers = [
        ("battery_power", sample.battery_power),
        ("max_charge_power", sample.max_charge_power),
        ("energy_today", sample.energy_today),
        ("running_days", sample.running_days),
        ("total_energy", sample.total_energy),
    ];

    let mut separator = ' ';
    for (key, value) in floats {
        let _ = write!(line, "{separator}{key}={value}");
        separator = ',';
    }
    for (key, value) in integers {
        let _ = write!(line, "{separator}{key}={value}i");
    }
    line
}

fn escape_measurement(measurement: &str) -> String {
    measurement.replace(',', "\\,").replace(' ', "\\ ")
}
