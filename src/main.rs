use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use log::info;

use litime_monitor::config::Config;
use litime_monitor::{ControllerClient, InfluxDbSink, Monitor};

/// Monitor a LiTime solar charge controller over Bluetooth Low Energy.
///
/// Connects to the controller, polls it for telemetry and stores every
/// sample in InfluxDB.
#[derive(Parser, Debug)]
#[command(name = "litime-monitor", version, about, long_about)]
struct Cli {
    /// Path to a YAML configuration file
    #[arg(short, long, env = "LITIME_MONITOR_CONFIG")]
    config: Option<PathBuf>,

    /// Log filter, e.g. `info` or `litime_monitor=debug`
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    log_level: String,

    /// InfluxDB URL
    #[arg(long, env = "LITIME_MONITOR_INFLUXDB_URL")]
    influxdb_url: Option<String>,

    /// InfluxDB token
    #[arg(long, env = "LITIME_MONITOR_INFLUXDB_TOKEN", hide_env_values = true)]
    influxdb_token: Option<String>,

    /// InfluxDB organization
    #[arg(long, env = "LITIME_MONITOR_INFLUXDB_ORG")]
    influxdb_org: Option<String>,

    /// InfluxDB bucket name
    #[arg(long, env = "LITIME_MONITOR_INFLUXDB_BUCKET")]
    influxdb_bucket: Option<String>,

    /// Bluetooth device MAC address
    #[arg(long, env = "LITIME_MONITOR_DEVICE_ADDRESS")]
    device_address: Option<String>,

    /// Bluetooth device name, used instead of the address when set
    #[arg(long, env = "LITIME_MONITOR_DEVICE_NAME")]
    device_name: Option<String>,

    /// Bluetooth service UUID
    #[arg(long, env = "LITIME_MONITOR_DEVICE_SERVICE")]
    device_service: Option<String>,

    /// Bluetooth characteristic UUID
    #[arg(long, env = "LITIME_MONITOR_DEVICE_CHARACTERISTIC")]
    device_characteristic: Option<String>,

    /// Seconds between telemetry requests
    #[arg(long, env = "LITIME_MONITOR_POLL_INTERVAL")]
    poll_interval: Option<u64>,
}

impl Cli {
    fn apply(&self, config: &mut Config) {
        fn set<T: Clone>(target: &mut T, value: &Option<T>) {
            if let Some(value) = value {
                *target = value.clone();
            }
        }

        set(&mut config.influxdb.url, &self.influxdb_url);
        set(&mut config.influxdb.token, &self.influxdb_token);
        set(&mut config.influxdb.org, &self.influxdb_org);
        set(&mut config.influxdb.bucket, &self.influxdb_bucket);
        set(&mut config.device.address, &self.device_address);
        set(&mut config.device.service, &self.device_service);
        set(&mut config.device.characteristic, &self.device_characteristic);
        set(&mut config.poll.interval_secs, &self.poll_interval);
        if self.device_name.is_some() {
            config.device.name = self.device_name.clone();
        }
    }
}

fn init_logger(filter: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logger(&cli.log_level);

    info!("reading config");
    let loaded = Config::load(cli.config.as_deref())?;
    if let Some(source) = &loaded.source {
        info!("using configuration from {}", source.display());
    }
    let mut config = loaded.config;
    cli.apply(&mut config);
    config.validate().context("invalid configuration")?;

    let client = ControllerClient::new(&config.device)
        .await
        .context("failed to connect to the charge controller")?;

    info!("establishing connection to influx");
    let sink = InfluxDbSink::new(&config.influxdb)?;
    let mut monitor = Monitor::new(sink);

    let result = tokio::select! {
        result = monitor.run(&client, config.poll.interval()) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("shutting down");
            Ok(())
        }
    };

    client.stop().await?;
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::parse_from([
            "litime-monitor",
            "--device-address",
            "C8:47:80:12:34:56",
            "--influxdb-bucket",
            "roof",
            "--poll-interval",
            "5",
        ]);
        let mut config = Config::default();
        cli.apply(&mut config);
        assert_eq!(config.device.address, "C8:47:80:12:34:56");
        assert_eq!(config.influxdb.bucket, "roof");
        assert_eq!(config.poll.interval_secs, 5);
        assert_eq!(config.influxdb.url, "http://127.0.0.1:8086");
    }
}
