//! Read telemetry from LiTime solar charge controllers over Bluetooth Low Energy
//!
//! The controller speaks a Modbus-like request-response protocol on a single
//! BLE characteristic. Writing [`message::request::POLL`] makes it notify an
//! acknowledgement and then a telemetry frame, which [`decode`] turns into a
//! [`Sample`]:
//!
//! - Battery voltage (V), current (A) and charge power (W)
//! - Controller temperature (ºC)
//! - Load voltage (V), current (A) and power (W)
//! - Panel voltage (V)
//! - Max charge power today (W), energy today (Wh), total energy (Wh)
//! - Running days
//!
//! Decoding is pure, so it can be used without a radio:
//!
//! ```rust
//! let mut frame = vec![0u8; 42];
//! frame[0..2].copy_from_slice(&[0x01, 0x03]);
//! frame[5..7].copy_from_slice(&150u16.to_be_bytes());
//!
//! let sample = litime_monitor::decode(&frame).unwrap().unwrap();
//! assert_eq!(sample.battery_voltage, 15.0);
//!
//! // The controller acknowledges every poll write; that is not a reading
//! assert_eq!(litime_monitor::decode(&[0x01, 0x06]), Ok(None));
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! # use litime_monitor::{Config, ControllerClient, InfluxDbSink, Monitor};
//! #
//! # #[tokio::main]
//! # pub async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     let client = ControllerClient::new(&config.device).await?;
//!     let mut monitor = Monitor::new(InfluxDbSink::new(&config.influxdb)?);
//!     monitor.run(&client, config.poll.interval()).await
//! # }
//! ```

pub mod config;
mod controller_client;
mod error;
pub mod message;
mod monitor;
mod sample;
pub mod sink;

pub use config::Config;
pub use controller_client::ControllerClient;
pub use error::DecodeError;
pub use message::telemetry::{decode, TelemetryMessage};
pub use monitor::{Monitor, Outcome};
pub use sample::Sample;
pub use sink::{InfluxDbSink, Sink};
