//! Talk to a LiTime solar charge controller over Bluetooth Low Energy.
//!
//! The controller exposes a serial-over-BLE characteristic. A Modbus-like
//! read request written to it is answered by notifications on the same
//! characteristic: first an acknowledgement of the write, then the telemetry
//! frame. See [`crate::message::telemetry`] for the frame layout.

use anyhow::anyhow;
use bluest::Adapter;
use bluest::AdvertisingDevice;
use bluest::Characteristic;
use bluest::Device;
use futures_util::Stream;
use futures_util::StreamExt;
use log::{info, warn};
use tokio::time::timeout;

use crate::config::DeviceConfig;
use crate::message::request;

pub struct ControllerClient {
    adapter: Adapter,
    device: Device,
    characteristic: Characteristic,
}

impl ControllerClient {
    const CONNECT_RETRIES: u32 = 2;

    /// Create a new `ControllerClient`, which includes attempting to discover the device.
    pub async fn new(config: &DeviceConfig) -> anyhow::Result<Self> {
        let service_id = config.service_id()?;
        let characteristic_id = config.characteristic_id()?;

        let adapter = bluest::Adapter::default()
            .await
            .ok_or(anyhow!("Default adapter not found"))?;
        adapter.wait_available().await?;

        info!("scanning for controller");
        let device = timeout(config.scan_timeout(), Self::discover_device(config, &adapter))
            .await
            .map_err(|_| anyhow!("Device not found"))??;

        adapter.connect_device(&device.device).await?;
        let name = device.device.name_async().await.unwrap_or_else(|_| config.address.clone());
        info!("connected to {name}");

        let service = device
            .device
            .discover_services_with_uuid(service_id)
            .await?
            .first()
            .ok_or(anyhow!("The specified device does not expose service {service_id}."))?
            .clone();
        let characteristic = service
            .discover_characteristics_with_uuid(characteristic_id)
            .await?
            .first()
            .ok_or(anyhow!("The specified device does not expose characteristic {characteristic_id}."))?
            .clone();
        info!("found characteristic {characteristic_id}");

        Ok(Self { adapter, device: device.device, characteristic })
    }

    /// Disconnect from the controller
    pub async fn stop(self) -> anyhow::Result<()> {
        self.adapter.disconnect_device(&self.device).await?;
        Ok(())
    }

    /// Subscribe to the notifications of the telemetry characteristic
    pub async fn notifications(
        &self,
    ) -> anyhow::Result<impl Stream<Item = Result<Vec<u8>, bluest::Error>> + Send + Unpin + '_> {
        Ok(self.characteristic.notify().await?)
    }

    /// Ask the controller for a telemetry frame.
    ///
    /// The answer arrives as notifications, see [`Self::notifications`].
    pub async fn poll(&self) -> anyhow::Result<()> {
        self.write(&request::POLL).await
    }

    #[cfg(target_os = "linux")]
    async fn write(&self, data: &[u8]) -> anyhow::Result<()> {
        self.characteristic.write_without_response(data).await?;
        Ok(())
    }

    #[cfg(not(target_os = "linux"))]
    async fn write(&self, data: &[u8]) -> anyhow::Result<()> {
        self.characteristic.write(data).await?;
        Ok(())
    }

    async fn discover_device(config: &DeviceConfig, adapter: &Adapter) -> anyhow::Result<AdvertisingDevice> {
        let mut adapter_events = adapter.scan(&[]).await?;
        while let Some(device) = adapter_events.next().await {
            let name = device.adv_data.local_name.clone();
            let id = format!("{:?}", device.device.id());
            info!("found device {id} name={name:?} rssi={:?}", device.rssi);
            if Self::is_target(config, name.as_deref(), &id) {
                return Ok(device);
            }
        }

        Err(anyhow!("Device not found"))
    }

    /// Match on the advertised name when one is configured, otherwise on the address
    fn is_target(config: &DeviceConfig, name: Option<&str>, id: &str) -> bool {
        match &config.name {
            Some(wanted) => name == Some(wanted.as_str()),
            None => id.to_ascii_uppercase().contains(&config.address.to_ascii_uppercase()),
        }
    }

    pub async fn try_connect(&self) -> anyhow::Result<()> {
        if !self.device.is_connected().await {
            let mut retries = Self::CONNECT_RETRIES;
            loop {
                match self.adapter.connect_device(&self.device).await {
                    Ok(()) => return Ok(()),
                    Err(err) if retries > 0 => {
                        warn!("failed to connect: {err}");
                        retries -= 1;
                    }
                    Err(err) => return Err(err.into()),
                }
            }
        }

        Ok(())
    }
}

#[test]
fn test_is_target_by_address() {
    let config = DeviceConfig { address: "c8:47:80:12:34:56".to_string(), ..DeviceConfig::default() };
    assert!(ControllerClient::is_target(&config, None, "DeviceId(C8:47:80:12:34:56)"));
    assert!(!ControllerClient::is_target(&config, Some("BT-TH"), "DeviceId(C8:47:80:12:34:57)"));
}

#[test]
fn test_is_target_by_name() {
    let config = DeviceConfig { name: Some("BT-TH-6C1A".to_string()), ..DeviceConfig::default() };
    assert!(ControllerClient::is_target(&config, Some("BT-TH-6C1A"), "DeviceId(00:00:00:00:00:00)"));
    assert!(!ControllerClient::is_target(&config, None, "DeviceId(00:00:00:00:00:00)"));
}
