//! Station-mode WiFi and the sockets the sync sequence runs over.

pub mod https;
pub mod sntp;

use embassy_net::Stack;
use esp_radio::wifi::{ClientConfig, ModeConfig, WifiController, WifiError};
use log::{debug, info};
use meteoclock_core::{config::WifiConfig, net::WifiLink};

/// WiFi association driven on demand by the sync sequence.
///
/// "Connected" means associated with a DHCP lease, since nothing useful
/// can be sent before that.
pub struct EspWifiLink<'a> {
    controller: WifiController<'a>,
    stack: Stack<'a>,
}

impl<'a> EspWifiLink<'a> {
    pub fn new(controller: WifiController<'a>, stack: Stack<'a>) -> Self {
        Self { controller, stack }
    }
}

impl WifiLink for EspWifiLink<'_> {
    type Error = WifiError;

    async fn begin(&mut self, config: &WifiConfig) -> Result<(), Self::Error> {
        let client_config = ClientConfig::default()
            .with_ssid(config.ssid.into())
            .with_password(config.password.into());
        self.controller
            .set_config(&ModeConfig::Client(client_config))?;

        if !self.controller.is_started().unwrap_or(false) {
            self.controller.start_async().await?;
        }

        info!("wifi: associating ssid={}", config.ssid);
        self.controller.connect()
    }

    async fn is_connected(&mut self) -> bool {
        let associated = matches!(self.controller.is_connected(), Ok(true));
        let link_up = self.stack.is_link_up();
        let has_ipv4 = self.stack.config_v4().is_some();
        debug!(
            "wifi: associated={} link_up={} has_ipv4={}",
            associated, link_up, has_ipv4
        );
        associated && link_up && has_ipv4
    }

    async fn disconnect(&mut self) {
        if let Err(err) = self.controller.disconnect_async().await {
            debug!("wifi: disconnect err={:?}", err);
        }
    }
}
