//! WiFi station bring-up
//!
//! Connection is attempted a fixed number of times; when it keeps failing
//! the device carries on offline.

use embassy_net::Runner;
use embassy_time::{Duration, Timer};
use esp_radio::wifi::{ClientConfig, ModeConfig, WifiController, WifiDevice, WifiError};
use log::{info, warn};

pub const CONNECT_ATTEMPTS: u8 = 20;
pub const CONNECT_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Credentials baked in from `.env` at build time
pub const WIFI_SSID: &str = env!("WIFI_SSID");
pub const WIFI_PASSWORD: &str = env!("WIFI_PASSWORD");

/// Configure station mode with the baked-in credentials and start the radio.
pub async fn start_station(controller: &mut WifiController<'static>) -> Result<(), WifiError> {
    let config = ModeConfig::Client(
        ClientConfig::default()
            .with_ssid(WIFI_SSID.into())
            .with_password(WIFI_PASSWORD.into()),
    );
    controller.set_config(&config)?;
    controller.start_async().await?;
    info!("WiFi station started");
    Ok(())
}

/// Try to associate up to [`CONNECT_ATTEMPTS`] times.
///
/// Returns the error of the last attempt when all of them failed.
pub async fn connect_with_retries(
    controller: &mut WifiController<'static>,
) -> Result<(), WifiError> {
    let mut attempt = 1;
    loop {
        match controller.connect_async().await {
            Ok(()) => {
                info!("WiFi connected to {} (attempt {})", WIFI_SSID, attempt);
                return Ok(());
            }
            Err(e) if attempt < CONNECT_ATTEMPTS => {
                warn!("WiFi attempt {} failed: {:?}", attempt, e);
                attempt += 1;
                Timer::after(CONNECT_RETRY_DELAY).await;
            }
            Err(e) => return Err(e),
        }
    }
}

#[embassy_executor::task]
pub async fn wifi_task(mut controller: WifiController<'static>, auto_connect: bool) {
    if WIFI_SSID.is_empty() {
        info!("No WiFi credentials, running offline");
        return;
    }
    if !auto_connect {
        info!("WiFi auto-connect disabled");
        return;
    }

    if let Err(e) = start_station(&mut controller).await {
        warn!("WiFi start failed: {:?}", e);
        return;
    }
    if let Err(e) = connect_with_retries(&mut controller).await {
        warn!(
            "WiFi unavailable after {} attempts ({:?}), continuing offline",
            CONNECT_ATTEMPTS, e
        );
    }
}

#[embassy_executor::task]
pub async fn net_task(mut runner: Runner<'static, WifiDevice<'static>>) {
    runner.run().await
}
