//! Network seams and the bounded polling around them.

pub mod fetch;
pub mod http;
pub mod sntp;

use core::fmt::Debug;

use log::{debug, warn};

use crate::{
    clock::Monotonic,
    config::{Timing, WifiConfig},
};

/// Station-mode WiFi association.
#[allow(async_fn_in_trait)]
pub trait WifiLink {
    type Error: Debug;

    /// Starts associating; returns once the request is issued.
    async fn begin(&mut self, config: &WifiConfig) -> Result<(), Self::Error>;
    async fn is_connected(&mut self) -> bool;
    async fn disconnect(&mut self);
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WifiError {
    /// The radio refused to start the association.
    Rejected,
    Timeout,
}

/// Associates and polls until connected or the ceiling passes.
///
/// Returns the milliseconds spent waiting.
pub async fn associate<W, M>(
    link: &mut W,
    ticker: &M,
    config: &WifiConfig,
    timing: &Timing,
) -> Result<u64, WifiError>
where
    W: WifiLink,
    M: Monotonic,
{
    if let Err(err) = link.begin(config).await {
        warn!("wifi: begin failed err={:?}", err);
        return Err(WifiError::Rejected);
    }

    let started_ms = ticker.now_ms();
    loop {
        if link.is_connected().await {
            return Ok(ticker.now_ms().saturating_sub(started_ms));
        }
        let waited_ms = ticker.now_ms().saturating_sub(started_ms);
        if waited_ms >= timing.wifi_timeout_ms {
            debug!("wifi: no association after {}ms", waited_ms);
            return Err(WifiError::Timeout);
        }
        ticker.sleep_ms(timing.wifi_poll_ms).await;
    }
}
