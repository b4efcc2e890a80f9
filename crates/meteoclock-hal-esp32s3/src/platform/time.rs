use embassy_time::{Instant, Timer};
use meteoclock_core::clock::Monotonic;

/// Monotonic ticks from the embassy time driver.
#[derive(Clone, Copy, Debug, Default)]
pub struct EmbassyTicker;

impl Monotonic for EmbassyTicker {
    fn now_ms(&self) -> u64 {
        Instant::now().as_millis()
    }

    async fn sleep_ms(&self, ms: u64) {
        Timer::after_millis(ms).await;
    }
}
