use core::fmt::Debug;

use embassy_time::Timer;
use log::{LevelFilter, error};

// 1602 backpack on I2C0: SDA=GPIO8, SCL=GPIO9
pub(super) const LCD_I2C_KHZ: u32 = 100;
pub(super) const LCD_ADDRESS: u8 = 0x27;

// DS1302: CE=GPIO4, SCLK=GPIO5, IO=GPIO6
// Button divider on GPIO1 (ADC1 channel 0).

/// 12-bit reading above which the button counts as pressed; a press pulls
/// the divider close to the rail.
pub(super) const BUTTON_THRESHOLD: u16 = 4_000;

#[cfg(debug_assertions)]
pub(super) const LOG_LEVEL: LevelFilter = LevelFilter::Debug;
#[cfg(not(debug_assertions))]
pub(super) const LOG_LEVEL: LevelFilter = LevelFilter::Warn;

/// Parks the firmware after a boot stage it cannot continue without.
pub(super) async fn halt<E: Debug>(stage: &str, err: E) -> ! {
    error!("boot: {} failed: {:?}", stage, err);
    loop {
        Timer::after_secs(1).await;
    }
}
