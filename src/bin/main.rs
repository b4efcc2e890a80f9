#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
#![deny(clippy::large_stack_frames)]

use ds1302::Ds1302;
use embassy_executor::Spawner;
use esp_hal::{
    analog::adc::{Adc, AdcConfig, Attenuation},
    clock::CpuClock,
    delay::Delay,
    gpio::{Flex, Level, Output, OutputConfig},
    i2c::master::{Config as I2cConfig, I2c},
    rng::Rng,
    time::Rate,
    timer::timg::TimerGroup,
};
use hd44780_i2c::{Config as LcdConfig, Hd44780};
use log::{info, warn};
use mbedtls_rs::Tls;
use meteoclock_core::{
    config::{AppConfig, ForecastEndpoint, WifiConfig},
    net::fetch::TrustAnchor,
    scheduler::Scheduler,
    sync::{RESPONSE_MAX, SyncOrchestrator},
};
use meteoclock_hal_esp32s3::{
    input::button::AnalogButton,
    network::{EspWifiLink, https::HttpsClient, sntp::SntpClient},
    platform::{display::LcdSurface, time::EmbassyTicker},
    rtc::{Ds1302Clock, FlexLine},
};
use static_cell::StaticCell;

use board::halt;

#[path = "main/board.rs"]
mod board;

const WIFI_SSID: &str = env!(
    "METEOCLOCK_WIFI_SSID",
    "Set METEOCLOCK_WIFI_SSID in your environment before building/flashing."
);
const WIFI_PASSWORD: &str = env!(
    "METEOCLOCK_WIFI_PASSWORD",
    "Set METEOCLOCK_WIFI_PASSWORD in your environment before building/flashing."
);

// Omsk, UTC+6 all year.
const LATITUDE: f32 = 55.0529;
const LONGITUDE: f32 = 74.5751;
const UTC_OFFSET_SECS: i32 = 6 * 3_600;

const APP_CONFIG: AppConfig = AppConfig::new(
    WifiConfig::new(WIFI_SSID, WIFI_PASSWORD),
    ForecastEndpoint::new(LATITUDE, LONGITUDE),
)
.with_utc_offset_secs(UTC_OFFSET_SECS)
.with_button_threshold(board::BUTTON_THRESHOLD);

const FORECAST_TRUST: TrustAnchor = TrustAnchor::from_pem(
    concat!(include_str!("../../certs/isrg-root-x1.pem"), "\0").as_bytes(),
);

const TCP_BUFFER_BYTES: usize = 4_096;

static NET_RESOURCES: StaticCell<embassy_net::StackResources<4>> = StaticCell::new();
static TCP_RX_BUFFER: StaticCell<[u8; TCP_BUFFER_BYTES]> = StaticCell::new();
static TCP_TX_BUFFER: StaticCell<[u8; TCP_BUFFER_BYTES]> = StaticCell::new();

#[panic_handler]
fn panic(_: &core::panic::PanicInfo) -> ! {
    loop {}
}

// This creates a default app-descriptor required by the esp-idf bootloader.
// For more information see: <https://docs.espressif.com/projects/esp-idf/en/stable/esp32/api-reference/system/app_image_format.html#application-description>
esp_bootloader_esp_idf::esp_app_desc!();

#[allow(
    clippy::large_stack_frames,
    reason = "it's not unusual to allocate larger buffers etc. in main"
)]
#[esp_rtos::main]
async fn main(_spawner: Spawner) -> ! {
    esp_println::logger::init_logger(board::LOG_LEVEL);
    esp_println::println!("boot: meteoclock starting");

    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    // esp-radio and the TLS session both allocate.
    esp_alloc::heap_allocator!(#[esp_hal::ram(reclaimed)] size: 65536);
    esp_alloc::heap_allocator!(size: 48 * 1024);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    let i2c = match I2c::new(
        peripherals.I2C0,
        I2cConfig::default().with_frequency(Rate::from_khz(board::LCD_I2C_KHZ)),
    ) {
        Ok(i2c) => i2c.with_sda(peripherals.GPIO8).with_scl(peripherals.GPIO9),
        Err(err) => halt("lcd i2c config", err).await,
    };
    let lcd = Hd44780::new(i2c, LcdConfig::default().with_address(board::LCD_ADDRESS));
    let mut display = LcdSurface::new(lcd, Delay::new());
    if let Err(err) = display.initialize() {
        warn!("boot: lcd init failed: {:?}", err);
    }

    let ce = Output::new(peripherals.GPIO4, Level::Low, OutputConfig::default());
    let sclk = Output::new(peripherals.GPIO5, Level::Low, OutputConfig::default());
    let io = FlexLine::new(Flex::new(peripherals.GPIO6));
    let mut clock = Ds1302Clock::new(Ds1302::new(ce, sclk, io, Delay::new()));
    clock.initialize();

    let mut adc_config = AdcConfig::new();
    let button_pin = adc_config.enable_pin(peripherals.GPIO1, Attenuation::_11dB);
    let button = AnalogButton::new(Adc::new(peripherals.ADC1, adc_config), button_pin);

    let radio = match esp_radio::init() {
        Ok(radio) => radio,
        Err(err) => halt("esp-radio init", err).await,
    };
    let (wifi_controller, interfaces) =
        match esp_radio::wifi::new(&radio, peripherals.WIFI, esp_radio::wifi::Config::default()) {
            Ok(parts) => parts,
            Err(err) => halt("wifi peripheral init", err).await,
        };

    let stack_config = embassy_net::Config::dhcpv4(Default::default());
    let (stack, mut net_runner) = embassy_net::new(
        interfaces.sta,
        stack_config,
        NET_RESOURCES.init(embassy_net::StackResources::<4>::new()),
        0x6D37_C10C_4E7A_0B55,
    );

    let mut rng = Rng::new();
    let tls = match Tls::new(&mut rng) {
        Ok(tls) => tls,
        Err(err) => halt("tls init", err).await,
    };
    let https = HttpsClient::new(
        stack,
        tls.reference(),
        TCP_RX_BUFFER.init([0; TCP_BUFFER_BYTES]),
        TCP_TX_BUFFER.init([0; TCP_BUFFER_BYTES]),
    );

    let mut sync = SyncOrchestrator::new(
        EspWifiLink::new(wifi_controller, stack),
        SntpClient::new(stack),
        https,
        EmbassyTicker,
        APP_CONFIG,
        FORECAST_TRUST,
    );
    let mut scheduler = Scheduler::new(clock, display, button, EmbassyTicker, &APP_CONFIG);

    info!(
        "meteoclock started: lat={} lon={} utc_offset_s={} sync_interval_ms={} response_max={}",
        LATITUDE,
        LONGITUDE,
        UTC_OFFSET_SECS,
        APP_CONFIG.timing.sync_interval_ms,
        RESPONSE_MAX
    );
    info!("LCD pins: SDA=GPIO8 SCL=GPIO9 addr=0x{:02x}", board::LCD_ADDRESS);
    info!("RTC pins: CE=GPIO4 SCLK=GPIO5 IO=GPIO6");
    info!("Button pin: GPIO1 threshold={}", board::BUTTON_THRESHOLD);

    let net_future = net_runner.run();
    let app_future = async {
        let _ = scheduler.boot(&mut sync).await;
        scheduler.run(&mut sync).await
    };

    let _ = embassy_futures::join::join(net_future, app_future).await;
    unreachable!()
}
