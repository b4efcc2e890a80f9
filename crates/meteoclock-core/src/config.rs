//! Injected configuration: credentials, endpoint, zone offset and timings.

pub const OPEN_METEO_HOST: &str = "api.open-meteo.com";
pub const HTTPS_PORT: u16 = 443;
pub const DEFAULT_NTP_SERVERS: [&str; 2] = ["pool.ntp.org", "time.nist.gov"];
/// Analog level above which the button counts as pressed (10-bit scale).
pub const DEFAULT_BUTTON_THRESHOLD: u16 = 1_000;

/// Wi-Fi credentials source.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct WifiConfig {
    pub ssid: &'static str,
    pub password: &'static str,
}

impl WifiConfig {
    pub const fn new(ssid: &'static str, password: &'static str) -> Self {
        Self { ssid, password }
    }
}

/// Forecast API location queried for the current temperature.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ForecastEndpoint {
    pub host: &'static str,
    pub port: u16,
    pub latitude: f32,
    pub longitude: f32,
}

impl ForecastEndpoint {
    pub const fn new(latitude: f32, longitude: f32) -> Self {
        Self {
            host: OPEN_METEO_HOST,
            port: HTTPS_PORT,
            latitude,
            longitude,
        }
    }

    pub const fn with_host(mut self, host: &'static str) -> Self {
        self.host = host;
        self
    }
}

/// Loop cadences and network ceilings, all in milliseconds.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Timing {
    pub clock_check_ms: u64,
    pub sync_interval_ms: u64,
    pub debounce_ms: u64,
    pub wifi_timeout_ms: u64,
    pub wifi_poll_ms: u64,
    pub time_sync_timeout_ms: u64,
    pub time_sync_poll_ms: u64,
}

impl Timing {
    pub const fn new() -> Self {
        Self {
            clock_check_ms: 200,
            sync_interval_ms: 30 * 60 * 1_000,
            debounce_ms: 300,
            wifi_timeout_ms: 30_000,
            wifi_poll_ms: 500,
            time_sync_timeout_ms: 30_000,
            time_sync_poll_ms: 500,
        }
    }

    pub const fn with_sync_interval_ms(mut self, sync_interval_ms: u64) -> Self {
        self.sync_interval_ms = sync_interval_ms;
        self
    }
}

impl Default for Timing {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything the scheduler and the sync sequence need from the deployment.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AppConfig {
    pub wifi: WifiConfig,
    pub endpoint: ForecastEndpoint,
    pub ntp_servers: [&'static str; 2],
    /// Fixed local zone offset applied to network time before stamping the RTC.
    pub utc_offset_secs: i32,
    pub timing: Timing,
    pub button_threshold: u16,
}

impl AppConfig {
    pub const fn new(wifi: WifiConfig, endpoint: ForecastEndpoint) -> Self {
        Self {
            wifi,
            endpoint,
            ntp_servers: DEFAULT_NTP_SERVERS,
            utc_offset_secs: 0,
            timing: Timing::new(),
            button_threshold: DEFAULT_BUTTON_THRESHOLD,
        }
    }

    pub const fn with_utc_offset_secs(mut self, utc_offset_secs: i32) -> Self {
        self.utc_offset_secs = utc_offset_secs;
        self
    }

    pub const fn with_ntp_servers(mut self, ntp_servers: [&'static str; 2]) -> Self {
        self.ntp_servers = ntp_servers;
        self
    }

    pub const fn with_timing(mut self, timing: Timing) -> Self {
        self.timing = timing;
        self
    }

    pub const fn with_button_threshold(mut self, button_threshold: u16) -> Self {
        self.button_threshold = button_threshold;
        self
    }
}
