//! The network sync sequence and its failure tokens.

use log::{info, warn};

use crate::{
    clock::{ClockStore, Monotonic, Timestamp},
    config::AppConfig,
    display::{
        DisplayState, DisplaySurface, STATUS_COL, STATUS_ROW, TEMPERATURE_COL, TEMPERATURE_ROW,
        status_field, temperature_field,
    },
    net::{
        self, WifiLink,
        fetch::{self, HttpsTransport, TrustAnchor},
        sntp::{self, TimeSyncClient},
    },
    weather::{self, TemperatureReading},
};

/// Largest HTTP response the sync accepts, headers included.
pub const RESPONSE_MAX: usize = 4_096;

/// Stage at which a sync attempt stopped.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SyncError {
    Wifi,
    TimeSync,
    Fetch,
    Parse,
}

impl SyncError {
    /// Text shown at row 0, column 0.
    pub const fn token(self) -> &'static str {
        match self {
            Self::Wifi => "WiFi e",
            Self::TimeSync => "NTP e",
            Self::Fetch => "API e",
            Self::Parse => "JSON e",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SyncReport {
    /// Local time written to the clock store.
    pub stamped: Timestamp,
    pub temperature: TemperatureReading,
}

pub type SyncResult = Result<SyncReport, SyncError>;

/// Runs one complete sync attempt and leaves its outcome on the display.
#[allow(async_fn_in_trait)]
pub trait Synchronizer {
    async fn synchronize<C, D>(
        &mut self,
        clock: &mut C,
        display: &mut D,
        state: &mut DisplayState,
    ) -> SyncResult
    where
        C: ClockStore,
        D: DisplaySurface;
}

/// WiFi, network time, RTC stamp, forecast fetch, parse, render.
pub struct SyncOrchestrator<W, T, H, M> {
    wifi: W,
    time: T,
    https: H,
    ticker: M,
    config: AppConfig,
    trust: TrustAnchor,
    response: [u8; RESPONSE_MAX],
}

impl<W, T, H, M> SyncOrchestrator<W, T, H, M>
where
    W: WifiLink,
    T: TimeSyncClient,
    H: HttpsTransport,
    M: Monotonic,
{
    pub fn new(wifi: W, time: T, https: H, ticker: M, config: AppConfig, trust: TrustAnchor) -> Self {
        Self {
            wifi,
            time,
            https,
            ticker,
            config,
            trust,
            response: [0; RESPONSE_MAX],
        }
    }

    /// Gives back the owned collaborators.
    pub fn release(self) -> (W, T, H, M) {
        (self.wifi, self.time, self.https, self.ticker)
    }

    async fn run_stages<C>(&mut self, clock: &mut C, state: &mut DisplayState) -> SyncResult
    where
        C: ClockStore,
    {
        let timing = self.config.timing;

        let waited_ms = net::associate(&mut self.wifi, &self.ticker, &self.config.wifi, &timing)
            .await
            .map_err(|err| {
                warn!("sync: wifi failed err={:?}", err);
                SyncError::Wifi
            })?;
        info!("sync: wifi associated after {}ms", waited_ms);

        let unix = sntp::acquire(
            &mut self.time,
            &self.ticker,
            &self.config.ntp_servers,
            timing.time_sync_timeout_ms,
            timing.time_sync_poll_ms,
        )
        .await
        .map_err(|err| {
            warn!("sync: network time failed err={:?}", err);
            SyncError::TimeSync
        })?;

        let stamped = Timestamp::from_unix(unix, self.config.utc_offset_secs);
        clock.set(stamped);
        state.invalidate_clock();
        info!("sync: clock stamped {}", stamped);

        let body = fetch::fetch(
            &mut self.https,
            &self.config.endpoint,
            &self.trust,
            &mut self.response,
        )
        .await
        .map_err(|err| {
            warn!("sync: fetch failed err={:?}", err);
            SyncError::Fetch
        })?;

        let temperature = weather::parse_current_temperature(body).map_err(|err| {
            warn!("sync: forecast parse failed err={:?}", err);
            SyncError::Parse
        })?;

        Ok(SyncReport {
            stamped,
            temperature,
        })
    }
}

impl<W, T, H, M> Synchronizer for SyncOrchestrator<W, T, H, M>
where
    W: WifiLink,
    T: TimeSyncClient,
    H: HttpsTransport,
    M: Monotonic,
{
    async fn synchronize<C, D>(
        &mut self,
        clock: &mut C,
        display: &mut D,
        state: &mut DisplayState,
    ) -> SyncResult
    where
        C: ClockStore,
        D: DisplaySurface,
    {
        let result = self.run_stages(clock, state).await;

        match result {
            Ok(report) => {
                state.set_temperature(report.temperature);
                display.write_at(STATUS_ROW, STATUS_COL, &status_field(""));
                display.write_at(
                    TEMPERATURE_ROW,
                    TEMPERATURE_COL,
                    &temperature_field(report.temperature),
                );
                info!("sync: temperature {:.1}C", report.temperature.celsius());
            }
            Err(err) => {
                display.write_at(STATUS_ROW, STATUS_COL, &status_field(err.token()));
            }
        }

        self.wifi.disconnect().await;
        result
    }
}

#[cfg(test)]
mod tests {
    use embassy_futures::block_on;

    use super::*;
    use crate::{
        config::{ForecastEndpoint, WifiConfig},
        testing::{CannedTransport, FakeRtc, GridDisplay, ManualClock, ScriptedTime, ScriptedWifi},
    };

    const UNIX: u64 = 1_700_000_000;
    const OMSK_OFFSET: i32 = 6 * 3_600;
    const TRUST: TrustAnchor = TrustAnchor::from_pem(b"pem\0");

    fn config() -> AppConfig {
        AppConfig::new(
            WifiConfig::new("home", "secret"),
            ForecastEndpoint::new(55.0529, 74.5751),
        )
        .with_utc_offset_secs(OMSK_OFFSET)
    }

    fn orchestrator<'a>(
        wifi: ScriptedWifi,
        time: ScriptedTime,
        https: CannedTransport,
        ticker: &'a ManualClock,
    ) -> SyncOrchestrator<ScriptedWifi, ScriptedTime, CannedTransport, &'a ManualClock> {
        SyncOrchestrator::new(wifi, time, https, ticker, config(), TRUST)
    }

    struct Bench {
        rtc: FakeRtc,
        display: GridDisplay,
        state: DisplayState,
    }

    impl Bench {
        fn new() -> Self {
            Self {
                rtc: FakeRtc::at(Timestamp::new(2000, 1, 1, 0, 0, 0)),
                display: GridDisplay::default(),
                state: DisplayState::new(),
            }
        }

        fn run<S: Synchronizer>(&mut self, sync: &mut S) -> SyncResult {
            block_on(sync.synchronize(&mut self.rtc, &mut self.display, &mut self.state))
        }
    }

    #[test]
    fn successful_sync_stamps_clock_and_renders_temperature() {
        let ticker = ManualClock::new();
        let mut sync = orchestrator(
            ScriptedWifi::connects_after(1),
            ScriptedTime::settles_after(1, UNIX),
            CannedTransport::ok_json(r#"{"current":{"temperature_2m":21.7}}"#),
            &ticker,
        );
        let mut bench = Bench::new();
        bench.display.write_at(0, 0, "NTP e ");

        let report = bench.run(&mut sync).expect("sync succeeds");

        let local = Timestamp::new(2023, 11, 15, 4, 13, 20);
        assert_eq!(report.stamped, local);
        assert_eq!(bench.rtc.sets, vec![local]);
        assert_eq!(bench.display.text_at(0, 10, 6), "21.7°C");
        assert_eq!(bench.display.text_at(0, 0, 6), "      ");
        assert_eq!(bench.state.temperature(), Some(report.temperature));

        let (wifi, _, https, _) = sync.release();
        assert_eq!(wifi.disconnects, 1);
        assert_eq!(https.exchanges, 1);
    }

    #[test]
    fn wifi_timeout_shows_token_and_skips_later_stages() {
        let ticker = ManualClock::new();
        let mut sync = orchestrator(
            ScriptedWifi::never_connects(),
            ScriptedTime::settles_after(0, UNIX),
            CannedTransport::ok_json("{}"),
            &ticker,
        );
        let mut bench = Bench::new();

        assert_eq!(bench.run(&mut sync), Err(SyncError::Wifi));
        assert_eq!(bench.display.text_at(0, 0, 6), "WiFi e");
        assert!(bench.rtc.sets.is_empty());

        let (wifi, time, https, _) = sync.release();
        assert_eq!(wifi.disconnects, 1);
        assert_eq!(time.starts, 0);
        assert_eq!(https.exchanges, 0);
    }

    #[test]
    fn time_sync_timeout_shows_ntp_token() {
        let ticker = ManualClock::new();
        let mut sync = orchestrator(
            ScriptedWifi::connects_after(0),
            ScriptedTime::stuck_at(0),
            CannedTransport::ok_json("{}"),
            &ticker,
        );
        let mut bench = Bench::new();

        assert_eq!(bench.run(&mut sync), Err(SyncError::TimeSync));
        assert_eq!(bench.display.text_at(0, 0, 6), "NTP e ");
        assert!(bench.rtc.sets.is_empty());
        assert_eq!(sync.release().0.disconnects, 1);
    }

    #[test]
    fn fetch_failure_still_keeps_stamped_clock() {
        let ticker = ManualClock::new();
        let mut sync = orchestrator(
            ScriptedWifi::connects_after(0),
            ScriptedTime::settles_after(0, UNIX),
            CannedTransport::replying(b"HTTP/1.1 404 Not Found\r\n\r\n"),
            &ticker,
        );
        let mut bench = Bench::new();

        assert_eq!(bench.run(&mut sync), Err(SyncError::Fetch));
        assert_eq!(bench.display.text_at(0, 0, 6), "API e ");
        assert_eq!(bench.rtc.sets.len(), 1);
        assert_eq!(sync.release().0.disconnects, 1);
    }

    #[test]
    fn parse_failure_keeps_previous_temperature() {
        let ticker = ManualClock::new();
        let mut sync = orchestrator(
            ScriptedWifi::connects_after(0),
            ScriptedTime::settles_after(0, UNIX),
            CannedTransport::ok_json(r#"{"current":{}}"#),
            &ticker,
        );
        let mut bench = Bench::new();
        let previous = TemperatureReading::from_celsius(-3.5);
        bench.state.set_temperature(previous);
        bench.display.write_at(0, 9, &temperature_field(previous));

        assert_eq!(bench.run(&mut sync), Err(SyncError::Parse));
        assert_eq!(bench.display.text_at(0, 0, 6), "JSON e");
        assert_eq!(bench.display.text_at(0, 10, 6), "-3.5°C");
        assert_eq!(bench.state.temperature(), Some(previous));
    }

    #[test]
    fn back_to_back_syncs_are_stable() {
        let ticker = ManualClock::new();
        let mut sync = orchestrator(
            ScriptedWifi::connects_after(0),
            ScriptedTime::settles_after(0, UNIX),
            CannedTransport::ok_json(r#"{"current":{"temperature_2m":21.7}}"#),
            &ticker,
        );
        let mut bench = Bench::new();

        let first = bench.run(&mut sync).expect("first sync");
        sync.time.unix = UNIX + 90;
        let second = bench.run(&mut sync).expect("second sync");

        assert_eq!(first.temperature, second.temperature);
        assert!(first.stamped < second.stamped);
        assert_eq!(bench.display.row(0), "          21.7°C");
    }

    #[test]
    fn tokens_are_distinct_and_fit_the_status_field() {
        let tokens = [
            SyncError::Wifi.token(),
            SyncError::TimeSync.token(),
            SyncError::Fetch.token(),
            SyncError::Parse.token(),
        ];
        for (index, token) in tokens.iter().enumerate() {
            assert!(token.len() <= crate::display::STATUS_WIDTH);
            assert!(!tokens[index + 1..].contains(token));
        }
    }
}
