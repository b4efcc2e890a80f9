//! Scripted stand-ins for every hardware and network seam.

use core::cell::Cell;

use crate::{
    clock::{ClockStore, Monotonic, Timestamp},
    config::WifiConfig,
    display::{COLUMNS, DisplaySurface, DisplayState, ROWS},
    input::ButtonInput,
    net::{WifiLink, fetch::HttpsTransport, fetch::TrustAnchor, sntp::TimeSyncClient},
    sync::{SyncResult, Synchronizer},
};

/// Millisecond ticker whose sleeps advance time instantly.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: Cell<u64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, ms: u64) {
        self.now_ms.set(self.now_ms.get() + ms);
    }
}

impl Monotonic for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.get()
    }

    async fn sleep_ms(&self, ms: u64) {
        self.advance(ms);
    }
}

#[derive(Debug)]
pub struct FakeRtc {
    pub now: Timestamp,
    pub sets: Vec<Timestamp>,
    pub reads: usize,
}

impl FakeRtc {
    pub fn at(now: Timestamp) -> Self {
        Self {
            now,
            sets: Vec::new(),
            reads: 0,
        }
    }

    /// Moves the stored time forward like a running oscillator.
    pub fn tick(&mut self, secs: i64) {
        let unix = self.now.to_unix(0) + secs;
        self.now = Timestamp::from_unix(unix as u64, 0);
    }
}

impl ClockStore for FakeRtc {
    fn now(&mut self) -> Timestamp {
        self.reads += 1;
        self.now
    }

    fn set(&mut self, timestamp: Timestamp) {
        self.sets.push(timestamp);
        self.now = timestamp;
    }
}

/// 16x2 character grid that records every write.
#[derive(Debug)]
pub struct GridDisplay {
    cells: [[char; COLUMNS as usize]; ROWS as usize],
    pub writes: Vec<(u8, u8, String)>,
    pub backlight: bool,
    pub clears: usize,
}

impl Default for GridDisplay {
    fn default() -> Self {
        Self {
            cells: [[' '; COLUMNS as usize]; ROWS as usize],
            writes: Vec::new(),
            backlight: false,
            clears: 0,
        }
    }
}

impl GridDisplay {
    pub fn row(&self, row: u8) -> String {
        self.cells[row as usize].iter().collect()
    }

    pub fn text_at(&self, row: u8, col: u8, len: usize) -> String {
        self.cells[row as usize][col as usize..]
            .iter()
            .take(len)
            .collect()
    }
}

impl DisplaySurface for GridDisplay {
    fn write_at(&mut self, row: u8, col: u8, text: &str) {
        self.writes.push((row, col, text.to_string()));
        if row >= ROWS {
            return;
        }
        for (offset, ch) in text.chars().enumerate() {
            let cell = col as usize + offset;
            if cell >= COLUMNS as usize {
                break;
            }
            self.cells[row as usize][cell] = ch;
        }
    }

    fn set_backlight(&mut self, on: bool) {
        self.backlight = on;
    }

    fn clear(&mut self) {
        self.clears += 1;
        self.cells = [[' '; COLUMNS as usize]; ROWS as usize];
    }
}

#[derive(Debug, Default)]
pub struct ScriptedWifi {
    /// Poll count after which the link reports connected; `None` never connects.
    connect_after: Option<usize>,
    reject: bool,
    pub begins: usize,
    pub polls: usize,
    pub disconnects: usize,
}

impl ScriptedWifi {
    pub fn connects_after(polls: usize) -> Self {
        Self {
            connect_after: Some(polls),
            ..Self::default()
        }
    }

    pub fn never_connects() -> Self {
        Self::default()
    }

    pub fn rejects() -> Self {
        Self {
            reject: true,
            ..Self::default()
        }
    }
}

impl WifiLink for ScriptedWifi {
    type Error = &'static str;

    async fn begin(&mut self, _config: &WifiConfig) -> Result<(), Self::Error> {
        self.begins += 1;
        self.polls = 0;
        if self.reject {
            return Err("radio busy");
        }
        Ok(())
    }

    async fn is_connected(&mut self) -> bool {
        self.polls += 1;
        self.connect_after.is_some_and(|after| self.polls > after)
    }

    async fn disconnect(&mut self) {
        self.disconnects += 1;
    }
}

#[derive(Debug, Default)]
pub struct ScriptedTime {
    settle_after: usize,
    pub unix: u64,
    pub starts: usize,
    polls: usize,
}

impl ScriptedTime {
    /// Reports zero for `polls` reads, then `unix`.
    pub fn settles_after(polls: usize, unix: u64) -> Self {
        Self {
            settle_after: polls,
            unix,
            ..Self::default()
        }
    }

    pub fn stuck_at(unix: u64) -> Self {
        Self::settles_after(0, unix)
    }
}

impl TimeSyncClient for ScriptedTime {
    async fn start(&mut self, _servers: &[&str]) {
        self.starts += 1;
        self.polls = 0;
    }

    async fn unix_seconds(&mut self) -> u64 {
        self.polls += 1;
        if self.polls > self.settle_after {
            self.unix
        } else {
            0
        }
    }
}

#[derive(Debug, Default)]
pub struct CannedTransport {
    reply: Option<Vec<u8>>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub request: Vec<u8>,
    pub exchanges: usize,
}

impl CannedTransport {
    pub fn replying(reply: &[u8]) -> Self {
        Self {
            reply: Some(reply.to_vec()),
            ..Self::default()
        }
    }

    /// 200 response wrapping `body`.
    pub fn ok_json(body: &str) -> Self {
        Self::replying(format!("HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n\r\n{body}").as_bytes())
    }

    pub fn failing() -> Self {
        Self::default()
    }
}

impl HttpsTransport for CannedTransport {
    type Error = &'static str;

    async fn exchange(
        &mut self,
        host: &str,
        port: u16,
        _trust: &TrustAnchor,
        request: &[u8],
        response: &mut [u8],
    ) -> Result<usize, Self::Error> {
        self.exchanges += 1;
        self.host = Some(host.to_string());
        self.port = Some(port);
        self.request = request.to_vec();

        let reply = self.reply.as_deref().ok_or("handshake failed")?;
        let len = reply.len().min(response.len());
        response[..len].copy_from_slice(&reply[..len]);
        Ok(len)
    }
}

#[derive(Debug, Default)]
pub struct FixedButton {
    pub level: u16,
    pub samples: usize,
}

impl ButtonInput for FixedButton {
    fn sample(&mut self) -> u16 {
        self.samples += 1;
        self.level
    }
}

/// Synchronizer that only counts runs and lets time pass.
#[derive(Debug)]
pub struct CountingSync<'a> {
    ticker: &'a ManualClock,
    duration_ms: u64,
    result: SyncResult,
    pub runs: usize,
}

impl<'a> CountingSync<'a> {
    pub fn new(ticker: &'a ManualClock, duration_ms: u64, result: SyncResult) -> Self {
        Self {
            ticker,
            duration_ms,
            result,
            runs: 0,
        }
    }
}

impl Synchronizer for CountingSync<'_> {
    async fn synchronize<C, D>(
        &mut self,
        _clock: &mut C,
        _display: &mut D,
        _state: &mut DisplayState,
    ) -> SyncResult
    where
        C: ClockStore,
        D: DisplaySurface,
    {
        self.runs += 1;
        self.ticker.advance(self.duration_ms);
        self.result
    }
}
