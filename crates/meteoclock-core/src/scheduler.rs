//! Cooperative dispatcher over the clock render, full-sync and button timers.

use log::{debug, info, warn};

use crate::{
    clock::{ClockStore, IntervalTimer, Monotonic},
    config::{AppConfig, Timing},
    display::{ClockRedraw, DisplayState, DisplaySurface},
    input::ButtonInput,
    sync::{SyncResult, Synchronizer},
};

/// Pause between passes so the network runner gets polled.
pub const IDLE_MS: u64 = 1;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SyncTimers {
    pub clock_check: IntervalTimer,
    pub full_sync: IntervalTimer,
    pub button: IntervalTimer,
}

impl SyncTimers {
    pub const fn new(timing: &Timing) -> Self {
        Self {
            clock_check: IntervalTimer::new(timing.clock_check_ms),
            full_sync: IntervalTimer::new(timing.sync_interval_ms),
            button: IntervalTimer::new(timing.debounce_ms),
        }
    }
}

/// What one pass did.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PassReport {
    pub redraw: ClockRedraw,
    pub sync: Option<SyncResult>,
    /// New backlight state when the button toggled it.
    pub backlight: Option<bool>,
}

pub struct Scheduler<C, D, B, M> {
    clock: C,
    display: D,
    button: B,
    ticker: M,
    state: DisplayState,
    timers: SyncTimers,
    button_threshold: u16,
    button_held: bool,
}

impl<C, D, B, M> Scheduler<C, D, B, M>
where
    C: ClockStore,
    D: DisplaySurface,
    B: ButtonInput,
    M: Monotonic,
{
    pub fn new(clock: C, display: D, button: B, ticker: M, config: &AppConfig) -> Self {
        Self {
            clock,
            display,
            button,
            ticker,
            state: DisplayState::new(),
            timers: SyncTimers::new(&config.timing),
            button_threshold: config.button_threshold,
            button_held: false,
        }
    }

    /// Backlight on, blank panel, one sync, then the sync window starts.
    pub async fn boot<S>(&mut self, sync: &mut S) -> SyncResult
    where
        S: Synchronizer,
    {
        self.state = DisplayState::new();
        self.display.set_backlight(true);
        self.display.clear();

        let result = sync
            .synchronize(&mut self.clock, &mut self.display, &mut self.state)
            .await;
        self.timers.full_sync.reset(self.ticker.now_ms());
        log_sync("boot", &result);
        result
    }

    /// One pass: clock render, then full-sync, then button.
    pub async fn poll<S>(&mut self, sync: &mut S) -> PassReport
    where
        S: Synchronizer,
    {
        let redraw = self.check_clock();
        let sync = self.check_sync(sync).await;
        let backlight = self.check_button();
        PassReport {
            redraw,
            sync,
            backlight,
        }
    }

    pub async fn run<S>(&mut self, sync: &mut S) -> !
    where
        S: Synchronizer,
    {
        loop {
            self.poll(sync).await;
            self.ticker.sleep_ms(IDLE_MS).await;
        }
    }

    pub fn check_clock(&mut self) -> ClockRedraw {
        if !self.timers.clock_check.fire(self.ticker.now_ms()) {
            return ClockRedraw::Unchanged;
        }

        let now = self.clock.now();
        let redraw = self.state.observe(&now);
        redraw.paint(&mut self.display);
        redraw
    }

    pub async fn check_sync<S>(&mut self, sync: &mut S) -> Option<SyncResult>
    where
        S: Synchronizer,
    {
        if !self.timers.full_sync.elapsed(self.ticker.now_ms()) {
            return None;
        }

        let result = sync
            .synchronize(&mut self.clock, &mut self.display, &mut self.state)
            .await;
        self.timers.full_sync.reset(self.ticker.now_ms());
        log_sync("periodic", &result);
        Some(result)
    }

    /// Toggles the backlight on a debounced press edge.
    pub fn check_button(&mut self) -> Option<bool> {
        let pressed = self.button.sample() > self.button_threshold;
        let edge = pressed && !self.button_held;
        self.button_held = pressed;
        if !edge {
            return None;
        }

        if !self.timers.button.fire(self.ticker.now_ms()) {
            debug!("button: press ignored inside debounce window");
            return None;
        }

        let on = self.state.toggle_backlight();
        self.display.set_backlight(on);
        debug!("button: backlight on={}", on);
        Some(on)
    }

    pub fn state(&self) -> &DisplayState {
        &self.state
    }

    pub fn timers(&self) -> &SyncTimers {
        &self.timers
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn button_mut(&mut self) -> &mut B {
        &mut self.button
    }
}

fn log_sync(trigger: &str, result: &SyncResult) {
    match result {
        Ok(report) => info!("sync: {} sync ok at {}", trigger, report.stamped),
        Err(err) => warn!("sync: {} sync failed token={}", trigger, err.token()),
    }
}
