//! Timers driving the world from the server loop
//!
//! Both timers are polled from the same `select!` loop that handles packets,
//! so every tick and save runs on the one task that owns the world. Awaiting
//! either timer is cancel safe: dropping the future before it completes
//! leaves the deadline untouched.

use log::debug;
use std::future::pending;
use std::pin::Pin;
use std::time::Duration;
use tokio::time::{sleep, Instant, Sleep};

/// Repeating timer reporting the measured time between firings
pub struct Ticker {
    period: Duration,
    last_tick: Instant,
    sleep: Pin<Box<Sleep>>,
}

impl Ticker {
    /// Arms the first firing one period from now
    pub fn start(period: Duration) -> Self {
        let now = Instant::now();
        Self {
            period,
            last_tick: now,
            sleep: Box::pin(tokio::time::sleep_until(now + period)),
        }
    }

    /// Waits for the next firing and returns the time since the previous one.
    ///
    /// The next deadline is counted from the moment this firing is observed.
    pub async fn tick(&mut self) -> Duration {
        self.sleep.as_mut().await;

        let now = Instant::now();
        let elapsed = now.duration_since(self.last_tick);
        self.last_tick = now;
        self.sleep.as_mut().reset(now + self.period);

        if elapsed > self.period * 2 {
            debug!(
                "Tick late: {} ms elapsed for a {} ms period",
                elapsed.as_millis(),
                self.period.as_millis()
            );
        }
        elapsed
    }
}

/// One-time timer that can be re-armed after it fires
pub struct SingleShot {
    period: Duration,
    sleep: Option<Pin<Box<Sleep>>>,
}

impl SingleShot {
    /// Creates a disarmed timer
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            sleep: None,
        }
    }

    /// Schedules a firing one period from now, replacing any pending one
    pub fn arm(&mut self) {
        self.sleep = Some(Box::pin(sleep(self.period)));
    }

    pub fn is_armed(&self) -> bool {
        self.sleep.is_some()
    }

    /// Completes when the armed timer fires; pends forever while disarmed
    pub async fn fired(&mut self) {
        match self.sleep.as_mut() {
            Some(timer) => {
                timer.as_mut().await;
                self.sleep = None;
            }
            None => pending::<()>().await,
        }
    }
}

/// Waits on an optional ticker, pending forever when there is none
pub async fn next_tick(ticker: &mut Option<Ticker>) -> Duration {
    match ticker {
        Some(ticker) => ticker.tick().await,
        None => pending().await,
    }
}
