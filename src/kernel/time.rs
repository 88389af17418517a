use std::time::Duration;

use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::info;

use super::reactive::{Emitter, ListenerId};

/// Default step cadence for the driver loop.
pub const TICK_MS: u64 = 20;

/// Periodic-callback provider. Listeners receive the elapsed time since the
/// previous step.
#[derive(Debug, Clone, Default)]
pub struct StepTimer {
    emitter: Emitter<Duration>,
}

impl StepTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener(&self, listener: impl Fn(&Duration) + 'static) -> ListenerId {
        self.emitter.add_listener(listener)
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.emitter.remove_listener(id)
    }

    pub fn has_listener(&self, id: ListenerId) -> bool {
        self.emitter.has_listener(id)
    }

    /// Manually advance every listener by `dt`.
    pub fn step(&self, dt: Duration) {
        self.emitter.emit(&dt);
    }

    /// Async driver loop. Never returns; bound it with `tokio::time::timeout`
    /// or `select!`. Must run on the current thread (`LocalSet` or a
    /// `current_thread` runtime) since listeners are not `Send`.
    pub async fn run(&self, period: Duration) {
        info!("Step timer started. Period: {}ms", period.as_millis());

        let mut cadence = interval(period);
        cadence.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut last = Instant::now();
        loop {
            cadence.tick().await;
            let now = Instant::now();
            self.step(now.duration_since(last));
            last = now;
        }
    }
}
