use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};

/// Cadence of the simulated loading progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressPolicy {
    pub tick_ms: u64,
    /// Percent added per tick.
    pub step: u8,
    /// Progress never passes this while a fetch is outstanding.
    pub cap: u8,
}

impl Default for ProgressPolicy {
    fn default() -> Self {
        Self {
            tick_ms: 100,
            step: 5,
            cap: 95,
        }
    }
}

impl ProgressPolicy {
    /// Next progress value after one tick.
    pub fn advance(&self, progress: u8) -> u8 {
        if progress >= self.cap {
            progress
        } else {
            progress.saturating_add(self.step).min(self.cap)
        }
    }
}

/// Repeating progress task. Aborted when dropped.
pub struct ProgressTicker {
    handle: JoinHandle<()>,
}

impl ProgressTicker {
    /// Call `tick` every `policy.tick_ms` until it returns `false` or the ticker is dropped.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<F>(policy: ProgressPolicy, mut tick: F) -> Self
    where
        F: FnMut(&ProgressPolicy) -> bool + Send + 'static,
    {
        let period = Duration::from_millis(policy.tick_ms.max(1));
        let handle = tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            loop {
                interval.tick().await;
                if !tick(&policy) {
                    break;
                }
            }
        });
        Self { handle }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for ProgressTicker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
