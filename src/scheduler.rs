//! Fixed-period tick driver with flag-based shutdown.
//!
//! ```text
//! Idle --run--> Running --shutdown flag / tick limit--> ShuttingDown
//!                                       --finish--> Terminated
//! ```
//!
//! Ticks run synchronously on the timer task, so two ticks never overlap.
//! Firings missed while a tick runs long are skipped, not queued.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::error::TickError;

/// Work executed once per timer firing
pub trait TickTask {
    fn name(&self) -> &str;

    fn execute(&mut self) -> Result<(), TickError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
    ShuttingDown,
    Terminated,
}

/// Counts from one `run`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub ticks: u64,
    pub failed: u64,
}

pub struct Scheduler {
    period: Duration,
    running: Arc<AtomicBool>,
    max_ticks: Option<u64>,
    state: SchedulerState,
}

impl Scheduler {
    /// `running` is cleared by the interrupt handler to request shutdown
    pub fn new(period: Duration, running: Arc<AtomicBool>) -> Self {
        Self {
            period,
            running,
            max_ticks: None,
            state: SchedulerState::Idle,
        }
    }

    /// Stop on its own after `ticks` firings
    pub fn with_max_ticks(mut self, ticks: Option<u64>) -> Self {
        self.max_ticks = ticks;
        self
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Drive `task` until shutdown is requested or the tick limit is hit.
    /// Leaves the scheduler in `ShuttingDown`; the caller tears down its
    /// resources and then calls `finish`.
    pub async fn run(&mut self, task: &mut dyn TickTask) -> RunStats {
        let mut stats = RunStats::default();
        if self.state != SchedulerState::Idle {
            warn!("Scheduler already ran ({:?}); not starting again", self.state);
            return stats;
        }

        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        self.state = SchedulerState::Running;
        info!(
            "Running {} every {} ms",
            task.name(),
            self.period.as_millis()
        );

        while self.running.load(Ordering::SeqCst) {
            if self.max_ticks.is_some_and(|max| stats.ticks >= max) {
                break;
            }
            interval.tick().await;
            if !self.running.load(Ordering::SeqCst) {
                break;
            }

            stats.ticks += 1;
            if let Err(e) = task.execute() {
                stats.failed += 1;
                warn!("Tick {} skipped: {}", stats.ticks, e);
            }
        }

        self.state = SchedulerState::ShuttingDown;
        info!(
            "Stopping after {} ticks ({} failed)",
            stats.ticks, stats.failed
        );
        stats
    }

    /// Mark teardown complete
    pub fn finish(&mut self) {
        self.state = SchedulerState::Terminated;
    }
}
