//! # Periodic Tasks
//!
//! Fixed-cadence task loop shared by every sampler. The cadence is a value the
//! task reports, not an inline delay, so it comes straight from configuration.

use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::info;

/// A task that runs one cycle of work per period.
#[async_trait]
pub trait PeriodicTask: Send {
    /// Name used in log output
    fn name(&self) -> &'static str;

    /// Time between cycle starts
    fn period(&self) -> Duration;

    /// One unit of work. Must not block the runtime.
    async fn cycle(&mut self);
}

/// Spawn `task` onto the runtime, running [`PeriodicTask::cycle`] every period.
///
/// A cycle that overruns its period delays the following ticks rather than
/// bursting to catch up.
pub fn spawn_periodic<T>(mut task: T) -> JoinHandle<()>
where
    T: PeriodicTask + 'static,
{
    tokio::spawn(async move {
        let period = task.period();
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("Starting {} task every {:?}", task.name(), period);

        loop {
            ticker.tick().await;
            task.cycle().await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Counter {
        cycles: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl PeriodicTask for Counter {
        fn name(&self) -> &'static str {
            "counter"
        }

        fn period(&self) -> Duration {
            Duration::from_millis(10)
        }

        async fn cycle(&mut self) {
            self.cycles.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawn_periodic_runs_at_period() {
        let cycles = Arc::new(AtomicUsize::new(0));
        let handle = spawn_periodic(Counter {
            cycles: Arc::clone(&cycles),
        });

        // Ticks at 0, 10, 20, 30, 40, 50 ms
        tokio::time::sleep(Duration::from_millis(55)).await;
        assert_eq!(cycles.load(Ordering::SeqCst), 6);

        handle.abort();
    }
}
