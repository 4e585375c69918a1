//! Periodic garbage collection of stale correlation carriers.

use crate::correlation::table::CorrelationTable;
use crate::observability::events;
use crate::runtime::worker_runtime::spawn_worker_thread;
use std::fmt::Debug;
use std::hash::Hash;
use std::io;
use std::sync::{Arc, Weak};
use std::thread::JoinHandle;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, trace, warn};

const COMPONENT: &str = "correlation_sweeper";

/// Owns the sweep thread of one correlation table. Dropping the handle stops
/// the thread without waiting for it.
pub(crate) struct SweeperHandle {
    stop: Option<oneshot::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl SweeperHandle {
    /// Starts sweeping `table` every `period`. The thread exits on its own
    /// once the table has been dropped.
    pub(crate) fn spawn<K, V>(
        table: &Arc<CorrelationTable<K, V>>,
        period: Duration,
    ) -> io::Result<Self>
    where
        K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
        V: Clone + Send + 'static,
    {
        let (stop, stopped) = oneshot::channel();
        let weak = Arc::downgrade(table);
        let thread_name = format!("sweeper-{}", table.name());

        let thread =
            spawn_worker_thread(&thread_name, move || sweep_loop(weak, period, stopped))?;

        Ok(Self {
            stop: Some(stop),
            thread: Some(thread),
        })
    }

    /// Signals the sweep thread and waits for it to exit. The join runs on
    /// the blocking pool so the calling runtime keeps serving other tasks.
    pub(crate) async fn stop(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        let Some(thread) = self.thread.take() else {
            return;
        };
        match tokio::task::spawn_blocking(move || thread.join()).await {
            Ok(Ok(())) => {}
            Ok(Err(_)) => warn!(component = COMPONENT, "sweeper thread panicked"),
            Err(err) => warn!(component = COMPONENT, err = %err, "unable to join sweeper thread"),
        }
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
    }
}

async fn sweep_loop<K, V>(
    table: Weak<CorrelationTable<K, V>>,
    period: Duration,
    mut stopped: oneshot::Receiver<()>,
) where
    K: Eq + Hash + Clone + Debug,
    V: Clone,
{
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = &mut stopped => break,
            _ = ticker.tick() => {
                let Some(table) = table.upgrade() else {
                    break;
                };
                let removed = table.sweep();
                if removed > 0 {
                    debug!(
                        event = events::CORRELATION_SWEPT,
                        component = COMPONENT,
                        table = table.name(),
                        removed,
                        remaining = table.len(),
                        "swept stale carriers"
                    );
                } else {
                    trace!(component = COMPONENT, table = table.name(), "nothing to sweep");
                }
            }
        }
    }

    trace!(component = COMPONENT, "sweep loop exited");
}

#[cfg(test)]
mod tests {
    use super::SweeperHandle;
    use crate::correlation::table::CorrelationTable;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn expired_values_are_collected_by_the_thread() {
        let table: Arc<CorrelationTable<String, u8>> =
            Arc::new(CorrelationTable::new("sweeper-test", Duration::from_millis(30)));
        let sweeper =
            SweeperHandle::spawn(&table, Duration::from_millis(20)).expect("spawn sweeper");

        table.deliver("m3".to_string(), 1);
        assert!(table.contains(&"m3".to_string()));

        // TTL plus a couple of sweep periods
        tokio::time::sleep(Duration::from_millis(150)).await;

        assert!(!table.contains(&"m3".to_string()));
        sweeper.stop().await;
    }

    #[tokio::test]
    async fn stop_joins_promptly_with_long_period() {
        let table: Arc<CorrelationTable<String, u8>> =
            Arc::new(CorrelationTable::new("sweeper-stop", Duration::from_secs(300)));
        let sweeper =
            SweeperHandle::spawn(&table, Duration::from_secs(300)).expect("spawn sweeper");

        let started = std::time::Instant::now();
        sweeper.stop().await;
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
