//! Keyed one-shot rendezvous between a producer and any number of waiters.
//!
//! Each key owns one carrier. The carrier is created by whichever side arrives
//! first: a waiter parks a one-shot sender in it, a producer parks the value.
//! The map lock is only held for the find-or-create and remove steps; waiting
//! happens on the one-shot receiver, outside the lock.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::{debug, trace};

use crate::observability::events;

const COMPONENT: &str = "correlation_table";

enum Carrier<V> {
    Waiting(Vec<oneshot::Sender<V>>),
    Filled { value: V, filled_at: Instant },
}

/// Result of handing a value to the table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Waiters were parked on the key and received the value.
    Woken(usize),
    /// Nobody was waiting; the value is kept until claimed or swept.
    Stored,
    /// Waiters had been parked but all of them gave up; the value is kept.
    StoredLate,
    /// A value was already parked under the key and has been overwritten.
    Replaced,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AwaitError {
    TimedOut,
    /// The table was closed while waiting.
    Closed,
}

/// Value-level expiry rule: whether `value` has outlived `ttl`.
pub type ExpiryCheck<V> = fn(&V, Duration) -> bool;

pub struct CorrelationTable<K, V> {
    name: String,
    ttl: Duration,
    expiry: Option<ExpiryCheck<V>>,
    carriers: Mutex<HashMap<K, Carrier<V>>>,
}

impl<K, V> CorrelationTable<K, V>
where
    K: Eq + Hash + Clone + Debug,
    V: Clone,
{
    /// Table whose parked values expire `ttl` after they were stored.
    pub fn new(name: impl Into<String>, ttl: Duration) -> Self {
        Self {
            name: name.into(),
            ttl,
            expiry: None,
            carriers: Mutex::new(HashMap::new()),
        }
    }

    /// Table whose parked values also expire once `is_expired` reports them
    /// older than `ttl`, e.g. by a timestamp the value carries itself.
    pub fn with_expiry(
        name: impl Into<String>,
        ttl: Duration,
        is_expired: ExpiryCheck<V>,
    ) -> Self {
        Self {
            expiry: Some(is_expired),
            ..Self::new(name, ttl)
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<K, Carrier<V>>> {
        self.carriers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Hands `value` to every live waiter on `key`. Nothing is stored when no
    /// waiter takes it; the value is handed back instead.
    pub fn try_complete(&self, key: &K, value: V) -> Result<usize, V> {
        let mut carriers = self.lock();
        let Some(Carrier::Waiting(senders)) = carriers.get_mut(key) else {
            return Err(value);
        };

        match wake_all(std::mem::take(senders), value) {
            Ok(woken) => {
                carriers.remove(key);
                Ok(woken)
            }
            Err(value) => {
                debug!(
                    event = events::CORRELATION_LATE_DELIVERY,
                    component = COMPONENT,
                    table = %self.name,
                    key = ?key,
                    "all waiters gave up before delivery"
                );
                carriers.remove(key);
                Err(value)
            }
        }
    }

    /// Wakes the waiters on `key`, or parks `value` for a later waiter.
    pub fn deliver(&self, key: K, value: V) -> DeliveryOutcome {
        let mut carriers = self.lock();

        match carriers.entry(key) {
            Entry::Vacant(vacant) => {
                trace!(
                    component = COMPONENT,
                    table = %self.name,
                    key = ?vacant.key(),
                    "parking value"
                );
                vacant.insert(Carrier::Filled {
                    value,
                    filled_at: Instant::now(),
                });
                DeliveryOutcome::Stored
            }
            Entry::Occupied(mut occupied) => match occupied.get_mut() {
                Carrier::Waiting(senders) => match wake_all(std::mem::take(senders), value) {
                    Ok(woken) => {
                        occupied.remove();
                        DeliveryOutcome::Woken(woken)
                    }
                    Err(value) => {
                        debug!(
                            event = events::CORRELATION_LATE_DELIVERY,
                            component = COMPONENT,
                            table = %self.name,
                            key = ?occupied.key(),
                            "all waiters gave up before delivery, keeping value"
                        );
                        occupied.insert(Carrier::Filled {
                            value,
                            filled_at: Instant::now(),
                        });
                        DeliveryOutcome::StoredLate
                    }
                },
                Carrier::Filled { .. } => {
                    occupied.insert(Carrier::Filled {
                        value,
                        filled_at: Instant::now(),
                    });
                    DeliveryOutcome::Replaced
                }
            },
        }
    }

    /// Claims the value for `key`, waiting up to `timeout` for it to arrive.
    /// A zero `timeout` waits without bound.
    pub async fn wait_for(&self, key: K, timeout: Duration) -> Result<V, AwaitError> {
        let mut receiver = {
            let mut carriers = self.lock();
            let (sender, receiver) = oneshot::channel();
            match carriers.remove(&key) {
                Some(Carrier::Filled { value, .. }) => return Ok(value),
                Some(Carrier::Waiting(mut senders)) => {
                    senders.push(sender);
                    carriers.insert(key.clone(), Carrier::Waiting(senders));
                }
                None => {
                    carriers.insert(key.clone(), Carrier::Waiting(vec![sender]));
                }
            }
            receiver
        };

        let received = if timeout.is_zero() {
            (&mut receiver).await.map_err(|_| AwaitError::Closed)
        } else {
            match tokio::time::timeout(timeout, &mut receiver).await {
                Ok(received) => received.map_err(|_| AwaitError::Closed),
                Err(_elapsed) => Err(AwaitError::TimedOut),
            }
        };

        match received {
            Ok(value) => Ok(value),
            Err(err) => {
                // a delivery may have raced the timer; closing first makes any
                // later send fail so the producer sees this waiter as gone
                receiver.close();
                if let Ok(value) = receiver.try_recv() {
                    return Ok(value);
                }
                self.abandon(&key);
                Err(err)
            }
        }
    }

    /// Drops closed waiter slots for `key`, and the carrier once none remain.
    fn abandon(&self, key: &K) {
        let mut carriers = self.lock();
        if let Some(Carrier::Waiting(senders)) = carriers.get_mut(key) {
            senders.retain(|sender| !sender.is_closed());
            if senders.is_empty() {
                carriers.remove(key);
            }
        }
    }

    /// Removes expired parked values and carriers whose waiters have all gone
    /// away. Returns the number of carriers removed.
    ///
    /// A parked value is expired once it has been stored longer than the TTL,
    /// or earlier if the table's expiry check says so.
    pub fn sweep(&self) -> usize {
        let ttl = self.ttl;
        let expiry = self.expiry;
        let mut carriers = self.lock();
        let before = carriers.len();

        carriers.retain(|_, carrier| match carrier {
            Carrier::Filled { value, filled_at } => {
                let value_expired = expiry.is_some_and(|is_expired| is_expired(value, ttl));
                !value_expired && filled_at.elapsed() <= ttl
            }
            Carrier::Waiting(senders) => {
                senders.retain(|sender| !sender.is_closed());
                !senders.is_empty()
            }
        });

        before - carriers.len()
    }

    /// Drops every carrier; parked waiters observe [`AwaitError::Closed`].
    pub fn close(&self) -> usize {
        let mut carriers = self.lock();
        let dropped = carriers.len();
        carriers.clear();
        dropped
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.lock().contains_key(key)
    }

    /// Number of live waiters parked on `key`.
    pub fn waiters(&self, key: &K) -> usize {
        match self.lock().get(key) {
            Some(Carrier::Waiting(senders)) => {
                senders.iter().filter(|sender| !sender.is_closed()).count()
            }
            _ => 0,
        }
    }

    /// Whether a value is parked under `key` and not yet claimed.
    pub fn is_filled(&self, key: &K) -> bool {
        matches!(self.lock().get(key), Some(Carrier::Filled { .. }))
    }
}

/// Sends `value` to every sender still connected. Hands the value back when
/// none of them accepted it.
fn wake_all<V: Clone>(senders: Vec<oneshot::Sender<V>>, value: V) -> Result<usize, V> {
    let mut live: Vec<_> = senders
        .into_iter()
        .filter(|sender| !sender.is_closed())
        .collect();
    let Some(last) = live.pop() else {
        return Err(value);
    };

    let mut woken = 0;
    for sender in live {
        if sender.send(value.clone()).is_ok() {
            woken += 1;
        }
    }
    match last.send(value) {
        Ok(()) => Ok(woken + 1),
        Err(value) if woken == 0 => Err(value),
        Err(_) => Ok(woken),
    }
}

#[cfg(test)]
mod tests {
    use super::{AwaitError, CorrelationTable, DeliveryOutcome};
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    fn table(ttl: Duration) -> Arc<CorrelationTable<String, u32>> {
        Arc::new(CorrelationTable::new("test", ttl))
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn waiter_first_is_woken_by_delivery() {
        let table = table(Duration::from_secs(60));
        let waiter = {
            let table = table.clone();
            tokio::spawn(async move {
                let started = Instant::now();
                let value = table
                    .wait_for("m1".to_string(), Duration::from_millis(2000))
                    .await;
                (value, started.elapsed())
            })
        };

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(table.deliver("m1".to_string(), 7), DeliveryOutcome::Woken(1));

        let (value, elapsed) = waiter.await.expect("waiter task");
        assert_eq!(value, Ok(7));
        assert!(elapsed < Duration::from_millis(1000), "took {elapsed:?}");
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn value_first_is_claimed_without_waiting() {
        let table = table(Duration::from_secs(60));
        assert_eq!(table.deliver("m2".to_string(), 9), DeliveryOutcome::Stored);

        let started = Instant::now();
        let value = table
            .wait_for("m2".to_string(), Duration::from_millis(1000))
            .await;

        assert_eq!(value, Ok(9));
        assert!(started.elapsed() < Duration::from_millis(100));
        assert!(!table.contains(&"m2".to_string()));
    }

    #[tokio::test]
    async fn wait_times_out_after_requested_duration() {
        let table = table(Duration::from_secs(60));
        let started = Instant::now();

        let value = table
            .wait_for("never-arrives".to_string(), Duration::from_millis(200))
            .await;

        let elapsed = started.elapsed();
        assert_eq!(value, Err(AwaitError::TimedOut));
        assert!(elapsed >= Duration::from_millis(200), "returned early: {elapsed:?}");
        assert!(elapsed < Duration::from_millis(1000), "returned late: {elapsed:?}");
        assert!(table.is_empty(), "abandoned carrier must be removed");
    }

    #[tokio::test]
    async fn late_delivery_after_timeout_is_parked() {
        let table = table(Duration::from_secs(60));
        let _ = table
            .wait_for("m3".to_string(), Duration::from_millis(10))
            .await;

        assert_eq!(table.deliver("m3".to_string(), 1), DeliveryOutcome::Stored);
        assert!(table.is_filled(&"m3".to_string()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn all_waiters_on_one_key_are_woken() {
        let table = table(Duration::from_secs(60));
        let mut waiters = Vec::new();
        for _ in 0..3 {
            let table = table.clone();
            waiters.push(tokio::spawn(async move {
                table.wait_for("shared".to_string(), Duration::ZERO).await
            }));
        }

        while table.waiters(&"shared".to_string()) < 3 {
            tokio::task::yield_now().await;
        }

        assert_eq!(table.deliver("shared".to_string(), 5), DeliveryOutcome::Woken(3));
        for waiter in waiters {
            assert_eq!(waiter.await.expect("waiter task"), Ok(5));
        }
    }

    #[tokio::test]
    async fn try_complete_hands_value_back_without_waiters() {
        let table = table(Duration::from_secs(60));
        assert_eq!(table.try_complete(&"m4".to_string(), 3), Err(3));
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn sweep_drops_only_expired_values() {
        let table = table(Duration::from_millis(50));
        table.deliver("old".to_string(), 1);
        tokio::time::sleep(Duration::from_millis(80)).await;
        table.deliver("fresh".to_string(), 2);

        assert_eq!(table.sweep(), 1);
        assert!(!table.contains(&"old".to_string()));
        assert!(table.is_filled(&"fresh".to_string()));
    }

    #[tokio::test]
    async fn sweep_applies_value_expiry_check() {
        // values carry their own age in seconds
        let table: CorrelationTable<String, u64> =
            CorrelationTable::with_expiry("test", Duration::from_secs(300), |age, ttl| {
                Duration::from_secs(*age) > ttl
            });
        table.deliver("stale".to_string(), 600);
        table.deliver("fresh".to_string(), 10);

        assert_eq!(table.sweep(), 1);
        assert!(!table.contains(&"stale".to_string()));
        assert!(table.is_filled(&"fresh".to_string()));
    }

    #[tokio::test]
    async fn close_releases_unbounded_waiters() {
        let table = table(Duration::from_secs(60));
        let waiter = {
            let table = table.clone();
            tokio::spawn(async move { table.wait_for("m5".to_string(), Duration::ZERO).await })
        };
        while !table.contains(&"m5".to_string()) {
            tokio::task::yield_now().await;
        }

        assert_eq!(table.close(), 1);
        assert_eq!(waiter.await.expect("waiter task"), Err(AwaitError::Closed));
    }

    #[tokio::test]
    async fn dropped_wait_future_is_swept() {
        let table = table(Duration::from_secs(60));
        {
            let wait = table.wait_for("m6".to_string(), Duration::ZERO);
            let _ = tokio::time::timeout(Duration::from_millis(10), wait).await;
        }

        assert!(table.contains(&"m6".to_string()));
        assert_eq!(table.sweep(), 1);
        assert!(table.is_empty());
    }
}
