//! Concurrency-capped fan-out over independent work keys.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::error::UnitError;

/// Aggregated outcome of one fan-out stage.
///
/// `records` holds every record the successful units produced, in
/// completion order (no relation to input order). `failures` holds one
/// entry per unit that resolved without records, labeled by its work key.
#[derive(Debug)]
pub struct FanOutReport<T> {
    pub records: Vec<T>,
    pub failures: Vec<(String, UnitError)>,
}

impl<T> FanOutReport<T> {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Run one async unit per key with at most `limit` units in flight.
///
/// Each unit acquires a semaphore permit before it starts and holds it for
/// its whole life, retries and backoff sleeps included; the owned permit
/// is dropped when the task ends, so a panicking unit still frees its
/// slot. Units are isolated: one failing never cancels its siblings, and
/// the call returns only after every unit has resolved.
///
/// Aggregation is collector-side: units hand their batch back through the
/// task handle and a single loop appends, so no list is mutated from two
/// tasks at once.
pub async fn fan_out<K, T, F, Fut>(keys: Vec<K>, limit: usize, unit: F) -> FanOutReport<T>
where
    K: std::fmt::Display + Send + 'static,
    T: Send + 'static,
    F: Fn(K) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Vec<T>, UnitError>> + Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(limit.max(1)));
    let unit = Arc::new(unit);
    let mut tasks = JoinSet::new();

    // Labels live outside the tasks, keyed by task id, so even a unit
    // that panics is reported under its own work key.
    let mut labels: HashMap<tokio::task::Id, String> = HashMap::new();
    for key in keys {
        let semaphore = Arc::clone(&semaphore);
        let unit = Arc::clone(&unit);
        let label = key.to_string();
        let handle = tasks.spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .expect("fan-out semaphore closed");
            unit(key).await
        });
        labels.insert(handle.id(), label);
    }

    let mut records = Vec::new();
    let mut failures = Vec::new();
    while let Some(joined) = tasks.join_next_with_id().await {
        match joined {
            Ok((_, Ok(batch))) => records.extend(batch),
            Ok((id, Err(e))) => {
                let label = labels.remove(&id).unwrap_or_default();
                log::error!("unit {label} yielded no records: {e}");
                failures.push((label, e));
            }
            Err(e) => {
                let label = labels.remove(&e.id()).unwrap_or_default();
                log::error!("unit {label} panicked: {e}");
                failures.push((label, UnitError::Transport(e.to_string())));
            }
        }
    }

    FanOutReport { records, failures }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn collects_all_records() {
        let report = fan_out((1..=10).collect(), 4, |k: i32| async move { Ok(vec![k, k]) }).await;
        assert!(report.is_clean());
        assert_eq!(report.records.len(), 20);
        let sum: i32 = report.records.iter().sum();
        assert_eq!(sum, 2 * (1..=10).sum::<i32>());
    }

    #[tokio::test]
    async fn ceiling_is_never_exceeded() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let (in_flight2, peak2) = (Arc::clone(&in_flight), Arc::clone(&peak));
        let report = fan_out((0..20).collect(), 3, move |k: i32| {
            let in_flight = Arc::clone(&in_flight2);
            let peak = Arc::clone(&peak2);
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok(vec![k])
            }
        })
        .await;

        assert_eq!(report.records.len(), 20);
        assert!(peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn failures_are_isolated_per_unit() {
        let report = fan_out((0..6).collect(), 2, |k: i32| async move {
            if k % 2 == 0 {
                Ok(vec![k])
            } else {
                Err(UnitError::Status(500))
            }
        })
        .await;

        assert_eq!(report.records.len(), 3);
        assert_eq!(report.failures.len(), 3);
        assert!(report
            .failures
            .iter()
            .all(|(_, e)| matches!(e, UnitError::Status(500))));
    }

    #[tokio::test]
    async fn panicking_unit_frees_its_slot() {
        // limit 1: if the panicking unit leaked its permit, the others
        // would never run and this test would hang.
        let report = fan_out(vec![7, 1, 2], 1, |k: i32| async move {
            if k == 7 {
                panic!("boom");
            }
            Ok(vec![k])
        })
        .await;

        assert_eq!(report.records.len(), 2);
        assert_eq!(report.failures.len(), 1);
        // the panicked unit is reported under its own work key
        assert_eq!(report.failures[0].0, "7");
    }

    #[tokio::test]
    async fn empty_key_set_returns_clean() {
        let report = fan_out(Vec::<i32>::new(), 3, |k: i32| async move { Ok(vec![k]) }).await;
        assert!(report.is_clean());
        assert!(report.records.is_empty());
    }
}
