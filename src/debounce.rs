use std::{
    future::Future,
    hash::Hash,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;

struct Pending {
    id: u64,
    cancel: CancellationToken,
    fire: CancellationToken,
}

/// Per-key single-shot timers. Arming a key again restarts its timer and
/// drops the previously armed task, so only the last task in a quiet window
/// runs. Once a task has started it is never aborted.
pub struct Debouncer<K: Eq + Hash> {
    delay: Duration,
    pending: Arc<DashMap<K, Pending>>,
    next_id: Arc<AtomicU64>,
}

impl<K: Eq + Hash> Clone for Debouncer<K> {
    fn clone(&self) -> Self {
        Self {
            delay: self.delay,
            pending: Arc::clone(&self.pending),
            next_id: Arc::clone(&self.next_id),
        }
    }
}

impl<K> Debouncer<K>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
{
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Arc::new(DashMap::new()),
            next_id: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn arm<F>(&self, key: K, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let cancel = CancellationToken::new();
        let fire = CancellationToken::new();

        let previous = self.pending.insert(
            key.clone(),
            Pending {
                id,
                cancel: cancel.clone(),
                fire: fire.clone(),
            },
        );
        if let Some(previous) = previous {
            previous.cancel.cancel();
        }

        let pending = Arc::clone(&self.pending);
        let delay = self.delay;
        tokio::spawn(async move {
            tokio::select! {
                biased;
                () = cancel.cancelled() => return,
                () = fire.cancelled() => {}
                () = tokio::time::sleep(delay) => {}
            }
            pending.remove_if(&key, |_, p| p.id == id);
            task.await;
        });
    }

    /// Drops the pending task for `key`. Returns whether one was pending.
    pub fn cancel(&self, key: &K) -> bool {
        match self.pending.remove(key) {
            Some((_, p)) => {
                p.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Drops every pending task and returns the keys they were armed under.
    pub fn take_pending(&self) -> Vec<K> {
        let keys: Vec<K> =
            self.pending.iter().map(|p| p.key().clone()).collect();
        keys.into_iter().filter(|key| self.cancel(key)).collect()
    }

    /// Runs the pending task for `key` now instead of at the deadline.
    pub fn fire(&self, key: &K) -> bool {
        match self.pending.get(key) {
            Some(p) => {
                p.fire.cancel();
                true
            }
            None => false,
        }
    }

    pub fn fire_all(&self) {
        for p in self.pending.iter() {
            p.fire.cancel();
        }
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use std::pin::Pin;

    use super::*;
    use parking_lot::Mutex;

    type Task = Pin<Box<dyn Future<Output = ()> + Send>>;

    fn recorder() -> (Arc<Mutex<Vec<u32>>>, impl Fn(u32) -> Task) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        let task = move |v: u32| -> Task {
            let sink = Arc::clone(&sink);
            Box::pin(async move { sink.lock().push(v) })
        };
        (log, task)
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_arms_run_last_task_once() {
        let debouncer = Debouncer::new(Duration::from_millis(500));
        let (log, task) = recorder();

        for v in 1..=5 {
            debouncer.arm("brightness", task(v));
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert!(log.lock().is_empty());

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(*log.lock(), vec![5]);
        assert_eq!(debouncer.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn keys_are_independent() {
        let debouncer = Debouncer::new(Duration::from_millis(500));
        let (log, task) = recorder();

        debouncer.arm("a", task(1));
        tokio::time::sleep(Duration::from_millis(300)).await;
        debouncer.arm("b", task(2));
        tokio::time::sleep(Duration::from_millis(250)).await;

        assert_eq!(*log.lock(), vec![1]);
        assert_eq!(debouncer.pending(), 1);

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(*log.lock(), vec![1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_and_fire() {
        let debouncer = Debouncer::new(Duration::from_millis(500));
        let (log, task) = recorder();

        debouncer.arm("a", task(1));
        debouncer.arm("b", task(2));
        assert!(debouncer.cancel(&"a"));
        assert!(!debouncer.cancel(&"a"));

        assert!(debouncer.fire(&"b"));
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
        assert_eq!(*log.lock(), vec![2]);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(*log.lock(), vec![2]);
    }

    #[tokio::test(start_paused = true)]
    async fn take_pending_drops_tasks() {
        let debouncer = Debouncer::new(Duration::from_millis(500));
        let (log, task) = recorder();

        debouncer.arm("a", task(1));
        debouncer.arm("b", task(2));
        let mut keys = debouncer.take_pending();
        keys.sort_unstable();

        assert_eq!(keys, vec!["a", "b"]);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(log.lock().is_empty());
    }
}
