use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::{anyhow, Result};
use futures_util::StreamExt;
use time::OffsetDateTime;
use tokio_util::time::{delay_queue, DelayQueue};
use tracing::{error, info, warn};

use crate::infrastructure::storage::s3::ObjectStore;
use crate::workers::ledger::{DeletionLedger, DeletionTask};

fn now_ms() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

/// Request-side handle: arms one-shot deletions of uploaded objects.
#[derive(Clone)]
pub struct DeletionScheduler {
    tx: async_channel::Sender<(DeletionTask, Duration)>,
    ledger: Arc<dyn DeletionLedger>,
    retention: Duration,
    pending: Arc<AtomicUsize>,
}

/// Background worker that owns the timers and performs the deletions.
pub struct Reaper {
    rx: async_channel::Receiver<(DeletionTask, Duration)>,
    store: Arc<dyn ObjectStore>,
    ledger: Arc<dyn DeletionLedger>,
    pending: Arc<AtomicUsize>,
}

/// Build a connected scheduler/worker pair. Spawn `Reaper::run` once.
pub fn channel(
    store: Arc<dyn ObjectStore>,
    ledger: Arc<dyn DeletionLedger>,
    retention: Duration,
) -> (DeletionScheduler, Reaper) {
    let (tx, rx) = async_channel::unbounded();
    let pending = Arc::new(AtomicUsize::new(0));

    let scheduler = DeletionScheduler {
        tx,
        ledger: ledger.clone(),
        retention,
        pending: pending.clone(),
    };
    let reaper = Reaper {
        rx,
        store,
        ledger,
        pending,
    };

    (scheduler, reaper)
}

impl DeletionScheduler {
    /// Record the deletion durably, then hand it to the worker.
    /// Returns as soon as the timer is queued.
    pub async fn schedule(&self, key: &str) -> Result<DeletionTask> {
        let task = DeletionTask {
            key: key.to_string(),
            deadline_ms: now_ms() + self.retention.as_millis() as i64,
        };

        if let Err(e) = self.ledger.record(&task).await {
            // The in-process timer still runs; only restart recovery is lost.
            warn!("Could not persist deletion of {}: {:#}", key, e);
        }

        self.tx
            .send((task.clone(), self.retention))
            .await
            .map_err(|_| anyhow!("deletion worker is gone"))?;

        Ok(task)
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    /// Deletions queued or armed but not yet performed.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst) + self.tx.len()
    }
}

/// Armed deletions, at most one timer per object key.
struct Timers {
    queue: DelayQueue<String>,
    armed: HashMap<String, delay_queue::Key>,
}

impl Timers {
    fn new() -> Self {
        Self {
            queue: DelayQueue::new(),
            armed: HashMap::new(),
        }
    }

    /// Arm `key` unless it already is; returns whether a timer was added.
    /// The ledger and the channel can both deliver the same key at startup.
    fn arm(&mut self, key: String, delay: Duration) -> bool {
        if self.armed.contains_key(&key) {
            return false;
        }
        let handle = self.queue.insert(key.clone(), delay);
        self.armed.insert(key, handle);
        true
    }

    fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    async fn next_expired(&mut self) -> Option<String> {
        let key = self.queue.next().await?.into_inner();
        self.armed.remove(&key);
        Some(key)
    }
}

impl Reaper {
    pub async fn run(self) {
        info!("🧹 Starting deletion worker...");

        let mut timers = Timers::new();
        self.recover(&mut timers).await;

        loop {
            tokio::select! {
                msg = self.rx.recv() => match msg {
                    Ok((task, delay)) => {
                        if self.arm(&mut timers, task.key.clone(), delay) {
                            info!("⏳ Deletion of {} scheduled in {}s", task.key, delay.as_secs());
                        }
                    }
                    Err(_) => {
                        // Senders are gone; drain what is already armed.
                        while let Some(key) = timers.next_expired().await {
                            self.reap(key).await;
                        }
                        break;
                    }
                },
                Some(key) = timers.next_expired(), if !timers.is_empty() => {
                    self.reap(key).await;
                }
            }
        }

        info!("🧹 Deletion worker stopped");
    }

    fn arm(&self, timers: &mut Timers, key: String, delay: Duration) -> bool {
        let added = timers.arm(key, delay);
        if added {
            self.pending.fetch_add(1, Ordering::SeqCst);
        }
        added
    }

    /// Re-arm deletions left over from a previous process.
    async fn recover(&self, timers: &mut Timers) {
        let tasks = match self.ledger.load().await {
            Ok(tasks) => tasks,
            Err(e) => {
                error!("❌ Could not load pending deletions: {:#}", e);
                return;
            }
        };

        if tasks.is_empty() {
            return;
        }

        let now = now_ms();
        info!("♻️ Re-arming {} pending deletions", tasks.len());
        for task in tasks {
            let remaining = Duration::from_millis((task.deadline_ms - now).max(0) as u64);
            self.arm(timers, task.key, remaining);
        }
    }

    async fn reap(&self, key: String) {
        self.pending.fetch_sub(1, Ordering::SeqCst);

        match self.store.delete(&key).await {
            Ok(()) => info!("🗑️ Deleted remote object {}", key),
            Err(e) => error!("❌ Failed to delete remote object {}: {:#}", key, e),
        }

        // One-shot: the entry goes whether or not the delete succeeded.
        if let Err(e) = self.ledger.remove(&key).await {
            warn!("Could not clear ledger entry for {}: {:#}", key, e);
        }
    }
}
