use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use redis::AsyncCommands;

use crate::infrastructure::redis::client::RedisService;

const LEDGER_KEY: &str = "clipvault:pending_deletions";

/// A remote object and the wall-clock time (unix ms) it must be gone by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionTask {
    pub key: String,
    pub deadline_ms: i64,
}

/// Durable record of deletions that have been scheduled but not yet run.
#[async_trait]
pub trait DeletionLedger: Send + Sync {
    async fn record(&self, task: &DeletionTask) -> Result<()>;

    async fn remove(&self, key: &str) -> Result<()>;

    async fn load(&self) -> Result<Vec<DeletionTask>>;
}

/// Process-local ledger; entries die with the process.
#[derive(Default)]
pub struct MemoryLedger {
    entries: Mutex<HashMap<String, i64>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DeletionLedger for MemoryLedger {
    async fn record(&self, task: &DeletionTask) -> Result<()> {
        self.entries
            .lock()
            .map_err(|_| anyhow!("ledger lock poisoned"))?
            .insert(task.key.clone(), task.deadline_ms);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries
            .lock()
            .map_err(|_| anyhow!("ledger lock poisoned"))?
            .remove(key);
        Ok(())
    }

    async fn load(&self) -> Result<Vec<DeletionTask>> {
        let entries = self.entries.lock().map_err(|_| anyhow!("ledger lock poisoned"))?;
        let mut tasks: Vec<DeletionTask> = entries
            .iter()
            .map(|(key, deadline_ms)| DeletionTask {
                key: key.clone(),
                deadline_ms: *deadline_ms,
            })
            .collect();
        tasks.sort_by_key(|t| t.deadline_ms);
        Ok(tasks)
    }
}

/// Sorted set keyed by object key, scored by deadline; survives restarts.
pub struct RedisLedger {
    redis: RedisService,
}

impl RedisLedger {
    pub fn new(redis: RedisService) -> Self {
        Self { redis }
    }
}

#[async_trait]
impl DeletionLedger for RedisLedger {
    async fn record(&self, task: &DeletionTask) -> Result<()> {
        let mut conn = self.redis.get_conn().await?;
        let _: () = conn.zadd(LEDGER_KEY, &task.key, task.deadline_ms).await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let mut conn = self.redis.get_conn().await?;
        let _: () = conn.zrem(LEDGER_KEY, key).await?;
        Ok(())
    }

    async fn load(&self) -> Result<Vec<DeletionTask>> {
        let mut conn = self.redis.get_conn().await?;
        let entries: Vec<(String, f64)> = conn.zrange_withscores(LEDGER_KEY, 0, -1).await?;
        Ok(entries
            .into_iter()
            .map(|(key, score)| DeletionTask {
                key,
                deadline_ms: score as i64,
            })
            .collect())
    }
}
