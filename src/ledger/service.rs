//! Audit chain service handle.
//!
//! [`AuditChain`] owns the pending queue, the chain store and the miner.
//! Submissions return immediately; sealing happens in background tokio
//! tasks, at most one mining cycle at a time.

use crate::core::{now_millis, Error, Result, Timestamp};
use crate::ledger::block::{AuditBlock, BlockData};
use crate::ledger::chain::ChainStore;
use crate::ledger::config::ChainConfig;
use crate::ledger::miner::Miner;
use crate::ledger::query::{self, ChainStats};
use crate::ledger::queue::PendingQueue;
use crate::ledger::record::{AuditAction, AuditRecord, Executive, RecordId, VerificationStatus};
use crate::ledger::scheduler::{Scheduler, TokioScheduler};
use crate::ledger::snapshot::{self, SnapshotStore};
use crate::ledger::verify::{self, ChainVerification};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};

/// Builder for [`AuditChain`].
pub struct AuditChainBuilder {
    config: ChainConfig,
    scheduler: Arc<dyn Scheduler>,
    snapshot_store: Option<Arc<dyn SnapshotStore>>,
}

impl AuditChainBuilder {
    /// Replace the yield primitive used by the miner.
    pub fn scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = scheduler;
        self
    }

    /// Save a snapshot to `store` after every accepted block.
    pub fn snapshot_store(mut self, store: Arc<dyn SnapshotStore>) -> Self {
        self.snapshot_store = Some(store);
        self
    }

    /// Validate the configuration and create the chain with its genesis block.
    pub fn build(self) -> Result<AuditChain> {
        self.config.validate()?;
        let chain = ChainStore::new()?;
        let miner = Miner::new(&self.config, self.scheduler);

        info!(
            difficulty = self.config.difficulty,
            batch_size = self.config.batch_size,
            "Audit chain initialized"
        );

        Ok(AuditChain {
            inner: Arc::new(Inner {
                config: self.config,
                chain: RwLock::new(chain),
                queue: Mutex::new(PendingQueue::new()),
                mining: AtomicBool::new(false),
                cycle_queued: AtomicBool::new(false),
                retry_scheduled: AtomicBool::new(false),
                disposed: AtomicBool::new(false),
                idle: Notify::new(),
                miner,
                snapshot_store: self.snapshot_store,
            }),
        })
    }
}

struct Inner {
    config: ChainConfig,
    chain: RwLock<ChainStore>,
    queue: Mutex<PendingQueue>,
    /// Single-flight flag: set while a mining cycle runs
    mining: AtomicBool,
    /// Set while a spawned cycle has not started yet
    cycle_queued: AtomicBool,
    /// Set while a backoff-delayed cycle is waiting to start
    retry_scheduled: AtomicBool,
    disposed: AtomicBool,
    /// Notified whenever a mining cycle ends
    idle: Notify,
    miner: Miner,
    snapshot_store: Option<Arc<dyn SnapshotStore>>,
}

/// Releases the single-flight flag when dropped, including on panic.
struct MiningGuard<'a>(&'a AtomicBool);

impl<'a> MiningGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for MiningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Inner {
    fn read_chain(&self) -> RwLockReadGuard<'_, ChainStore> {
        self.chain.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_chain(&self) -> RwLockWriteGuard<'_, ChainStore> {
        self.chain.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_queue(&self) -> MutexGuard<'_, PendingQueue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    fn is_idle(&self) -> bool {
        !self.mining.load(Ordering::Acquire) && self.lock_queue().is_empty()
    }

    /// Start a cycle immediately if the miner is idle.
    fn trigger(self: &Arc<Self>) {
        if self.is_disposed() || self.mining.load(Ordering::Acquire) {
            return;
        }
        if self.cycle_queued.swap(true, Ordering::AcqRel) {
            return;
        }
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let inner = Arc::clone(self);
                handle.spawn(async move {
                    inner.cycle_queued.store(false, Ordering::Release);
                    inner.run_cycle().await;
                });
            }
            Err(_) => {
                self.cycle_queued.store(false, Ordering::Release);
                warn!("No tokio runtime available; records stay queued");
            }
        }
    }

    /// Start a cycle after the configured backoff.
    fn schedule_retry(self: &Arc<Self>) {
        if self.retry_scheduled.swap(true, Ordering::AcqRel) {
            return;
        }
        let backoff = self.config.retry_backoff();
        debug!(backoff_ms = self.config.retry_backoff_ms, "Scheduling next mining cycle");

        let inner = Arc::clone(self);
        let spawned = tokio::runtime::Handle::try_current().map(|handle| {
            handle.spawn(async move {
                tokio::time::sleep(backoff).await;
                inner.retry_scheduled.store(false, Ordering::Release);
                inner.run_cycle().await;
            })
        });
        if spawned.is_err() {
            self.retry_scheduled.store(false, Ordering::Release);
        }
    }

    async fn run_cycle(self: Arc<Self>) {
        let Some(guard) = MiningGuard::acquire(&self.mining) else {
            return;
        };

        if !self.is_disposed() {
            let batch = self.lock_queue().drain_front(self.config.batch_size);
            if !batch.is_empty() {
                self.mine_batch(batch).await;
            }
        }

        drop(guard);
        self.idle.notify_waiters();

        if !self.is_disposed() && !self.lock_queue().is_empty() {
            self.schedule_retry();
        }
    }

    /// Seal one batch, requeueing it at the front on any failure.
    async fn mine_batch(&self, batch: Vec<AuditRecord>) {
        let size = batch.len();
        let outcome = AssertUnwindSafe(self.seal_batch(&batch)).catch_unwind().await;

        let failure = match outcome {
            Ok(Ok(block)) => {
                info!(
                    index = block.index,
                    records = size,
                    nonce = block.nonce,
                    hash = %block.hash,
                    "Block mined and appended"
                );
                self.auto_save().await;
                return;
            }
            Ok(Err(err)) => err.to_string(),
            Err(_) => "mining cycle panicked".to_string(),
        };

        warn!(records = size, reason = %failure, "Mining cycle failed; batch requeued");
        self.lock_queue().requeue_front(batch);
    }

    async fn seal_batch(&self, batch: &[AuditRecord]) -> Result<AuditBlock> {
        let data = BlockData::aggregate(batch, now_millis());
        let candidate = self.read_chain().next_candidate(data)?;

        let sealed = self.miner.seal(candidate, &self.disposed).await?;

        let mut chain = self.write_chain();
        if !verify::verify_block(&sealed, chain.blocks(), self.miner.difficulty()) {
            return Err(Error::BlockRejected(format!(
                "candidate {} failed verification against tip",
                sealed.index
            )));
        }
        chain.append(sealed.clone(), self.miner.difficulty())?;
        Ok(sealed)
    }

    async fn auto_save(&self) {
        let Some(store) = &self.snapshot_store else {
            return;
        };
        let encoded = snapshot::encode(self.read_chain().blocks());
        let result = match encoded {
            Ok(snapshot) => store.save(&snapshot).await,
            Err(err) => Err(err),
        };
        if let Err(err) = result {
            error!(error = %err, "Snapshot auto-save failed");
        }
    }
}

/// In-memory, proof-of-work sealed audit ledger.
///
/// Cloning yields another handle to the same chain.
#[derive(Clone)]
pub struct AuditChain {
    inner: Arc<Inner>,
}

impl AuditChain {
    /// Create a chain with the default scheduler and no snapshot store.
    pub fn new(config: ChainConfig) -> Result<Self> {
        Self::builder(config).build()
    }

    pub fn builder(config: ChainConfig) -> AuditChainBuilder {
        AuditChainBuilder {
            config,
            scheduler: Arc::new(TokioScheduler),
            snapshot_store: None,
        }
    }

    pub fn config(&self) -> &ChainConfig {
        &self.inner.config
    }

    /// Submit a record for sealing and return its id.
    ///
    /// Never fails. Starts a mining cycle when the miner is idle; otherwise
    /// the record is picked up by a later batch.
    pub fn add_audit_record(
        &self,
        executive: &Executive,
        action: &AuditAction,
        context: Option<serde_json::Value>,
    ) -> RecordId {
        let record = AuditRecord::new(executive, action, context);
        let id = record.id.clone();
        let queued = {
            let mut queue = self.inner.lock_queue();
            queue.push_back(record);
            queue.len()
        };
        debug!(record_id = %id, executive_id = %executive.id, queued, "Audit record queued");

        if self.inner.is_disposed() {
            warn!(record_id = %id, "Audit chain disposed; record will not be mined");
        } else {
            self.inner.trigger();
        }
        id
    }

    /// Verify the committed chain.
    pub fn verify_chain(&self) -> ChainVerification {
        let verification = self.inner.read_chain().verify(self.inner.config.difficulty);
        if !verification.is_valid {
            warn!(errors = verification.errors.len(), "Chain verification failed");
        }
        verification
    }

    /// Verify one block against the committed chain.
    pub fn verify_block(&self, block: &AuditBlock) -> bool {
        verify::verify_block(block, self.inner.read_chain().blocks(), self.inner.config.difficulty)
    }

    pub fn get_chain_stats(&self) -> ChainStats {
        let pending = self.inner.lock_queue().len();
        query::chain_stats(self.inner.read_chain().blocks(), pending)
    }

    pub fn get_executive_audit_records(&self, executive_id: &str) -> Vec<AuditRecord> {
        query::records_by_executive(self.inner.read_chain().blocks(), executive_id)
    }

    pub fn get_audit_records_by_time_range(
        &self,
        start: Timestamp,
        end: Timestamp,
    ) -> Vec<AuditRecord> {
        query::records_by_time_range(self.inner.read_chain().blocks(), start, end)
    }

    /// Status of a record by id: pending while queued, otherwise as sealed.
    pub fn get_record_status(&self, id: &RecordId) -> Option<VerificationStatus> {
        if self.inner.lock_queue().find(id).is_some() {
            return Some(VerificationStatus::Pending);
        }
        self.inner
            .read_chain()
            .find_record(id)
            .map(|r| r.verification_status)
    }

    pub fn get_block(&self, index: u64) -> Option<AuditBlock> {
        self.inner.read_chain().get(index).cloned()
    }

    /// Copy of every committed block.
    pub fn blocks(&self) -> Vec<AuditBlock> {
        self.inner.read_chain().blocks().to_vec()
    }

    /// Number of committed blocks, genesis included.
    pub fn len(&self) -> usize {
        self.inner.read_chain().len()
    }

    /// Always false: a live chain holds at least its genesis block.
    pub fn is_empty(&self) -> bool {
        self.inner.read_chain().is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.inner.lock_queue().len()
    }

    /// Serialize every committed block.
    pub fn export_chain(&self) -> Result<String> {
        snapshot::encode(self.inner.read_chain().blocks())
    }

    /// Replace the chain with `snapshot` if it verifies.
    ///
    /// Returns false, logging why, when the snapshot cannot be parsed or
    /// fails verification. The live chain is untouched in that case.
    pub fn import_chain(&self, snapshot: &str) -> bool {
        match self.try_import_chain(snapshot) {
            Ok(_) => true,
            Err(Error::ImportRejected { errors }) => {
                for message in &errors {
                    warn!(error = %message, "Imported chain defect");
                }
                false
            }
            Err(err) => {
                warn!(error = %err, "Chain import failed");
                false
            }
        }
    }

    /// Typed form of [`import_chain`](Self::import_chain).
    pub fn try_import_chain(&self, snapshot: &str) -> Result<ChainVerification> {
        let blocks = snapshot::decode(snapshot)?;
        let verification = verify::verify_chain(&blocks, self.inner.config.difficulty);
        if !verification.is_valid {
            return Err(Error::ImportRejected {
                errors: verification.errors,
            });
        }

        let count = blocks.len();
        let previous = self.inner.write_chain().replace(blocks);
        info!(
            blocks = count,
            replaced = previous.len(),
            "Imported chain accepted"
        );
        Ok(verification)
    }

    /// Export the chain into `store`.
    pub async fn save_snapshot(&self, store: &dyn SnapshotStore) -> Result<()> {
        let snapshot = self.export_chain()?;
        store.save(&snapshot).await
    }

    /// Import the latest snapshot from `store`.
    ///
    /// Returns false when the store is empty or the snapshot is rejected.
    pub async fn restore_snapshot(&self, store: &dyn SnapshotStore) -> Result<bool> {
        match store.load().await? {
            Some(snapshot) => Ok(self.import_chain(&snapshot)),
            None => Ok(false),
        }
    }

    /// Wait until the queue is drained and no cycle is running.
    ///
    /// Returns early once the chain is disposed. A queue left behind by
    /// submissions made outside a runtime is mined here.
    pub async fn flush(&self) {
        loop {
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.inner.is_disposed() || self.inner.is_idle() {
                return;
            }
            if !self.inner.mining.load(Ordering::Acquire)
                && !self.inner.retry_scheduled.load(Ordering::Acquire)
            {
                self.inner.trigger();
            }
            notified.await;
        }
    }

    /// Stop mining.
    ///
    /// A running search is aborted at its next yield and its batch
    /// requeued. Later submissions are queued but never mined.
    pub fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        info!(pending = self.pending_count(), "Audit chain disposed");
        self.inner.idle.notify_waiters();
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.is_disposed()
    }
}
