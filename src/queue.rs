//! Per-resource async work queues.
//!
//! Slow or blocking hardware commands (modem transactions, PWM bursts
//! with sleeps) never run on the control path.  Callers enqueue a job;
//! a single dedicated consumer thread per physical resource drains its
//! queue strictly FIFO, so commands from different logical producers
//! can never interleave on the same bus.
//!
//! ```text
//!  control task ──enqueue──▶ ┌─────────────┐        ┌───────────────┐
//!  telemetry    ──enqueue──▶ │   Channel   │──pop──▶│ consumer      │
//!  (any thread) ──enqueue──▶ │  (bounded)  │  one   │ thread        │
//!                            └─────────────┘  at a  │ (owns the     │
//!                                             time  │  resource)    │
//!                                                   └───────────────┘
//! ```
//!
//! A failing job is logged with its item id and discarded; the consumer
//! loop itself never dies.  Cancellation is cooperative: a token in a
//! bounded registry is checked when the consumer picks the item up, and
//! long-running jobs may poll it at their own checkpoints — an item
//! that has already started is not interrupted.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use log::{debug, info, warn};

use crate::drivers::task_pin::{self, Core};
use crate::error::{Error, QueueError, Result};

/// Pending items per queue.  A backlog deeper than this means the
/// resource is wedged and newer commands are already stale.
pub const QUEUE_DEPTH: usize = 8;

/// Cancellation registry capacity (power of two for `FnvIndexMap`).
const REGISTRY_CAP: usize = 16;

// ── Cancellation ──────────────────────────────────────────────

/// Shared cooperative-cancellation flag for one queued item.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

// ── Work items ────────────────────────────────────────────────

/// A deferred job.  Receives its own cancellation token so it can bail
/// out at safe points (e.g. between frames of a multi-part SMS).
pub type Job = Box<dyn FnOnce(&CancelToken) -> Result<()> + Send + 'static>;

type DoneSignal = Signal<CriticalSectionRawMutex, Result<()>>;

/// One queued unit of work.  Created at enqueue, consumed exactly once
/// by the consumer thread, then discarded.
struct WorkItem {
    id: u32,
    enqueued_at_ms: u64,
    job: Job,
    cancel: CancelToken,
    done: Arc<DoneSignal>,
}

/// Awaitable completion handle returned by
/// [`WorkQueue::enqueue_with_handle`].
pub struct JobHandle {
    pub id: u32,
    done: Arc<DoneSignal>,
}

impl JobHandle {
    /// Resolve with the job's result once the consumer has run (or
    /// skipped) it.
    pub async fn wait(&self) -> Result<()> {
        self.done.wait().await
    }
}

// ── Queue ─────────────────────────────────────────────────────

type ItemChannel = Channel<CriticalSectionRawMutex, WorkItem, QUEUE_DEPTH>;
type CancelRegistry = Mutex<heapless::FnvIndexMap<u32, CancelToken, REGISTRY_CAP>>;

/// Cheap cloneable handle to one resource's work queue.
#[derive(Clone)]
pub struct WorkQueue {
    label: &'static str,
    chan: Arc<ItemChannel>,
    registry: Arc<CancelRegistry>,
    next_id: Arc<AtomicU32>,
    pending: Arc<AtomicUsize>,
    started: Instant,
}

impl WorkQueue {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            chan: Arc::new(Channel::new()),
            registry: Arc::new(Mutex::new(heapless::FnvIndexMap::new())),
            next_id: Arc::new(AtomicU32::new(1)),
            pending: Arc::new(AtomicUsize::new(0)),
            started: Instant::now(),
        }
    }

    /// Spawn the consumer thread that owns this queue's resource.
    ///
    /// `thread_name` must be NUL-terminated (FreeRTOS task name).
    pub fn start(
        &self,
        core: Core,
        priority: u8,
        stack_kb: usize,
        thread_name: &'static str,
    ) -> std::thread::JoinHandle<()> {
        let label = self.label;
        let chan = self.chan.clone();
        let registry = self.registry.clone();
        let pending = self.pending.clone();
        task_pin::spawn_on_core(core, priority, stack_kb, thread_name, move || {
            consumer_loop(label, &chan, &registry, &pending);
        })
    }

    /// Append a job; returns its item id immediately.  The job runs
    /// later on the consumer thread, never on the caller's.
    pub fn enqueue(&self, job: Job) -> Result<u32> {
        Ok(self.enqueue_with_handle(job)?.id)
    }

    /// Like [`enqueue`](Self::enqueue), but also returns a handle the
    /// caller can await for the job's result.
    pub fn enqueue_with_handle(&self, job: Job) -> Result<JobHandle> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let cancel = CancelToken::new();
        let done: Arc<DoneSignal> = Arc::new(Signal::new());

        {
            let mut reg = self.registry.lock().expect("cancel registry poisoned");
            if reg.insert(id, cancel.clone()).is_err() {
                return Err(QueueError::RegistryFull.into());
            }
        }

        let item = WorkItem {
            id,
            enqueued_at_ms: self.started.elapsed().as_millis() as u64,
            job,
            cancel,
            done: done.clone(),
        };

        // Counted before the send: the consumer may pop (and decrement)
        // the instant the item lands in the channel.
        self.pending.fetch_add(1, Ordering::Relaxed);
        if self.chan.try_send(item).is_err() {
            self.pending.fetch_sub(1, Ordering::Relaxed);
            self.registry
                .lock()
                .expect("cancel registry poisoned")
                .remove(&id);
            warn!("{}: queue full, item {} rejected", self.label, id);
            return Err(QueueError::Full.into());
        }

        Ok(JobHandle { id, done })
    }

    /// Request cancellation of a queued item.  Returns `false` if the
    /// item already completed (or never existed).  An item the consumer
    /// has already started only observes this at its own checkpoints.
    pub fn cancel(&self, id: u32) -> bool {
        let reg = self.registry.lock().expect("cancel registry poisoned");
        match reg.get(&id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Items waiting (not yet picked up by the consumer).
    pub fn depth(&self) -> usize {
        self.pending.load(Ordering::Relaxed)
    }

    pub fn label(&self) -> &'static str {
        self.label
    }
}

// ── Consumer ──────────────────────────────────────────────────

fn consumer_loop(
    label: &'static str,
    chan: &ItemChannel,
    registry: &CancelRegistry,
    pending: &AtomicUsize,
) {
    let executor: edge_executor::LocalExecutor<'_, 4> = edge_executor::LocalExecutor::new();

    executor
        .spawn(async {
            loop {
                // Suspends while the queue is empty; wakes on enqueue.
                let item = chan.receive().await;
                pending.fetch_sub(1, Ordering::Relaxed);

                if item.cancel.is_cancelled() {
                    debug!("{label}: item {} cancelled before start", item.id);
                    finish(registry, item.id, &item.done, Err(Error::Cancelled));
                    continue;
                }

                debug!(
                    "{label}: item {} starting (queued {} ms ago)",
                    item.id, item.enqueued_at_ms
                );

                let WorkItem {
                    id,
                    job,
                    cancel,
                    done,
                    ..
                } = item;
                let result = job(&cancel);
                if let Err(e) = result {
                    // One bad job must not starve or kill the consumer.
                    warn!("{label}: item {id} failed: {e}");
                }
                finish(registry, id, &done, result);
            }
        })
        .detach();

    info!("{label}: consumer ready");

    // The executor drives the drain task; pending::<()> keeps it alive
    // for the life of the thread.
    futures_lite::future::block_on(executor.run(core::future::pending::<()>()));
}

fn finish(registry: &CancelRegistry, id: u32, done: &Arc<DoneSignal>, result: Result<()>) {
    registry
        .lock()
        .expect("cancel registry poisoned")
        .remove(&id);
    done.signal(result);
}

// ── Tests ────────────────────────────────────────────────────
