//! Shared debounce-timer service
//!
//! One worker task owns every pending timer in the daemon. Scheduling with
//! an existing handle cancels and re-arms in a single command, so there is
//! no window in which both the old and the new timer are live. Due jobs run
//! on the worker itself, one at a time in fire-time order, which is what
//! serializes builds across all projects.

use futures::future::BoxFuture;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, trace, warn};

/// Opaque token naming one pending scheduled job
///
/// A handle is spent once its timer fires or is cancelled; passing a spent
/// handle back to [`DebounceScheduler::schedule`] is a harmless no-op
/// cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerHandle(u64);

enum SchedulerCommand {
    Schedule {
        cancel: Option<u64>,
        id: u64,
        fire_at: Instant,
        job: BoxFuture<'static, ()>,
    },
    Stop,
}

/// Single-worker timer service with exact cancellation
pub struct DebounceScheduler {
    tx: mpsc::UnboundedSender<SchedulerCommand>,
    next_id: AtomicU64,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl DebounceScheduler {
    /// Starts the scheduler worker
    ///
    /// Must be called from within a tokio runtime.
    pub fn new() -> Self {
        debug!("Starting debounce scheduler");
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_worker(rx));
        Self {
            tx,
            next_id: AtomicU64::new(1),
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Arms a timer to run `job` after `delay`, cancelling `existing` first
    ///
    /// Cancellation and re-arm are applied by the worker as one unit: if
    /// `existing` is still pending it will never fire. A job whose timer has
    /// already started running is past cancellation and runs to completion.
    pub fn schedule<F>(&self, existing: Option<TimerHandle>, delay: Duration, job: F) -> TimerHandle
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        trace!(
            timer = id,
            delay_ms = delay.as_millis() as u64,
            "Scheduling timer"
        );

        let command = SchedulerCommand::Schedule {
            cancel: existing.map(|handle| handle.0),
            id,
            fire_at: Instant::now() + delay,
            job: Box::pin(job),
        };
        if self.tx.send(command).is_err() {
            warn!(timer = id, "Scheduler is stopped; timer dropped");
        }

        TimerHandle(id)
    }

    /// Signals the worker to terminate, discarding all pending timers
    pub fn stop(&self) {
        debug!("Stopping debounce scheduler");
        let _ = self.tx.send(SchedulerCommand::Stop);
    }

    /// Waits for the worker to terminate; safe to call once after [`stop`]
    ///
    /// [`stop`]: DebounceScheduler::stop
    pub async fn join(&self) {
        let handle = self
            .worker
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

impl Default for DebounceScheduler {
    fn default() -> Self {
        Self::new()
    }
}

struct WorkerState {
    /// Live timers by id; a heap entry with no table entry is stale
    pending: HashMap<u64, BoxFuture<'static, ()>>,
    /// Min-heap of (fire time, arrival seq, id); seq breaks fire-time ties
    queue: BinaryHeap<Reverse<(Instant, u64, u64)>>,
    seq: u64,
}

impl WorkerState {
    fn new() -> Self {
        Self {
            pending: HashMap::new(),
            queue: BinaryHeap::new(),
            seq: 0,
        }
    }

    /// Applies one command; returns true when the worker should stop
    fn apply(&mut self, command: SchedulerCommand) -> bool {
        match command {
            SchedulerCommand::Schedule {
                cancel,
                id,
                fire_at,
                job,
            } => {
                if let Some(old) = cancel {
                    if self.pending.remove(&old).is_some() {
                        trace!(timer = old, "Cancelled pending timer");
                    }
                }
                self.seq += 1;
                self.pending.insert(id, job);
                self.queue.push(Reverse((fire_at, self.seq, id)));
                false
            }
            SchedulerCommand::Stop => true,
        }
    }

    /// Pops the earliest due job, skipping stale heap entries
    fn take_due(&mut self) -> Option<(u64, BoxFuture<'static, ()>)> {
        let now = Instant::now();
        while let Some(&Reverse((fire_at, _, id))) = self.queue.peek() {
            if !self.pending.contains_key(&id) {
                self.queue.pop();
                continue;
            }
            if fire_at > now {
                return None;
            }
            self.queue.pop();
            return self.pending.remove(&id).map(|job| (id, job));
        }
        None
    }

    /// Fire time of the earliest entry, due or not (stale entries only wake
    /// the worker early, which is harmless)
    fn next_wake(&self) -> Option<Instant> {
        self.queue.peek().map(|&Reverse((fire_at, _, _))| fire_at)
    }
}

async fn run_worker(mut rx: mpsc::UnboundedReceiver<SchedulerCommand>) {
    let mut state = WorkerState::new();

    loop {
        // Apply every command already queued before firing anything, so a
        // cancellation that raced an imminent fire is observed first.
        loop {
            match rx.try_recv() {
                Ok(command) => {
                    if state.apply(command) {
                        debug!(
                            discarded = state.pending.len(),
                            "Scheduler worker stopped"
                        );
                        return;
                    }
                }
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => return,
            }
        }

        // Fire one due job, then re-check for commands that arrived while
        // it ran.
        if let Some((id, job)) = state.take_due() {
            trace!(timer = id, "Firing timer");
            job.await;
            continue;
        }

        let next_wake = state.next_wake();
        let wake = next_wake.unwrap_or_else(Instant::now);
        tokio::select! {
            command = rx.recv() => match command {
                Some(command) => {
                    if state.apply(command) {
                        debug!(
                            discarded = state.pending.len(),
                            "Scheduler worker stopped"
                        );
                        return;
                    }
                }
                None => return,
            },
            _ = sleep_until(wake), if next_wake.is_some() => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use tokio::time::sleep;

    fn counting_job(counter: &Arc<AtomicUsize>) -> impl Future<Output = ()> + Send + 'static {
        let counter = Arc::clone(counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_timer_fires_after_delay() {
        let scheduler = DebounceScheduler::new();
        let counter = Arc::new(AtomicUsize::new(0));

        scheduler.schedule(None, Duration::from_millis(50), counting_job(&counter));

        sleep(Duration::from_millis(20)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0, "fired before the delay");

        sleep(Duration::from_millis(200)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_rescheduling_cancels_previous_timer() {
        let scheduler = DebounceScheduler::new();
        let counter = Arc::new(AtomicUsize::new(0));

        // Re-arm five times in quick succession: only the last survives.
        let mut handle = None;
        for _ in 0..5 {
            handle = Some(scheduler.schedule(
                handle,
                Duration::from_millis(100),
                counting_job(&counter),
            ));
            sleep(Duration::from_millis(20)).await;
        }

        sleep(Duration::from_millis(400)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_reschedule_restarts_full_delay_window() {
        let scheduler = DebounceScheduler::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let handle = scheduler.schedule(None, Duration::from_millis(150), counting_job(&counter));
        sleep(Duration::from_millis(50)).await;
        scheduler.schedule(Some(handle), Duration::from_millis(150), counting_job(&counter));

        // The original timer would have fired by now; the replacement has
        // a full window left.
        sleep(Duration::from_millis(130)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0, "old timer fired");

        sleep(Duration::from_millis(200)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_independent_timers_fire_in_time_order() {
        let scheduler = DebounceScheduler::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for (label, delay_ms) in [("slow", 120), ("fast", 40)] {
            let order = Arc::clone(&order);
            scheduler.schedule(None, Duration::from_millis(delay_ms), async move {
                order.lock().unwrap().push(label);
            });
        }

        sleep(Duration::from_millis(400)).await;
        assert_eq!(*order.lock().unwrap(), vec!["fast", "slow"]);
    }

    #[tokio::test]
    async fn test_callbacks_run_serially() {
        let scheduler = DebounceScheduler::new();
        let in_flight = Arc::new(AtomicUsize::new(0));
        let overlapped = Arc::new(AtomicUsize::new(0));
        let finished = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let in_flight = Arc::clone(&in_flight);
            let overlapped = Arc::clone(&overlapped);
            let finished = Arc::clone(&finished);
            scheduler.schedule(None, Duration::from_millis(10), async move {
                if in_flight.fetch_add(1, Ordering::SeqCst) > 0 {
                    overlapped.fetch_add(1, Ordering::SeqCst);
                }
                sleep(Duration::from_millis(50)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                finished.fetch_add(1, Ordering::SeqCst);
            });
        }

        sleep(Duration::from_millis(400)).await;
        assert_eq!(finished.load(Ordering::SeqCst), 3);
        assert_eq!(overlapped.load(Ordering::SeqCst), 0, "callbacks overlapped");
    }

    #[tokio::test]
    async fn test_stop_discards_pending_timers() {
        let scheduler = DebounceScheduler::new();
        let counter = Arc::new(AtomicUsize::new(0));

        scheduler.schedule(None, Duration::from_millis(50), counting_job(&counter));
        scheduler.stop();
        scheduler.join().await;

        sleep(Duration::from_millis(150)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0, "timer fired after stop");
    }

    #[tokio::test]
    async fn test_join_is_idempotent() {
        let scheduler = DebounceScheduler::new();
        scheduler.stop();
        scheduler.join().await;
        scheduler.join().await;
    }
}
