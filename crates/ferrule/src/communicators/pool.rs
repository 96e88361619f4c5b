use super::mailbox::{ExitGuard, Mailbox, Next};
use super::{Communicator, FastCommunicator, SlowCommunicator};
use parking_lot::Mutex;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Mailbox capacity used by [`CommunicatorPool::new`].
pub const DEFAULT_MAILBOX_CAPACITY: usize = 50;

const DEFAULT_REMOVE_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle identifying a listener within one pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommunicatorId(u64);

impl fmt::Display for CommunicatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "communicator-{}", self.0)
    }
}

/// Fan-out of payloads to fast and slow listeners.
///
/// `communicate` never blocks for longer than it takes to run the fast
/// listeners and enqueue onto each slow listener's mailbox. Each slow
/// listener's worker thread is spawned on the first message it receives.
pub struct CommunicatorPool<T> {
    state: Mutex<PoolState<T>>,
    capacity: usize,
    remove_timeout: Duration,
    next_id: AtomicU64,
}

struct PoolState<T> {
    fast: Vec<(CommunicatorId, Arc<dyn FastCommunicator<T>>)>,
    slow: Vec<SlowEntry<T>>,
}

struct SlowEntry<T> {
    id: CommunicatorId,
    listener: Arc<dyn SlowCommunicator<T>>,
    mailbox: Arc<Mailbox<T>>,
    worker: Option<JoinHandle<()>>,
}

impl<T> CommunicatorPool<T>
where
    T: Clone + Send + 'static,
{
    /// Create a pool whose slow listeners get [`DEFAULT_MAILBOX_CAPACITY`].
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAILBOX_CAPACITY)
    }

    /// Create a pool with a custom mailbox capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            state: Mutex::new(PoolState {
                fast: Vec::new(),
                slow: Vec::new(),
            }),
            capacity: capacity.max(1),
            remove_timeout: DEFAULT_REMOVE_TIMEOUT,
            next_id: AtomicU64::new(1),
        }
    }

    /// Bound how long [`remove`](Self::remove) waits for a worker to drain.
    pub fn with_remove_timeout(mut self, timeout: Duration) -> Self {
        self.remove_timeout = timeout;
        self
    }

    /// Register a listener.
    pub fn add(&self, communicator: Communicator<T>) -> CommunicatorId {
        let id = CommunicatorId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut state = self.state.lock();
        match communicator {
            Communicator::Fast(listener) => state.fast.push((id, listener)),
            Communicator::Slow(listener) => state.slow.push(SlowEntry {
                id,
                listener,
                mailbox: Arc::new(Mailbox::new(self.capacity)),
                worker: None,
            }),
        }
        debug!(%id, "communicator added");
        id
    }

    /// Register a fast listener.
    pub fn add_fast(&self, listener: impl FastCommunicator<T> + 'static) -> CommunicatorId {
        self.add(Communicator::fast(listener))
    }

    /// Register a slow listener.
    pub fn add_slow(&self, listener: impl SlowCommunicator<T> + 'static) -> CommunicatorId {
        self.add(Communicator::slow(listener))
    }

    /// Deregister a listener. Returns `false` if the id is unknown.
    ///
    /// A slow listener's worker is asked to drain its mailbox and exit; if it
    /// has not exited within the remove timeout it is abandoned.
    pub fn remove(&self, id: CommunicatorId) -> bool {
        let removed = {
            let mut state = self.state.lock();
            if let Some(position) = state.fast.iter().position(|(fast_id, _)| *fast_id == id) {
                state.fast.remove(position);
                return true;
            }
            match state.slow.iter().position(|entry| entry.id == id) {
                Some(position) => state.slow.remove(position),
                None => return false,
            }
        };

        removed.mailbox.request_stop();
        if let Some(worker) = removed.worker {
            if removed.mailbox.wait_exited(self.remove_timeout) {
                let _ = worker.join();
            } else {
                warn!(%id, "abandoning communicator worker that did not exit in time");
            }
        }
        true
    }

    /// Deliver `payload` to every listener.
    pub fn communicate(&self, payload: T) {
        let fast = {
            let mut state = self.state.lock();
            for entry in state.slow.iter_mut() {
                entry.mailbox.offer(payload.clone());
                ensure_worker(entry);
            }
            state.fast.clone()
        };

        for (id, listener) in fast {
            match catch_unwind(AssertUnwindSafe(|| listener.communicate(&payload))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => error!(%id, error = %err, "fast communicator failed"),
                Err(panic) => error!(%id, panic = panic_message(&*panic), "fast communicator panicked"),
            }
        }
    }

    /// Wait until every slow listener has nothing queued or in flight, up
    /// to `timeout` per listener. Returns whether all of them settled.
    pub fn wait(&self, timeout: Duration) -> bool {
        let mailboxes: Vec<_> = self
            .state
            .lock()
            .slow
            .iter()
            .filter(|entry| entry.worker.is_some())
            .map(|entry| Arc::clone(&entry.mailbox))
            .collect();

        mailboxes
            .iter()
            .fold(true, |settled, mailbox| mailbox.wait_idle(timeout) && settled)
    }

    /// Drain and stop every slow listener's worker, waiting up to `timeout`
    /// per listener.
    ///
    /// Listeners whose worker exited (or never started) are deregistered;
    /// the rest stay registered so terminating again is safe. Returns
    /// whether every slow listener was terminated.
    pub fn terminate(&self, timeout: Duration) -> bool {
        let targets: Vec<_> = self
            .state
            .lock()
            .slow
            .iter()
            .map(|entry| (entry.id, Arc::clone(&entry.mailbox), entry.worker.is_some()))
            .collect();

        let mut exited = Vec::new();
        for (id, mailbox, running) in targets {
            mailbox.request_stop();
            if !running || mailbox.wait_exited(timeout) {
                exited.push(id);
            } else {
                warn!(%id, "communicator worker did not exit before timeout");
            }
        }

        let mut state = self.state.lock();
        let mut finished = Vec::new();
        state.slow.retain_mut(|entry| {
            if exited.contains(&entry.id) {
                finished.extend(entry.worker.take());
                false
            } else {
                true
            }
        });
        let all_terminated = state.slow.is_empty();
        drop(state);

        for worker in finished {
            let _ = worker.join();
        }
        all_terminated
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        let state = self.state.lock();
        state.fast.len() + state.slow.len()
    }

    /// Whether no listeners are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Messages currently queued for a slow listener.
    pub fn queued(&self, id: CommunicatorId) -> Option<usize> {
        self.state
            .lock()
            .slow
            .iter()
            .find(|entry| entry.id == id)
            .map(|entry| entry.mailbox.len())
    }
}

impl<T> Default for CommunicatorPool<T>
where
    T: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for CommunicatorPool<T> {
    fn drop(&mut self) {
        for entry in self.state.get_mut().slow.iter() {
            entry.mailbox.request_stop();
        }
    }
}

fn ensure_worker<T: Send + 'static>(entry: &mut SlowEntry<T>) {
    if entry.worker.is_some() {
        return;
    }

    let id = entry.id;
    let listener = Arc::clone(&entry.listener);
    let mailbox = Arc::clone(&entry.mailbox);
    let spawned = std::thread::Builder::new()
        .name(format!("ferrule-{}", id))
        .spawn(move || run_worker(id, listener, mailbox));

    match spawned {
        Ok(handle) => entry.worker = Some(handle),
        Err(err) => {
            error!(%id, error = %err, "could not spawn communicator worker");
            entry.mailbox.mark_exited();
        }
    }
}

fn run_worker<T>(id: CommunicatorId, listener: Arc<dyn SlowCommunicator<T>>, mailbox: Arc<Mailbox<T>>) {
    let _guard = ExitGuard(&*mailbox);
    loop {
        match mailbox.next() {
            Next::Exit => return,
            Next::Deliver { payload, dropped } => {
                if dropped > 0 {
                    isolate(id, "dropped", || listener.dropped(dropped));
                }
                isolate(id, "communicate", || listener.communicate(payload));
                mailbox.finished();
            }
        }
    }
}

/// Run one listener call, logging any error or panic.
fn isolate(id: CommunicatorId, call: &'static str, f: impl FnOnce() -> anyhow::Result<()>) {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(())) => {}
        Ok(Err(err)) => error!(%id, call, error = %err, "slow communicator failed"),
        Err(panic) => error!(%id, call, panic = panic_message(&*panic), "slow communicator panicked"),
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    struct Recorder(Arc<Mutex<Vec<u32>>>);

    impl FastCommunicator<u32> for Recorder {
        fn communicate(&self, payload: &u32) -> anyhow::Result<()> {
            self.0.lock().push(*payload);
            Ok(())
        }
    }

    impl SlowCommunicator<u32> for Recorder {
        fn communicate(&self, payload: u32) -> anyhow::Result<()> {
            self.0.lock().push(payload);
            Ok(())
        }
    }

    struct Failing;

    impl FastCommunicator<u32> for Failing {
        fn communicate(&self, _payload: &u32) -> anyhow::Result<()> {
            anyhow::bail!("always fails")
        }
    }

    struct Panicking;

    impl SlowCommunicator<u32> for Panicking {
        fn communicate(&self, payload: u32) -> anyhow::Result<()> {
            if payload == 1 {
                panic!("boom");
            }
            Ok(())
        }
    }

    /// Blocks on its first message until released.
    struct Gate {
        started: Mutex<Option<mpsc::Sender<()>>>,
        release: Mutex<mpsc::Receiver<()>>,
        delivered: Arc<Mutex<Vec<u32>>>,
        drops: Arc<Mutex<Vec<usize>>>,
    }

    impl SlowCommunicator<u32> for Gate {
        fn communicate(&self, payload: u32) -> anyhow::Result<()> {
            if let Some(started) = self.started.lock().take() {
                let _ = started.send(());
                let _ = self.release.lock().recv();
            }
            self.delivered.lock().push(payload);
            Ok(())
        }

        fn dropped(&self, count: usize) -> anyhow::Result<()> {
            self.drops.lock().push(count);
            Ok(())
        }
    }

    #[test]
    fn fast_listeners_run_inline_in_order() {
        let pool = CommunicatorPool::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        pool.add_fast(Recorder(Arc::clone(&seen)));
        pool.add_fast(Failing);
        pool.add_fast(Recorder(Arc::clone(&seen)));

        pool.communicate(7u32);
        assert_eq!(*seen.lock(), vec![7, 7]);
    }

    #[test]
    fn slow_listener_survives_panics() {
        let pool = CommunicatorPool::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        pool.add_slow(Panicking);
        pool.add_slow(Recorder(Arc::clone(&seen)));

        for n in 1..=3u32 {
            pool.communicate(n);
        }
        assert!(pool.wait(Duration::from_secs(2)));
        assert_eq!(*seen.lock(), vec![1, 2, 3]);
    }

    #[test]
    fn drops_are_reported_once_before_next_delivery() {
        let capacity = 3;
        let extra = 4;
        let pool = CommunicatorPool::with_capacity(capacity);
        let (started_tx, started_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let delivered = Arc::new(Mutex::new(Vec::new()));
        let drops = Arc::new(Mutex::new(Vec::new()));
        pool.add_slow(Gate {
            started: Mutex::new(Some(started_tx)),
            release: Mutex::new(release_rx),
            delivered: Arc::clone(&delivered),
            drops: Arc::clone(&drops),
        });

        pool.communicate(0u32);
        started_rx.recv().unwrap();

        let total = (capacity + extra) as u32;
        for n in 1..=total {
            pool.communicate(n);
        }
        release_tx.send(()).unwrap();
        assert!(pool.wait(Duration::from_secs(2)));

        assert_eq!(*drops.lock(), vec![extra]);
        assert_eq!(*delivered.lock(), vec![0, 1, 2, 3]);
        assert_eq!(delivered.lock().len() + extra, total as usize + 1);
    }

    #[test]
    fn remove_unknown_id_is_false() {
        let pool: CommunicatorPool<u32> = CommunicatorPool::new();
        let id = pool.add_fast(Failing);
        assert!(pool.remove(id));
        assert!(!pool.remove(id));
        assert!(pool.is_empty());
    }

    #[test]
    fn terminate_drains_and_deregisters() {
        let pool = CommunicatorPool::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        pool.add_slow(Recorder(Arc::clone(&seen)));
        pool.add_slow(Recorder(Arc::new(Mutex::new(Vec::new()))));
        pool.add_fast(Failing);

        pool.communicate(1u32);
        pool.communicate(2u32);
        assert!(pool.terminate(Duration::from_secs(2)));
        assert_eq!(*seen.lock(), vec![1, 2]);
        assert_eq!(pool.len(), 1);
        assert!(pool.terminate(Duration::from_secs(2)));
    }

    #[test]
    fn terminate_keeps_stuck_listeners_registered() {
        let pool = CommunicatorPool::new();
        let (started_tx, started_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        pool.add_slow(Gate {
            started: Mutex::new(Some(started_tx)),
            release: Mutex::new(release_rx),
            delivered: Arc::new(Mutex::new(Vec::new())),
            drops: Arc::new(Mutex::new(Vec::new())),
        });

        pool.communicate(1u32);
        started_rx.recv().unwrap();

        assert!(!pool.terminate(Duration::from_millis(50)));
        assert_eq!(pool.len(), 1);

        release_tx.send(()).unwrap();
        assert!(pool.terminate(Duration::from_secs(2)));
        assert!(pool.is_empty());
    }
}
