use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Bounded FIFO shared by many producers and one worker thread.
pub(super) struct Mailbox<T> {
    state: Mutex<MailboxState<T>>,
    ready: Condvar,
    settled: Condvar,
    capacity: usize,
}

struct MailboxState<T> {
    queue: VecDeque<T>,
    dropped: usize,
    busy: bool,
    stop: bool,
    exited: bool,
}

/// What the worker should do next.
pub(super) enum Next<T> {
    Deliver { payload: T, dropped: usize },
    Exit,
}

impl<T> Mailbox<T> {
    pub(super) fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(MailboxState {
                queue: VecDeque::with_capacity(capacity),
                dropped: 0,
                busy: false,
                stop: false,
                exited: false,
            }),
            ready: Condvar::new(),
            settled: Condvar::new(),
            capacity: capacity.max(1),
        }
    }

    /// Enqueue without blocking; a full mailbox counts a drop instead.
    /// Nothing is accepted once the worker has exited.
    pub(super) fn offer(&self, payload: T) -> bool {
        let mut state = self.state.lock();
        if state.exited {
            return false;
        }
        if state.queue.len() >= self.capacity {
            state.dropped += 1;
            return false;
        }
        state.queue.push_back(payload);
        self.ready.notify_one();
        true
    }

    /// Block the worker until there is a message or it has been told to
    /// stop with nothing left to deliver.
    pub(super) fn next(&self) -> Next<T> {
        let mut state = self.state.lock();
        loop {
            if let Some(payload) = state.queue.pop_front() {
                state.busy = true;
                let dropped = std::mem::take(&mut state.dropped);
                return Next::Deliver { payload, dropped };
            }
            if state.stop {
                state.exited = true;
                self.settled.notify_all();
                return Next::Exit;
            }
            self.ready.wait(&mut state);
        }
    }

    /// Called by the worker after each delivery.
    pub(super) fn finished(&self) {
        let mut state = self.state.lock();
        state.busy = false;
        if state.queue.is_empty() {
            self.settled.notify_all();
        }
    }

    /// Called when no worker will serve this mailbox any more.
    pub(super) fn mark_exited(&self) {
        let mut state = self.state.lock();
        state.busy = false;
        state.exited = true;
        state.queue.clear();
        self.settled.notify_all();
    }

    pub(super) fn request_stop(&self) {
        let mut state = self.state.lock();
        state.stop = true;
        self.ready.notify_all();
    }

    /// Wait until nothing is queued or in flight. Returns whether that
    /// happened before the timeout.
    pub(super) fn wait_idle(&self, timeout: Duration) -> bool {
        self.wait_until(timeout, |state| {
            state.exited || (state.queue.is_empty() && !state.busy)
        })
    }

    /// Wait until the worker has exited. Returns whether that happened
    /// before the timeout.
    pub(super) fn wait_exited(&self, timeout: Duration) -> bool {
        self.wait_until(timeout, |state| state.exited)
    }

    pub(super) fn len(&self) -> usize {
        self.state.lock().queue.len()
    }

    fn wait_until(&self, timeout: Duration, done: impl Fn(&MailboxState<T>) -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        while !done(&state) {
            if self.settled.wait_until(&mut state, deadline).timed_out() {
                return done(&state);
            }
        }
        true
    }
}

/// Held by a worker thread; marks the mailbox exited however the thread ends.
pub(super) struct ExitGuard<'a, T>(pub(super) &'a Mailbox<T>);

impl<T> Drop for ExitGuard<'_, T> {
    fn drop(&mut self) {
        self.0.mark_exited();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn full_mailbox_counts_drops() {
        let mailbox = Mailbox::new(2);
        assert!(mailbox.offer(1));
        assert!(mailbox.offer(2));
        assert!(!mailbox.offer(3));
        assert!(!mailbox.offer(4));

        match mailbox.next() {
            Next::Deliver { payload, dropped } => {
                assert_eq!(payload, 1);
                assert_eq!(dropped, 2);
            }
            Next::Exit => panic!("expected a delivery"),
        }
        mailbox.finished();

        match mailbox.next() {
            Next::Deliver { payload, dropped } => {
                assert_eq!(payload, 2);
                assert_eq!(dropped, 0);
            }
            Next::Exit => panic!("expected a delivery"),
        }
    }

    #[test]
    fn stop_drains_before_exit() {
        let mailbox = Mailbox::new(4);
        mailbox.offer("a");
        mailbox.request_stop();

        assert!(matches!(mailbox.next(), Next::Deliver { payload: "a", .. }));
        mailbox.finished();
        assert!(matches!(mailbox.next(), Next::Exit));
        assert!(mailbox.wait_exited(Duration::from_millis(1)));
    }

    #[test]
    fn wait_idle_times_out_while_busy() {
        let mailbox = Mailbox::new(4);
        mailbox.offer(1);
        let _ = mailbox.next();
        assert!(!mailbox.wait_idle(Duration::from_millis(20)));
        mailbox.finished();
        assert!(mailbox.wait_idle(Duration::from_millis(20)));
    }

    #[test]
    fn worker_dying_mid_delivery_closes_the_mailbox() {
        let mailbox = Arc::new(Mailbox::new(4));
        mailbox.offer(1);
        mailbox.offer(2);

        let worker = {
            let mailbox = Arc::clone(&mailbox);
            std::thread::spawn(move || {
                let _guard = ExitGuard(&*mailbox);
                let _ = mailbox.next();
                panic!("worker died");
            })
        };
        assert!(worker.join().is_err());

        assert!(mailbox.wait_exited(Duration::from_millis(1)));
        assert!(mailbox.wait_idle(Duration::from_millis(1)));
        assert!(!mailbox.offer(3));
        assert_eq!(mailbox.len(), 0);
    }
}
