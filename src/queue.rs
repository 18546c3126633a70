//! Bounded FIFO event queue — the sole synchronization point between the
//! upstream producers (HTTP poller, WebSocket client) and the DB writer.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

use crate::event::Event;

struct State {
    buffer: VecDeque<Event>,
    capacity: usize,
    closed: bool,
}

/// Thread-safe bounded FIFO. `push` blocks while full, `pop` blocks while
/// empty; `close` is idempotent and wakes every waiter.
pub struct BoundedQueue {
    state: Mutex<State>,
    not_full: Condvar,
    not_empty: Condvar,
}

/// Returned by `pop` to distinguish a delivered event from end-of-stream.
pub enum Popped {
    Event(Event),
    EndOfStream,
}

impl BoundedQueue {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "queue capacity must be positive");
        BoundedQueue {
            state: Mutex::new(State {
                buffer: VecDeque::with_capacity(capacity),
                capacity,
                closed: false,
            }),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
        }
    }

    /// Blocks while `size == capacity && !closed`. Returns `Err(())` without
    /// enqueueing if the queue is closed — this is the only failure mode and
    /// signals shutdown to the caller.
    pub fn push(&self, event: Event) -> Result<(), ()> {
        let mut state = self.state.lock().unwrap();
        loop {
            if state.closed {
                return Err(());
            }
            if state.buffer.len() < state.capacity {
                break;
            }
            state = self.not_full.wait(state).unwrap();
        }
        state.buffer.push_back(event);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Blocks while `size == 0 && !closed`. Returns `Popped::EndOfStream`
    /// once the queue is closed and drained.
    pub fn pop(&self) -> Popped {
        let mut state = self.state.lock().unwrap();
        loop {
            if let Some(event) = state.buffer.pop_front() {
                self.not_full.notify_one();
                return Popped::Event(event);
            }
            if state.closed {
                return Popped::EndOfStream;
            }
            state = self.not_empty.wait(state).unwrap();
        }
    }

    /// Marks the queue closed and wakes every waiter. Idempotent.
    pub fn close(&self) {
        let mut state = self.state.lock().unwrap();
        state.closed = true;
        drop(state);
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    pub fn len(&self) -> usize {
        self.state.lock().unwrap().buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.state.lock().unwrap().capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn event(sig: &str) -> Event {
        Event {
            kind: EventKind::Pumpfun,
            signature: sig.to_string(),
            data: vec![1],
            ..Default::default()
        }
    }

    #[test]
    fn fifo_order_single_producer() {
        let q = BoundedQueue::new(4);
        q.push(event("a")).unwrap();
        q.push(event("b")).unwrap();
        q.push(event("c")).unwrap();

        for expected in ["a", "b", "c"] {
            match q.pop() {
                Popped::Event(e) => assert_eq!(e.signature, expected),
                Popped::EndOfStream => panic!("unexpected end of stream"),
            }
        }
    }

    #[test]
    fn push_after_close_fails() {
        let q = BoundedQueue::new(4);
        q.close();
        assert!(q.push(event("x")).is_err());
    }

    #[test]
    fn pop_drains_then_signals_end_of_stream() {
        let q = BoundedQueue::new(4);
        q.push(event("a")).unwrap();
        q.close();

        match q.pop() {
            Popped::Event(e) => assert_eq!(e.signature, "a"),
            Popped::EndOfStream => panic!("expected buffered event before end-of-stream"),
        }
        match q.pop() {
            Popped::Event(_) => panic!("expected end of stream"),
            Popped::EndOfStream => {}
        }
    }

    #[test]
    fn close_is_idempotent() {
        let q = BoundedQueue::new(2);
        q.close();
        q.close();
        assert!(q.push(event("x")).is_err());
    }

    #[test]
    fn backpressure_blocks_third_push_until_pop() {
        let q = Arc::new(BoundedQueue::new(2));
        q.push(event("a")).unwrap();
        q.push(event("b")).unwrap();

        let q2 = Arc::clone(&q);
        let handle = thread::spawn(move || {
            q2.push(event("c")).unwrap();
        });

        thread::sleep(Duration::from_millis(50));
        assert_eq!(q.len(), 2, "third push must not have landed yet");

        match q.pop() {
            Popped::Event(e) => assert_eq!(e.signature, "a"),
            Popped::EndOfStream => panic!(),
        }
        handle.join().unwrap();
        assert_eq!(q.len(), 2);
    }

    #[test]
    fn size_never_exceeds_capacity() {
        let q = BoundedQueue::new(1);
        assert_eq!(q.capacity(), 1);
        q.push(event("a")).unwrap();
        assert_eq!(q.len(), 1);
    }
}
