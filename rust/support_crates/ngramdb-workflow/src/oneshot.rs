//! A oneshot channel: exactly one value travels from one sender to one receiver.
//!
//! Every job descriptor handed to a worker embeds a [`OneshotSender`] for its
//! result; the dispatching thread keeps the matching [`OneshotReceiver`] and
//! blocks on it when it needs the result.
//!
//! ## Channel Lifecycle
//!
//! 1. Pending: waiting for a value
//! 2. Ready: a value has been sent and not yet received
//! 3. Closed: the value was received, or the sender was dropped without sending
//!
//! A sender dropped while the channel is still pending closes it, so a
//! receiver never blocks forever on a job whose worker died.

use std::sync::{Arc, Condvar, Mutex};

/// Creates a new oneshot channel, returning a sender and receiver pair.
pub fn channel<T>() -> (OneshotSender<T>, OneshotReceiver<T>) {
    let cell = Arc::new(OneshotCell {
        state: Mutex::new(State::Pending),
        condvar: Condvar::new(),
    });
    (OneshotSender(Some(cell.clone())), OneshotReceiver(cell))
}

/// The sending half of a oneshot channel.
pub struct OneshotSender<T>(Option<Arc<OneshotCell<T>>>);

impl<T> OneshotSender<T> {
    /// Sends the value, consuming the sender.
    ///
    /// Returns `Err(value)` if the receiver was already dropped.
    pub fn send(mut self, value: T) -> Result<(), T> {
        match self.0.take() {
            Some(cell) => {
                if Arc::strong_count(&cell) == 1 {
                    return Err(value);
                }
                cell.resolve(State::Ready(value));
                Ok(())
            }
            None => Err(value),
        }
    }
}

impl<T> Drop for OneshotSender<T> {
    fn drop(&mut self) {
        if let Some(cell) = self.0.take() {
            cell.resolve(State::Closed);
        }
    }
}

/// The receiving half of a oneshot channel.
pub struct OneshotReceiver<T>(Arc<OneshotCell<T>>);

impl<T> OneshotReceiver<T> {
    /// Blocks until the value arrives.
    ///
    /// Returns `None` if the sender was dropped without sending.
    pub fn recv(self) -> Option<T> {
        let guard = self.0.state.lock().unwrap();
        let mut guard = self
            .0
            .condvar
            .wait_while(guard, |state| matches!(state, State::Pending))
            .unwrap();
        match std::mem::replace(&mut *guard, State::Closed) {
            State::Ready(value) => Some(value),
            State::Pending | State::Closed => None,
        }
    }

    /// Returns `true` while no value has been sent and the sender is alive.
    pub fn is_pending(&self) -> bool {
        matches!(*self.0.state.lock().unwrap(), State::Pending)
    }
}

struct OneshotCell<T> {
    state: Mutex<State<T>>,
    condvar: Condvar,
}

impl<T> OneshotCell<T> {
    /// Moves a pending cell to `next`; a resolved cell is left untouched.
    fn resolve(&self, next: State<T>) {
        let mut state = self.state.lock().unwrap();
        if matches!(*state, State::Pending) {
            *state = next;
            self.condvar.notify_all();
        }
    }
}

enum State<T> {
    Pending,
    Ready(T),
    Closed,
}
