use std::collections::VecDeque;

use crate::message::Message;

/// Default number of turns kept by [`History`].
pub const DEFAULT_HISTORY_CAPACITY: usize = 5;

/// Fixed-capacity FIFO of recent conversation turns.
///
/// The bound is enforced on every push: once `capacity` turns are held, each
/// new turn evicts the oldest one. A capacity of zero keeps nothing.
#[derive(Debug, Clone)]
pub struct History {
    turns: VecDeque<Message>,
    capacity: usize,
}

impl History {
    pub fn new(capacity: usize) -> Self {
        Self {
            turns: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Append a turn, returning the evicted one if the window was full.
    pub fn push(&mut self, turn: Message) -> Option<Message> {
        if self.capacity == 0 {
            return Some(turn);
        }
        let evicted = if self.turns.len() == self.capacity {
            self.turns.pop_front()
        } else {
            None
        };
        self.turns.push_back(turn);
        if evicted.is_some() {
            tracing::trace!(capacity = self.capacity, "history full, evicted oldest turn");
        }
        evicted
    }

    /// Append a user turn and its reply together.
    pub fn record_exchange(&mut self, user: Message, reply: Message) {
        self.push(user);
        self.push(reply);
    }

    /// Turns in chronological order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Message> + '_ {
        self.turns.iter()
    }

    pub fn snapshot(&self) -> Vec<Message> {
        self.turns.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}
