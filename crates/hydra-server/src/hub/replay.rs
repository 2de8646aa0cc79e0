//! Bounded per-channel replay buffers.

use std::collections::VecDeque;

use hydra_core::Event;

/// Fixed-capacity FIFO of the most recent events on a channel. Oldest
/// entries are dropped first; nothing here survives the process.
#[derive(Debug)]
pub struct ReplayBuffer {
    capacity: usize,
    items: VecDeque<Event>,
}

impl ReplayBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            items: VecDeque::with_capacity(capacity),
        }
    }

    /// Record an event, evicting the oldest when full. A zero capacity
    /// disables replay entirely.
    pub fn push(&mut self, event: Event) {
        if self.capacity == 0 {
            return;
        }
        if self.items.len() == self.capacity {
            self.items.pop_front();
        }
        self.items.push_back(event);
    }

    /// The retained backlog, oldest first.
    pub fn snapshot(&self) -> Vec<Event> {
        self.items.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use hydra_core::event::PricePayload;

    fn tick(n: i64) -> Event {
        Event::PriceUpdate(PricePayload {
            symbol: "SOL/USDC".into(),
            price: n as f64,
            change_24h: 0.0,
            timestamp: n,
        })
    }

    #[test]
    fn retains_most_recent_in_arrival_order() {
        let mut buffer = ReplayBuffer::new(3);
        for n in 0..7 {
            buffer.push(tick(n));
        }

        let timestamps: Vec<i64> = buffer
            .snapshot()
            .iter()
            .map(|e| match e {
                Event::PriceUpdate(p) => p.timestamp,
                _ => panic!("unexpected event kind"),
            })
            .collect();
        assert_eq!(timestamps, vec![4, 5, 6]);
    }

    #[test]
    fn zero_capacity_records_nothing() {
        let mut buffer = ReplayBuffer::new(0);
        buffer.push(tick(1));
        assert!(buffer.is_empty());
        assert!(buffer.snapshot().is_empty());
    }

    #[test]
    fn under_capacity_keeps_everything() {
        let mut buffer = ReplayBuffer::new(5);
        buffer.push(tick(1));
        buffer.push(tick(2));
        assert_eq!(buffer.len(), 2);
    }
}
