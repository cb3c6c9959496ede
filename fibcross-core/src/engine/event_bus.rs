//! Single-threaded FIFO event queue.

use crate::domain::Event;
use std::collections::VecDeque;

#[derive(Debug, Clone, Default)]
pub struct EventBus {
    queue: VecDeque<Event>,
    published: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&mut self, event: Event) {
        self.published += 1;
        self.queue.push_back(event);
    }

    pub fn next(&mut self) -> Option<Event> {
        self.queue.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Events published since creation.
    pub fn published(&self) -> u64 {
        self.published
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_order() {
        let mut bus = EventBus::new();
        bus.publish(Event::Market);
        bus.publish(Event::Market);
        assert_eq!(bus.len(), 2);
        assert_eq!(bus.next(), Some(Event::Market));
        assert_eq!(bus.next(), Some(Event::Market));
        assert!(bus.next().is_none());
        assert!(bus.is_empty());
        assert_eq!(bus.published(), 2);
    }
}
