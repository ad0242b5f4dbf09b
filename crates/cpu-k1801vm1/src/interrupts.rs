//! Pending-interrupt queue.
//!
//! Devices raise interrupts by priority and vector; between instructions
//! the CPU takes the highest-priority pending interrupt if it exceeds the
//! current PSW priority.

use std::collections::BinaryHeap;

use crate::bus::Bus;
use crate::cpu::Cpu1801;

/// A pending device interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interrupt {
    pub priority: u8,
    pub vector: u16,
}

impl Ord for Interrupt {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.priority.cmp(&other.priority)
    }
}

impl PartialOrd for Interrupt {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Priority-ordered queue of pending device interrupts.
#[derive(Debug, Default)]
pub struct InterruptQueue {
    pending: BinaryHeap<Interrupt>,
}

impl InterruptQueue {
    #[must_use]
    pub fn new() -> Self {
        Self { pending: BinaryHeap::new() }
    }

    pub fn request(&mut self, interrupt: Interrupt) {
        self.pending.push(interrupt);
    }

    #[must_use]
    pub fn highest_priority(&self) -> Option<u8> {
        self.pending.peek().map(|i| i.priority)
    }

    fn take_highest(&mut self) -> Option<Interrupt> {
        self.pending.pop()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

impl Cpu1801 {
    /// Request an interrupt at the given priority (1-7) and vector.
    pub fn request_interrupt(&mut self, priority: u8, vector: u16) {
        self.interrupts.request(Interrupt { priority, vector });
    }

    /// Check the pending-interrupt queue; if the highest-priority pending
    /// interrupt exceeds the current PSW priority, take it.
    pub(crate) fn service_pending_interrupt(&mut self, bus: &mut impl Bus) {
        let Some(top) = self.interrupts.highest_priority() else {
            return;
        };
        if top <= self.psw.priority() {
            return;
        }
        let Some(interrupt) = self.interrupts.take_highest() else {
            return;
        };
        self.waiting = false;
        self.take_trap(bus, interrupt.vector);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn higher_priority_interrupt_served_first() {
        let mut q = InterruptQueue::new();
        q.request(Interrupt { priority: 4, vector: 0o300 });
        q.request(Interrupt { priority: 6, vector: 0o320 });
        assert_eq!(q.highest_priority(), Some(6));
        assert_eq!(q.take_highest(), Some(Interrupt { priority: 6, vector: 0o320 }));
        assert_eq!(q.take_highest(), Some(Interrupt { priority: 4, vector: 0o300 }));
    }
}
