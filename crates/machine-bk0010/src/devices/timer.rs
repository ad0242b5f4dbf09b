//! Programmable timer: a free-running 16-bit down-counter that raises an
//! interrupt at zero and reloads, the minimal device needed to exercise
//! the CPU's device-driven interrupt path.
//!
//! Two registers: a control word (bit 0 = enable) and a count register
//! (read returns the live counter; write sets the reload value and
//! restarts the count from it).

use crate::device::{Device, InterruptSink, StateBag};

const ENABLE_BIT: u16 = 1;

/// A single down-counting timer.
pub struct Timer {
    addrs: [u16; 2],
    control_addr: u16,
    count_addr: u16,
    reload: u16,
    counter: u16,
    enabled: bool,
    cycles_per_tick: u32,
    cycle_accum: u32,
    priority: u8,
    vector: u16,
}

impl Timer {
    /// `cycles_per_tick` is how many CPU cycles the counter takes to
    /// decrement by one; `priority`/`vector` are what it requests on
    /// [`crate::device::InterruptSink`] when it reaches zero.
    #[must_use]
    pub fn new(control_addr: u16, count_addr: u16, cycles_per_tick: u32, priority: u8, vector: u16) -> Self {
        Self {
            addrs: [control_addr, count_addr],
            control_addr,
            count_addr,
            reload: 0,
            counter: 0,
            enabled: false,
            cycles_per_tick: cycles_per_tick.max(1),
            cycle_accum: 0,
            priority,
            vector,
        }
    }
}

impl Device for Timer {
    fn addresses(&self) -> &[u16] {
        &self.addrs
    }

    fn init(&mut self, _cpu_time: u64) {
        self.enabled = false;
        self.cycle_accum = 0;
    }

    fn read(&mut self, _cpu_time: u64, address: u16) -> u16 {
        if address == self.control_addr {
            u16::from(self.enabled)
        } else if address == self.count_addr {
            self.counter
        } else {
            0
        }
    }

    fn write(&mut self, _cpu_time: u64, _byte_mode: bool, address: u16, value: u16) {
        if address == self.control_addr {
            self.enabled = value & ENABLE_BIT != 0;
            if self.enabled {
                self.cycle_accum = 0;
            }
        } else if address == self.count_addr {
            self.reload = value;
            self.counter = value;
        }
    }

    fn save_state(&self, bag: &mut StateBag) {
        bag.insert("timer.reload".into(), self.reload.to_string());
        bag.insert("timer.counter".into(), self.counter.to_string());
        bag.insert("timer.enabled".into(), self.enabled.to_string());
    }

    fn restore_state(&mut self, bag: &StateBag) {
        if let Some(v) = bag.get("timer.reload").and_then(|s| s.parse().ok()) {
            self.reload = v;
        }
        if let Some(v) = bag.get("timer.counter").and_then(|s| s.parse().ok()) {
            self.counter = v;
        }
        if let Some(v) = bag.get("timer.enabled").and_then(|s| s.parse().ok()) {
            self.enabled = v;
        }
    }

    fn advance(&mut self, _cpu_time: u64, elapsed_cycles: u32, irq: &mut dyn InterruptSink) {
        if !self.enabled {
            return;
        }
        self.cycle_accum += elapsed_cycles;
        while self.cycle_accum >= self.cycles_per_tick {
            self.cycle_accum -= self.cycles_per_tick;
            if self.counter == 0 {
                self.counter = self.reload;
                irq.request_interrupt(self.priority, self.vector);
            } else {
                self.counter -= 1;
                if self.counter == 0 {
                    irq.request_interrupt(self.priority, self.vector);
                    self.counter = self.reload;
                }
            }
        }
    }
}
