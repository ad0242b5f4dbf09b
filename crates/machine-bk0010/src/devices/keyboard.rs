//! Keyboard controller (real BK-0010 address pair 0o177660/0o177662).
//!
//! No matrix scan timing and no host keymap live here — the host decides
//! what a keypress is and calls [`Keyboard::set_key`]; the CORE only
//! owns the two registers software polls: a status word (bit 7 = a key
//! is pending) and a data register (low byte = scan code, cleared by
//! the CPU's read, matching the real hardware's read-to-acknowledge
//! behavior).

use crate::device::{Device, StateBag};

const READY_BIT: u16 = 1 << 7;

/// The keyboard status/data register pair.
pub struct Keyboard {
    addrs: [u16; 2],
    status_addr: u16,
    data_addr: u16,
    pending: Option<u8>,
}

impl Keyboard {
    #[must_use]
    pub fn new(status_addr: u16, data_addr: u16) -> Self {
        Self { addrs: [status_addr, data_addr], status_addr, data_addr, pending: None }
    }

    /// Host API: latch a scan code as though a key had just been struck.
    /// Overwrites any code the CPU has not yet read.
    pub fn set_key(&mut self, code: u8) {
        self.pending = Some(code);
    }
}

impl Device for Keyboard {
    fn addresses(&self) -> &[u16] {
        &self.addrs
    }

    fn init(&mut self, _cpu_time: u64) {
        self.pending = None;
    }

    fn read(&mut self, _cpu_time: u64, address: u16) -> u16 {
        if address == self.status_addr {
            if self.pending.is_some() { READY_BIT } else { 0 }
        } else if address == self.data_addr {
            self.pending.take().map_or(0, u16::from)
        } else {
            0
        }
    }

    fn write(&mut self, _cpu_time: u64, _byte_mode: bool, _address: u16, _value: u16) {
        // Both registers are read-only from the CPU's side.
    }

    fn save_state(&self, bag: &mut StateBag) {
        if let Some(code) = self.pending {
            bag.insert("keyboard.pending".into(), code.to_string());
        }
    }

    fn restore_state(&mut self, bag: &StateBag) {
        self.pending = bag.get("keyboard.pending").and_then(|s| s.parse().ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_key_makes_status_ready_and_data_returns_the_code() {
        let mut kb = Keyboard::new(0o177660, 0o177662);
        assert_eq!(kb.read(0, 0o177660), 0);
        kb.set_key(b'A');
        assert_eq!(kb.read(0, 0o177660), READY_BIT);
        assert_eq!(kb.read(0, 0o177662), u16::from(b'A'));
    }

    #[test]
    fn reading_the_data_register_clears_pending() {
        let mut kb = Keyboard::new(0o177660, 0o177662);
        kb.set_key(7);
        kb.read(0, 0o177662);
        assert_eq!(kb.read(0, 0o177660), 0);
        assert_eq!(kb.read(0, 0o177662), 0);
    }

    #[test]
    fn writes_are_ignored() {
        let mut kb = Keyboard::new(0o177660, 0o177662);
        kb.write(0, false, 0o177662, 0xFF);
        assert_eq!(kb.read(0, 0o177660), 0);
    }
}
