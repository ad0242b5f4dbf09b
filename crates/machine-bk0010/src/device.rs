//! The device contract devices register under with [`crate::bus::Bus`].
//!
//! Distinct from [`cpu_k1801vm1::Bus`]: that trait is what the CPU core
//! sees (word/byte reads that can bus-error). `Device` is the narrower
//! per-peripheral contract the memory bus dispatches *to* — a device
//! never sees an unmapped address, and its reads never fault (an
//! unreadable register just returns 0, per the write-only case).

use std::collections::BTreeMap;

/// Opaque persisted state, keyed by the device's own field names. Devices
/// that hold nothing worth persisting across a save/restore cycle leave
/// both methods as no-ops.
pub type StateBag = BTreeMap<String, String>;

/// A memory-mapped peripheral.
///
/// Implementors claim a fixed set of addresses via [`Device::addresses`]
/// at construction time; the bus checks those against every other
/// region before registering the device and routes matching reads and
/// writes here for the lifetime of the `Computer`.
pub trait Device: std::any::Any {
    /// The addresses this device claims. Checked for overlap against
    /// every other region when the device is registered; must not
    /// change afterward.
    fn addresses(&self) -> &[u16];

    /// Called once from `Computer::reset`, with `cpu_time` reset to 0.
    fn init(&mut self, cpu_time: u64);

    /// Read the word at `address`, one of [`Device::addresses`]. Devices
    /// with no meaningful value for a given address (write-only
    /// registers) return 0.
    fn read(&mut self, cpu_time: u64, address: u16) -> u16;

    /// Write `value` to `address`. `byte_mode` tells the device whether
    /// the CPU issued a byte or word access; most registers here are
    /// word-wide and ignore it.
    fn write(&mut self, cpu_time: u64, byte_mode: bool, address: u16, value: u16);

    /// Serialize this device's state into `bag`.
    fn save_state(&self, _bag: &mut StateBag) {}

    /// Restore this device's state from `bag`.
    fn restore_state(&mut self, _bag: &StateBag) {}

    /// Called once per executed instruction with the number of cycles it
    /// took, for devices that age independently of being read or written
    /// (the timer). `irq` lets such a device raise an interrupt without
    /// holding a reference back to the CPU — per the CORE's rule that
    /// devices own no cyclic state, the computer hands it in fresh on
    /// every call instead.
    fn advance(&mut self, _cpu_time: u64, _elapsed_cycles: u32, _irq: &mut dyn InterruptSink) {}

    /// Narrows this trait object back to its concrete type. Lets
    /// `Computer` reach a specific registered device (e.g. the keyboard,
    /// to feed it a key) without the generic device list giving up its
    /// uniform `Vec<Box<dyn Device>>` storage.
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

/// Lets a device request a CPU interrupt without holding a reference to
/// the CPU between calls.
pub trait InterruptSink {
    fn request_interrupt(&mut self, priority: u8, vector: u16);
}

impl InterruptSink for cpu_k1801vm1::Cpu1801 {
    fn request_interrupt(&mut self, priority: u8, vector: u16) {
        self.request_interrupt(priority, vector);
    }
}
