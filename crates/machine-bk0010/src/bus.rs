//! The address-space bus: a list of non-overlapping memory regions plus a
//! list of devices, dispatched by address.
//!
//! The K1801VM1 has no fixed chip set of its own, so the bus here stays a
//! generic region/device list that `machine-bk0010` populates, rather
//! than a struct hardcoded to one machine's peripherals.

use cpu_k1801vm1::ReadResult;

use crate::device::Device;
use crate::memory::MemoryRegion;

/// The BK-0010 address space: RAM/ROM regions plus memory-mapped devices.
///
/// Regions and devices are checked for overlap at registration time. This
/// is a one-time wiring error caught when the `Computer` is assembled, not
/// a runtime condition the emulated program can trigger, so it surfaces as
/// a host-facing `Result` rather than a trap.
#[derive(Default)]
pub struct Bus {
    regions: Vec<MemoryRegion>,
    devices: Vec<Box<dyn Device>>,
}

impl Bus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a RAM or ROM region. Fails if it overlaps an existing
    /// region or device.
    pub fn add_region(&mut self, region: MemoryRegion) -> Result<(), String> {
        if self.overlaps(region.start(), region.end()) {
            return Err(format!(
                "memory region at {:#o} overlaps an existing region or device",
                region.start()
            ));
        }
        self.regions.push(region);
        self.regions.sort_by_key(MemoryRegion::start);
        Ok(())
    }

    /// Register a device. Fails if any claimed address overlaps an
    /// existing region or device.
    pub fn add_device(&mut self, device: Box<dyn Device>) -> Result<(), String> {
        for &addr in device.addresses() {
            if self.overlaps(addr, u32::from(addr) + 1) {
                return Err(format!(
                    "device address {addr:#o} overlaps an existing region or device"
                ));
            }
        }
        self.devices.push(device);
        Ok(())
    }

    fn overlaps(&self, start: u16, end: u32) -> bool {
        let start = u32::from(start);
        let region_hit = self
            .regions
            .iter()
            .any(|r| start < r.end() && u32::from(r.start()) < end);
        let device_hit = self
            .devices
            .iter()
            .any(|d| d.addresses().iter().any(|&a| u32::from(a) >= start && u32::from(a) < end));
        region_hit || device_hit
    }

    fn find_region(&self, addr: u16) -> Option<usize> {
        self.regions.iter().position(|r| r.contains(addr))
    }

    fn find_device(&mut self, addr: u16) -> Option<&mut Box<dyn Device>> {
        self.devices.iter_mut().find(|d| d.addresses().contains(&addr))
    }

    /// Called from `Computer::reset`: every device receives its `init`
    /// callback with `cpu_time` reset to 0.
    pub fn init_devices(&mut self, cpu_time: u64) {
        for device in &mut self.devices {
            device.init(cpu_time);
        }
    }

    pub fn devices_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn Device>> {
        self.devices.iter_mut()
    }

    pub fn devices(&self) -> impl Iterator<Item = &Box<dyn Device>> {
        self.devices.iter()
    }
}

impl cpu_k1801vm1::Bus for Bus {
    fn read_word(&mut self, cpu_time: u64, addr: u16) -> ReadResult {
        if let Some(idx) = self.find_region(addr) {
            let region = &self.regions[idx];
            return if region.contains(addr.wrapping_add(1)) {
                ReadResult::Ok(region.read_word(addr))
            } else {
                ReadResult::BusError
            };
        }
        if let Some(device) = self.find_device(addr) {
            return ReadResult::Ok(device.read(cpu_time, addr));
        }
        ReadResult::BusError
    }

    fn read_byte(&mut self, cpu_time: u64, addr: u16) -> ReadResult {
        if let Some(idx) = self.find_region(addr) {
            return ReadResult::Ok(u16::from(self.regions[idx].read_byte(addr)));
        }
        let word_addr = addr & !1;
        if let Some(device) = self.find_device(word_addr) {
            let word = device.read(cpu_time, word_addr);
            let byte = if addr & 1 == 0 { word & 0x00FF } else { word >> 8 };
            return ReadResult::Ok(byte);
        }
        ReadResult::BusError
    }

    fn write_word(&mut self, cpu_time: u64, addr: u16, value: u16) -> bool {
        if let Some(idx) = self.find_region(addr) {
            return self.regions[idx].contains(addr.wrapping_add(1))
                && self.regions[idx].write_word(addr, value);
        }
        if let Some(device) = self.find_device(addr) {
            device.write(cpu_time, false, addr, value);
            return true;
        }
        false
    }

    fn write_byte(&mut self, cpu_time: u64, addr: u16, value: u8) -> bool {
        if let Some(idx) = self.find_region(addr) {
            return self.regions[idx].write_byte(addr, value);
        }
        let word_addr = addr & !1;
        if let Some(device) = self.find_device(word_addr) {
            device.write(cpu_time, true, word_addr, u16::from(value));
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::StateBag;

    struct Echo {
        addrs: [u16; 1],
        last: u16,
    }

    impl Device for Echo {
        fn addresses(&self) -> &[u16] {
            &self.addrs
        }

        fn init(&mut self, _cpu_time: u64) {
            self.last = 0;
        }

        fn read(&mut self, _cpu_time: u64, _address: u16) -> u16 {
            self.last
        }

        fn write(&mut self, _cpu_time: u64, _byte_mode: bool, _address: u16, value: u16) {
            self.last = value;
        }

        fn save_state(&self, _bag: &mut StateBag) {}
        fn restore_state(&mut self, _bag: &StateBag) {}
    }

    #[test]
    fn ram_region_reads_back_what_it_wrote() {
        use cpu_k1801vm1::Bus as _;
        let mut bus = Bus::new();
        bus.add_region(MemoryRegion::ram(0, 0x1000)).unwrap();
        assert!(bus.write_word(0, 0o1000, 0xABCD));
        assert_eq!(bus.read_word(0, 0o1000), ReadResult::Ok(0xABCD));
    }

    #[test]
    fn unmapped_address_faults() {
        use cpu_k1801vm1::Bus as _;
        let mut bus = Bus::new();
        bus.add_region(MemoryRegion::ram(0, 0x1000)).unwrap();
        assert_eq!(bus.read_word(0, 0o177716), ReadResult::BusError);
    }

    #[test]
    fn device_dispatch_round_trips_through_write_and_read() {
        use cpu_k1801vm1::Bus as _;
        let mut bus = Bus::new();
        bus.add_device(Box::new(Echo { addrs: [0o177716], last: 0 })).unwrap();
        assert!(bus.write_word(0, 0o177716, 0x42));
        assert_eq!(bus.read_word(0, 0o177716), ReadResult::Ok(0x42));
    }

    #[test]
    fn byte_read_selects_low_or_high_half_by_parity() {
        use cpu_k1801vm1::Bus as _;
        let mut bus = Bus::new();
        bus.add_device(Box::new(Echo { addrs: [0o177716], last: 0 })).unwrap();
        bus.write_word(0, 0o177716, 0x1234);
        assert_eq!(bus.read_byte(0, 0o177716), ReadResult::Ok(0x34));
        assert_eq!(bus.read_byte(0, 0o177717), ReadResult::Ok(0x12));
    }

    #[test]
    fn overlapping_regions_fail_at_registration() {
        let mut bus = Bus::new();
        bus.add_region(MemoryRegion::ram(0, 0x1000)).unwrap();
        let err = bus.add_region(MemoryRegion::ram(0o1000, 0x1000)).unwrap_err();
        assert!(err.contains("overlaps"));
    }
}
