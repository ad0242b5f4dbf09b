//! The eight K1801VM1 addressing modes.
//!
//! A six-bit operand field splits into a 3-bit mode and a 3-bit register
//! number. [`resolve`] computes the effective location (register or memory
//! address) and performs every side effect (auto-increment, auto-decrement,
//! PC advance for immediate/index) immediately, the same way a real PDP-11
//! performs them as the operand is fetched rather than deferring them to
//! the end of the instruction — see DESIGN.md for the reasoning behind
//! applying side effects eagerly instead of deferring them.

use crate::bus::Bus;
use crate::cpu::Cpu1801;
use crate::registers::{PC, SP};
use crate::traps::Trap;

/// One of the eight addressing modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddrMode {
    Register,
    RegisterDeferred,
    Autoincrement,
    AutoincrementDeferred,
    Autodecrement,
    AutodecrementDeferred,
    Index,
    IndexDeferred,
}

impl AddrMode {
    #[must_use]
    pub const fn decode(mode_bits: u8) -> Self {
        match mode_bits & 0x7 {
            0 => Self::Register,
            1 => Self::RegisterDeferred,
            2 => Self::Autoincrement,
            3 => Self::AutoincrementDeferred,
            4 => Self::Autodecrement,
            5 => Self::AutodecrementDeferred,
            6 => Self::Index,
            _ => Self::IndexDeferred,
        }
    }
}

/// Where a resolved operand lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EaResult {
    /// Operand is register `n` itself (not memory).
    Reg(usize),
    /// Operand is the memory cell at this address.
    Mem(u16),
}

impl Cpu1801 {
    /// Fetch the word at PC and advance PC by 2.
    pub(crate) fn fetch_word(&mut self, bus: &mut impl Bus) -> Result<u16, Trap> {
        let pc = self.regs.pc();
        if pc % 2 != 0 {
            return Err(Trap::BusError);
        }
        let value = bus
            .read_word(self.cpu_time, pc)
            .ok()
            .ok_or(Trap::BusError)?;
        self.regs.advance_pc(2);
        Ok(value)
    }

    /// Autoincrement/autodecrement step size: byte mode uses 1, except on
    /// SP or PC where it is always 2 to keep the stack and instruction
    /// stream word-aligned.
    fn step_size(reg: usize, byte_mode: bool) -> u16 {
        if byte_mode && reg != SP && reg != PC {
            1
        } else {
            2
        }
    }

    /// Resolve a six-bit operand field (mode bits 3-5, register bits 0-2)
    /// to its effective location, performing every addressing side effect.
    pub(crate) fn resolve_ea(
        &mut self,
        bus: &mut impl Bus,
        mode: AddrMode,
        reg: usize,
        byte_mode: bool,
    ) -> Result<EaResult, Trap> {
        match mode {
            AddrMode::Register => Ok(EaResult::Reg(reg)),
            AddrMode::RegisterDeferred => Ok(EaResult::Mem(self.regs.get(reg))),
            AddrMode::Autoincrement => {
                let addr = self.regs.get(reg);
                let size = Self::step_size(reg, byte_mode);
                self.regs.set(reg, addr.wrapping_add(size));
                Ok(EaResult::Mem(addr))
            }
            AddrMode::AutoincrementDeferred => {
                let ptr = self.regs.get(reg);
                let addr = self.read_word_at(bus, ptr)?;
                self.regs.set(reg, ptr.wrapping_add(2));
                Ok(EaResult::Mem(addr))
            }
            AddrMode::Autodecrement => {
                let size = Self::step_size(reg, byte_mode);
                let addr = self.regs.get(reg).wrapping_sub(size);
                self.regs.set(reg, addr);
                Ok(EaResult::Mem(addr))
            }
            AddrMode::AutodecrementDeferred => {
                let ptr = self.regs.get(reg).wrapping_sub(2);
                self.regs.set(reg, ptr);
                let addr = self.read_word_at(bus, ptr)?;
                Ok(EaResult::Mem(addr))
            }
            AddrMode::Index => {
                let x = self.fetch_word(bus)?;
                let addr = self.regs.get(reg).wrapping_add(x);
                Ok(EaResult::Mem(addr))
            }
            AddrMode::IndexDeferred => {
                let x = self.fetch_word(bus)?;
                let ptr = self.regs.get(reg).wrapping_add(x);
                let addr = self.read_word_at(bus, ptr)?;
                Ok(EaResult::Mem(addr))
            }
        }
    }

    /// Read a word for addressing-mode indirection (not an instruction
    /// fetch, so it does not advance PC).
    fn read_word_at(&mut self, bus: &mut impl Bus, addr: u16) -> Result<u16, Trap> {
        if addr % 2 != 0 {
            return Err(Trap::BusError);
        }
        bus.read_word(self.cpu_time, addr).ok().ok_or(Trap::BusError)
    }

    /// Read the operand's value. For byte mode on a register operand, only
    /// the low byte participates; memory operands are read with the width
    /// implied by `byte_mode`, zero-extended into a `u16` for uniform ALU
    /// handling.
    pub(crate) fn read_operand(
        &mut self,
        bus: &mut impl Bus,
        ea: EaResult,
        byte_mode: bool,
    ) -> Result<u16, Trap> {
        match ea {
            EaResult::Reg(n) => {
                let v = self.regs.get(n);
                Ok(if byte_mode { v & 0x00FF } else { v })
            }
            EaResult::Mem(addr) => {
                if byte_mode {
                    bus.read_byte(self.cpu_time, addr)
                        .ok()
                        .map(|v| v & 0x00FF)
                        .ok_or(Trap::BusError)
                } else {
                    if addr % 2 != 0 {
                        return Err(Trap::BusError);
                    }
                    bus.read_word(self.cpu_time, addr).ok().ok_or(Trap::BusError)
                }
            }
        }
    }

    /// Write the operand's value back. For byte mode on a register
    /// operand, only the low byte is replaced; the high byte is preserved.
    pub(crate) fn write_operand(
        &mut self,
        bus: &mut impl Bus,
        ea: EaResult,
        byte_mode: bool,
        value: u16,
    ) -> Result<(), Trap> {
        match ea {
            EaResult::Reg(n) => {
                if byte_mode {
                    let prior = self.regs.get(n);
                    self.regs.set(n, (prior & 0xFF00) | (value & 0x00FF));
                } else {
                    self.regs.set(n, value);
                }
                Ok(())
            }
            EaResult::Mem(addr) => {
                let ok = if byte_mode {
                    bus.write_byte(self.cpu_time, addr, value as u8)
                } else {
                    if addr % 2 != 0 {
                        return Err(Trap::BusError);
                    }
                    bus.write_word(self.cpu_time, addr, value)
                };
                if ok {
                    Ok(())
                } else {
                    Err(Trap::BusError)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::Cpu1801;
    use std::collections::BTreeMap;

    struct TestBus {
        mem: BTreeMap<u16, u8>,
    }

    impl TestBus {
        fn new() -> Self {
            Self { mem: BTreeMap::new() }
        }

        fn set_word(&mut self, addr: u16, value: u16) {
            self.mem.insert(addr, value as u8);
            self.mem.insert(addr + 1, (value >> 8) as u8);
        }
    }

    impl Bus for TestBus {
        fn read_word(&mut self, _t: u64, addr: u16) -> crate::bus::ReadResult {
            let lo = *self.mem.get(&addr).unwrap_or(&0);
            let hi = *self.mem.get(&(addr + 1)).unwrap_or(&0);
            crate::bus::ReadResult::Ok(u16::from(lo) | (u16::from(hi) << 8))
        }

        fn read_byte(&mut self, _t: u64, addr: u16) -> crate::bus::ReadResult {
            crate::bus::ReadResult::Ok(u16::from(*self.mem.get(&addr).unwrap_or(&0)))
        }

        fn write_word(&mut self, _t: u64, addr: u16, value: u16) -> bool {
            self.set_word(addr, value);
            true
        }

        fn write_byte(&mut self, _t: u64, addr: u16, value: u8) -> bool {
            self.mem.insert(addr, value);
            true
        }
    }

    #[test]
    fn autoincrement_word_advances_by_two() {
        let mut bus = TestBus::new();
        let mut cpu = Cpu1801::new();
        cpu.regs.set(1, 0o1000);
        let ea = cpu
            .resolve_ea(&mut bus, AddrMode::Autoincrement, 1, false)
            .unwrap();
        assert_eq!(ea, EaResult::Mem(0o1000));
        assert_eq!(cpu.regs.get(1), 0o1002);
    }

    #[test]
    fn byte_autoincrement_on_sp_steps_by_two() {
        let mut bus = TestBus::new();
        let mut cpu = Cpu1801::new();
        cpu.regs.set_sp(0o1000);
        let ea = cpu
            .resolve_ea(&mut bus, AddrMode::Autoincrement, SP, true)
            .unwrap();
        assert_eq!(ea, EaResult::Mem(0o1000));
        assert_eq!(cpu.regs.sp(), 0o1002);
    }

    #[test]
    fn index_mode_reads_x_word_and_advances_pc() {
        let mut bus = TestBus::new();
        bus.set_word(0o100002, 0o20);
        let mut cpu = Cpu1801::new();
        cpu.regs.set_pc(0o100002);
        cpu.regs.set(1, 0o1000);
        let ea = cpu.resolve_ea(&mut bus, AddrMode::Index, 1, false).unwrap();
        assert_eq!(ea, EaResult::Mem(0o1020));
        assert_eq!(cpu.regs.pc(), 0o100004);
    }

    #[test]
    fn register_byte_write_preserves_high_byte() {
        let mut bus = TestBus::new();
        let mut cpu = Cpu1801::new();
        cpu.regs.set(0, 0o123456);
        cpu.write_operand(&mut bus, EaResult::Reg(0), true, 0o77)
            .unwrap();
        assert_eq!(cpu.regs.get(0), 0o123477 & 0xFFFF);
    }
}
