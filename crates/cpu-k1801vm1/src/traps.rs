//! Trap vectors and the trap/interrupt/BPT/EMT/HALT/WAIT instruction group.

use crate::bus::Bus;
use crate::cpu::Cpu1801;
use crate::flags::Psw;
use crate::registers::PC;

/// A fault raised while evaluating an operand or fetching an instruction.
///
/// Both variants are handled entirely inside [`Cpu1801::step`] by taking the
/// corresponding trap; neither ever escapes to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trap {
    /// Unmapped address, or an odd address on a word access.
    BusError,
    /// Decode found no matching opcode entry.
    ReservedOpcode,
}

/// Bus error / odd address trap vector.
pub const VEC_BUS_ERROR: u16 = 0o4;
/// Reserved (illegal) instruction trap vector.
pub const VEC_RESERVED_OPCODE: u16 = 0o10;
/// BPT trap vector.
pub const VEC_BPT: u16 = 0o14;
/// IOT trap vector.
pub const VEC_IOT: u16 = 0o20;
/// EMT trap vector.
pub const VEC_EMT: u16 = 0o30;
/// TRAP instruction vector.
pub const VEC_TRAP: u16 = 0o34;

impl Cpu1801 {
    /// Push PSW then PC (pre-decrementing SP by 2 each time) and load the
    /// new PC/PSW from the two words at `vector`/`vector + 2`.
    ///
    /// This never fails: a faulting stack write or vector read during the
    /// trap sequence is absorbed (the old PSW/PC are still clobbered, same
    /// as real PDP-11 double-fault behavior collapsing into whatever the
    /// vector holds) rather than recursing into another trap.
    pub(crate) fn take_trap(&mut self, bus: &mut impl Bus, vector: u16) {
        let sp_psw = self.regs.sp().wrapping_sub(2);
        self.regs.set_sp(sp_psw);
        bus.write_word(self.cpu_time, sp_psw, self.psw.get());

        let sp_pc = sp_psw.wrapping_sub(2);
        self.regs.set_sp(sp_pc);
        bus.write_word(self.cpu_time, sp_pc, self.regs.pc());

        let new_pc = bus
            .read_word(self.cpu_time, vector)
            .ok()
            .unwrap_or(0);
        let new_psw = bus
            .read_word(self.cpu_time, vector.wrapping_add(2))
            .ok()
            .unwrap_or(Psw::default().get());

        self.regs.set_pc(new_pc);
        self.psw = Psw::new(new_psw);
    }

    pub(crate) fn trap_fault(&mut self, bus: &mut impl Bus, fault: Trap) {
        let vector = match fault {
            Trap::BusError => VEC_BUS_ERROR,
            Trap::ReservedOpcode => VEC_RESERVED_OPCODE,
        };
        self.take_trap(bus, vector);
    }

    /// EMT nnn — vector 30.
    pub(crate) fn exec_emt(&mut self, bus: &mut impl Bus) {
        self.take_trap(bus, VEC_EMT);
    }

    /// TRAP nnn — vector 34.
    pub(crate) fn exec_trap(&mut self, bus: &mut impl Bus) {
        self.take_trap(bus, VEC_TRAP);
    }

    /// BPT — vector 14.
    pub(crate) fn exec_bpt(&mut self, bus: &mut impl Bus) {
        self.take_trap(bus, VEC_BPT);
    }

    /// IOT — vector 20.
    pub(crate) fn exec_iot(&mut self, bus: &mut impl Bus) {
        self.take_trap(bus, VEC_IOT);
    }

    /// RTI — pop PC then PSW, unconditionally restoring priority and flags.
    pub(crate) fn exec_rti(&mut self, bus: &mut impl Bus) -> Result<(), Trap> {
        self.pop_pc_and_psw(bus)
    }

    /// RTT — identical to RTI in this CORE (no T-bit single-step trace
    /// trap is modeled, so there is no distinction to preserve).
    pub(crate) fn exec_rtt(&mut self, bus: &mut impl Bus) -> Result<(), Trap> {
        self.pop_pc_and_psw(bus)
    }

    fn pop_pc_and_psw(&mut self, bus: &mut impl Bus) -> Result<(), Trap> {
        let sp = self.regs.sp();
        let new_pc = bus.read_word(self.cpu_time, sp).ok().ok_or(Trap::BusError)?;
        let sp2 = sp.wrapping_add(2);
        let new_psw = bus
            .read_word(self.cpu_time, sp2)
            .ok()
            .ok_or(Trap::BusError)?;
        self.regs.set_sp(sp2.wrapping_add(2));
        self.regs.set(PC, new_pc);
        self.psw = Psw::new(new_psw);
        Ok(())
    }

    /// HALT — legal instruction; stops execution. Surfaced to the host via
    /// [`Cpu1801::is_halted`].
    pub(crate) fn exec_halt(&mut self) {
        self.halted = true;
    }

    /// WAIT — halts instruction issue until an interrupt arrives. Modeled
    /// as a `waiting` flag the pending-interrupt check clears.
    pub(crate) fn exec_wait(&mut self) {
        self.waiting = true;
    }

    /// RESET — pulses the reset line for attached devices; does not touch
    /// CPU registers itself (that is `Cpu1801::reset`'s job). The machine
    /// crate observes this via `Cpu1801::take_reset_pulse`.
    pub(crate) fn exec_reset_instruction(&mut self) {
        self.reset_pulse_pending = true;
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

        fn load_word(&mut self, addr: u16, value: u16) {
            self.mem.insert(addr, value as u8);
            self.mem.insert(addr + 1, (value >> 8) as u8);
        }
    }

    impl Bus for TestBus {
        fn read_word(&mut self, _t: u64, addr: u16) -> crate::bus::ReadResult {
            if addr % 2 != 0 {
                return crate::bus::ReadResult::BusError;
            }
            let lo = *self.mem.get(&addr).unwrap_or(&0);
            let hi = *self.mem.get(&(addr + 1)).unwrap_or(&0);
            crate::bus::ReadResult::Ok(u16::from(lo) | (u16::from(hi) << 8))
        }

        fn read_byte(&mut self, _t: u64, addr: u16) -> crate::bus::ReadResult {
            crate::bus::ReadResult::Ok(u16::from(*self.mem.get(&addr).unwrap_or(&0)))
        }

        fn write_word(&mut self, _t: u64, addr: u16, value: u16) -> bool {
            self.mem.insert(addr, value as u8);
            self.mem.insert(addr + 1, (value >> 8) as u8);
            true
        }

        fn write_byte(&mut self, _t: u64, addr: u16, value: u8) -> bool {
            self.mem.insert(addr, value);
            true
        }
    }

    #[test]
    fn bus_error_trap_pushes_psw_then_pc_and_loads_vector() {
        let mut bus = TestBus::new();
        bus.load_word(VEC_BUS_ERROR, 0o100200);
        bus.load_word(VEC_BUS_ERROR + 2, 0o340);

        let mut cpu = Cpu1801::new();
        cpu.regs.set_pc(0o100010);
        cpu.regs.set_sp(0o1000);
        cpu.psw = Psw::new(crate::flags::N);

        cpu.trap_fault(&mut bus, Trap::BusError);

        assert_eq!(cpu.regs.pc(), 0o100200);
        assert_eq!(cpu.regs.sp(), 0o1000 - 4);
        let pushed_pc = bus.read_word(0, 0o1000 - 4).ok().unwrap();
        let pushed_psw = bus.read_word(0, 0o1000 - 2).ok().unwrap();
        assert_eq!(pushed_pc, 0o100010);
        assert_eq!(pushed_psw, crate::flags::N);
    }
}
