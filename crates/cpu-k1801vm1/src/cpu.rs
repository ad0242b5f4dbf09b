//! The central CPU struct: registers, PSW, timing, and the instruction
//! loop that ties the instruction-group modules together.

use emu_core::{Observable, Value};

use crate::bus::Bus;
use crate::flags::Psw;
use crate::interrupts::InterruptQueue;
use crate::registers::Registers;

/// Outcome of one [`Cpu1801::step`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// An instruction was fetched and executed (including traps taken as
    /// a result of executing it).
    Executed,
    /// The CPU is halted; no instruction was fetched.
    Halted,
    /// The CPU is waiting for an interrupt; no instruction was fetched.
    Waiting,
}

/// A K1801VM1 CPU core.
///
/// Generic machine crates construct one of these, implement [`Bus`] for
/// their memory map, and drive it with [`Cpu1801::step`].
#[derive(Debug)]
pub struct Cpu1801 {
    pub(crate) regs: Registers,
    pub(crate) psw: Psw,
    pub(crate) cpu_time: u64,
    pub(crate) halted: bool,
    pub(crate) waiting: bool,
    pub(crate) reset_pulse_pending: bool,
    pub(crate) interrupts: InterruptQueue,
}

impl Default for Cpu1801 {
    fn default() -> Self {
        Self::new()
    }
}

impl Cpu1801 {
    #[must_use]
    pub fn new() -> Self {
        Self {
            regs: Registers::new(),
            psw: Psw::default(),
            cpu_time: 0,
            halted: false,
            waiting: false,
            reset_pulse_pending: false,
            interrupts: InterruptQueue::new(),
        }
    }

    /// Reset registers and PSW to their power-up state. The caller (the
    /// machine crate, which knows where ROM lives) is responsible for
    /// setting the initial PC afterward.
    pub fn reset(&mut self) {
        self.regs = Registers::new();
        self.psw = Psw::default();
        self.halted = false;
        self.waiting = false;
        self.reset_pulse_pending = false;
        self.interrupts.clear();
    }

    #[must_use]
    pub fn registers(&self) -> Registers {
        self.regs
    }

    /// Read one of the eight general registers (R6=SP, R7=PC).
    #[must_use]
    pub fn read_register(&self, n: usize) -> u16 {
        self.regs.get(n)
    }

    /// Write one of the eight general registers (R6=SP, R7=PC).
    pub fn write_register(&mut self, n: usize, value: u16) {
        self.regs.set(n, value);
    }

    #[must_use]
    pub fn psw(&self) -> Psw {
        self.psw
    }

    /// Overwrite the PSW wholesale. For test setup and `restore_state`;
    /// normal execution only ever changes it through condition-code and
    /// trap/interrupt logic.
    pub fn set_psw(&mut self, psw: Psw) {
        self.psw = psw;
    }

    #[must_use]
    pub fn cpu_time(&self) -> u64 {
        self.cpu_time
    }

    #[must_use]
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    #[must_use]
    pub fn is_waiting(&self) -> bool {
        self.waiting
    }

    /// Consume a pending RESET-instruction pulse, if one occurred since
    /// the last call. Devices that reset alongside the CPU watch this.
    pub fn take_reset_pulse(&mut self) -> bool {
        std::mem::take(&mut self.reset_pulse_pending)
    }

    /// Execute exactly one instruction.
    ///
    /// First services the highest-priority pending interrupt, if any
    /// exceeds the current PSW priority; then, unless halted or waiting,
    /// fetches and executes one instruction. Faults raised while decoding
    /// or executing are converted to the matching trap and absorbed here
    /// — a single `step` call always either executes one instruction or
    /// takes one trap, never both silently escaping as an error.
    pub fn step(&mut self, bus: &mut impl Bus) -> StepOutcome {
        self.service_pending_interrupt(bus);

        if self.halted {
            return StepOutcome::Halted;
        }
        if self.waiting {
            self.cpu_time += 1;
            return StepOutcome::Waiting;
        }

        let cycles = match self.decode_and_execute(bus) {
            Ok(cycles) => cycles,
            Err(fault) => {
                self.trap_fault(bus, fault);
                crate::timing::BASE_TRAP
            }
        };
        self.cpu_time += u64::from(cycles);
        StepOutcome::Executed
    }
}

impl Observable for Cpu1801 {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "pc" => Some(Value::U16(self.regs.pc())),
            "sp" => Some(Value::U16(self.regs.sp())),
            "r0" => Some(Value::U16(self.regs.get(0))),
            "r1" => Some(Value::U16(self.regs.get(1))),
            "r2" => Some(Value::U16(self.regs.get(2))),
            "r3" => Some(Value::U16(self.regs.get(3))),
            "r4" => Some(Value::U16(self.regs.get(4))),
            "r5" => Some(Value::U16(self.regs.get(5))),
            "psw" => Some(Value::U16(self.psw.get())),
            "flags.n" => Some(Value::Bool(self.psw.flag(crate::flags::N))),
            "flags.z" => Some(Value::Bool(self.psw.flag(crate::flags::Z))),
            "flags.v" => Some(Value::Bool(self.psw.flag(crate::flags::V))),
            "flags.c" => Some(Value::Bool(self.psw.flag(crate::flags::C))),
            "priority" => Some(Value::U8(self.psw.priority())),
            "halted" => Some(Value::Bool(self.halted)),
            "waiting" => Some(Value::Bool(self.waiting)),
            "cpu_time" => Some(Value::U64(self.cpu_time)),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "pc", "sp", "r0", "r1", "r2", "r3", "r4", "r5", "psw", "flags.n", "flags.z",
            "flags.v", "flags.c", "priority", "halted", "waiting", "cpu_time",
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::{C, Z};
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

        fn word_at(&self, addr: u16) -> u16 {
            let lo = *self.mem.get(&addr).unwrap_or(&0);
            let hi = *self.mem.get(&(addr + 1)).unwrap_or(&0);
            u16::from(lo) | (u16::from(hi) << 8)
        }
    }

    impl Bus for TestBus {
        fn read_word(&mut self, _t: u64, addr: u16) -> crate::bus::ReadResult {
            if addr % 2 != 0 {
                return crate::bus::ReadResult::BusError;
            }
            crate::bus::ReadResult::Ok(self.word_at(addr))
        }

        fn read_byte(&mut self, _t: u64, addr: u16) -> crate::bus::ReadResult {
            crate::bus::ReadResult::Ok(u16::from(*self.mem.get(&addr).unwrap_or(&0)))
        }

        fn write_word(&mut self, _t: u64, addr: u16, value: u16) -> bool {
            self.load_word(addr, value);
            true
        }

        fn write_byte(&mut self, _t: u64, addr: u16, value: u8) -> bool {
            self.mem.insert(addr, value);
            true
        }
    }

    /// `SWAB R0` with R0 = 0o001234 leaves R0 = 0o003412.
    #[test]
    fn seed_swab_swaps_register_bytes() {
        let mut bus = TestBus::new();
        let mut cpu = Cpu1801::new();
        cpu.regs.set_pc(0o1000);
        bus.load_word(0o1000, 0o000300); // SWAB R0
        cpu.regs.set(0, 0o001234);

        let outcome = cpu.step(&mut bus);

        assert_eq!(outcome, StepOutcome::Executed);
        assert_eq!(cpu.regs.get(0), 0o003412);
        assert_eq!(cpu.regs.pc(), 0o1002);
    }

    /// `TST R1` with R1 = 0 sets Z and clears C; `TSTB` on a zero memory
    /// byte does the same.
    #[test]
    fn seed_tst_sets_zero_flag_and_clears_carry() {
        let mut bus = TestBus::new();
        let mut cpu = Cpu1801::new();
        cpu.regs.set_pc(0o1000);
        bus.load_word(0o1000, 0o005701); // TST R1
        cpu.regs.set(1, 0);
        cpu.psw.set_flag(C, true);

        cpu.step(&mut bus);

        assert!(cpu.psw.flag(Z));
        assert!(!cpu.psw.flag(C));
    }

    /// `MOV X(R1),R0` (index mode) reads the word at `R1 + X` and loads it
    /// into R0, consuming the extra displacement word.
    #[test]
    fn seed_mov_index_mode_loads_displaced_word() {
        let mut bus = TestBus::new();
        let mut cpu = Cpu1801::new();
        cpu.regs.set_pc(0o1000);
        bus.load_word(0o1000, 0o016100); // MOV X(R1),R0  (src mode 6 reg 1, dst reg 0)
        bus.load_word(0o1002, 0o20); // displacement = 020
        cpu.regs.set(1, 0o2000);
        bus.load_word(0o2020, 0o112233 & 0xFFFF);

        cpu.step(&mut bus);

        assert_eq!(cpu.regs.get(0), 0o112233 & 0xFFFF);
        assert_eq!(cpu.regs.pc(), 0o1004);
    }

    /// `BCC` branches when carry is clear; base opcode `0o103000` plus a
    /// displacement of 1 word moves PC forward by 2 past the branch itself.
    #[test]
    fn seed_bcc_branches_forward_when_carry_clear() {
        let mut bus = TestBus::new();
        let mut cpu = Cpu1801::new();
        cpu.regs.set_pc(0o1000);
        bus.load_word(0o1000, 0o103001); // BCC +1
        cpu.psw.set_flag(C, false);

        cpu.step(&mut bus);

        assert_eq!(cpu.regs.pc(), 0o1004);
    }

    #[test]
    fn odd_pc_faults_with_bus_error_and_does_not_panic() {
        let mut bus = TestBus::new();
        bus.load_word(crate::traps::VEC_BUS_ERROR, 0o2000);
        bus.load_word(crate::traps::VEC_BUS_ERROR + 2, 0o340);
        let mut cpu = Cpu1801::new();
        cpu.regs.set_pc(0o1001);
        cpu.regs.set_sp(0o1000);

        let outcome = cpu.step(&mut bus);

        assert_eq!(outcome, StepOutcome::Executed);
        assert_eq!(cpu.regs.pc(), 0o2000);
    }

    #[test]
    fn halt_instruction_stops_further_execution() {
        let mut bus = TestBus::new();
        let mut cpu = Cpu1801::new();
        cpu.regs.set_pc(0o1000);
        bus.load_word(0o1000, 0o000000); // HALT

        assert_eq!(cpu.step(&mut bus), StepOutcome::Executed);
        assert!(cpu.is_halted());
        assert_eq!(cpu.step(&mut bus), StepOutcome::Halted);
    }

    #[test]
    fn interrupt_wakes_a_waiting_cpu() {
        let mut bus = TestBus::new();
        bus.load_word(0o300, 0o5000);
        bus.load_word(0o302, 0o340);
        let mut cpu = Cpu1801::new();
        cpu.psw.set_priority(0);
        cpu.regs.set_pc(0o1000);
        cpu.regs.set_sp(0o1000);
        bus.load_word(0o1000, 0o000001); // WAIT

        cpu.step(&mut bus);
        assert!(cpu.is_waiting());

        cpu.request_interrupt(4, 0o300);
        cpu.step(&mut bus);

        assert!(!cpu.is_waiting());
        assert_eq!(cpu.regs.pc(), 0o5000);
    }
}
