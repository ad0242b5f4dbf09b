//! Condition-code operators: CLC, CLV, CLN, CLZ, CCC, SEC, SEV, SEN, SEZ,
//! SCC, and NOP (which is this family with no flag bits selected).
//!
//! Encoding (octal `000240`-`000277`): bit 4 (`020`) selects set vs clear,
//! bits 0-3 select which of C/V/Z/N participate.

use crate::cpu::Cpu1801;
use crate::flags::{C, N, V, Z};

pub const OP_CC_BASE: u16 = 0o000240;
pub const OP_CC_MASK: u16 = 0o177740;

impl Cpu1801 {
    /// Execute a condition-code operator. `word` is the full instruction.
    pub(crate) fn exec_cc_op(&mut self, word: u16) {
        let set = word & 0o20 != 0;
        if word & 1 != 0 {
            self.psw.set_flag(C, set);
        }
        if word & 2 != 0 {
            self.psw.set_flag(V, set);
        }
        if word & 4 != 0 {
            self.psw.set_flag(Z, set);
        }
        if word & 8 != 0 {
            self.psw.set_flag(N, set);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::Psw;

    #[test]
    fn ccc_clears_all_four_flags() {
        let mut cpu = Cpu1801::new();
        cpu.psw = Psw::new(C | V | Z | N);
        cpu.exec_cc_op(0o000257); // CCC
        assert_eq!(cpu.psw.get() & 0o17, 0);
    }

    #[test]
    fn scc_sets_all_four_flags() {
        let mut cpu = Cpu1801::new();
        cpu.psw = Psw::new(0);
        cpu.exec_cc_op(0o000277); // SCC
        assert_eq!(cpu.psw.get() & 0o17, 0o17);
    }

    #[test]
    fn nop_touches_nothing() {
        let mut cpu = Cpu1801::new();
        cpu.psw = Psw::new(C | Z);
        cpu.exec_cc_op(0o000240); // NOP
        assert_eq!(cpu.psw.get() & 0o17, C | Z);
    }

    #[test]
    fn sec_sets_only_carry() {
        let mut cpu = Cpu1801::new();
        cpu.psw = Psw::new(0);
        cpu.exec_cc_op(0o000261); // SEC
        assert_eq!(cpu.psw.get() & 0o17, C);
    }
}
