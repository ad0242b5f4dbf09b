//! Top-level opcode dispatch.
//!
//! One instruction word is fetched, classified by trying each instruction
//! group's mask from the narrowest encoding to the widest, and executed.
//! Groups are tried in an order where no two ever claim the same opcode,
//! so the first match is the only match.

use crate::bus::Bus;
use crate::cpu::Cpu1801;
use crate::double_operand::split_field;
use crate::timing::{
    addressing_surcharge, BASE_BRANCH, BASE_CC_OP, BASE_DOUBLE_OPERAND, BASE_JMP, BASE_JSR,
    BASE_MISC_CONTROL, BASE_RTS, BASE_SINGLE_OPERAND, BASE_TRAP,
};
use crate::traps::Trap;
use crate::{branches, cc_ops, double_operand, jumps, single_operand};

impl Cpu1801 {
    /// Fetch and execute one instruction. Returns the cycle count charged
    /// to `cpu_time`, or the [`Trap`] that was raised while doing so (the
    /// caller takes the corresponding trap; it never escapes further).
    pub(crate) fn decode_and_execute(&mut self, bus: &mut impl Bus) -> Result<u32, Trap> {
        let word = self.fetch_word(bus)?;

        match word {
            0o000000 => {
                self.exec_halt();
                return Ok(BASE_MISC_CONTROL);
            }
            0o000001 => {
                self.exec_wait();
                return Ok(BASE_MISC_CONTROL);
            }
            0o000002 => {
                self.exec_rti(bus)?;
                return Ok(BASE_TRAP);
            }
            0o000003 => {
                self.exec_bpt(bus);
                return Ok(BASE_TRAP);
            }
            0o000004 => {
                self.exec_iot(bus);
                return Ok(BASE_TRAP);
            }
            0o000005 => {
                self.exec_reset_instruction();
                return Ok(BASE_MISC_CONTROL);
            }
            0o000006 => {
                self.exec_rtt(bus)?;
                return Ok(BASE_TRAP);
            }
            0o000007 => return Err(Trap::ReservedOpcode),
            _ => {}
        }

        if word & 0o177400 == 0o104000 {
            self.exec_emt(bus);
            return Ok(BASE_TRAP);
        }
        if word & 0o177400 == 0o104400 {
            self.exec_trap(bus);
            return Ok(BASE_TRAP);
        }

        if word & cc_ops::OP_CC_MASK == cc_ops::OP_CC_BASE {
            self.exec_cc_op(word);
            return Ok(BASE_CC_OP);
        }

        if word & jumps::OP_RTS_MASK == jumps::OP_RTS {
            let reg = (word & 7) as usize;
            self.exec_rts(bus, reg)?;
            return Ok(BASE_RTS);
        }

        if word & jumps::OP_JMP_MASK == jumps::OP_JMP {
            let (mode, reg) = split_field(word & 0o77);
            self.exec_jmp(bus, mode, reg)?;
            return Ok(BASE_JMP + addressing_surcharge(mode));
        }

        if word & jumps::OP_MARK_MASK == jumps::OP_MARK {
            let n = word & 0o77;
            self.exec_mark(bus, n)?;
            return Ok(BASE_MISC_CONTROL);
        }

        if let Some((op, byte_mode)) = single_operand::classify(word & single_operand::MASK) {
            let (mode, reg) = split_field(word & 0o77);
            self.exec_single_operand(bus, op, byte_mode, mode, reg)?;
            return Ok(BASE_SINGLE_OPERAND + addressing_surcharge(mode));
        }

        if word & jumps::OP_JSR_MASK == jumps::OP_JSR {
            let link = ((word >> 6) & 7) as usize;
            let (mode, reg) = split_field(word & 0o77);
            self.exec_jsr(bus, link, mode, reg)?;
            return Ok(BASE_JSR + addressing_surcharge(mode));
        }

        if word & jumps::OP_SOB_MASK == jumps::OP_SOB {
            let reg = ((word >> 6) & 7) as usize;
            let offset = word & 0o77;
            self.exec_sob(reg, offset);
            return Ok(BASE_MISC_CONTROL);
        }

        if let Some(condition) = branches::classify(word & 0o177400) {
            self.exec_branch(word, condition);
            return Ok(BASE_BRANCH);
        }

        if let Some((op, byte_mode)) = double_operand::classify(word & double_operand::MASK) {
            let (src_mode, src_reg) = split_field((word >> 6) & 0o77);
            let (dst_mode, dst_reg) = split_field(word & 0o77);
            self.exec_double_operand(bus, op, byte_mode, src_mode, src_reg, dst_mode, dst_reg)?;
            let surcharge = addressing_surcharge(src_mode) + addressing_surcharge(dst_mode);
            return Ok(BASE_DOUBLE_OPERAND + surcharge);
        }

        Err(Trap::ReservedOpcode)
    }
}
