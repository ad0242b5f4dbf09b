//! Double-operand instructions: MOV, CMP, BIT, BIC, BIS, ADD, SUB.
//!
//! Encoding: top 4 bits select the operation (mask `0o170000`), the next
//! six bits are the source operand field, the low six bits the
//! destination operand field. SUB has no byte form; the other six do,
//! selected by the high bit of the 4-bit opcode field.

use crate::addressing::AddrMode;
use crate::bus::Bus;
use crate::cpu::Cpu1801;
use crate::flags::{C, V};
use crate::traps::Trap;

pub const MASK: u16 = 0o170000;

pub const OP_MOV: u16 = 0o010000;
pub const OP_CMP: u16 = 0o020000;
pub const OP_BIT: u16 = 0o030000;
pub const OP_BIC: u16 = 0o040000;
pub const OP_BIS: u16 = 0o050000;
pub const OP_ADD: u16 = 0o060000;
pub const OP_MOVB: u16 = 0o110000;
pub const OP_CMPB: u16 = 0o120000;
pub const OP_BITB: u16 = 0o130000;
pub const OP_BICB: u16 = 0o140000;
pub const OP_BISB: u16 = 0o150000;
pub const OP_SUB: u16 = 0o160000;

/// A double-operand operation, independent of its byte/word form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoubleOp {
    Mov,
    Cmp,
    Bit,
    Bic,
    Bis,
    Add,
    Sub,
}

/// Classify a masked opcode (`word & MASK`) as a double-operand operation
/// plus its byte-mode flag.
#[must_use]
pub fn classify(masked: u16) -> Option<(DoubleOp, bool)> {
    Some(match masked {
        OP_MOV => (DoubleOp::Mov, false),
        OP_CMP => (DoubleOp::Cmp, false),
        OP_BIT => (DoubleOp::Bit, false),
        OP_BIC => (DoubleOp::Bic, false),
        OP_BIS => (DoubleOp::Bis, false),
        OP_ADD => (DoubleOp::Add, false),
        OP_MOVB => (DoubleOp::Mov, true),
        OP_CMPB => (DoubleOp::Cmp, true),
        OP_BITB => (DoubleOp::Bit, true),
        OP_BICB => (DoubleOp::Bic, true),
        OP_BISB => (DoubleOp::Bis, true),
        OP_SUB => (DoubleOp::Sub, false),
        _ => return None,
    })
}

/// Split a six-bit operand field into (mode, register).
#[must_use]
pub const fn split_field(field: u16) -> (AddrMode, usize) {
    let mode = AddrMode::decode((field >> 3) as u8);
    let reg = (field & 7) as usize;
    (mode, reg)
}

impl Cpu1801 {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn exec_double_operand(
        &mut self,
        bus: &mut impl Bus,
        op: DoubleOp,
        byte_mode: bool,
        src_mode: AddrMode,
        src_reg: usize,
        dst_mode: AddrMode,
        dst_reg: usize,
    ) -> Result<(), Trap> {
        let src_ea = self.resolve_ea(bus, src_mode, src_reg, byte_mode)?;
        let src = self.read_operand(bus, src_ea, byte_mode)?;

        match op {
            DoubleOp::Mov => {
                let dst_ea = self.resolve_ea(bus, dst_mode, dst_reg, byte_mode)?;
                if byte_mode {
                    self.psw.set_nz_byte(src as u8);
                } else {
                    self.psw.set_nz_word(src);
                }
                self.write_operand(bus, dst_ea, byte_mode, src)?;
            }
            DoubleOp::Cmp => {
                let dst_ea = self.resolve_ea(bus, dst_mode, dst_reg, byte_mode)?;
                let dst = self.read_operand(bus, dst_ea, byte_mode)?;
                if byte_mode {
                    let (r, borrow) = (src as u8).overflowing_sub(dst as u8);
                    self.psw.set_nz_byte(r);
                    self.psw.set_flag(
                        V,
                        ((src as u8) ^ (dst as u8)) & ((src as u8) ^ r) & 0x80 != 0,
                    );
                    self.psw.set_flag(C, borrow);
                } else {
                    let (r, borrow) = src.overflowing_sub(dst);
                    self.psw.set_nz_word(r);
                    self.psw.set_flag(V, (src ^ dst) & (src ^ r) & 0x8000 != 0);
                    self.psw.set_flag(C, borrow);
                }
            }
            DoubleOp::Bit => {
                let dst_ea = self.resolve_ea(bus, dst_mode, dst_reg, byte_mode)?;
                let dst = self.read_operand(bus, dst_ea, byte_mode)?;
                let r = src & dst;
                if byte_mode {
                    self.psw.set_nz_byte(r as u8);
                } else {
                    self.psw.set_nz_word(r);
                }
            }
            DoubleOp::Bic => {
                let dst_ea = self.resolve_ea(bus, dst_mode, dst_reg, byte_mode)?;
                let dst = self.read_operand(bus, dst_ea, byte_mode)?;
                let r = dst & !src;
                if byte_mode {
                    self.psw.set_nz_byte(r as u8);
                } else {
                    self.psw.set_nz_word(r);
                }
                self.write_operand(bus, dst_ea, byte_mode, r)?;
            }
            DoubleOp::Bis => {
                let dst_ea = self.resolve_ea(bus, dst_mode, dst_reg, byte_mode)?;
                let dst = self.read_operand(bus, dst_ea, byte_mode)?;
                let r = dst | src;
                if byte_mode {
                    self.psw.set_nz_byte(r as u8);
                } else {
                    self.psw.set_nz_word(r);
                }
                self.write_operand(bus, dst_ea, byte_mode, r)?;
            }
            DoubleOp::Add => {
                let dst_ea = self.resolve_ea(bus, dst_mode, dst_reg, byte_mode)?;
                let dst = self.read_operand(bus, dst_ea, false)?;
                let (r, carry_out) = dst.overflowing_add(src);
                self.psw.set_nz_word(r);
                self.psw
                    .set_flag(V, !(src ^ dst) & (dst ^ r) & 0x8000 != 0);
                self.psw.set_flag(C, carry_out);
                self.write_operand(bus, dst_ea, false, r)?;
            }
            DoubleOp::Sub => {
                let dst_ea = self.resolve_ea(bus, dst_mode, dst_reg, false)?;
                let dst = self.read_operand(bus, dst_ea, false)?;
                let (r, borrow) = dst.overflowing_sub(src);
                self.psw.set_nz_word(r);
                self.psw.set_flag(V, (src ^ dst) & (dst ^ r) & 0x8000 != 0);
                self.psw.set_flag(C, borrow);
                self.write_operand(bus, dst_ea, false, r)?;
            }
        }
        Ok(())
    }
}
