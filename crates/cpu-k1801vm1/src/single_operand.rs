//! Single-operand instructions: CLR, COM, INC, DEC, NEG, ADC, SBC, TST,
//! ROR, ROL, ASR, ASL, SWAB, SXT, MFPS, MTPS.
//!
//! Encoding: opcode in bits 15-6 (mask `0o177700`), operand field in bits
//! 5-0. Byte forms set bit 15 (add `0o100000`) of the CLR..TST/ROR..ASL
//! group; SWAB and SXT are word-only, MFPS/MTPS are byte-only (they move
//! the low byte of the PSW).

use crate::addressing::AddrMode;
use crate::bus::Bus;
use crate::cpu::Cpu1801;
use crate::flags::{C, N, V, Z};
use crate::traps::Trap;

pub const MASK: u16 = 0o177700;

pub const OP_SWAB: u16 = 0o000300;
pub const OP_CLR: u16 = 0o005000;
pub const OP_COM: u16 = 0o005100;
pub const OP_INC: u16 = 0o005200;
pub const OP_DEC: u16 = 0o005300;
pub const OP_NEG: u16 = 0o005400;
pub const OP_ADC: u16 = 0o005500;
pub const OP_SBC: u16 = 0o005600;
pub const OP_TST: u16 = 0o005700;
pub const OP_ROR: u16 = 0o006000;
pub const OP_ROL: u16 = 0o006100;
pub const OP_ASR: u16 = 0o006200;
pub const OP_ASL: u16 = 0o006300;
pub const OP_SXT: u16 = 0o006700;
pub const OP_CLRB: u16 = 0o105000;
pub const OP_COMB: u16 = 0o105100;
pub const OP_INCB: u16 = 0o105200;
pub const OP_DECB: u16 = 0o105300;
pub const OP_NEGB: u16 = 0o105400;
pub const OP_ADCB: u16 = 0o105500;
pub const OP_SBCB: u16 = 0o105600;
pub const OP_TSTB: u16 = 0o105700;
pub const OP_RORB: u16 = 0o106000;
pub const OP_ROLB: u16 = 0o106100;
pub const OP_ASRB: u16 = 0o106200;
pub const OP_ASLB: u16 = 0o106300;
pub const OP_MTPS: u16 = 0o106400;
pub const OP_MFPS: u16 = 0o106700;

/// A single-operand operation, independent of its byte/word form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SingleOp {
    Swab,
    Clr,
    Com,
    Inc,
    Dec,
    Neg,
    Adc,
    Sbc,
    Tst,
    Ror,
    Rol,
    Asr,
    Asl,
    Sxt,
    Mtps,
    Mfps,
}

/// Classify a masked opcode (`word & MASK`) as a single-operand operation
/// plus its byte-mode flag.
#[must_use]
pub fn classify(masked: u16) -> Option<(SingleOp, bool)> {
    Some(match masked {
        OP_SWAB => (SingleOp::Swab, false),
        OP_CLR => (SingleOp::Clr, false),
        OP_COM => (SingleOp::Com, false),
        OP_INC => (SingleOp::Inc, false),
        OP_DEC => (SingleOp::Dec, false),
        OP_NEG => (SingleOp::Neg, false),
        OP_ADC => (SingleOp::Adc, false),
        OP_SBC => (SingleOp::Sbc, false),
        OP_TST => (SingleOp::Tst, false),
        OP_ROR => (SingleOp::Ror, false),
        OP_ROL => (SingleOp::Rol, false),
        OP_ASR => (SingleOp::Asr, false),
        OP_ASL => (SingleOp::Asl, false),
        OP_SXT => (SingleOp::Sxt, false),
        OP_CLRB => (SingleOp::Clr, true),
        OP_COMB => (SingleOp::Com, true),
        OP_INCB => (SingleOp::Inc, true),
        OP_DECB => (SingleOp::Dec, true),
        OP_NEGB => (SingleOp::Neg, true),
        OP_ADCB => (SingleOp::Adc, true),
        OP_SBCB => (SingleOp::Sbc, true),
        OP_TSTB => (SingleOp::Tst, true),
        OP_RORB => (SingleOp::Ror, true),
        OP_ROLB => (SingleOp::Rol, true),
        OP_ASRB => (SingleOp::Asr, true),
        OP_ASLB => (SingleOp::Asl, true),
        OP_MTPS => (SingleOp::Mtps, true),
        OP_MFPS => (SingleOp::Mfps, true),
        _ => return None,
    })
}

impl Cpu1801 {
    pub(crate) fn exec_single_operand(
        &mut self,
        bus: &mut impl Bus,
        op: SingleOp,
        byte_mode: bool,
        mode: AddrMode,
        reg: usize,
    ) -> Result<(), Trap> {
        let ea = self.resolve_ea(bus, mode, reg, byte_mode)?;

        match op {
            SingleOp::Swab => {
                let v = self.read_operand(bus, ea, false)?;
                let swapped = (v >> 8) | (v << 8);
                self.psw.set_nz_byte((swapped & 0xFF) as u8);
                self.psw.set_flag(C, false);
                self.write_operand(bus, ea, false, swapped)?;
            }
            SingleOp::Clr => {
                self.write_operand(bus, ea, byte_mode, 0)?;
                if byte_mode {
                    self.psw.set_nz_byte(0);
                } else {
                    self.psw.set_nz_word(0);
                }
                self.psw.set_flag(C, false);
            }
            SingleOp::Com => {
                let v = self.read_operand(bus, ea, byte_mode)?;
                if byte_mode {
                    let r = !(v as u8);
                    self.psw.set_nz_byte(r);
                    self.write_operand(bus, ea, true, u16::from(r))?;
                } else {
                    let r = !v;
                    self.psw.set_nz_word(r);
                    self.write_operand(bus, ea, false, r)?;
                }
                self.psw.set_flag(C, true);
            }
            SingleOp::Inc => {
                let v = self.read_operand(bus, ea, byte_mode)?;
                if byte_mode {
                    let b = v as u8;
                    let r = b.wrapping_add(1);
                    self.psw.set_nz_byte(r);
                    self.psw.set_flag(V, b == 0x7F);
                    self.write_operand(bus, ea, true, u16::from(r))?;
                } else {
                    let r = v.wrapping_add(1);
                    self.psw.set_nz_word(r);
                    self.psw.set_flag(V, v == 0x7FFF);
                    self.write_operand(bus, ea, false, r)?;
                }
            }
            SingleOp::Dec => {
                let v = self.read_operand(bus, ea, byte_mode)?;
                if byte_mode {
                    let b = v as u8;
                    let r = b.wrapping_sub(1);
                    self.psw.set_nz_byte(r);
                    self.psw.set_flag(V, b == 0x80);
                    self.write_operand(bus, ea, true, u16::from(r))?;
                } else {
                    let r = v.wrapping_sub(1);
                    self.psw.set_nz_word(r);
                    self.psw.set_flag(V, v == 0x8000);
                    self.write_operand(bus, ea, false, r)?;
                }
            }
            SingleOp::Neg => {
                let v = self.read_operand(bus, ea, byte_mode)?;
                if byte_mode {
                    let b = v as u8;
                    let r = 0u8.wrapping_sub(b);
                    self.psw.set_nz_byte(r);
                    self.psw.set_flag(V, b == 0x80);
                    self.psw.set_flag(C, r != 0);
                    self.write_operand(bus, ea, true, u16::from(r))?;
                } else {
                    let r = 0u16.wrapping_sub(v);
                    self.psw.set_nz_word(r);
                    self.psw.set_flag(V, v == 0x8000);
                    self.psw.set_flag(C, r != 0);
                    self.write_operand(bus, ea, false, r)?;
                }
            }
            SingleOp::Adc => {
                let v = self.read_operand(bus, ea, byte_mode)?;
                let carry_in = self.psw.flag(C);
                if byte_mode {
                    let b = v as u8;
                    let (r, carry_out) = b.overflowing_add(u8::from(carry_in));
                    self.psw.set_nz_byte(r);
                    self.psw.set_flag(V, b == 0x7F && carry_in);
                    self.psw.set_flag(C, carry_out);
                    self.write_operand(bus, ea, true, u16::from(r))?;
                } else {
                    let (r, carry_out) = v.overflowing_add(u16::from(carry_in));
                    self.psw.set_nz_word(r);
                    self.psw.set_flag(V, v == 0x7FFF && carry_in);
                    self.psw.set_flag(C, carry_out);
                    self.write_operand(bus, ea, false, r)?;
                }
            }
            SingleOp::Sbc => {
                let v = self.read_operand(bus, ea, byte_mode)?;
                let carry_in = self.psw.flag(C);
                if byte_mode {
                    let b = v as u8;
                    let (r, carry_out) = b.overflowing_sub(u8::from(carry_in));
                    self.psw.set_nz_byte(r);
                    self.psw.set_flag(V, b == 0x80 && carry_in);
                    self.psw.set_flag(C, carry_out);
                    self.write_operand(bus, ea, true, u16::from(r))?;
                } else {
                    let (r, carry_out) = v.overflowing_sub(u16::from(carry_in));
                    self.psw.set_nz_word(r);
                    self.psw.set_flag(V, v == 0x8000 && carry_in);
                    self.psw.set_flag(C, carry_out);
                    self.write_operand(bus, ea, false, r)?;
                }
            }
            SingleOp::Tst => {
                let v = self.read_operand(bus, ea, byte_mode)?;
                if byte_mode {
                    self.psw.set_nz_byte(v as u8);
                } else {
                    self.psw.set_nz_word(v);
                }
                self.psw.set_flag(C, false);
            }
            SingleOp::Ror => {
                let v = self.read_operand(bus, ea, byte_mode)?;
                let carry_in = self.psw.flag(C);
                if byte_mode {
                    let b = v as u8;
                    let carry_out = b & 1 != 0;
                    let r = (b >> 1) | (u8::from(carry_in) << 7);
                    self.psw.set_nz_byte(r);
                    self.psw.set_flag(C, carry_out);
                    self.psw.set_flag(V, carry_out ^ (r & 0x80 != 0));
                    self.write_operand(bus, ea, true, u16::from(r))?;
                } else {
                    let carry_out = v & 1 != 0;
                    let r = (v >> 1) | (u16::from(carry_in) << 15);
                    self.psw.set_nz_word(r);
                    self.psw.set_flag(C, carry_out);
                    self.psw.set_flag(V, carry_out ^ (r & 0x8000 != 0));
                    self.write_operand(bus, ea, false, r)?;
                }
            }
            SingleOp::Rol => {
                let v = self.read_operand(bus, ea, byte_mode)?;
                let carry_in = self.psw.flag(C);
                if byte_mode {
                    let b = v as u8;
                    let carry_out = b & 0x80 != 0;
                    let r = (b << 1) | u8::from(carry_in);
                    self.psw.set_nz_byte(r);
                    self.psw.set_flag(C, carry_out);
                    self.psw.set_flag(V, carry_out ^ (r & 0x80 != 0));
                    self.write_operand(bus, ea, true, u16::from(r))?;
                } else {
                    let carry_out = v & 0x8000 != 0;
                    let r = (v << 1) | u16::from(carry_in);
                    self.psw.set_nz_word(r);
                    self.psw.set_flag(C, carry_out);
                    self.psw.set_flag(V, carry_out ^ (r & 0x8000 != 0));
                    self.write_operand(bus, ea, false, r)?;
                }
            }
            SingleOp::Asr => {
                let v = self.read_operand(bus, ea, byte_mode)?;
                if byte_mode {
                    let b = v as u8;
                    let carry_out = b & 1 != 0;
                    let r = ((b as i8) >> 1) as u8;
                    self.psw.set_nz_byte(r);
                    self.psw.set_flag(C, carry_out);
                    self.psw.set_flag(V, carry_out ^ (r & 0x80 != 0));
                    self.write_operand(bus, ea, true, u16::from(r))?;
                } else {
                    let carry_out = v & 1 != 0;
                    let r = ((v as i16) >> 1) as u16;
                    self.psw.set_nz_word(r);
                    self.psw.set_flag(C, carry_out);
                    self.psw.set_flag(V, carry_out ^ (r & 0x8000 != 0));
                    self.write_operand(bus, ea, false, r)?;
                }
            }
            SingleOp::Asl => {
                let v = self.read_operand(bus, ea, byte_mode)?;
                if byte_mode {
                    let b = v as u8;
                    let carry_out = b & 0x80 != 0;
                    let r = b.wrapping_shl(1);
                    self.psw.set_nz_byte(r);
                    self.psw.set_flag(C, carry_out);
                    self.psw.set_flag(V, carry_out ^ (r & 0x80 != 0));
                    self.write_operand(bus, ea, true, u16::from(r))?;
                } else {
                    let carry_out = v & 0x8000 != 0;
                    let r = v.wrapping_shl(1);
                    self.psw.set_nz_word(r);
                    self.psw.set_flag(C, carry_out);
                    self.psw.set_flag(V, carry_out ^ (r & 0x8000 != 0));
                    self.write_operand(bus, ea, false, r)?;
                }
            }
            SingleOp::Sxt => {
                let n = self.psw.flag(N);
                let r = if n { 0xFFFF } else { 0 };
                self.psw.set_flag(Z, !n);
                self.write_operand(bus, ea, false, r)?;
            }
            SingleOp::Mfps => {
                let v = self.psw.get() & 0xFF;
                self.psw.set_nz_byte(v as u8);
                self.write_operand(bus, ea, true, v)?;
            }
            SingleOp::Mtps => {
                // The source byte replaces the whole low byte of the PSW —
                // condition codes and priority both live there (see
                // DESIGN.md's Open Question on MTPS/MFPS).
                let v = self.read_operand(bus, ea, true)?;
                self.psw.0 = (self.psw.0 & 0xFF00) | (v & 0x00FF);
            }
        }
        Ok(())
    }
}
