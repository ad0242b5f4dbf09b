//! Base instruction timing and addressing-mode surcharges.
//!
//! The K1801VM1 does not model bus-cycle-exact timing; instead each
//! instruction class has a fixed base time, refined by a
//! per-addressing-mode surcharge for the extra memory cycles indirect and
//! indexed modes need. This architectural short-cycle approximation is
//! good enough to pace the PCM audio emitter without claiming
//! bus-cycle accuracy.

use crate::addressing::AddrMode;

/// Base cycle cost for a single-operand instruction.
pub const BASE_SINGLE_OPERAND: u32 = 1;
/// Base cycle cost for a double-operand instruction.
pub const BASE_DOUBLE_OPERAND: u32 = 1;
/// Base cycle cost for a branch instruction.
pub const BASE_BRANCH: u32 = 1;
/// Base cycle cost for JMP.
pub const BASE_JMP: u32 = 2;
/// Base cycle cost for JSR.
pub const BASE_JSR: u32 = 2;
/// Base cycle cost for RTS.
pub const BASE_RTS: u32 = 2;
/// Base cycle cost for a condition-code operator (CLC, SEC, NOP, ...).
pub const BASE_CC_OP: u32 = 1;
/// Base cycle cost for a trap/interrupt instruction.
pub const BASE_TRAP: u32 = 3;
/// Base cycle cost for MARK/SOB.
pub const BASE_MISC_CONTROL: u32 = 2;

/// Extra cycles an addressing mode adds beyond the instruction's base time:
/// one for each extra memory access the mode needs beyond the operand
/// itself (indirect pointer fetch, index-word fetch).
#[must_use]
pub const fn addressing_surcharge(mode: AddrMode) -> u32 {
    match mode {
        AddrMode::Register | AddrMode::RegisterDeferred => 0,
        AddrMode::Autoincrement | AddrMode::Autodecrement => 0,
        AddrMode::AutoincrementDeferred | AddrMode::AutodecrementDeferred => 1,
        AddrMode::Index => 1,
        AddrMode::IndexDeferred => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_deferred_costs_more_than_index() {
        assert!(addressing_surcharge(AddrMode::IndexDeferred) > addressing_surcharge(AddrMode::Index));
    }
}
