//! Operand text helpers for PC-relative memory references.
//!
//! Capstone renders an ARM literal load as `r0, [pc, #0x10]`. Only the
//! operand text is inspected here; Capstone's structured memory operand
//! stores the offset magnitude and its sign separately, while the listing
//! format is defined by the hex literal as printed.

use crate::{Address, DisassemblyError};

/// Marks an operand list that reads memory relative to the PC.
pub const PC_RELATIVE_MARKER: &str = "[pc";

/// A parsed `[pc, #0x...]` reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcRelative {
    /// Displacement as printed between `0x` and `]`
    pub displacement: Address,
}

impl PcRelative {
    /// Returns true if `operands` contains a PC-relative memory operand.
    pub fn is_pc_relative(operands: &str) -> bool {
        operands.contains(PC_RELATIVE_MARKER)
    }

    /// Parse the PC-relative reference out of an operand string.
    ///
    /// Returns `Ok(None)` when `operands` has no PC-relative memory operand.
    /// The displacement is the hex text between the first `x` of `operands`
    /// and the next `]`; anything else is an `OperandParse` error for the
    /// instruction at `addr`.
    pub fn parse(operands: &str, addr: Address) -> Result<Option<Self>, DisassemblyError> {
        if !Self::is_pc_relative(operands) {
            return Ok(None);
        }

        let parse_error = || DisassemblyError::OperandParse {
            addr,
            operands: operands.to_string(),
        };

        let (_, after_x) = operands.split_once('x').ok_or_else(parse_error)?;
        let (hex, _) = after_x.split_once(']').ok_or_else(parse_error)?;

        if hex.is_empty() || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(parse_error());
        }

        let displacement = Address::from_str_radix(hex, 16).map_err(|_| parse_error())?;
        Ok(Some(Self { displacement }))
    }
}

/// Text before the first comma of an operand list (the whole list if there
/// is no comma).
pub fn first_operand(operands: &str) -> &str {
    operands.split(',').next().unwrap_or(operands)
}
