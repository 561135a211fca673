//! Capstone-based ARM decoder.

use capstone::arch::arm::ArchMode as ArmMode;
use capstone::prelude::*;

use crate::{Address, Decoder, DisassemblyError, Insn, ARM_INSN_SIZE};

/// A Capstone handle fixed to 32-bit ARM in ARM mode with detail enabled.
#[derive(Debug)]
pub struct ArmDecoder {
    cs: Capstone,
}

impl ArmDecoder {
    /// Build the decoder.
    pub fn new() -> Result<Self, DisassemblyError> {
        Ok(Self {
            cs: Self::build_arm()?,
        })
    }

    /// Build an ARM (ARM mode) Capstone handle with operand detail
    pub fn build_arm() -> Result<Capstone, DisassemblyError> {
        Ok(Capstone::new()
            .arm()
            .mode(ArmMode::Arm)
            .detail(true)
            .build()?)
    }
}

impl Decoder for ArmDecoder {
    fn decode(&self, image: &[u8], offset: usize, base: Address) -> Option<Insn> {
        if offset >= image.len() {
            return None;
        }

        let end = std::cmp::min(offset + ARM_INSN_SIZE, image.len());
        let at = base + offset as Address;

        // Store the result first to avoid lifetime issues
        let disasm_result = self.cs.disasm_count(&image[offset..end], at, 1).ok()?;
        let i = disasm_result.iter().next()?;

        if i.address() != at {
            return None;
        }

        let mut bytes = [0u8; ARM_INSN_SIZE];
        for (j, b) in i.bytes().iter().enumerate().take(ARM_INSN_SIZE) {
            bytes[j] = *b;
        }

        Some(Insn {
            addr: i.address(),
            size: i.bytes().len() as u8,
            mnemonic: i.mnemonic().unwrap_or("").to_string(),
            operands: i.op_str().unwrap_or("").to_string(),
            bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_pc_relative_ldr() {
        // ldr r0, [pc, #0x10]
        let bytes = [0x10, 0x00, 0x9f, 0xe5];
        let decoder = ArmDecoder::new().unwrap();

        let insn = decoder.decode(&bytes, 0, 0x20aa420).unwrap();
        assert_eq!(insn.addr, 0x20aa420);
        assert_eq!(insn.size, 4);
        assert_eq!(insn.mnemonic, "ldr");
        assert_eq!(insn.operands, "r0, [pc, #0x10]");
        assert_eq!(insn.bytes(), &bytes);
    }

    #[test]
    fn test_decode_uses_offset_and_base() {
        // mov r0, r1 ; bx lr
        let bytes = [0x01, 0x00, 0xa0, 0xe1, 0x1e, 0xff, 0x2f, 0xe1];
        let decoder = ArmDecoder::new().unwrap();

        let insn = decoder.decode(&bytes, 4, 0x8000).unwrap();
        assert_eq!(insn.addr, 0x8004);
        assert_eq!(insn.mnemonic, "bx");
        assert_eq!(insn.operands, "lr");
    }

    #[test]
    fn test_decode_past_end() {
        let decoder = ArmDecoder::new().unwrap();
        assert!(decoder.decode(&[0x1e, 0xff, 0x2f, 0xe1], 4, 0).is_none());
    }

    #[test]
    fn test_decode_truncated_word() {
        let decoder = ArmDecoder::new().unwrap();
        assert!(decoder.decode(&[0x1e, 0xff], 0, 0).is_none());
    }
}
