//! Literal-pool annotation over a linear instruction stream.
//!
//! A PC-relative load is rewritten to `ldr r0, =0x<value>` with the word it
//! reads, and the address of that word is remembered so the sweep's
//! decoding of the literal itself is left out of the listing.

use std::collections::BTreeSet;
use std::fmt;

use crate::operand::{first_operand, PcRelative};
use crate::sweep::{self, SweepMode};
use crate::{check_mapping, Address, Decoder, DisassemblyError, Insn, ARM_INSN_SIZE};

/// In ARM mode the PC reads as the instruction's address plus 8.
pub const ARM_PC_READ_AHEAD: Address = 8;

/// A literal word resolved from a PC-relative load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Literal {
    /// Address of the literal word
    pub data_addr: Address,
    /// Little-endian value stored there
    pub value: u32,
}

/// One line of the listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    /// Address of the instruction
    pub addr: Address,
    /// Instruction mnemonic
    pub mnemonic: String,
    /// Operands, rewritten when `literal` is set
    pub operands: String,
    /// Raw encoding of the instruction
    pub bytes: Vec<u8>,
    /// Resolved literal for PC-relative loads
    pub literal: Option<Literal>,
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}:\t{}\t{}", self.addr, self.mnemonic, self.operands)
    }
}

/// Result of one annotation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    /// Base address the image was mapped at
    pub base: Address,
    /// Emitted lines in sweep order
    pub lines: Vec<Line>,
    /// Every address found to hold literal data
    pub data_addrs: BTreeSet<Address>,
    /// Number of PC-relative loads resolved
    pub resolved: usize,
    /// Number of instructions dropped as literal data
    pub suppressed: usize,
}

/// Annotates the instruction stream of one image.
#[derive(Debug, Clone, Copy)]
pub struct Annotator<'a> {
    image: &'a [u8],
    base: Address,
}

impl<'a> Annotator<'a> {
    /// Map `image` at `base`.
    pub fn new(image: &'a [u8], base: Address) -> Result<Self, DisassemblyError> {
        check_mapping(image, base)?;
        Ok(Self { image, base })
    }

    /// Sweep the image with `decoder` and annotate the result.
    pub fn run(&self, decoder: &dyn Decoder, mode: SweepMode) -> Result<Listing, DisassemblyError> {
        let insns = sweep::run(self.image, self.base, decoder, mode);
        self.annotate(&insns)
    }

    /// Annotate an instruction stream given in increasing address order.
    pub fn annotate(&self, insns: &[Insn]) -> Result<Listing, DisassemblyError> {
        let mut listing = Listing {
            base: self.base,
            ..Listing::default()
        };

        for insn in insns {
            if let Some(pc_rel) = PcRelative::parse(&insn.operands, insn.addr)? {
                let data_addr = pc_rel
                    .displacement
                    .checked_add(ARM_PC_READ_AHEAD)
                    .and_then(|disp| disp.checked_add(insn.addr))
                    .ok_or(DisassemblyError::LiteralOutOfRange {
                        addr: insn.addr,
                        data_addr: Address::MAX,
                        len: self.image.len(),
                    })?;
                let value = self.read_word(insn.addr, data_addr)?;

                log::trace!(
                    "0x{:x}: literal at 0x{:x} = 0x{:x}",
                    insn.addr,
                    data_addr,
                    value
                );

                listing.data_addrs.insert(data_addr);
                listing.resolved += 1;
                listing.lines.push(Line {
                    addr: insn.addr,
                    mnemonic: insn.mnemonic.clone(),
                    operands: format!("{}, =0x{:x}", first_operand(&insn.operands), value),
                    bytes: insn.bytes().to_vec(),
                    literal: Some(Literal { data_addr, value }),
                });
            } else if listing.data_addrs.contains(&insn.addr) {
                listing.suppressed += 1;
            } else {
                listing.lines.push(Line {
                    addr: insn.addr,
                    mnemonic: insn.mnemonic.clone(),
                    operands: insn.operands.clone(),
                    bytes: insn.bytes().to_vec(),
                    literal: None,
                });
            }
        }

        log::info!(
            "Annotated {} instructions: {} lines, {} literals resolved, {} suppressed",
            insns.len(),
            listing.lines.len(),
            listing.resolved,
            listing.suppressed
        );

        Ok(listing)
    }

    /// Read the little-endian word at `data_addr`, referenced from `addr`.
    fn read_word(&self, addr: Address, data_addr: Address) -> Result<u32, DisassemblyError> {
        let out_of_range = || DisassemblyError::LiteralOutOfRange {
            addr,
            data_addr,
            len: self.image.len(),
        };

        let start = data_addr
            .checked_sub(self.base)
            .and_then(|offset| usize::try_from(offset).ok())
            .ok_or_else(out_of_range)?;
        let end = start.checked_add(ARM_INSN_SIZE).ok_or_else(out_of_range)?;

        let word = self.image.get(start..end).ok_or_else(out_of_range)?;
        let mut buf = [0u8; ARM_INSN_SIZE];
        buf.copy_from_slice(word);
        Ok(u32::from_le_bytes(buf))
    }
}
