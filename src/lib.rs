//! Core IR, traits, and errors for the poolsweep literal-pool annotator.
//!
//! poolsweep linearly disassembles a raw 32-bit ARM image loaded at a fixed
//! base address. Loads through a PC-relative memory operand are rewritten to
//! show the 32-bit literal they read, and the literal words themselves are
//! dropped from the listing.
//!
//! # Basic Usage
//!
//! ```rust,no_run
//! use std::fs;
//! use poolsweep::{
//!     annotate::Annotator,
//!     decoder::ArmDecoder,
//!     format::OutputFormat,
//!     sweep::SweepMode,
//! };
//!
//! let image = fs::read("ov0.bin").unwrap();
//! let decoder = ArmDecoder::new().unwrap();
//!
//! let annotator = Annotator::new(&image, 0x20aa420).unwrap();
//! let listing = annotator.run(&decoder, SweepMode::Stop).unwrap();
//!
//! let text = OutputFormat::Text.get_formatter().format(&listing).unwrap();
//! fs::write("ov0.s", text).unwrap();
//! ```

pub mod annotate;
pub mod compression;
pub mod decoder;
pub mod format;
pub mod operand;
pub mod sweep;

/// Represents an address in the target's 32-bit address space
pub type Address = u64;

/// Width of every ARM-mode instruction, and of a literal-pool word
pub const ARM_INSN_SIZE: usize = 4;

/// Highest address the 32-bit target can map
pub const MAX_ADDRESS: Address = u32::MAX as Address;

/// One decoded instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Insn {
    /// Address of the instruction
    pub addr: Address,
    /// Size of the instruction in bytes
    pub size: u8,
    /// Instruction mnemonic (e.g., "ldr", "bl")
    pub mnemonic: String,
    /// Instruction operands as Capstone renders them
    pub operands: String,
    /// Raw encoding
    pub bytes: [u8; ARM_INSN_SIZE],
}

impl Insn {
    /// Returns the instruction bytes, up to the actual instruction size.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes[..(self.size as usize).min(ARM_INSN_SIZE)]
    }
}

/// Decoder trait: one instruction at a time out of a mapped image.
pub trait Decoder {
    /// Decode a single instruction at `offset` into `image`.
    ///
    /// # Arguments
    /// * `image` - The whole binary image
    /// * `offset` - Byte offset of the instruction inside `image`
    /// * `base` - Address that offset 0 of `image` is mapped to
    ///
    /// # Returns
    /// Some(Insn) if an instruction was decoded, None otherwise
    fn decode(&self, image: &[u8], offset: usize, base: Address) -> Option<Insn>;
}

/// Check that `image` can be mapped at `base` in a 32-bit address space.
///
/// The image must be non-empty and its last byte must still have an
/// address that fits in 32 bits.
pub fn check_mapping(image: &[u8], base: Address) -> Result<(), DisassemblyError> {
    if image.is_empty() {
        return Err(DisassemblyError::EmptyImage);
    }

    let last = (image.len() as Address - 1)
        .checked_add(base)
        .filter(|last| *last <= MAX_ADDRESS);

    match last {
        Some(_) => Ok(()),
        None => Err(DisassemblyError::AddressOverflow {
            base,
            len: image.len(),
        }),
    }
}

/// Error type for disassembly operations
#[derive(Debug, thiserror::Error)]
pub enum DisassemblyError {
    /// Capstone could not be set up
    #[error("Capstone error: {0}")]
    Capstone(#[from] capstone::Error),

    /// Nothing to disassemble
    #[error("Input image is empty")]
    EmptyImage,

    /// Image does not fit the 32-bit address space at this base
    #[error("Image of {len} bytes at base 0x{base:x} runs past the 32-bit address space")]
    AddressOverflow { base: Address, len: usize },

    /// PC-relative operand without a parseable hex displacement
    #[error("Cannot parse PC-relative displacement at 0x{addr:x}: \"{operands}\"")]
    OperandParse { addr: Address, operands: String },

    /// PC-relative load whose literal lies outside the image
    #[error("Literal at 0x{data_addr:x} referenced from 0x{addr:x} is outside the {len}-byte image")]
    LiteralOutOfRange {
        addr: Address,
        data_addr: Address,
        len: usize,
    },

    /// Overlay could not be decompressed
    #[error("Decompression error: {0}")]
    Compression(#[from] compression::CompressionError),

    /// Output serialisation failed
    #[error("Format error: {0}")]
    Format(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
