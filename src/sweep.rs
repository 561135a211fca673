//! Linear-sweep disassembly over a whole image

use std::fmt;
use std::time::Instant;

use clap::ValueEnum;

use crate::{Address, Decoder, Insn, ARM_INSN_SIZE};

/// What the sweep does when a word does not decode.
#[derive(Copy, Clone, ValueEnum, Debug, Default, PartialEq, Eq)]
pub enum SweepMode {
    /// End the sweep at the first undecodable word
    #[default]
    Stop,
    /// Step over the undecodable word and keep going
    Skip,
}

impl fmt::Display for SweepMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SweepMode::Stop => write!(f, "stop"),
            SweepMode::Skip => write!(f, "skip"),
        }
    }
}

/// Linear-sweep disassembly in increasing address order
///
/// `image` must already have been checked with [`crate::check_mapping`]
/// at `base`; [`crate::annotate::Annotator::new`] does that.
///
/// # Arguments
/// * `image` - The binary image to disassemble
/// * `base` - Address of the first byte of `image`
/// * `decoder` - The decoder to use for disassembly
/// * `mode` - Policy for undecodable words
///
/// # Returns
/// The instruction stream, one entry per decoded position
pub(crate) fn run(image: &[u8], base: Address, decoder: &dyn Decoder, mode: SweepMode) -> Vec<Insn> {
    log::debug!(
        "Starting linear sweep on {} bytes at 0x{:x} ({} on invalid)",
        image.len(),
        base,
        mode
    );
    let start_time = Instant::now();

    let mut insns = Vec::with_capacity(image.len() / ARM_INSN_SIZE);
    let mut offset = 0usize;
    let mut skip_count = 0usize;

    while offset < image.len() {
        match decoder.decode(image, offset, base) {
            // Avoid infinite loop from zero-sized instructions
            Some(insn) if insn.size > 0 => {
                offset += insn.size as usize;
                insns.push(insn);
            }
            _ => match mode {
                SweepMode::Stop => {
                    log::debug!(
                        "Undecodable word at 0x{:x}, stopping sweep",
                        base + offset as Address
                    );
                    break;
                }
                SweepMode::Skip => {
                    log::trace!("Skipping undecodable word at 0x{:x}", base + offset as Address);
                    offset += ARM_INSN_SIZE;
                    skip_count += 1;
                }
            },
        }
    }

    log::debug!(
        "Linear sweep completed in {:?}: {} instructions, {} words skipped",
        start_time.elapsed(),
        insns.len(),
        skip_count
    );

    insns
}
