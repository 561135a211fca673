//! Backward-LZ decompression of DS code overlays.
//!
//! A compressed overlay ends with an 8-byte footer:
//!
//! | Bytes | Meaning |
//! |---|---|
//! | `-8..-5` | bits 0-23: compressed length; bits 24-31: footer + padding length |
//! | `-4..-1` | number of bytes the image grows by when decompressed |
//!
//! The compressed stream is read from the end towards the start and the
//! output is written from the end of the grown buffer downwards, in place.
//! Bytes before the compressed region are left untouched.

use thiserror::Error;

/// Size of the trailing footer
pub const FOOTER_LEN: usize = 8;

/// Errors that can occur while decompressing an overlay
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CompressionError {
    /// Not even room for the footer
    #[error("Overlay of {0} bytes is too short for a compression footer")]
    TooShort(usize),

    /// Footer lengths do not fit the overlay
    #[error("Bad compression footer: header {header_len}, compressed {compressed_len}, overlay {len} bytes")]
    BadFooter {
        header_len: usize,
        compressed_len: usize,
        len: usize,
    },

    /// The stream reads or writes outside the buffer
    #[error("Compressed stream is corrupt near offset 0x{0:x}")]
    Corrupt(usize),
}

fn read_u32_le(data: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}

/// Decompress an overlay image, returning the grown image.
pub fn decompress_overlay(data: &[u8]) -> Result<Vec<u8>, CompressionError> {
    let len = data.len();
    if len < FOOTER_LEN {
        return Err(CompressionError::TooShort(len));
    }

    let bounds = read_u32_le(data, len - 8);
    let extra = read_u32_le(data, len - 4) as usize;
    let header_len = (bounds >> 24) as usize;
    let compressed_len = (bounds & 0x00ff_ffff) as usize;

    if header_len > len || compressed_len > len {
        return Err(CompressionError::BadFooter {
            header_len,
            compressed_len,
            len,
        });
    }

    let mut out = Vec::with_capacity(len + extra);
    out.extend_from_slice(data);
    out.resize(len + extra, 0);

    let stop = len - compressed_len;
    let mut src = len - header_len;
    let mut dst = out.len();

    log::debug!(
        "Decompressing overlay: {} compressed bytes at 0x{:x}, grows by {}",
        compressed_len,
        stop,
        extra
    );

    while src > stop {
        src -= 1;
        let mut flags = out[src];

        for _ in 0..8 {
            if flags & 0x80 == 0 {
                src = src.checked_sub(1).ok_or(CompressionError::Corrupt(src))?;
                dst = dst.checked_sub(1).ok_or(CompressionError::Corrupt(src))?;
                out[dst] = out[src];
            } else {
                if src < 2 {
                    return Err(CompressionError::Corrupt(src));
                }
                let hi = out[src - 1];
                let lo = out[src - 2];
                src -= 2;

                let disp = ((((hi as usize) << 8) | lo as usize) & 0xfff) + 2;
                let count = (hi >> 4) as usize + 3;

                for _ in 0..count {
                    let from = dst + disp;
                    if from >= out.len() {
                        return Err(CompressionError::Corrupt(src));
                    }
                    dst = dst.checked_sub(1).ok_or(CompressionError::Corrupt(src))?;
                    out[dst] = out[from];
                }
            }

            flags <<= 1;
            if src <= stop {
                break;
            }
        }
    }

    log::debug!("Overlay decompressed to {} bytes", out.len());
    Ok(out)
}
