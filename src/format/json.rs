//! JSON and JSON Lines output formatters

use serde::Serialize;

use super::ListingFormatter;
use crate::annotate::{Line, Listing};
use crate::DisassemblyError;

/// Serializable line for JSON output
#[derive(Serialize)]
struct LineJson<'a> {
    /// Address of the instruction
    address: String,
    mnemonic: &'a str,
    operands: &'a str,
    /// Bytes of the instruction as hex string
    bytes: String,
    /// Address of the resolved literal, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    data_address: Option<String>,
    /// Value of the resolved literal, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<String>,
}

impl<'a> From<&'a Line> for LineJson<'a> {
    fn from(line: &'a Line) -> Self {
        Self {
            address: format!("0x{:x}", line.addr),
            mnemonic: &line.mnemonic,
            operands: &line.operands,
            bytes: hex_bytes(&line.bytes),
            data_address: line.literal.map(|lit| format!("0x{:x}", lit.data_addr)),
            value: line.literal.map(|lit| format!("0x{:x}", lit.value)),
        }
    }
}

/// Serializable listing for JSON output
#[derive(Serialize)]
struct ListingJson<'a> {
    base_address: String,
    resolved: usize,
    suppressed: usize,
    data_addresses: Vec<String>,
    lines: Vec<LineJson<'a>>,
}

pub(super) fn hex_bytes(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

fn to_format_error(e: serde_json::Error) -> DisassemblyError {
    DisassemblyError::Format(format!("JSON serialization error: {}", e))
}

impl ListingFormatter for super::JsonFormatter {
    fn format(&self, listing: &Listing) -> Result<String, DisassemblyError> {
        let doc = ListingJson {
            base_address: format!("0x{:x}", listing.base),
            resolved: listing.resolved,
            suppressed: listing.suppressed,
            data_addresses: listing
                .data_addrs
                .iter()
                .map(|addr| format!("0x{:x}", addr))
                .collect(),
            lines: listing.lines.iter().map(LineJson::from).collect(),
        };

        serde_json::to_string_pretty(&doc).map_err(to_format_error)
    }
}

impl ListingFormatter for super::JsonLinesFormatter {
    fn format(&self, listing: &Listing) -> Result<String, DisassemblyError> {
        let mut output = String::new();

        for line in &listing.lines {
            let json = serde_json::to_string(&LineJson::from(line)).map_err(to_format_error)?;
            output.push_str(&json);
            output.push('\n');
        }

        Ok(output)
    }
}
