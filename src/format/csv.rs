//! CSV output formatter

use super::json::hex_bytes;
use super::ListingFormatter;
use crate::annotate::Listing;
use crate::DisassemblyError;

fn to_format_error(e: impl std::fmt::Display) -> DisassemblyError {
    DisassemblyError::Format(format!("CSV serialization error: {}", e))
}

impl ListingFormatter for super::CsvFormatter {
    fn format(&self, listing: &Listing) -> Result<String, DisassemblyError> {
        let mut writer = ::csv::Writer::from_writer(Vec::new());

        writer
            .write_record(["address", "mnemonic", "operands", "bytes", "data_address", "value"])
            .map_err(to_format_error)?;

        for line in &listing.lines {
            let (data_addr, value) = match line.literal {
                Some(lit) => (format!("0x{:x}", lit.data_addr), format!("0x{:x}", lit.value)),
                None => (String::new(), String::new()),
            };

            writer
                .write_record([
                    format!("0x{:x}", line.addr).as_str(),
                    line.mnemonic.as_str(),
                    line.operands.as_str(),
                    hex_bytes(&line.bytes).as_str(),
                    data_addr.as_str(),
                    value.as_str(),
                ])
                .map_err(to_format_error)?;
        }

        let bytes = writer.into_inner().map_err(to_format_error)?;
        String::from_utf8(bytes).map_err(to_format_error)
    }
}
