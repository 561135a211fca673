//! Output formats for annotated listings

mod csv;
mod json;

use std::fmt;

use clap::ValueEnum;

use crate::annotate::Listing;
use crate::DisassemblyError;

/// Supported output formats for annotated listings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Plain assembly listing (default)
    #[default]
    Text,
    /// JSON document with the listing and the literal-pool summary
    Json,
    /// JSON Lines format (one JSON object per line)
    #[value(name = "jsonl", alias = "jsonlines")]
    JsonLines,
    /// CSV format (comma-separated values)
    Csv,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::JsonLines => write!(f, "jsonl"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}

impl OutputFormat {
    /// Get a formatter for this output format
    pub fn get_formatter(&self) -> Box<dyn ListingFormatter> {
        match self {
            OutputFormat::Text => Box::new(TextFormatter),
            OutputFormat::Json => Box::new(JsonFormatter),
            OutputFormat::JsonLines => Box::new(JsonLinesFormatter),
            OutputFormat::Csv => Box::new(CsvFormatter),
        }
    }
}

/// Formatter trait for annotated listings
pub trait ListingFormatter {
    /// Render the whole listing
    fn format(&self, listing: &Listing) -> Result<String, DisassemblyError>;
}

/// Format the listing as `0xADDR:\tMNEMONIC\tOPERANDS` lines
pub struct TextFormatter;

/// Format the listing in JSON
pub struct JsonFormatter;

/// Format the listing in JSON Lines
pub struct JsonLinesFormatter;

/// Format the listing in CSV
pub struct CsvFormatter;

impl ListingFormatter for TextFormatter {
    fn format(&self, listing: &Listing) -> Result<String, DisassemblyError> {
        let mut output = String::new();

        for line in &listing.lines {
            output.push_str(&line.to_string());
            output.push('\n');
        }

        Ok(output)
    }
}
