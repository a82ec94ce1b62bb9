//! MT103 ⇄ pacs.008 Converter Library
//!
//! A library for converting customer credit transfer messages between the
//! SWIFT MT103 tagged-text format and the ISO 20022 pacs.008 XML format.
//!
//! # Supported Formats
//!
//! - **MT103**: SWIFT FIN customer credit transfer (tagged text)
//! - **pacs.008**: ISO 20022 FI-to-FI customer credit transfer (XML)
//!
//! # Features
//!
//! - Tokenize MT103 messages into SWIFT blocks and tagged fields
//! - Validate structure, required fields, and business rules before mapping
//! - Convert in both directions with deterministic field-mapping tables
//! - Check generated pacs.008 XML against the supported schema subset
//!
//! Only a fixed subset of MT103 fields is supported (20, 23B, 32A, 33B,
//! 50A/50K, 59, 70, 71A), enough for a single customer credit transfer.
//!
//! # Examples
//!
//! ## Converting an MT103 message
//!
//! ```no_run
//! use mt103_converter::convert_forward;
//!
//! let raw = std::fs::read_to_string("payment.mt103")?;
//! let outcome = convert_forward(&raw);
//! if outcome.success {
//!     println!("{}", outcome.xml.unwrap());
//! } else {
//!     for error in &outcome.errors {
//!         eprintln!("• {}", error);
//!     }
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod conversion;
pub mod error;
pub mod mt103_format;
pub mod pacs008_format;
pub mod types;
pub mod validation;

use std::str::FromStr;

// Re-export commonly used types
pub use conversion::{convert_forward, convert_reverse, ForwardOutcome, ReverseOutcome};
pub use error::{Error, Result};
pub use types::{ChargeBearer, FieldTag, MappedTransaction, Party, ValidationReport};

/// Supported payment message formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// MT103 SWIFT format
    Mt103,
    /// pacs.008 ISO 20022 XML format
    Pacs008,
}

impl FromStr for Format {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "mt103" | "mt-103" | "swift" => Ok(Format::Mt103),
            "pacs008" | "pacs.008" | "pacs" | "xml" => Ok(Format::Pacs008),
            _ => Err(Error::InvalidFormat(s.to_string())),
        }
    }
}

impl Format {
    /// Get file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Format::Mt103 => "txt",
            Format::Pacs008 => "xml",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_str() {
        assert_eq!("mt103".parse::<Format>().unwrap(), Format::Mt103);
        assert_eq!("MT103".parse::<Format>().unwrap(), Format::Mt103);
        assert_eq!("pacs008".parse::<Format>().unwrap(), Format::Pacs008);
        assert_eq!("pacs.008".parse::<Format>().unwrap(), Format::Pacs008);
        assert!("camt053".parse::<Format>().is_err());
    }

    #[test]
    fn test_format_extension() {
        assert_eq!(Format::Mt103.extension(), "txt");
        assert_eq!(Format::Pacs008.extension(), "xml");
    }
}
