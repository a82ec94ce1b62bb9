//! Error types for the mt103_converter library.

use std::io;
use thiserror::Error;

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur during parsing, mapping, and serialization.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error occurred during read or write operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Error parsing or writing XML.
    #[error("XML error: {0}")]
    Xml(String),

    /// Error tokenizing an MT103 message into blocks and fields.
    #[error("MT103 tokenization error: {0}")]
    Tokenize(String),

    /// Invalid date format.
    #[error("Invalid date format: {0}")]
    InvalidDate(String),

    /// Invalid amount format.
    #[error("Invalid amount format: {0}")]
    InvalidAmount(String),

    /// Missing required field or element.
    #[error("Missing required field: {0}")]
    MissingField(String),

    /// Invalid format specified.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// General parsing error.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Conversion error between formats.
    #[error("Conversion error: {0}")]
    ConversionError(String),
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::Xml(err.to_string())
    }
}

impl From<quick_xml::DeError> for Error {
    fn from(err: quick_xml::DeError) -> Self {
        Error::Xml(err.to_string())
    }
}
