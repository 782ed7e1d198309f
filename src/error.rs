//! Error taxonomy for the decoder.
//!
//! Two levels exist:
//!   - [`ParseErrorKind`] — what went wrong, produced anywhere inside the
//!     decoder.  Several kinds carry the MO:DCA exception code from the AFP
//!     documentation (`0x02` incomplete parameter, `0x04` missing mandatory
//!     parameter, `0x10` unrecognized construct, `0x40` bad class code).
//!   - [`ParseError`] — the kind plus stream context (field number and the
//!     byte offset where the failing structured field begins), attached by
//!     the field reader before an error is surfaced to the caller.
//!
//! Conditions tolerated by policy never become errors; they are recorded as
//! [`Warning`] values on the record being decoded.

use serde::Serialize;
use std::fmt;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseErrorKind {
    #[error("unexpected end of input while reading {0}")]
    TruncatedInput(&'static str),
    #[error("missing 0x5A carriage control byte")]
    MissingCarriageControl,
    #[error("unrecognized class code 0x{0:06X} - MO:DCA uses class code 0xD3")]
    UnrecognizedClassCode(u32),
    #[error("structured field padding is not supported")]
    UnsupportedPadding,
    #[error("structured field length {0} is shorter than the introducer")]
    BadFieldLength(u16),
    #[error("unrecognized structured field 0x{0:06X}")]
    UnknownStructuredField(u32),
    #[error("unrecognized triplet 0x{0:02X}")]
    UnknownTriplet(u8),
    #[error("unknown control sequence function 0x{0:02X}")]
    UnknownFunction(u8),
    #[error("required parameter missing: {0}")]
    MissingParameter(String),
    #[error("incomplete parameter: {0}")]
    IncompleteParameter(String),
    #[error("invalid length {length} declared by triplet {index}")]
    BadTripletLength { index: usize, length: u8 },
    #[error("invalid length {length} declared by control sequence {index}")]
    BadFunctionLength { index: usize, length: u8 },
    #[error("presentation text ends while a control sequence chain is open")]
    DanglingChain,
    #[error("repeating group {0}")]
    RepeatingGroup(&'static str),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl ParseErrorKind {
    /// The exception code defined by the AFP documentation, or 0x00 for
    /// conditions the documentation does not describe.
    pub fn modca_code(&self) -> u8 {
        match self {
            ParseErrorKind::IncompleteParameter(_) => 0x02,
            ParseErrorKind::MissingParameter(_) => 0x04,
            ParseErrorKind::UnknownStructuredField(_) | ParseErrorKind::UnknownTriplet(_) => 0x10,
            ParseErrorKind::UnrecognizedClassCode(_) => 0x40,
            _ => 0x00,
        }
    }
}

/// A fatal decode failure with stream context.
///
/// `field_no` counts structured fields from 1; `offset` is the byte offset
/// of the carriage control byte of the field being decoded when the error
/// occurred.
#[derive(Debug)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub field_no: u64,
    pub offset: u64,
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = self.kind.modca_code();
        if code != 0 {
            write!(f, "0x{code:02X} ")?;
        }
        write!(
            f,
            "{} - field {}; start offset {}",
            self.kind, self.field_no, self.offset
        )
    }
}

/// A condition that would be fatal under a stricter policy, recorded on the
/// record it occurred in and decoding carried on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    /// MO:DCA exception code, 0x00 when the documentation has none.
    pub code: u8,
    pub message: String,
}

impl From<&ParseErrorKind> for Warning {
    fn from(kind: &ParseErrorKind) -> Self {
        Warning {
            code: kind.modca_code(),
            message: kind.to_string(),
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.code != 0 {
            write!(f, "0x{:02X} ", self.code)?;
        }
        f.write_str(&self.message)
    }
}

/// Record a tolerated condition, logging it as it is captured.
pub(crate) fn push_warning(warnings: &mut Vec<Warning>, kind: &ParseErrorKind) {
    let warning = Warning::from(kind);
    log::warn!("{warning}");
    warnings.push(warning);
}
