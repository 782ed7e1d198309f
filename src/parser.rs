//! Structured field scanner and the stream/load façade.
//!
//! An AFP print stream is a flat sequence of structured fields, each
//! preceded by the carriage control byte `0x5A`.  [`FieldReader`] pulls one
//! field per `next()` from any [`Read`] source, so a document is decoded in
//! constant memory no matter its size.  [`load`] drains the same iterator
//! into a `Vec` for small inputs.
//!
//! Decoding is policy-driven: by default anything the registries do not
//! know is a hard error, which suits format exploration.  Text-extraction
//! consumers run [`Policy::tolerant`] and inspect the warnings left on each
//! record instead.

use byteorder::{BigEndian, ReadBytesExt};
use serde::Serialize;
use std::io::{self, Read};

use crate::cursor::Cursor;
use crate::error::{push_warning, ParseError, ParseErrorKind};
use crate::fields::{self, SfiFlags, StructuredField, FIELD_RAW, MODCA_CLASS_CODE};
use crate::syntax::decode_syntax;

/// Marker byte preceding every structured field.
pub const CARRIAGE_CONTROL: u8 = 0x5A;

/// What the decoder tolerates.
///
/// The default rejects everything unexpected.  `strict` additionally turns
/// missing and incomplete parameters of known constructs from warnings into
/// fatal errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Policy {
    /// Decode structured fields missing from the registry as raw data.
    pub allow_unknown_fields: bool,
    /// Decode triplets missing from the registry as raw data.
    pub allow_unknown_triplets: bool,
    /// Decode control sequence functions missing from the registry as raw
    /// data.
    pub allow_unknown_functions: bool,
    /// Fail on missing or incomplete parameters instead of recording
    /// warnings.
    pub strict: bool,
}

impl Policy {
    /// Accept all unknown constructs; keep parameter conditions as
    /// warnings.
    pub fn tolerant() -> Self {
        Policy {
            allow_unknown_fields: true,
            allow_unknown_triplets: true,
            allow_unknown_functions: true,
            strict: false,
        }
    }
}

/// Iterator of structured fields over a byte source.
///
/// Yields `Result` items and fuses after the first fatal error, since a
/// framing failure leaves no way to find the next field boundary.
pub struct FieldReader<R> {
    reader: R,
    policy: Policy,
    offset: u64,
    field_no: u64,
    done: bool,
}

impl<R: Read> FieldReader<R> {
    pub fn new(reader: R, policy: Policy) -> Self {
        FieldReader {
            reader,
            policy,
            offset: 0,
            field_no: 0,
            done: false,
        }
    }

    /// Byte offset the next field is expected at.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Read the carriage control byte, or `None` at a clean end of input.
    fn read_marker(&mut self) -> Result<Option<u8>, ParseErrorKind> {
        let mut byte = [0u8; 1];
        loop {
            match self.reader.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(byte[0])),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(ParseErrorKind::Io(e)),
            }
        }
    }

    fn read_field(&mut self, field_no: u64) -> Result<Option<StructuredField>, ParseErrorKind> {
        let offset = self.offset;
        let marker = match self.read_marker()? {
            None => return Ok(None),
            Some(b) => b,
        };
        if marker != CARRIAGE_CONTROL {
            return Err(ParseErrorKind::MissingCarriageControl);
        }
        self.offset += 1;

        // The declared length covers its own two bytes but not the marker.
        let length = self
            .reader
            .read_u16::<BigEndian>()
            .map_err(eof_as("structured field length"))?;
        self.offset += 2;
        if length < 8 {
            return Err(ParseErrorKind::BadFieldLength(length));
        }
        let mut data = vec![0u8; usize::from(length) - 2];
        self.reader
            .read_exact(&mut data)
            .map_err(eof_as("structured field"))?;
        self.offset += data.len() as u64;

        let mut cur = Cursor::new(&data);
        let type_bytes = cur.take(3, "structured field type")?;
        let type_id = u32::from(type_bytes[0]) << 16
            | u32::from(type_bytes[1]) << 8
            | u32::from(type_bytes[2]);
        let flags = SfiFlags(cur.take_u8("flag byte")?);
        cur.take(2, "reserved bytes")?;

        if (type_id >> 16) as u8 != MODCA_CLASS_CODE {
            return Err(ParseErrorKind::UnrecognizedClassCode(type_id));
        }
        if flags.padded() {
            return Err(ParseErrorKind::UnsupportedPadding);
        }
        let extension = if flags.extension() {
            let ext_length = cur.take_u8("introducer extension length")?;
            // The extension length counts itself.
            if ext_length == 0 {
                return Err(ParseErrorKind::IncompleteParameter("ExtLength".to_string()));
            }
            Some(
                cur.take(usize::from(ext_length) - 1, "introducer extension")?
                    .to_vec(),
            )
        } else {
            None
        };

        let kind = fields::lookup(type_id);
        if kind.is_none() && !self.policy.allow_unknown_fields {
            return Err(ParseErrorKind::UnknownStructuredField(type_id));
        }
        let syntax = kind.map_or(FIELD_RAW, |k| k.syntax);
        let (mut params, _) = decode_syntax(cur.peek_rest(), syntax, &self.policy)?;
        if kind.is_none() {
            push_warning(
                &mut params.warnings,
                &ParseErrorKind::UnknownStructuredField(type_id),
            );
        }

        let field = StructuredField {
            offset,
            field_no,
            length,
            type_id,
            flags,
            extension,
            kind,
            params,
        };
        log::debug!("field {field_no} at offset {offset}: {field}");
        Ok(Some(field))
    }
}

impl<R: Read> Iterator for FieldReader<R> {
    type Item = Result<StructuredField, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let start = self.offset;
        let field_no = self.field_no + 1;
        match self.read_field(field_no) {
            Ok(None) => {
                self.done = true;
                None
            }
            Ok(Some(field)) => {
                self.field_no = field_no;
                Some(Ok(field))
            }
            Err(kind) => {
                self.done = true;
                let err = ParseError {
                    kind,
                    field_no,
                    offset: start,
                };
                log::error!("{err}");
                Some(Err(err))
            }
        }
    }
}

fn eof_as(what: &'static str) -> impl Fn(io::Error) -> ParseErrorKind {
    move |e| {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            ParseErrorKind::TruncatedInput(what)
        } else {
            ParseErrorKind::Io(e)
        }
    }
}

/// Decode structured fields one at a time from `reader`.
pub fn stream<R: Read>(reader: R, policy: Policy) -> FieldReader<R> {
    FieldReader::new(reader, policy)
}

/// Decode the whole input into memory.  Stops at the first fatal error.
pub fn load<R: Read>(reader: R, policy: Policy) -> Result<Vec<StructuredField>, ParseError> {
    stream(reader, policy).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(type_id: u32, flags: u8, body: &[u8]) -> Vec<u8> {
        let length = (body.len() + 8) as u16;
        let mut out = vec![CARRIAGE_CONTROL];
        out.extend_from_slice(&length.to_be_bytes());
        out.extend_from_slice(&type_id.to_be_bytes()[1..]);
        out.push(flags);
        out.extend_from_slice(&[0, 0]);
        out.extend_from_slice(body);
        out
    }

    #[test]
    fn empty_input_yields_nothing() {
        let mut reader = stream(&[][..], Policy::default());
        assert!(reader.next().is_none());
        assert!(reader.next().is_none());
    }

    #[test]
    fn missing_marker_is_fatal_with_context() {
        let data = [0x00u8, 0x08];
        for policy in [Policy::default(), Policy::tolerant()] {
            let err = stream(&data[..], policy).next().unwrap().unwrap_err();
            assert!(matches!(err.kind, ParseErrorKind::MissingCarriageControl));
            assert_eq!(err.field_no, 1);
            assert_eq!(err.offset, 0);
        }
    }

    #[test]
    fn undersized_field_length_is_fatal() {
        let data = [CARRIAGE_CONTROL, 0x00, 0x07];
        let err = stream(&data[..], Policy::default())
            .next()
            .unwrap()
            .unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::BadFieldLength(7)));
    }

    #[test]
    fn reader_fuses_after_an_error() {
        let mut bytes = field(crate::fields::SF_NOP, 0, &[]);
        bytes.push(0x00); // garbage after a valid field
        let mut reader = stream(&bytes[..], Policy::default());
        assert!(reader.next().unwrap().is_ok());
        assert!(reader.next().unwrap().is_err());
        assert!(reader.next().is_none());
    }

    #[test]
    fn introducer_extension_is_captured() {
        let mut body = vec![3u8, 0xAB, 0xCD]; // ExtLength counts itself
        body.extend_from_slice(&[0xEE]); // NOP payload
        let bytes = field(crate::fields::SF_NOP, 0b1000_0000, &body);
        let sf = stream(&bytes[..], Policy::default())
            .next()
            .unwrap()
            .unwrap();
        assert_eq!(sf.extension.as_deref(), Some(&[0xAB, 0xCD][..]));
        assert_eq!(sf.params.bytes("UndfData"), Some(&[0xEE][..]));
    }

    #[test]
    fn zero_extension_length_is_fatal() {
        let bytes = field(crate::fields::SF_NOP, 0b1000_0000, &[0u8, 0xAA]);
        let err = stream(&bytes[..], Policy::default())
            .next()
            .unwrap()
            .unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::IncompleteParameter(_)));
    }
}
