//! Streaming decoder for AFP (MO:DCA) print-stream files.
//!
//! An AFP document is a flat sequence of structured fields.  [`stream`]
//! decodes them one at a time from any [`std::io::Read`] source; [`load`]
//! collects the whole document.  A [`Policy`] controls how much of the
//! unexpected the decoder tolerates.
//!
//! ```no_run
//! use std::fs::File;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let file = File::open("document.afp")?;
//! for field in afpstream::stream(file, afpstream::Policy::tolerant()) {
//!     let field = field?;
//!     println!("{field}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod cursor;
pub mod ebcdic;
pub mod error;
pub mod fields;
pub mod functions;
pub mod parser;
pub mod syntax;
pub mod triplets;

pub use error::{ParseError, ParseErrorKind, Warning};
pub use fields::{FieldKind, SfiFlags, StructuredField};
pub use functions::{reassemble, ControlSequence, FunctionKind, TextElement};
pub use parser::{load, stream, FieldReader, Policy, CARRIAGE_CONTROL};
pub use syntax::{Param, Params, Value};
pub use triplets::{Triplet, TripletKind};
