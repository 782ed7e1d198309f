//! Declarative parameter syntaxes and the engine that decodes them.
//!
//! Every known structured field, triplet and control sequence function is
//! described by a static table of [`SyntaxItem`]s giving each parameter's
//! offset, width, data type and whether it is mandatory.  The engine walks
//! the table against one payload and produces an ordered [`Params`] record.
//!
//! # Repeating groups
//!
//! A nested table is a repeating group.  Three sizing schemes exist on the
//! wire and all are table-driven:
//!   - every parameter fixed-width and mandatory — the group repeats at the
//!     summed width (MCC);
//!   - a preceding parameter with [`Role::NextGroupLength`] declares the
//!     width of each group (MCF-1);
//!   - the group's own first parameter with [`Role::ThisGroupLength`]
//!     declares that group's extent (MCF, MPO).
//!
//! # Tolerance
//!
//! A mandatory parameter that is entirely absent is a missing-parameter
//! condition; one that is present but cut short by the end of the payload
//! is an incomplete-parameter condition.  Under `strict` both are fatal;
//! otherwise they are recorded as warnings on the produced record and the
//! remaining parameters of the syntax are skipped.

use serde::Serialize;
use std::fmt;

use crate::cursor::{slice_at, Slice};
use crate::ebcdic;
use crate::error::{push_warning, ParseErrorKind, Warning};
use crate::functions::{decode_ptoca, TextElement};
use crate::parser::Policy;
use crate::triplets::{decode_triplets, Triplet};

/// Name under which repeating-group instances appear in [`Params`].
pub const PNAME_REPEATING_GROUP: &str = "RepeatingGroup";

// ── Syntax tables ─────────────────────────────────────────────────────────────

/// Wire data type of one parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ParamKind {
    /// Unsigned code point (registry identifiers, enumerated values).
    Code,
    /// Raw bytes, kept undecoded.
    Byte,
    /// Unsigned big-endian binary number.
    UBin,
    /// Signed (two's complement) big-endian binary number.
    SBin,
    /// EBCDIC character data.
    Char,
    /// A self-delimited triplet sequence running to the end of the payload.
    Triplets,
    /// Presentation text with embedded control sequences.
    Ptoca,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    None,
    /// This UBIN parameter holds the byte length of the repeating group
    /// that follows it.
    NextGroupLength,
    /// This UBIN parameter, first in a repeating group, holds the length
    /// of the group it begins.
    ThisGroupLength,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamSpec {
    /// Byte offset of the parameter within the payload.
    pub offset: usize,
    /// Width in bytes; 0 means "to the end of the payload".
    pub len: usize,
    pub kind: ParamKind,
    pub name: &'static str,
    /// Optional parameters are always trailing.
    pub mandatory: bool,
    pub role: Role,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntaxItem {
    Param(ParamSpec),
    Group(&'static [SyntaxItem]),
}

pub type Syntax = &'static [SyntaxItem];

/// Table-building shorthand for a plain parameter.
pub(crate) const fn param(
    offset: usize,
    len: usize,
    kind: ParamKind,
    name: &'static str,
    mandatory: bool,
) -> SyntaxItem {
    SyntaxItem::Param(ParamSpec {
        offset,
        len,
        kind,
        name,
        mandatory,
        role: Role::None,
    })
}

/// Table-building shorthand for a mandatory UBIN group-length parameter.
pub(crate) const fn length_param(
    offset: usize,
    len: usize,
    name: &'static str,
    role: Role,
) -> SyntaxItem {
    SyntaxItem::Param(ParamSpec {
        offset,
        len,
        kind: ParamKind::UBin,
        name,
        mandatory: true,
        role,
    })
}

// ── Decoded values ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Value {
    Code(u64),
    UBin(u64),
    SBin(i64),
    Bytes(Vec<u8>),
    Chars(String),
    Triplets(Vec<Triplet>),
    Text(Vec<TextElement>),
    Groups(Vec<Params>),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Code(v) => write!(f, "0x{v:02X}"),
            Value::UBin(v) => write!(f, "{v}"),
            Value::SBin(v) => write!(f, "{v}"),
            Value::Bytes(b) => f.write_str(&hex::encode(b)),
            Value::Chars(s) => write!(f, "{s:?}"),
            Value::Triplets(t) => write!(f, "{} triplet(s)", t.len()),
            Value::Text(t) => write!(f, "{} text element(s)", t.len()),
            Value::Groups(g) => write!(f, "{} group(s)", g.len()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Param {
    pub name: &'static str,
    pub value: Value,
}

/// An ordered parameter record decoded from one payload.
///
/// Entry order is encounter order and duplicate names are kept as-is —
/// later entries of the same name may override earlier ones per MO:DCA
/// semantics, so the decoder never collapses them.  The `get`-style
/// accessors return the first match.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct Params {
    pub entries: Vec<Param>,
    /// Conditions tolerated by policy while decoding this record.
    pub warnings: Vec<Warning>,
}

impl Params {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|p| p.name == name)
            .map(|p| &p.value)
    }

    /// Unsigned value of a CODE or UBIN parameter.
    pub fn ubin(&self, name: &str) -> Option<u64> {
        match self.get(name)? {
            Value::Code(v) | Value::UBin(v) => Some(*v),
            _ => None,
        }
    }

    pub fn sbin(&self, name: &str) -> Option<i64> {
        match self.get(name)? {
            Value::SBin(v) => Some(*v),
            _ => None,
        }
    }

    pub fn chars(&self, name: &str) -> Option<&str> {
        match self.get(name)? {
            Value::Chars(s) => Some(s),
            _ => None,
        }
    }

    pub fn bytes(&self, name: &str) -> Option<&[u8]> {
        match self.get(name)? {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn triplets(&self, name: &str) -> Option<&[Triplet]> {
        match self.get(name)? {
            Value::Triplets(t) => Some(t),
            _ => None,
        }
    }

    pub fn text(&self, name: &str) -> Option<&[TextElement]> {
        match self.get(name)? {
            Value::Text(t) => Some(t),
            _ => None,
        }
    }

    pub fn groups(&self, name: &str) -> Option<&[Params]> {
        match self.get(name)? {
            Value::Groups(g) => Some(g),
            _ => None,
        }
    }

    fn push(&mut self, name: &'static str, value: Value) {
        self.entries.push(Param { name, value });
    }

    fn record(&mut self, kind: &ParseErrorKind) {
        push_warning(&mut self.warnings, kind);
    }
}

// ── Engine ────────────────────────────────────────────────────────────────────

fn be_u64(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0, |acc, &b| (acc << 8) | u64::from(b))
}

fn be_i64(bytes: &[u8]) -> i64 {
    let u = be_u64(bytes);
    let bits = bytes.len() * 8;
    if bits == 0 || bits >= 64 {
        return u as i64;
    }
    if u & (1 << (bits - 1)) != 0 {
        (u | (!0u64 << bits)) as i64
    } else {
        u as i64
    }
}

/// Width of a group whose every parameter is fixed and mandatory, or 0 when
/// the group is open-ended and must size itself.
fn fixed_width(group: &[SyntaxItem]) -> usize {
    let mut width = 0;
    for item in group {
        match item {
            SyntaxItem::Group(_) => return 0,
            SyntaxItem::Param(p) => {
                if !p.mandatory || p.len == 0 {
                    return 0;
                }
                width += p.len;
            }
        }
    }
    width
}

/// True when the value carries actual content.  Decoders for nested lists
/// can come back empty when a tolerated truncation cut the list short; an
/// empty list is treated like an absent parameter.
fn value_present(value: &Value) -> bool {
    match value {
        Value::Bytes(b) => !b.is_empty(),
        Value::Triplets(t) => !t.is_empty(),
        Value::Text(t) => !t.is_empty(),
        Value::Groups(g) => !g.is_empty(),
        _ => true,
    }
}

/// Decode one payload against a syntax table.
///
/// Returns the parameter record and the number of payload bytes the syntax
/// covered — `data.len()`, unless a [`Role::ThisGroupLength`] parameter
/// bounded the payload to a shorter extent.
pub(crate) fn decode_syntax(
    data: &[u8],
    syntax: Syntax,
    policy: &Policy,
) -> Result<(Params, usize), ParseErrorKind> {
    let mut data = data;
    let mut out = Params::default();
    let mut next_group_len = 0usize;
    let mut next_offset = 0usize;

    for item in syntax {
        match *item {
            SyntaxItem::Group(group) => {
                let width = if next_group_len != 0 {
                    next_group_len
                } else {
                    fixed_width(group)
                };
                let mut groups = Vec::new();
                let mut at = next_offset;
                while at < data.len() {
                    let slice = if width != 0 {
                        if at + width > data.len() {
                            return Err(ParseErrorKind::RepeatingGroup(
                                "length longer than available data",
                            ));
                        }
                        &data[at..at + width]
                    } else {
                        &data[at..]
                    };
                    let (group_params, consumed) = decode_syntax(slice, group, policy)?;
                    groups.push(group_params);
                    if consumed == 0 {
                        return Err(ParseErrorKind::RepeatingGroup("length cannot be zero"));
                    }
                    at += consumed;
                }
                if !groups.is_empty() {
                    out.push(PNAME_REPEATING_GROUP, Value::Groups(groups));
                }
                next_group_len = 0;
                next_offset = at;
            }
            SyntaxItem::Param(spec) => match slice_at(data, spec.offset, spec.len) {
                Slice::Partial => {
                    let kind = ParseErrorKind::IncompleteParameter(spec.name.to_string());
                    if policy.strict {
                        return Err(kind);
                    }
                    out.record(&kind);
                    break;
                }
                Slice::Absent => {
                    if spec.mandatory {
                        let kind = ParseErrorKind::MissingParameter(spec.name.to_string());
                        if policy.strict {
                            return Err(kind);
                        }
                        out.record(&kind);
                    }
                }
                Slice::Full(bytes) => {
                    let value = match spec.kind {
                        ParamKind::Code => Value::Code(be_u64(bytes)),
                        ParamKind::UBin => Value::UBin(be_u64(bytes)),
                        ParamKind::SBin => Value::SBin(be_i64(bytes)),
                        ParamKind::Byte => Value::Bytes(bytes.to_vec()),
                        ParamKind::Char => Value::Chars(ebcdic::decode_trimmed(bytes)),
                        ParamKind::Triplets => {
                            Value::Triplets(decode_triplets(bytes, policy, &mut out.warnings)?)
                        }
                        ParamKind::Ptoca => {
                            Value::Text(decode_ptoca(bytes, policy, &mut out.warnings)?)
                        }
                    };
                    match spec.role {
                        Role::NextGroupLength => {
                            let n = match value {
                                Value::UBin(n) => n as usize,
                                _ => 0,
                            };
                            if n == 0 {
                                return Err(ParseErrorKind::RepeatingGroup(
                                    "length cannot be zero",
                                ));
                            }
                            next_group_len = n;
                        }
                        Role::ThisGroupLength => {
                            let n = match value {
                                Value::UBin(n) => n as usize,
                                _ => 0,
                            };
                            if n == 0 {
                                return Err(ParseErrorKind::RepeatingGroup(
                                    "length cannot be zero",
                                ));
                            }
                            if n > data.len() {
                                return Err(ParseErrorKind::RepeatingGroup(
                                    "length longer than available data",
                                ));
                            }
                            data = &data[..n];
                        }
                        Role::None => {}
                    }
                    if value_present(&value) {
                        out.push(spec.name, value);
                    } else if spec.mandatory {
                        let kind = ParseErrorKind::MissingParameter(spec.name.to_string());
                        if policy.strict {
                            return Err(kind);
                        }
                        out.record(&kind);
                    }
                    next_offset = spec.offset + spec.len;
                }
            },
        }
    }

    Ok((out, data.len()))
}
