//! Presentation text control sequence functions.
//!
//! PTX payloads mix literal text bytes with control sequences.  An
//! unchained control sequence is announced by the two-byte escape
//! `0x2BD3`; a chained one follows the previous sequence directly.  A
//! function identifier's low bit says whether it chains: the chained
//! identifier is always the unchained one plus one.
//!
//! Bytes sitting at an unchained boundary that are not the escape are
//! literal text and decode as [`TextElement::Text`] runs, interleaved in
//! wire order with the control sequences.  Ending the payload while a
//! chain is still open is fatal under every policy.

use serde::Serialize;
use std::fmt;

use crate::cursor::Cursor;
use crate::error::{push_warning, ParseErrorKind, Warning};
use crate::parser::Policy;
use crate::syntax::{decode_syntax, param, ParamKind, Params, Syntax};

/// Escape introducing an unchained control sequence.
pub const PTX_ESCAPE: u16 = 0x2BD3;

// ── Registry ──────────────────────────────────────────────────────────────────

// Unchained function identifiers.  The chained variant is the identifier
// plus one.
pub const FN_U_AMB: u8 = 0xD2;
pub const FN_U_AMI: u8 = 0xC6;
pub const FN_U_BSU: u8 = 0xF2;
pub const FN_U_DBR: u8 = 0xE6;
pub const FN_U_DIR: u8 = 0xE4;
pub const FN_U_ESU: u8 = 0xF4;
pub const FN_U_NOP: u8 = 0xF8;
pub const FN_U_RMB: u8 = 0xD4;
pub const FN_U_RMI: u8 = 0xC8;
pub const FN_U_RPS: u8 = 0xEE;
pub const FN_U_SCFL: u8 = 0xF0;
pub const FN_U_STC: u8 = 0x74;
pub const FN_U_STO: u8 = 0xF6;
pub const FN_U_SVI: u8 = 0xC4;
pub const FN_U_TRN: u8 = 0xDA;

/// True when the identifier is the chained form of its function.
pub fn is_chained(function: u8) -> bool {
    function % 2 == 1
}

#[derive(Debug, PartialEq, Serialize)]
pub struct FunctionKind {
    /// Identifier of the unchained form.
    pub unchained_id: u8,
    pub abbreviation: &'static str,
    pub name: &'static str,
    #[serde(skip)]
    pub syntax: Syntax,
}

/// Syntax applied to functions the registry does not know.
pub(crate) static FUNCTION_RAW: Syntax = &[param(0, 0, ParamKind::Byte, "DATA", true)];

static FUNCTION_KINDS: &[FunctionKind] = &[
    FunctionKind {
        unchained_id: FN_U_AMB,
        abbreviation: "AMB",
        name: "Absolute Move Baseline",
        syntax: &[param(0, 2, ParamKind::SBin, "DSPLCMNT", true)],
    },
    FunctionKind {
        unchained_id: FN_U_AMI,
        abbreviation: "AMI",
        name: "Absolute Move Inline",
        syntax: &[param(0, 2, ParamKind::SBin, "DSPLCMNT", true)],
    },
    FunctionKind {
        unchained_id: FN_U_BSU,
        abbreviation: "BSU",
        name: "Begin Suppression",
        syntax: &[param(0, 1, ParamKind::Code, "LID", true)],
    },
    FunctionKind {
        unchained_id: FN_U_DBR,
        abbreviation: "DBR",
        name: "Draw Baseline Rule",
        syntax: &[
            param(0, 2, ParamKind::SBin, "RLENGTH", true),
            param(2, 3, ParamKind::SBin, "RWIDTH", false),
        ],
    },
    FunctionKind {
        unchained_id: FN_U_DIR,
        abbreviation: "DIR",
        name: "Draw Inline Rule",
        syntax: &[
            param(0, 2, ParamKind::SBin, "RLENGTH", true),
            param(2, 3, ParamKind::SBin, "RWIDTH", false),
        ],
    },
    FunctionKind {
        unchained_id: FN_U_ESU,
        abbreviation: "ESU",
        name: "End Suppression",
        syntax: &[param(0, 1, ParamKind::Code, "LID", true)],
    },
    FunctionKind {
        unchained_id: FN_U_NOP,
        abbreviation: "NOP",
        name: "No Operation",
        syntax: &[param(0, 0, ParamKind::Byte, "IGNDATA", false)],
    },
    FunctionKind {
        unchained_id: FN_U_RMB,
        abbreviation: "RMB",
        name: "Relative Move Baseline",
        syntax: &[param(0, 2, ParamKind::SBin, "INCRMENT", true)],
    },
    FunctionKind {
        unchained_id: FN_U_RMI,
        abbreviation: "RMI",
        name: "Relative Move Inline",
        syntax: &[param(0, 2, ParamKind::SBin, "INCRMENT", true)],
    },
    FunctionKind {
        unchained_id: FN_U_RPS,
        abbreviation: "RPS",
        name: "Repeat String",
        syntax: &[
            param(0, 2, ParamKind::UBin, "RLENGTH", true),
            param(2, 0, ParamKind::Char, "RPTDATA", false),
        ],
    },
    FunctionKind {
        unchained_id: FN_U_SCFL,
        abbreviation: "SCFL",
        name: "Set Coded Font Local",
        syntax: &[param(0, 1, ParamKind::Code, "LID", true)],
    },
    FunctionKind {
        unchained_id: FN_U_STC,
        abbreviation: "STC",
        name: "Set Text Color",
        syntax: &[
            param(0, 2, ParamKind::Code, "FRGCOLOR", true),
            param(2, 1, ParamKind::Byte, "PRECSION", false),
        ],
    },
    FunctionKind {
        unchained_id: FN_U_STO,
        abbreviation: "STO",
        name: "Set Text Orientation",
        syntax: &[
            param(0, 2, ParamKind::Code, "IORNTION", true),
            param(2, 2, ParamKind::Code, "BORNTION", true),
        ],
    },
    FunctionKind {
        unchained_id: FN_U_SVI,
        abbreviation: "SVI",
        name: "Set Variable Space Character Increment",
        syntax: &[param(0, 2, ParamKind::SBin, "INCRMENT", true)],
    },
    FunctionKind {
        unchained_id: FN_U_TRN,
        abbreviation: "TRN",
        name: "Transparent Data",
        syntax: &[param(0, 0, ParamKind::Char, "TRNDATA", false)],
    },
];

/// Look up a function by either its chained or unchained identifier.
pub fn lookup(function: u8) -> Option<&'static FunctionKind> {
    let unchained = function & !1;
    FUNCTION_KINDS.iter().find(|k| k.unchained_id == unchained)
}

// ── Records ───────────────────────────────────────────────────────────────────

/// One decoded control sequence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControlSequence {
    /// Declared length, covering the length and function bytes.
    pub length: u8,
    /// Function identifier as it appeared on the wire.
    pub function: u8,
    /// True when this sequence chains to the next one.
    pub chained: bool,
    pub kind: Option<&'static FunctionKind>,
    /// Function data bytes as they appeared on the wire.
    pub data: Vec<u8>,
    pub params: Params,
}

impl ControlSequence {
    pub fn abbreviation(&self) -> &'static str {
        self.kind.map_or("?", |k| k.abbreviation)
    }

    pub fn name(&self) -> &'static str {
        self.kind.map_or("Unknown", |k| k.name)
    }
}

impl fmt::Display for ControlSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02X} {}", self.function, self.abbreviation())
    }
}

/// One element of a decoded PTX payload, in wire order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TextElement {
    /// A run of literal (EBCDIC) text bytes.
    Text(Vec<u8>),
    Function(ControlSequence),
}

/// Rebuild the exact wire bytes of a decoded PTX payload.
pub fn reassemble(elements: &[TextElement]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut chained = false;
    for element in elements {
        match element {
            TextElement::Text(text) => out.extend_from_slice(text),
            TextElement::Function(cs) => {
                if !chained {
                    out.extend_from_slice(&PTX_ESCAPE.to_be_bytes());
                }
                out.push(cs.length);
                out.push(cs.function);
                out.extend_from_slice(&cs.data);
                chained = cs.chained;
            }
        }
    }
    out
}

// ── Decoding ──────────────────────────────────────────────────────────────────

/// Decode a PTX payload into interleaved text runs and control sequences.
pub(crate) fn decode_ptoca(
    data: &[u8],
    policy: &Policy,
    warnings: &mut Vec<Warning>,
) -> Result<Vec<TextElement>, ParseErrorKind> {
    let mut cur = Cursor::new(data);
    let mut out = Vec::new();
    let mut chained = false;
    let mut index = 0usize;

    while !cur.is_empty() {
        if !chained {
            // Literal text runs up to the next escape.  A lone trailing
            // byte can never start an escape and is text as well.
            let mut text = Vec::new();
            while !cur.is_empty() && cur.peek_u16_be() != Some(PTX_ESCAPE) {
                text.push(cur.take_u8("presentation text")?);
            }
            if !text.is_empty() {
                out.push(TextElement::Text(text));
            }
            if cur.is_empty() {
                break;
            }
            cur.take(2, "control sequence escape")?;
        }

        let length = cur.take_u8("control sequence length")?;
        if length < 2 {
            return Err(ParseErrorKind::BadFunctionLength { index, length });
        }
        let function = cur.take_u8("control sequence function")?;
        let kind = lookup(function);
        let syntax = match kind {
            Some(k) => k.syntax,
            None => {
                let err = ParseErrorKind::UnknownFunction(function);
                if !policy.allow_unknown_functions {
                    return Err(err);
                }
                push_warning(warnings, &err);
                FUNCTION_RAW
            }
        };
        let data = cur.take(usize::from(length) - 2, "control sequence data")?;
        let (params, _) = decode_syntax(data, syntax, policy)?;

        chained = is_chained(function);
        out.push(TextElement::Function(ControlSequence {
            length,
            function,
            chained,
            kind,
            data: data.to_vec(),
            params,
        }));
        index += 1;
    }

    if chained {
        return Err(ParseErrorKind::DanglingChain);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn functions_of(elements: &[TextElement]) -> Vec<&ControlSequence> {
        elements
            .iter()
            .filter_map(|e| match e {
                TextElement::Function(cs) => Some(cs),
                TextElement::Text(_) => None,
            })
            .collect()
    }

    #[test]
    fn single_unchained_sequence() {
        // Escape, then AMB with displacement 16.
        let data = [0x2B, 0xD3, 0x04, 0xD2, 0x00, 0x10];
        let mut warnings = Vec::new();
        let elements = decode_ptoca(&data, &Policy::default(), &mut warnings).unwrap();
        assert_eq!(elements.len(), 1);
        let fns = functions_of(&elements);
        assert_eq!(fns[0].abbreviation(), "AMB");
        assert!(!fns[0].chained);
        assert_eq!(fns[0].params.sbin("DSPLCMNT"), Some(16));
    }

    #[test]
    fn chained_sequences_need_no_escape() {
        // AMB chained (0xD3), then AMI unchained (0xC6) directly after.
        let data = [0x2B, 0xD3, 0x04, 0xD3, 0x00, 0x10, 0x04, 0xC6, 0xFF, 0xF0];
        let mut warnings = Vec::new();
        let elements = decode_ptoca(&data, &Policy::default(), &mut warnings).unwrap();
        let fns = functions_of(&elements);
        assert_eq!(fns.len(), 2);
        assert!(fns[0].chained);
        assert_eq!(fns[1].abbreviation(), "AMI");
        assert_eq!(fns[1].params.sbin("DSPLCMNT"), Some(-16));
    }

    #[test]
    fn text_runs_interleave_with_sequences() {
        // "AB" in EBCDIC, SCFL, then "C".
        let data = [0xC1, 0xC2, 0x2B, 0xD3, 0x03, 0xF0, 0x01, 0xC3];
        let mut warnings = Vec::new();
        let elements = decode_ptoca(&data, &Policy::default(), &mut warnings).unwrap();
        assert_eq!(elements.len(), 3);
        assert_eq!(elements[0], TextElement::Text(vec![0xC1, 0xC2]));
        assert!(matches!(&elements[1], TextElement::Function(cs) if cs.abbreviation() == "SCFL"));
        assert_eq!(elements[2], TextElement::Text(vec![0xC3]));
    }

    #[test]
    fn lone_trailing_byte_is_text() {
        let data = [0x2B];
        let mut warnings = Vec::new();
        let elements = decode_ptoca(&data, &Policy::default(), &mut warnings).unwrap();
        assert_eq!(elements, vec![TextElement::Text(vec![0x2B])]);
    }

    #[test]
    fn open_chain_at_end_is_fatal() {
        let data = [0x2B, 0xD3, 0x04, 0xD3, 0x00, 0x10];
        let mut warnings = Vec::new();
        assert!(matches!(
            decode_ptoca(&data, &Policy::tolerant(), &mut warnings),
            Err(ParseErrorKind::DanglingChain)
        ));
    }

    #[test]
    fn unknown_function_gates_on_policy() {
        let data = [0x2B, 0xD3, 0x03, 0x20, 0xAA];
        let mut warnings = Vec::new();
        assert!(matches!(
            decode_ptoca(&data, &Policy::default(), &mut warnings),
            Err(ParseErrorKind::UnknownFunction(0x20))
        ));

        let policy = Policy {
            allow_unknown_functions: true,
            ..Policy::default()
        };
        let elements = decode_ptoca(&data, &policy, &mut warnings).unwrap();
        let fns = functions_of(&elements);
        assert_eq!(fns[0].name(), "Unknown");
        assert_eq!(fns[0].params.bytes("DATA"), Some(&[0xAA][..]));
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn truncated_function_data_is_fatal() {
        let data = [0x2B, 0xD3, 0x06, 0xD2, 0x00];
        let mut warnings = Vec::new();
        assert!(matches!(
            decode_ptoca(&data, &Policy::tolerant(), &mut warnings),
            Err(ParseErrorKind::TruncatedInput(_))
        ));
    }

    #[test]
    fn reassemble_restores_wire_bytes() {
        let data = [
            0xC1, 0xC2, 0x2B, 0xD3, 0x04, 0xD3, 0x00, 0x10, 0x04, 0xC6, 0xFF, 0xF0, 0xC3,
        ];
        let mut warnings = Vec::new();
        let elements = decode_ptoca(&data, &Policy::default(), &mut warnings).unwrap();
        assert_eq!(reassemble(&elements), data.to_vec());
    }
}
