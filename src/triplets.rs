//! Triplet registry and list decoder.
//!
//! A triplet is a self-identifying parameter: one length byte covering the
//! whole triplet, one identifier byte, then the value.  Triplet lists ride
//! inside structured field payloads and repeat to the end of the enclosing
//! parameter.
//!
//! Identifiers not in the registry decode as a raw `Contents` byte
//! parameter when [`Policy::allow_unknown_triplets`] is set and are fatal
//! otherwise.

use serde::Serialize;
use std::fmt;

use crate::cursor::Cursor;
use crate::error::{push_warning, ParseErrorKind, Warning};
use crate::parser::Policy;
use crate::syntax::{decode_syntax, param, ParamKind, Params, Syntax};

// ── Registry ──────────────────────────────────────────────────────────────────

#[derive(Debug, PartialEq, Serialize)]
pub struct TripletKind {
    pub id: u8,
    pub name: &'static str,
    #[serde(skip)]
    pub syntax: Syntax,
}

/// Syntax applied to triplets the registry does not know.
pub(crate) static TRIPLET_RAW: Syntax = &[param(0, 0, ParamKind::Byte, "Contents", true)];

static TRIPLET_KINDS: &[TripletKind] = &[
    TripletKind {
        id: 0x01,
        name: "Coded Graphic Character Set Global Identifier",
        syntax: &[
            param(0, 2, ParamKind::Code, "GCSGID", true),
            param(2, 2, ParamKind::Code, "ID", true),
        ],
    },
    TripletKind {
        id: 0x02,
        name: "Fully Qualified Name",
        syntax: &[
            param(0, 1, ParamKind::Code, "FQNType", true),
            param(1, 1, ParamKind::Code, "FQNFmt", true),
            param(2, 0, ParamKind::Char, "FQName", true),
        ],
    },
    TripletKind {
        id: 0x18,
        name: "MO:DCA Interchange Set",
        syntax: &[
            param(0, 1, ParamKind::Code, "IStype", true),
            param(1, 2, ParamKind::Code, "ISid", true),
        ],
    },
    TripletKind {
        id: 0x21,
        name: "Resource Object Type",
        syntax: &[
            param(0, 1, ParamKind::Code, "ObjType", true),
            param(1, 7, ParamKind::Code, "ConData", true),
        ],
    },
    TripletKind {
        id: 0x24,
        name: "Resource Local Identifier",
        syntax: &[
            param(0, 1, ParamKind::Code, "ResType", true),
            param(1, 1, ParamKind::Code, "ResLID", true),
        ],
    },
    TripletKind {
        id: 0x25,
        name: "Resource Section Number",
        syntax: &[param(0, 1, ParamKind::Code, "ResSNum", true)],
    },
    TripletKind {
        id: 0x26,
        name: "Character Rotation",
        syntax: &[param(0, 2, ParamKind::Code, "CharRot", true)],
    },
    TripletKind {
        id: 0x2D,
        name: "Object Byte Offset",
        syntax: &[
            param(0, 4, ParamKind::UBin, "DirByOff", true),
            param(4, 4, ParamKind::UBin, "DirByHi", false),
        ],
    },
    TripletKind {
        id: 0x36,
        name: "Attribute Value",
        syntax: &[
            param(0, 2, ParamKind::Byte, "Reserved", true),
            param(2, 0, ParamKind::Char, "AttVal", false),
        ],
    },
    TripletKind {
        id: 0x56,
        name: "Medium Map Page Number",
        syntax: &[param(0, 4, ParamKind::UBin, "PageNum", true)],
    },
    TripletKind {
        id: 0x57,
        name: "Object Byte Extent",
        syntax: &[
            param(0, 4, ParamKind::UBin, "ByteExt", true),
            param(4, 4, ParamKind::UBin, "BytExtHi", true),
        ],
    },
    TripletKind {
        id: 0x58,
        name: "Object Structured Field Offset",
        syntax: &[
            param(0, 4, ParamKind::UBin, "SFOff", true),
            param(4, 4, ParamKind::UBin, "SFOffHi", false),
        ],
    },
    TripletKind {
        id: 0x59,
        name: "Object Structured Field Extent",
        syntax: &[
            param(0, 4, ParamKind::UBin, "SFExt", true),
            param(4, 4, ParamKind::UBin, "SFExtHi", false),
        ],
    },
    TripletKind {
        id: 0x62,
        name: "Local Date and Time Stamp",
        syntax: &[
            param(0, 1, ParamKind::Code, "StampType", true),
            param(1, 1, ParamKind::Code, "THunYear", true),
            param(2, 2, ParamKind::Code, "TenYear", true),
            param(4, 3, ParamKind::Code, "Day", true),
            param(7, 2, ParamKind::Code, "Hour", true),
            param(9, 2, ParamKind::Code, "Minute", true),
            param(11, 2, ParamKind::Code, "Second", true),
            param(13, 2, ParamKind::Code, "HundSec", true),
        ],
    },
    TripletKind {
        id: 0x68,
        name: "Medium Orientation",
        syntax: &[param(0, 1, ParamKind::Code, "MedOrient", true)],
    },
    TripletKind {
        id: 0x80,
        name: "Attribute Qualifier",
        syntax: &[
            param(0, 4, ParamKind::UBin, "SeqNum", true),
            param(4, 4, ParamKind::UBin, "LevNum", true),
        ],
    },
];

pub fn lookup(id: u8) -> Option<&'static TripletKind> {
    TRIPLET_KINDS.iter().find(|k| k.id == id)
}

// ── Records ───────────────────────────────────────────────────────────────────

/// One decoded triplet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Triplet {
    /// Declared length, covering the length and identifier bytes.
    pub length: u8,
    pub id: u8,
    pub kind: Option<&'static TripletKind>,
    pub params: Params,
}

impl Triplet {
    pub fn name(&self) -> &'static str {
        self.kind.map_or("Unknown", |k| k.name)
    }
}

impl fmt::Display for Triplet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02X} {}", self.id, self.name())
    }
}

// ── Decoding ──────────────────────────────────────────────────────────────────

/// Decode a triplet list running to the end of `data`.
///
/// A triplet whose declared length overruns the list is fatal under
/// `strict`; otherwise the remaining bytes decode as a raw triplet, a
/// warning is recorded and the list ends there.  A declared length below
/// the two covered bytes is always fatal, as no further framing can be
/// recovered from it.
pub(crate) fn decode_triplets(
    data: &[u8],
    policy: &Policy,
    warnings: &mut Vec<Warning>,
) -> Result<Vec<Triplet>, ParseErrorKind> {
    let mut cur = Cursor::new(data);
    let mut out = Vec::new();
    let mut index = 0usize;

    while !cur.is_empty() {
        let length = cur.take_u8("triplet length")?;
        if length < 2 {
            return Err(ParseErrorKind::BadTripletLength { index, length });
        }
        let declared = usize::from(length);

        if declared - 1 > cur.remaining() {
            let kind = ParseErrorKind::IncompleteParameter(format!(
                "triplet {index} declares {declared} bytes but {} remain",
                cur.remaining() + 1
            ));
            if policy.strict {
                return Err(kind);
            }
            push_warning(warnings, &kind);
            if cur.is_empty() {
                break;
            }
            let id = cur.take_u8("triplet identifier")?;
            let value = cur.rest();
            let (params, _) = decode_syntax(value, TRIPLET_RAW, policy)?;
            out.push(Triplet {
                length,
                id,
                kind: lookup(id),
                params,
            });
            break;
        }

        let id = cur.take_u8("triplet identifier")?;
        let value = cur.take(declared - 2, "triplet contents")?;
        let kind = lookup(id);
        let syntax = match kind {
            Some(k) => k.syntax,
            None => {
                let err = ParseErrorKind::UnknownTriplet(id);
                if !policy.allow_unknown_triplets {
                    return Err(err);
                }
                push_warning(warnings, &err);
                TRIPLET_RAW
            }
        };
        let (params, _) = decode_syntax(value, syntax, policy)?;
        out.push(Triplet {
            length,
            id,
            kind,
            params,
        });
        index += 1;
    }

    Ok(out)
}
