//! Structured field registry and the decoded field record.
//!
//! A structured field identifier is three bytes: the MO:DCA class code
//! `0xD3`, a type code and a category code.  The registry covers the
//! document-level fields; anything else decodes as a raw `Data` parameter
//! when [`Policy::allow_unknown_fields`] is set and is fatal otherwise.

use serde::Serialize;
use std::fmt;

use crate::syntax::{length_param, param, ParamKind, Params, Role, Syntax, SyntaxItem};

/// Class code occupying the top byte of every MO:DCA identifier.
pub const MODCA_CLASS_CODE: u8 = 0xD3;

/// Name of the triplet-list parameter many fields end with.
pub const PNAME_TRIPLETS: &str = "Triplets";

// ── Identifiers ───────────────────────────────────────────────────────────────

pub const SF_BAG: u32 = 0xD3A8C9;
pub const SF_BDG: u32 = 0xD3A8C4;
pub const SF_BDI: u32 = 0xD3A8A7;
pub const SF_BDT: u32 = 0xD3A8A8;
pub const SF_BFG: u32 = 0xD3A8C5;
pub const SF_BFM: u32 = 0xD3A8CD;
pub const SF_BMM: u32 = 0xD3A8CC;
pub const SF_BNG: u32 = 0xD3A8AD;
pub const SF_BPG: u32 = 0xD3A8AF;
pub const SF_BPT: u32 = 0xD3A89B;
pub const SF_BRG: u32 = 0xD3A8C6;
pub const SF_BRS: u32 = 0xD3A8CE;
pub const SF_CTC: u32 = 0xD3A79B;
pub const SF_EAG: u32 = 0xD3A9C9;
pub const SF_EDG: u32 = 0xD3A9C4;
pub const SF_EDI: u32 = 0xD3A9A7;
pub const SF_EDT: u32 = 0xD3A9A8;
pub const SF_EFG: u32 = 0xD3A9C5;
pub const SF_EFM: u32 = 0xD3A9CD;
pub const SF_EMM: u32 = 0xD3A9CC;
pub const SF_ENG: u32 = 0xD3A9AD;
pub const SF_EPG: u32 = 0xD3A9AF;
pub const SF_EPT: u32 = 0xD3A99B;
pub const SF_ERG: u32 = 0xD3A9C6;
pub const SF_ERS: u32 = 0xD3A9CE;
pub const SF_IEL: u32 = 0xD3B2A7;
pub const SF_IPO: u32 = 0xD3AFD8;
pub const SF_IPS: u32 = 0xD3AF5F;
pub const SF_MCC: u32 = 0xD3A288;
pub const SF_MCF: u32 = 0xD3AB8A;
pub const SF_MCF_1: u32 = 0xD3B18A;
pub const SF_MDD: u32 = 0xD3A688;
pub const SF_MMC: u32 = 0xD3A788;
pub const SF_MPO: u32 = 0xD3ABD8;
pub const SF_NOP: u32 = 0xD3EEEE;
pub const SF_PGD: u32 = 0xD3A6AF;
pub const SF_PGP_1: u32 = 0xD3ACAF;
pub const SF_PTD: u32 = 0xD3B19B;
pub const SF_PTD_1: u32 = 0xD3A69B;
pub const SF_PTX: u32 = 0xD3EE9B;
pub const SF_TLE: u32 = 0xD3A090;

// ── Registry ──────────────────────────────────────────────────────────────────

#[derive(Debug, PartialEq, Serialize)]
pub struct FieldKind {
    pub id: u32,
    pub abbreviation: &'static str,
    pub name: &'static str,
    #[serde(skip)]
    pub syntax: Syntax,
}

/// Syntax applied to fields the registry does not know.
pub(crate) static FIELD_RAW: Syntax = &[param(0, 0, ParamKind::Byte, "Data", false)];

// Begin/End pairs share shapes: an eight-character name, usually optional,
// sometimes followed by a triplet list.
static FIELD_KINDS: &[FieldKind] = &[
    FieldKind {
        id: SF_BAG,
        abbreviation: "BAG",
        name: "Begin Active Environment Group",
        syntax: &[
            param(0, 8, ParamKind::Char, "AEGName", false),
            param(8, 0, ParamKind::Triplets, PNAME_TRIPLETS, false),
        ],
    },
    FieldKind {
        id: SF_BDG,
        abbreviation: "BDG",
        name: "Begin Document Environment Group",
        syntax: &[
            param(0, 8, ParamKind::Char, "DEGName", false),
            param(8, 0, ParamKind::Triplets, PNAME_TRIPLETS, false),
        ],
    },
    FieldKind {
        id: SF_BDI,
        abbreviation: "BDI",
        name: "Begin Document Index",
        syntax: &[
            param(0, 8, ParamKind::Char, "IndxName", false),
            param(8, 0, ParamKind::Triplets, PNAME_TRIPLETS, false),
        ],
    },
    FieldKind {
        id: SF_BDT,
        abbreviation: "BDT",
        name: "Begin Document",
        syntax: &[
            param(0, 8, ParamKind::Char, "DocName", true),
            param(8, 2, ParamKind::Byte, "Reserved", true),
            param(10, 0, ParamKind::Triplets, PNAME_TRIPLETS, true),
        ],
    },
    FieldKind {
        id: SF_BFG,
        abbreviation: "BFG",
        name: "Begin Form Environment Group",
        syntax: &[param(0, 8, ParamKind::Char, "FEGName", false)],
    },
    FieldKind {
        id: SF_BFM,
        abbreviation: "BFM",
        name: "Begin Form Map",
        syntax: &[
            param(0, 8, ParamKind::Char, "FMName", false),
            param(8, 0, ParamKind::Triplets, PNAME_TRIPLETS, false),
        ],
    },
    FieldKind {
        id: SF_BMM,
        abbreviation: "BMM",
        name: "Begin Medium Map",
        syntax: &[
            param(0, 8, ParamKind::Char, "MMName", true),
            param(8, 0, ParamKind::Triplets, PNAME_TRIPLETS, false),
        ],
    },
    FieldKind {
        id: SF_BNG,
        abbreviation: "BNG",
        name: "Begin Named Page Group",
        syntax: &[
            param(0, 8, ParamKind::Char, "PGrpName", true),
            param(8, 0, ParamKind::Triplets, PNAME_TRIPLETS, false),
        ],
    },
    FieldKind {
        id: SF_BPG,
        abbreviation: "BPG",
        name: "Begin Page",
        syntax: &[
            param(0, 8, ParamKind::Char, "PageName", false),
            param(8, 0, ParamKind::Triplets, PNAME_TRIPLETS, false),
        ],
    },
    FieldKind {
        id: SF_BPT,
        abbreviation: "BPT",
        name: "Begin Presentation Text Object",
        syntax: &[
            param(0, 8, ParamKind::Char, "PTdoName", false),
            param(8, 0, ParamKind::Triplets, PNAME_TRIPLETS, false),
        ],
    },
    FieldKind {
        id: SF_BRG,
        abbreviation: "BRG",
        name: "Begin Resource Group",
        syntax: &[
            param(0, 8, ParamKind::Char, "RGrpName", false),
            param(8, 0, ParamKind::Triplets, PNAME_TRIPLETS, false),
        ],
    },
    FieldKind {
        id: SF_BRS,
        abbreviation: "BRS",
        name: "Begin Resource",
        syntax: &[
            param(0, 8, ParamKind::Char, "RSName", true),
            param(8, 2, ParamKind::Byte, "Reserved", true),
            param(10, 0, ParamKind::Triplets, PNAME_TRIPLETS, true),
        ],
    },
    FieldKind {
        id: SF_CTC,
        abbreviation: "CTC",
        name: "Composed Text Control",
        syntax: &[param(0, 10, ParamKind::Byte, "ConData", true)],
    },
    FieldKind {
        id: SF_EAG,
        abbreviation: "EAG",
        name: "End Active Environment Group",
        syntax: &[param(0, 8, ParamKind::Char, "AEGName", false)],
    },
    FieldKind {
        id: SF_EDG,
        abbreviation: "EDG",
        name: "End Document Environment Group",
        syntax: &[param(0, 8, ParamKind::Char, "DEGName", false)],
    },
    FieldKind {
        id: SF_EDI,
        abbreviation: "EDI",
        name: "End Document Index",
        syntax: &[
            param(0, 8, ParamKind::Char, "IndxName", false),
            param(8, 0, ParamKind::Triplets, PNAME_TRIPLETS, false),
        ],
    },
    FieldKind {
        id: SF_EDT,
        abbreviation: "EDT",
        name: "End Document",
        syntax: &[
            param(0, 8, ParamKind::Char, "DocName", false),
            param(8, 0, ParamKind::Triplets, PNAME_TRIPLETS, false),
        ],
    },
    FieldKind {
        id: SF_EFG,
        abbreviation: "EFG",
        name: "End Form Environment Group",
        syntax: &[param(0, 8, ParamKind::Char, "FEGName", false)],
    },
    FieldKind {
        id: SF_EFM,
        abbreviation: "EFM",
        name: "End Form Map",
        syntax: &[param(0, 8, ParamKind::Char, "FMName", false)],
    },
    FieldKind {
        id: SF_EMM,
        abbreviation: "EMM",
        name: "End Medium Map",
        syntax: &[param(0, 8, ParamKind::Char, "MMName", false)],
    },
    FieldKind {
        id: SF_ENG,
        abbreviation: "ENG",
        name: "End Named Page Group",
        syntax: &[
            param(0, 8, ParamKind::Char, "PGrpName", false),
            param(8, 0, ParamKind::Triplets, PNAME_TRIPLETS, false),
        ],
    },
    FieldKind {
        id: SF_EPG,
        abbreviation: "EPG",
        name: "End Page",
        syntax: &[
            param(0, 8, ParamKind::Char, "PageName", false),
            param(8, 0, ParamKind::Triplets, PNAME_TRIPLETS, false),
        ],
    },
    FieldKind {
        id: SF_EPT,
        abbreviation: "EPT",
        name: "End Presentation Text Object",
        syntax: &[
            param(0, 8, ParamKind::Char, "PTdoName", false),
            param(8, 0, ParamKind::Triplets, PNAME_TRIPLETS, false),
        ],
    },
    FieldKind {
        id: SF_ERG,
        abbreviation: "ERG",
        name: "End Resource Group",
        syntax: &[
            param(0, 8, ParamKind::Char, "RGrpName", false),
            param(8, 0, ParamKind::Triplets, PNAME_TRIPLETS, false),
        ],
    },
    FieldKind {
        id: SF_ERS,
        abbreviation: "ERS",
        name: "End Resource",
        syntax: &[param(0, 8, ParamKind::Char, "RSName", false)],
    },
    FieldKind {
        id: SF_IEL,
        abbreviation: "IEL",
        name: "Index Element",
        syntax: &[param(0, 0, ParamKind::Triplets, PNAME_TRIPLETS, true)],
    },
    FieldKind {
        id: SF_IPO,
        abbreviation: "IPO",
        name: "Include Page Overlay",
        syntax: &[
            param(0, 8, ParamKind::Char, "OvlyName", true),
            param(8, 3, ParamKind::SBin, "XolOset", true),
            param(11, 3, ParamKind::SBin, "YolOset", true),
            param(14, 2, ParamKind::Code, "OvlyOrent", false),
            param(16, 0, ParamKind::Triplets, PNAME_TRIPLETS, false),
        ],
    },
    FieldKind {
        id: SF_IPS,
        abbreviation: "IPS",
        name: "Include Page Segment",
        syntax: &[
            param(0, 8, ParamKind::Char, "PsegName", true),
            param(8, 3, ParamKind::SBin, "XpsOset", true),
            param(11, 3, ParamKind::SBin, "YpsOset", true),
            param(14, 0, ParamKind::Triplets, PNAME_TRIPLETS, false),
        ],
    },
    FieldKind {
        id: SF_MCC,
        abbreviation: "MCC",
        name: "Medium Copy Count",
        syntax: &[SyntaxItem::Group(&[
            param(0, 2, ParamKind::UBin, "Startnum", true),
            param(2, 2, ParamKind::UBin, "Stopnum", true),
            param(4, 1, ParamKind::Byte, "Reserved", true),
            param(5, 1, ParamKind::Code, "MMCid", true),
        ])],
    },
    FieldKind {
        id: SF_MCF,
        abbreviation: "MCF",
        name: "Map Coded Font Format 2",
        syntax: &[SyntaxItem::Group(&[
            length_param(0, 2, "RGLength", Role::ThisGroupLength),
            param(2, 0, ParamKind::Triplets, PNAME_TRIPLETS, true),
        ])],
    },
    FieldKind {
        id: SF_MCF_1,
        abbreviation: "MCF-1",
        name: "Map Coded Font Format 1",
        syntax: &[
            length_param(0, 1, "RGLength", Role::NextGroupLength),
            param(1, 3, ParamKind::Byte, "Reserved", true),
            SyntaxItem::Group(&[
                param(0, 1, ParamKind::UBin, "CFLid", true),
                param(1, 1, ParamKind::Byte, "Reserved", true),
                param(2, 1, ParamKind::Code, "Sectid", true),
                param(3, 1, ParamKind::Byte, "Reserved", true),
                param(4, 8, ParamKind::Char, "CFName", true),
                param(12, 8, ParamKind::Char, "CPName", true),
                param(20, 8, ParamKind::Char, "FCSName", true),
                param(28, 2, ParamKind::Code, "CharRot", false),
            ]),
        ],
    },
    FieldKind {
        id: SF_MDD,
        abbreviation: "MDD",
        name: "Medium Descriptor",
        syntax: &[
            param(0, 1, ParamKind::Code, "XmBase", true),
            param(1, 1, ParamKind::Code, "YmBase", true),
            param(2, 2, ParamKind::UBin, "XmUnits", true),
            param(4, 2, ParamKind::UBin, "YmUnits", true),
            param(6, 3, ParamKind::UBin, "XmSize", true),
            param(9, 3, ParamKind::UBin, "YmSize", true),
            param(12, 1, ParamKind::Byte, "MDDFlgs", true),
            param(13, 0, ParamKind::Triplets, PNAME_TRIPLETS, false),
        ],
    },
    FieldKind {
        id: SF_MMC,
        abbreviation: "MMC",
        name: "Medium Modification Control",
        syntax: &[
            param(0, 1, ParamKind::Code, "MMCid", true),
            param(1, 1, ParamKind::Code, "Constant", true),
            param(2, 0, ParamKind::Byte, "Keywords", false),
        ],
    },
    FieldKind {
        id: SF_MPO,
        abbreviation: "MPO",
        name: "Map Page Overlay",
        syntax: &[SyntaxItem::Group(&[
            length_param(0, 2, "RGLength", Role::ThisGroupLength),
            param(2, 0, ParamKind::Triplets, PNAME_TRIPLETS, true),
        ])],
    },
    FieldKind {
        id: SF_NOP,
        abbreviation: "NOP",
        name: "No Operation",
        syntax: &[param(0, 0, ParamKind::Byte, "UndfData", false)],
    },
    FieldKind {
        id: SF_PGD,
        abbreviation: "PGD",
        name: "Page Descriptor",
        syntax: &[
            param(0, 1, ParamKind::Code, "XpgBase", true),
            param(1, 1, ParamKind::Code, "YpgBase", true),
            param(2, 2, ParamKind::UBin, "XpgUnits", true),
            param(4, 2, ParamKind::UBin, "YpgUnits", true),
            param(6, 3, ParamKind::UBin, "XpgSize", true),
            param(9, 3, ParamKind::UBin, "YpgSize", true),
            param(12, 3, ParamKind::Byte, "Reserved", true),
            param(15, 0, ParamKind::Triplets, PNAME_TRIPLETS, false),
        ],
    },
    FieldKind {
        id: SF_PGP_1,
        abbreviation: "PGP-1",
        name: "Page Position Format 1",
        syntax: &[
            param(0, 3, ParamKind::UBin, "XmOset", true),
            param(3, 3, ParamKind::UBin, "YmOset", true),
        ],
    },
    FieldKind {
        id: SF_PTD,
        abbreviation: "PTD",
        name: "Presentation Text Data Descriptor Format 2",
        syntax: &[
            param(0, 1, ParamKind::Code, "XPBASE", true),
            param(1, 1, ParamKind::Code, "YPBASE", true),
            param(2, 2, ParamKind::UBin, "XPUNITVL", true),
            param(4, 2, ParamKind::UBin, "YPUNITVL", true),
            param(6, 3, ParamKind::UBin, "XPEXTENT", true),
            param(9, 3, ParamKind::UBin, "YPEXTENT", true),
            param(12, 2, ParamKind::Byte, "TEXTFLAGS", false),
            param(14, 0, ParamKind::Byte, "TXTCONDS", false),
        ],
    },
    FieldKind {
        id: SF_PTD_1,
        abbreviation: "PTD-1",
        name: "Presentation Text Data Descriptor Format 1",
        syntax: &[
            param(0, 1, ParamKind::Code, "XptBase", true),
            param(1, 1, ParamKind::Code, "YptBase", true),
            param(2, 2, ParamKind::UBin, "XptUnits", true),
            param(4, 2, ParamKind::UBin, "YptUnits", true),
            param(6, 2, ParamKind::UBin, "XptSize", true),
            param(8, 2, ParamKind::UBin, "YptSize", true),
            param(10, 2, ParamKind::Byte, "Reserved", false),
        ],
    },
    FieldKind {
        id: SF_PTX,
        abbreviation: "PTX",
        name: "Presentation Text Data",
        syntax: &[param(0, 0, ParamKind::Ptoca, "PTOCAdat", false)],
    },
    FieldKind {
        id: SF_TLE,
        abbreviation: "TLE",
        name: "Tag Logical Element",
        syntax: &[param(0, 0, ParamKind::Triplets, PNAME_TRIPLETS, true)],
    },
];

pub fn lookup(id: u32) -> Option<&'static FieldKind> {
    FIELD_KINDS.iter().find(|k| k.id == id)
}

// ── Records ───────────────────────────────────────────────────────────────────

/// Flag byte of a structured field introducer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SfiFlags(pub u8);

impl SfiFlags {
    /// The introducer carries an extension.
    pub fn extension(self) -> bool {
        self.0 & 0b1000_0000 != 0
    }

    /// The payload is one segment of a larger logical field.
    pub fn segmented(self) -> bool {
        self.0 & 0b0010_0000 != 0
    }

    /// The payload ends with padding.
    pub fn padded(self) -> bool {
        self.0 & 0b0000_1000 != 0
    }
}

/// One decoded structured field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructuredField {
    /// Byte offset of the carriage control byte in the input.
    pub offset: u64,
    /// Ordinal position in the input, counted from 1.
    pub field_no: u64,
    /// Declared length, which does not cover the carriage control byte.
    pub length: u16,
    pub type_id: u32,
    pub flags: SfiFlags,
    /// Introducer extension data, without its own length byte.
    pub extension: Option<Vec<u8>>,
    pub kind: Option<&'static FieldKind>,
    pub params: Params,
}

impl StructuredField {
    pub fn abbreviation(&self) -> &'static str {
        self.kind.map_or("?", |k| k.abbreviation)
    }

    pub fn name(&self) -> &'static str {
        self.kind.map_or("Unknown", |k| k.name)
    }

    /// The field's trailing triplet list, when it has one.
    pub fn triplets(&self) -> Option<&[crate::triplets::Triplet]> {
        self.params.triplets(PNAME_TRIPLETS)
    }
}

impl fmt::Display for StructuredField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:06X} {}", self.type_id, self.abbreviation())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_ids_carry_the_class_code() {
        for kind in FIELD_KINDS {
            assert_eq!((kind.id >> 16) as u8, MODCA_CLASS_CODE, "{}", kind.name);
        }
    }

    #[test]
    fn lookup_hits_and_misses() {
        assert_eq!(lookup(SF_BDT).map(|k| k.abbreviation), Some("BDT"));
        assert_eq!(lookup(SF_PTX).map(|k| k.abbreviation), Some("PTX"));
        assert!(lookup(0xD31111).is_none());
    }

    #[test]
    fn flag_bits() {
        let flags = SfiFlags(0b1010_1000);
        assert!(flags.extension());
        assert!(flags.segmented());
        assert!(flags.padded());
        let none = SfiFlags(0);
        assert!(!none.extension());
        assert!(!none.segmented());
        assert!(!none.padded());
    }
}
