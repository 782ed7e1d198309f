use afpstream::{fields, load, stream, Policy, TextElement, Value, CARRIAGE_CONTROL};
use std::fs::File;
use std::io::Write;
use tempfile::NamedTempFile;

/// Wrap a payload in a structured field with the given type id.
fn field(type_id: u32, body: &[u8]) -> Vec<u8> {
    let length = (body.len() + 8) as u16;
    let mut out = vec![CARRIAGE_CONTROL];
    out.extend_from_slice(&length.to_be_bytes());
    out.extend_from_slice(&type_id.to_be_bytes()[1..]);
    out.push(0);
    out.extend_from_slice(&[0, 0]);
    out.extend_from_slice(body);
    out
}

#[test]
fn begin_document_with_triplets() {
    // DocName "DOC00001", two reserved bytes, one Medium Orientation triplet.
    let mut body = vec![0xC4, 0xD6, 0xC3, 0xF0, 0xF0, 0xF0, 0xF0, 0xF1];
    body.extend_from_slice(&[0x00, 0x00]);
    body.extend_from_slice(&[0x03, 0x68, 0x01]);
    let bytes = field(fields::SF_BDT, &body);

    let sf = stream(&bytes[..], Policy::default()).next().unwrap().unwrap();
    assert_eq!(sf.abbreviation(), "BDT");
    assert_eq!(sf.length, bytes.len() as u16 - 1);
    assert_eq!(sf.params.chars("DocName"), Some("DOC00001"));
    let triplets = sf.triplets().unwrap();
    assert_eq!(triplets.len(), 1);
    assert_eq!(triplets[0].name(), "Medium Orientation");
    assert_eq!(triplets[0].params.ubin("MedOrient"), Some(1));
    assert!(sf.params.warnings.is_empty());
}

#[test]
fn presentation_text_decodes_text_and_sequences() {
    // "AB" then an AMB moving the baseline to 16.
    let body = [0xC1, 0xC2, 0x2B, 0xD3, 0x04, 0xD2, 0x00, 0x10];
    let bytes = field(fields::SF_PTX, &body);

    let sf = stream(&bytes[..], Policy::default()).next().unwrap().unwrap();
    let elements = sf.params.text("PTOCAdat").unwrap();
    assert_eq!(elements.len(), 2);
    assert_eq!(elements[0], TextElement::Text(vec![0xC1, 0xC2]));
    match &elements[1] {
        TextElement::Function(cs) => {
            assert_eq!(cs.abbreviation(), "AMB");
            assert_eq!(cs.params.sbin("DSPLCMNT"), Some(16));
        }
        other => panic!("expected a control sequence, got {other:?}"),
    }
    assert_eq!(afpstream::reassemble(elements), body.to_vec());
}

#[test]
fn medium_copy_count_fixed_groups() {
    // Two copy ranges.
    let body = [
        0x00, 0x01, 0x00, 0x02, 0x00, 0xAA, // copies 1-2, modification 0xAA
        0x00, 0x03, 0x00, 0x04, 0x00, 0xBB, // copies 3-4, modification 0xBB
    ];
    let bytes = field(fields::SF_MCC, &body);

    let sf = stream(&bytes[..], Policy::default()).next().unwrap().unwrap();
    let groups = sf.params.groups("RepeatingGroup").unwrap();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].ubin("Startnum"), Some(1));
    assert_eq!(groups[0].ubin("MMCid"), Some(0xAA));
    assert_eq!(groups[1].ubin("Stopnum"), Some(4));
    assert_eq!(groups[1].ubin("MMCid"), Some(0xBB));
}

#[test]
fn map_coded_font_self_sized_groups() {
    // One group: its RGLength covers itself plus a Resource Local
    // Identifier triplet.
    let body = [0x00, 0x06, 0x04, 0x24, 0x05, 0x01];
    let bytes = field(fields::SF_MCF, &body);

    let sf = stream(&bytes[..], Policy::default()).next().unwrap().unwrap();
    let groups = sf.params.groups("RepeatingGroup").unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].ubin("RGLength"), Some(6));
    let triplets = groups[0].triplets("Triplets").unwrap();
    assert_eq!(triplets[0].id, 0x24);
    assert_eq!(triplets[0].params.ubin("ResType"), Some(0x05));
    assert_eq!(triplets[0].params.ubin("ResLID"), Some(0x01));
}

#[test]
fn map_coded_font_format_1_pre_sized_groups() {
    let mut body = vec![30, 0x00, 0x00, 0x00]; // RGLength, reserved
    let mut group = vec![0x01, 0x00, 0x00, 0x00]; // CFLid, reserved, Sectid, reserved
    group.extend_from_slice(&[0xC3, 0xC6, 0xF0, 0xF0, 0xF0, 0xF0, 0xF0, 0xF1]); // "CF000001"
    group.extend_from_slice(&[0xE3, 0xF1, 0xE5, 0xF1, 0xF0, 0xF5, 0xF0, 0xF0]); // "T1V10500"
    group.extend_from_slice(&[0xC3, 0xF0, 0xC8, 0xF2, 0xF0, 0xF0, 0xF0, 0xF0]); // "C0H20000"
    group.extend_from_slice(&[0x2D, 0x00]); // CharRot
    assert_eq!(group.len(), 30);
    body.extend_from_slice(&group);
    let bytes = field(fields::SF_MCF_1, &body);

    let sf = stream(&bytes[..], Policy::default()).next().unwrap().unwrap();
    assert_eq!(sf.params.ubin("RGLength"), Some(30));
    let groups = sf.params.groups("RepeatingGroup").unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].ubin("CFLid"), Some(1));
    assert_eq!(groups[0].chars("CFName"), Some("CF000001"));
    assert_eq!(groups[0].chars("CPName"), Some("T1V10500"));
    assert_eq!(groups[0].chars("FCSName"), Some("C0H20000"));
    assert_eq!(groups[0].ubin("CharRot"), Some(0x2D00));
}

#[test]
fn consecutive_fields_keep_offsets_and_numbers() {
    let mut bytes = field(fields::SF_BPG, &[]);
    let first_len = bytes.len() as u64;
    bytes.extend_from_slice(&field(fields::SF_EPG, &[]));

    let fields_out = load(&bytes[..], Policy::default()).unwrap();
    assert_eq!(fields_out.len(), 2);
    assert_eq!(fields_out[0].abbreviation(), "BPG");
    assert_eq!(fields_out[0].field_no, 1);
    assert_eq!(fields_out[0].offset, 0);
    assert_eq!(fields_out[1].abbreviation(), "EPG");
    assert_eq!(fields_out[1].field_no, 2);
    assert_eq!(fields_out[1].offset, first_len);
}

#[test]
fn load_matches_stream() {
    let mut bytes = field(fields::SF_BDT, &{
        let mut b = vec![0xC4, 0xD6, 0xC3, 0xF0, 0xF0, 0xF0, 0xF0, 0xF1, 0x00, 0x00];
        b.extend_from_slice(&[0x03, 0x68, 0x00]);
        b
    });
    bytes.extend_from_slice(&field(fields::SF_NOP, b"anything"));
    bytes.extend_from_slice(&field(fields::SF_EDT, &[]));

    let loaded = load(&bytes[..], Policy::default()).unwrap();
    let streamed: Vec<_> = stream(&bytes[..], Policy::default())
        .map(|r| r.unwrap())
        .collect();
    assert_eq!(loaded, streamed);
    assert_eq!(loaded.len(), 3);
}

#[test]
fn page_names_are_space_trimmed() {
    // PageName " PG1    " pads with EBCDIC spaces.
    let body = [0x40, 0xD7, 0xC7, 0xF1, 0x40, 0x40, 0x40, 0x40];
    let bytes = field(fields::SF_BPG, &body);
    let sf = stream(&bytes[..], Policy::default()).next().unwrap().unwrap();
    assert_eq!(sf.params.chars("PageName"), Some("PG1"));
}

#[test]
fn tag_logical_element_attribute() {
    // FQN triplet (attribute name "INDEX1") then an Attribute Value
    // triplet ("A").
    let mut body = vec![0x0A, 0x02, 0x0B, 0x00];
    body.extend_from_slice(&[0xC9, 0xD5, 0xC4, 0xC5, 0xE7, 0xF1]); // "INDEX1"
    body.extend_from_slice(&[0x05, 0x36, 0x00, 0x00, 0xC1]);
    let bytes = field(fields::SF_TLE, &body);

    let sf = stream(&bytes[..], Policy::default()).next().unwrap().unwrap();
    let triplets = sf.triplets().unwrap();
    assert_eq!(triplets.len(), 2);
    assert_eq!(triplets[0].params.chars("FQName"), Some("INDEX1"));
    assert_eq!(triplets[1].params.chars("AttVal"), Some("A"));
}

#[test]
fn streams_from_a_file_handle() {
    let mut tmp = NamedTempFile::new().unwrap();
    let mut bytes = field(fields::SF_BPG, &[]);
    bytes.extend_from_slice(&field(fields::SF_EPG, &[]));
    tmp.write_all(&bytes).unwrap();
    tmp.flush().unwrap();

    let file = File::open(tmp.path()).unwrap();
    let count = stream(file, Policy::default())
        .map(|r| r.unwrap())
        .count();
    assert_eq!(count, 2);
}

#[test]
fn records_serialize_to_json() {
    let bytes = field(fields::SF_NOP, &[0xDE, 0xAD]);
    let sf = stream(&bytes[..], Policy::default()).next().unwrap().unwrap();
    let v = serde_json::to_value(&sf).unwrap();
    assert_eq!(v["field_no"], 1);
    assert_eq!(v["kind"]["abbreviation"], "NOP");
    assert_eq!(v["params"]["entries"][0]["name"], "UndfData");
    assert_eq!(v["params"]["entries"][0]["value"]["Bytes"][0], 0xDE);
}

#[test]
fn duplicate_parameter_names_stay_ordered() {
    // Two FQN triplets in one TLE; both appear, in wire order.
    let mut body = vec![0x05, 0x02, 0x0B, 0x00, 0xC1];
    body.extend_from_slice(&[0x05, 0x02, 0x0B, 0x00, 0xC2]);
    let bytes = field(fields::SF_TLE, &body);

    let sf = stream(&bytes[..], Policy::default()).next().unwrap().unwrap();
    let triplets = sf.triplets().unwrap();
    assert_eq!(triplets.len(), 2);
    assert_eq!(triplets[0].params.chars("FQName"), Some("A"));
    assert_eq!(triplets[1].params.chars("FQName"), Some("B"));
}

#[test]
fn value_accessors_reject_wrong_types() {
    let bytes = field(fields::SF_NOP, &[0x01]);
    let sf = stream(&bytes[..], Policy::default()).next().unwrap().unwrap();
    assert!(matches!(
        sf.params.get("UndfData"),
        Some(Value::Bytes(b)) if b == &[0x01]
    ));
    assert_eq!(sf.params.chars("UndfData"), None);
    assert_eq!(sf.params.ubin("UndfData"), None);
}
