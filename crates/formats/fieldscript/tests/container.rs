use fieldscript::{Error, Script};

fn container(entries: &[u16], code: &[u8]) -> Vec<u8> {
    let mut data = b"FSCR".to_vec();
    data.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    for e in entries {
        data.extend_from_slice(&e.to_le_bytes());
    }
    data.extend_from_slice(code);
    data
}

#[test]
fn parse_entry_table_and_code() {
    let data = container(&[0, 3], &[0x08, 0x01, 0x00, 0x00]);
    let script = Script::parse("town", &data).expect("failed to parse container");
    assert_eq!(script.name, "town");
    assert_eq!(script.entries, vec![0, 3]);
    assert_eq!(script.code, vec![0x08, 0x01, 0x00, 0x00]);
}

#[test]
fn entry_at_code_end_is_allowed() {
    let data = container(&[0, 1], &[0x00]);
    let script = Script::parse("edge", &data).unwrap();
    assert_eq!(script.entries, vec![0, 1]);
}

#[test]
fn truncated_entry_table() {
    let mut data = b"FSCR".to_vec();
    data.extend_from_slice(&[2, 0, 0, 0]);
    let err = Script::parse("short", &data).unwrap_err();
    assert!(matches!(err, Error::UnexpectedEof { offset: 8, need: 2, have: 0 }));
}

#[test]
fn empty_table_falls_back_to_entry_zero() {
    let data = container(&[], &[0x00]);
    let script = Script::parse("bare", &data).unwrap();
    assert_eq!(script.entries, vec![0]);
}
