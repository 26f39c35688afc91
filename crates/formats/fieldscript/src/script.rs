use crate::cursor::{Cursor, Writer};
use crate::error::{Error, Result};

const MAGIC: [u8; 4] = *b"FSCR";

/// One compiled script: its code bytes and the entry offsets into them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    pub name: String,
    /// Entry offsets in table order. Index `i` is entry point `i`.
    pub entries: Vec<u32>,
    pub code: Vec<u8>,
}

impl Script {
    /// Wrap bare code bytes. An empty entry list means a single entry at 0.
    pub fn from_raw(name: impl Into<String>, code: Vec<u8>, entries: Vec<u32>) -> Self {
        let entries = if entries.is_empty() { vec![0] } else { entries };
        Self {
            name: name.into(),
            entries,
            code,
        }
    }

    /// Parse an `FSCR` container: magic, u16 entry count, u16 entry offsets,
    /// then code bytes to the end of the buffer.
    pub fn parse(name: impl Into<String>, data: &[u8]) -> Result<Self> {
        let mut cur = Cursor::new(data);
        let magic = cur.read_magic()?;
        if magic != MAGIC {
            return Err(Error::InvalidMagic {
                expected: MAGIC,
                found: magic,
            });
        }

        let count = cur.read_u16()? as usize;
        let mut entries = Vec::with_capacity(count);
        for _ in 0..count {
            entries.push(cur.read_u16()? as u32);
        }

        let code = cur.read_bytes(cur.remaining())?.to_vec();
        for &entry in &entries {
            if entry as usize > code.len() {
                return Err(Error::Parse {
                    context: "script header",
                    message: format!("entry {entry:#06x} is past the end of code ({:#x} bytes)", code.len()),
                });
            }
        }

        Ok(Self::from_raw(name, code, entries))
    }

    /// Whether `data` starts with the container magic.
    pub fn is_container(data: &[u8]) -> bool {
        data.starts_with(&MAGIC)
    }

    /// Serialize back into an `FSCR` container. Entry counts and offsets are
    /// stored as `u16`; larger values are rejected rather than truncated.
    pub fn to_container(&self) -> Result<Vec<u8>> {
        let mut w = Writer::new();
        w.write_magic(&MAGIC);
        w.write_u16(header_u16(self.entries.len(), "entry count")?);
        for &entry in &self.entries {
            w.write_u16(header_u16(entry as usize, "entry offset")?);
        }
        w.write_bytes(&self.code);
        Ok(w.into_bytes())
    }
}

fn header_u16(value: usize, what: &str) -> Result<u16> {
    u16::try_from(value).map_err(|_| Error::Parse {
        context: "script header",
        message: format!("{what} {value:#x} does not fit in 16 bits"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_defaults_to_entry_zero() {
        let script = Script::from_raw("s", vec![0x00], vec![]);
        assert_eq!(script.entries, vec![0]);
    }

    #[test]
    fn container_round_trip() {
        let script = Script::from_raw("s", vec![0x00, 0x00], vec![0, 1]);
        let bytes = script.to_container().unwrap();
        assert!(Script::is_container(&bytes));
        assert_eq!(Script::parse("s", &bytes).unwrap(), script);
    }

    #[test]
    fn bad_magic() {
        let err = Script::parse("s", b"NOPE\x00\x00").unwrap_err();
        assert!(matches!(err, Error::InvalidMagic { .. }));
    }

    #[test]
    fn entry_past_end() {
        let mut data = b"FSCR".to_vec();
        data.extend_from_slice(&[1, 0, 9, 0, 0x00]);
        let err = Script::parse("s", &data).unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn oversized_entry_is_rejected() {
        let script = Script::from_raw("s", vec![0x00], vec![0x1_0000]);
        let err = script.to_container().unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
        assert!(err.to_string().contains("entry offset"), "{err}");
    }
}
