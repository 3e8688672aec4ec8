//! On-disk record encoding.
//!
//! A record is one contiguous unit:
//!
//! `tombstone(1) | value_len(u32) | value bytes | key_len(u32) | key(i32)`
//!
//! Multi-byte fields use the host's native byte order. Records are
//! self-delimiting and written back to back from offset 0; segment files
//! carry no header, trailer, or padding.

/// Fixed width of an encoded key, in bytes.
pub(crate) const KEY_LEN: u32 = 4;

/// Bytes a record occupies beyond its value: tombstone, value length,
/// key length, key.
pub(crate) const RECORD_OVERHEAD: u64 = 13;

/// One-byte marker distinguishing insertions from deletions. Any other
/// byte value in a segment file is structural corruption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Tombstone {
    Insert,
    Delete,
}

impl Tombstone {
    pub(crate) fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Tombstone::Insert),
            1 => Some(Tombstone::Delete),
            _ => None,
        }
    }

    pub(crate) fn as_byte(self) -> u8 {
        match self {
            Tombstone::Insert => 0,
            Tombstone::Delete => 1,
        }
    }
}

/// Total encoded size of a record holding `value_len` value bytes.
pub(crate) fn encoded_size(value_len: usize) -> u64 {
    RECORD_OVERHEAD + value_len as u64
}

/// Encode a record into a single buffer so it can be appended in one write.
/// Deletion records carry an empty value.
pub(crate) fn encode(key: i32, value: &[u8], tombstone: Tombstone) -> Vec<u8> {
    let mut buf = Vec::with_capacity(encoded_size(value.len()) as usize);
    buf.push(tombstone.as_byte());
    buf.extend_from_slice(&(value.len() as u32).to_ne_bytes());
    buf.extend_from_slice(value);
    buf.extend_from_slice(&KEY_LEN.to_ne_bytes());
    buf.extend_from_slice(&key.to_ne_bytes());
    buf
}
