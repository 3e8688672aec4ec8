//! Segment files: one append-only data file plus the index describing its
//! live insertions.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, Read, Seek, SeekFrom, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::PathBuf;

use crate::store::error::{Result, StoreError};
use crate::store::index::KeyIndex;
use crate::store::record::{self, Tombstone, KEY_LEN};

/// One segment of the store. `size` tracks the logical end of file and is
/// kept within the `u32` offset range the index can address.
#[derive(Debug)]
pub(crate) struct Segment {
    pub(crate) id: u64,
    pub(crate) path: PathBuf,
    pub(crate) size: u32,
    pub(crate) index: KeyIndex,
    file: File,
}

impl Segment {
    /// Create the backing file (mode 0664, truncating any existing file)
    /// with an empty index.
    pub(crate) fn create(path: PathBuf, id: u64) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o664)
            .open(&path)?;
        Ok(Segment {
            id,
            path,
            size: 0,
            index: KeyIndex::new(),
            file,
        })
    }

    /// Open an existing segment file. The index is empty until
    /// [`Segment::repopulate`] replays the file.
    pub(crate) fn open(path: PathBuf, id: u64) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(&path)?;
        Ok(Segment {
            id,
            path,
            size: 0,
            index: KeyIndex::new(),
            file,
        })
    }

    /// Rebuild the index by replaying the file oldest-first: an insertion
    /// binds its key to the offset of the record's value-length field, a
    /// deletion unbinds it, so the last write wins. A trailing record cut
    /// short by a torn append is truncated away.
    pub(crate) fn repopulate(&mut self) -> Result<()> {
        let file_len = self.file.metadata()?.len();
        if file_len >= u64::from(u32::MAX) {
            return Err(self.malformed("segment exceeds the 4 GiB offset range"));
        }

        self.index = KeyIndex::new();
        self.file.seek(SeekFrom::Start(0))?;

        let mut reader = BufReader::new(&self.file);
        let mut pos: u64 = 0;
        let mut torn = false;

        loop {
            let mut tombstone_byte = [0u8; 1];
            match reader.read_exact(&mut tombstone_byte) {
                Ok(()) => {}
                Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => break,
                Err(err) => return Err(err.into()),
            }
            let Some(tombstone) = Tombstone::from_byte(tombstone_byte[0]) else {
                return Err(self.malformed(format!(
                    "illegal tombstone byte {:#04x} at offset {pos}",
                    tombstone_byte[0]
                )));
            };

            let Some(value_len) = read_u32(&mut reader)? else {
                torn = true;
                break;
            };
            if u64::from(value_len) > file_len {
                // declared length walks past end of file
                torn = true;
                break;
            }
            let mut value = vec![0u8; value_len as usize];
            if !read_full(&mut reader, &mut value)? {
                torn = true;
                break;
            }

            let Some(key_len) = read_u32(&mut reader)? else {
                torn = true;
                break;
            };
            if key_len != KEY_LEN {
                return Err(StoreError::BadKeyLength {
                    path: self.path.clone(),
                    found: key_len,
                });
            }
            let mut key_bytes = [0u8; 4];
            if !read_full(&mut reader, &mut key_bytes)? {
                torn = true;
                break;
            }
            let key = i32::from_ne_bytes(key_bytes);

            match tombstone {
                Tombstone::Insert => {
                    self.index.write(key, (pos + 1) as u32);
                }
                Tombstone::Delete => {
                    self.index.remove(key);
                }
            }
            pos += record::encoded_size(value_len as usize);
        }

        drop(reader);
        if torn || pos < file_len {
            self.file.set_len(pos)?;
        }
        self.size = pos as u32;
        Ok(())
    }

    /// Append one encoded record with a single write. For insertions the
    /// index is updated before the write and restored to its previous
    /// binding if the write fails.
    pub(crate) fn append(&mut self, key: i32, value: &[u8], tombstone: Tombstone) -> Result<()> {
        let buf = record::encode(key, value, tombstone);
        let end = self.file.seek(SeekFrom::End(0))?;
        if end + buf.len() as u64 >= u64::from(u32::MAX) {
            return Err(self.malformed("segment exceeds the 4 GiB offset range"));
        }

        let previous = match tombstone {
            Tombstone::Insert => self.index.write(key, (end + 1) as u32),
            Tombstone::Delete => None,
        };

        if let Err(err) = self.file.write_all(&buf) {
            if tombstone == Tombstone::Insert {
                match previous {
                    Some(offset) => {
                        self.index.write(key, offset);
                    }
                    None => {
                        self.index.remove(key);
                    }
                }
            }
            return Err(err.into());
        }

        self.size = (end + buf.len() as u64) as u32;
        Ok(())
    }

    /// Read the live value for `key`, or `None` if this segment does not
    /// bind it.
    pub(crate) fn read(&mut self, key: i32) -> Result<Option<Vec<u8>>> {
        let Some(offset) = self.index.read(key) else {
            return Ok(None);
        };
        self.file.seek(SeekFrom::Start(u64::from(offset)))?;
        let mut len_buf = [0u8; 4];
        self.file.read_exact(&mut len_buf)?;
        let mut value = vec![0u8; u32::from_ne_bytes(len_buf) as usize];
        self.file.read_exact(&mut value)?;
        Ok(Some(value))
    }

    /// Delete `key` from this segment: unbind it and append a deletion
    /// record so a replay reaches the same state. The binding is restored
    /// if the append fails. Returns `false` when the key is not bound here.
    pub(crate) fn remove_pair(&mut self, key: i32) -> Result<bool> {
        let Some(offset) = self.index.remove(key) else {
            return Ok(false);
        };
        if let Err(err) = self.append(key, &[], Tombstone::Delete) {
            self.index.write(key, offset);
            return Err(err);
        }
        Ok(true)
    }

    /// Move the backing file to `new_path`. Atomic within one filesystem.
    pub(crate) fn rename(&mut self, new_path: PathBuf) -> Result<()> {
        fs::rename(&self.path, &new_path)?;
        self.path = new_path;
        Ok(())
    }

    /// Close and unlink the backing file, consuming the segment.
    pub(crate) fn delete_file(self) -> Result<()> {
        let Segment { path, file, .. } = self;
        drop(file);
        fs::remove_file(&path)?;
        Ok(())
    }

    /// Keys of live insertions, snapshotted in index traversal order.
    pub(crate) fn live_keys(&self) -> Vec<i32> {
        self.index.live_keys()
    }

    fn malformed(&self, reason: impl Into<String>) -> StoreError {
        StoreError::MalformedSegment {
            path: self.path.clone(),
            reason: reason.into(),
        }
    }
}

/// Read a native-endian u32 field, or `None` on EOF inside the field.
fn read_u32(reader: &mut impl Read) -> Result<Option<u32>> {
    let mut buf = [0u8; 4];
    match reader.read_exact(&mut buf) {
        Ok(()) => Ok(Some(u32::from_ne_bytes(buf))),
        Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => Ok(None),
        Err(err) => Err(err.into()),
    }
}

/// Fill `buf`, or report `false` on EOF before it is full.
fn read_full(reader: &mut impl Read, buf: &mut [u8]) -> Result<bool> {
    match reader.read_exact(buf) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(err) => Err(err.into()),
    }
}
