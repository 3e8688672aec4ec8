// hashkv/src/store/engine.rs
use std::fs::{self, DirBuilder};
use std::os::unix::fs::DirBuilderExt;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::store::compaction;
use crate::store::config::StoreConfig;
use crate::store::error::{Result, StoreError};
use crate::store::record::{self, Tombstone};
use crate::store::segment::Segment;
use crate::store::stats::StoreStats;

pub(crate) const SEGMENT_SUFFIX: &str = ".dat";

/// A log-structured key-value store.
///
/// The store owns an ordered list of segments, newest first. Insertions go
/// to the head segment until the next record would no longer fit; the head
/// is then compacted, one merge of two small segments is attempted, and a
/// fresh head segment takes the record. Lookups walk the list newest-first
/// so the most recent binding of a key always wins.
///
/// Not safe to share across threads, and a data directory must only ever be
/// opened by one store at a time.
#[derive(Debug)]
pub struct KVStore {
    pub(crate) data_dir: PathBuf,
    pub(crate) config: StoreConfig,
    pub(crate) segments: Vec<Segment>,
    pub(crate) next_id: u64,
}

impl KVStore {
    /// Open the store at `dir` with the default configuration. A missing
    /// directory is created together with a first empty segment.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        Self::open_with(dir, StoreConfig::default())
    }

    /// Open the store at `dir` with an explicit configuration.
    pub fn open_with<P: AsRef<Path>>(dir: P, config: StoreConfig) -> Result<Self> {
        let data_dir = dir.as_ref().to_path_buf();
        let store = if data_dir.is_dir() {
            Self::recover(data_dir, config)?
        } else {
            Self::create_fresh(data_dir, config)?
        };
        debug!(
            data_dir = %store.data_dir.display(),
            segments = store.segments.len(),
            next_id = store.next_id,
            "opened store"
        );
        Ok(store)
    }

    fn create_fresh(data_dir: PathBuf, config: StoreConfig) -> Result<Self> {
        DirBuilder::new().mode(0o755).create(&data_dir)?;
        match Segment::create(data_dir.join(format!("1{SEGMENT_SUFFIX}")), 1) {
            Ok(first) => Ok(KVStore {
                data_dir,
                config,
                segments: vec![first],
                next_id: 2,
            }),
            Err(err) => {
                let _ = fs::remove_dir_all(&data_dir);
                Err(err)
            }
        }
    }

    fn recover(data_dir: PathBuf, config: StoreConfig) -> Result<Self> {
        let mut discovered: Vec<(u64, PathBuf)> = Vec::new();
        for entry in fs::read_dir(&data_dir)? {
            let entry = entry?;
            let name = entry.file_name();
            match name.to_str().and_then(parse_segment_id) {
                Some(id) => discovered.push((id, entry.path())),
                None => {
                    debug!(entry = %entry.path().display(), "skipping non-segment entry");
                }
            }
        }

        // newest first
        discovered.sort_unstable_by(|a, b| b.0.cmp(&a.0));

        let next_id = discovered.first().map_or(1, |(id, _)| id + 1);
        let mut segments = Vec::with_capacity(discovered.len());
        for (id, path) in discovered {
            let mut segment = Segment::open(path, id)?;
            segment.repopulate()?;
            segments.push(segment);
        }

        Ok(KVStore {
            data_dir,
            config,
            segments,
            next_id,
        })
    }

    /// Insert or overwrite `key` with `value`.
    pub fn put(&mut self, key: i32, value: &[u8]) -> Result<()> {
        if value.is_empty() {
            return Err(StoreError::EmptyValue);
        }
        let record_size = record::encoded_size(value.len());
        if let Some(head) = self.segments.first_mut() {
            if record_size + u64::from(head.size) < u64::from(self.config.max_segment_size) {
                return head.append(key, value, Tombstone::Insert);
            }
            compaction::compact_segment(self, 0)?;
        }
        self.roll_new_head(key, value)
    }

    fn roll_new_head(&mut self, key: i32, value: &[u8]) -> Result<()> {
        let id = self.next_id;
        let path = self.data_dir.join(format!("{id}{SEGMENT_SUFFIX}"));
        let segment = Segment::create(path, id)?;
        self.segments.insert(0, segment);
        if let Err(err) = self.segments[0].append(key, value, Tombstone::Insert) {
            let segment = self.segments.remove(0);
            let _ = segment.delete_file();
            return Err(err);
        }
        self.next_id += 1;
        Ok(())
    }

    /// Look up `key`, newest segment first.
    pub fn get(&mut self, key: i32) -> Result<Option<Vec<u8>>> {
        for segment in &mut self.segments {
            if let Some(value) = segment.read(key)? {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    /// Delete `key` from whichever segment currently binds it; the
    /// tombstone is appended to that segment, not to the head. Returns
    /// `false` when no segment binds the key.
    pub fn delete(&mut self, key: i32) -> Result<bool> {
        for segment in &mut self.segments {
            if segment.remove_pair(key)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Close the store, releasing segments newest-first. Segment files and
    /// the data directory stay on disk.
    pub fn close(mut self) {
        self.segments.drain(..).for_each(drop);
    }

    /// Snapshot of store-level counters.
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            num_keys: self.segments.iter().map(|s| s.index.len()).sum(),
            num_segments: self.segments.len(),
            total_bytes: self.segments.iter().map(|s| u64::from(s.size)).sum(),
            head_segment_id: self.segments.first().map_or(0, |s| s.id),
            oldest_segment_id: self.segments.last().map_or(0, |s| s.id),
        }
    }
}

/// Parse `<id>.dat` with a decimal id of at least 1. The reserved
/// temporary names (`tmp.dat`, `old.dat`, `mtemp.dat`) and foreign files
/// fail the parse and are skipped during recovery.
fn parse_segment_id(name: &str) -> Option<u64> {
    let stem = name.strip_suffix(SEGMENT_SUFFIX)?;
    let id = stem.parse::<u64>().ok()?;
    (id >= 1).then_some(id)
}
