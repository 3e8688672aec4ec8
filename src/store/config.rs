//! Store configuration options.

/// Default rollover ceiling for segment files, in bytes.
pub const DEFAULT_MAX_SEGMENT_SIZE: u32 = 1024;

/// Tunables for a [`KVStore`](crate::store::KVStore).
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Segment size ceiling. A record that would grow the head segment to
    /// this many bytes or beyond triggers a rollover instead; the same
    /// ceiling bounds which segment pairs are eligible for merging.
    pub max_segment_size: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_segment_size: DEFAULT_MAX_SEGMENT_SIZE,
        }
    }
}
