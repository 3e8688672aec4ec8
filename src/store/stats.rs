//! Store statistics and metrics.

use std::fmt;

/// Statistics about the key-value store.
#[derive(Debug, Clone, Default)]
pub struct StoreStats {
    /// Live index entries across all segments.
    pub num_keys: usize,
    /// Number of segment files.
    pub num_segments: usize,
    /// Total bytes used across all segments.
    pub total_bytes: u64,
    /// ID of the head (newest) segment, 0 when the store is empty.
    pub head_segment_id: u64,
    /// ID of the oldest segment, 0 when the store is empty.
    pub oldest_segment_id: u64,
}

impl fmt::Display for StoreStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Store Statistics:")?;
        writeln!(f, "  Keys: {}", self.num_keys)?;
        writeln!(f, "  Segments: {}", self.num_segments)?;
        writeln!(f, "  Total size: {} bytes", self.total_bytes)?;
        writeln!(f, "  Head segment: {}", self.head_segment_id)?;
        write!(f, "  Oldest segment: {}", self.oldest_segment_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_display() {
        let stats = StoreStats {
            num_keys: 100,
            num_segments: 3,
            total_bytes: 2048,
            head_segment_id: 4,
            oldest_segment_id: 1,
        };

        let display = format!("{}", stats);
        assert!(display.contains("Keys: 100"));
        assert!(display.contains("Segments: 3"));
        assert!(display.contains("2048 bytes"));
        assert!(display.contains("Head segment: 4"));
    }
}
