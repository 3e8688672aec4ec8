//! Compaction and merging: rewriting segments so obsolete records stop
//! costing disk.

use tracing::debug;

use crate::store::engine::KVStore;
use crate::store::error::Result;
use crate::store::record::Tombstone;
use crate::store::segment::Segment;

const COMPACT_TMP: &str = "tmp.dat";
const COMPACT_OLD: &str = "old.dat";
const MERGE_TMP: &str = "mtemp.dat";

/// Rewrite the segment at `pos` so it holds exactly its live records, swap
/// the rebuilt file over the live name, then attempt a single merge pass.
///
/// The swap renames the original to `old.dat` before moving the rebuilt
/// file under the canonical name, so the canonical name always holds either
/// the pre-compaction or the post-compaction data, never a partial file.
pub(crate) fn compact_segment(store: &mut KVStore, pos: usize) -> Result<()> {
    let tmp_path = store.data_dir.join(COMPACT_TMP);
    let old_path = store.data_dir.join(COMPACT_OLD);

    let source = &mut store.segments[pos];
    debug!(segment = source.id, size = source.size, "compacting segment");

    let mut rebuilt = Segment::create(tmp_path, source.id)?;
    if let Err(err) = copy_live_records(source, &mut rebuilt) {
        let _ = rebuilt.delete_file();
        return Err(err);
    }

    let canonical = source.path.clone();
    if let Err(err) = source.rename(old_path) {
        let _ = rebuilt.delete_file();
        return Err(err);
    }
    if let Err(err) = rebuilt.rename(canonical.clone()) {
        let _ = rebuilt.delete_file();
        let _ = source.rename(canonical);
        return Err(err);
    }

    debug!(segment = rebuilt.id, size = rebuilt.size, "compaction finished");
    let retired = std::mem::replace(&mut store.segments[pos], rebuilt);
    retired.delete_file()?;

    merge_once(store)
}

/// Merge the first pair of segments whose combined on-disk size is under
/// the rollover ceiling, if any such pair exists. At most one pair is
/// merged per call.
pub(crate) fn merge_once(store: &mut KVStore) -> Result<()> {
    let Some((a, b)) = find_merge_pair(&store.segments, store.config.max_segment_size) else {
        return Ok(());
    };

    let (newer, older) = if store.segments[a].id > store.segments[b].id {
        (a, b)
    } else {
        (b, a)
    };
    let newer_id = store.segments[newer].id;
    let newer_path = store.segments[newer].path.clone();
    debug!(
        newer = newer_id,
        older = store.segments[older].id,
        "merging segments"
    );

    let mut merged = Segment::create(store.data_dir.join(MERGE_TMP), newer_id)?;
    // the newer segment is copied first, so on key collisions the older
    // segment's value is filtered out below
    if let Err(err) = copy_live_records(&mut store.segments[newer], &mut merged) {
        let _ = merged.delete_file();
        return Err(err);
    }
    if let Err(err) = copy_live_records(&mut store.segments[older], &mut merged) {
        let _ = merged.delete_file();
        return Err(err);
    }

    // commit: both inputs go away and the merged file takes the newer name
    let first = store.segments.remove(a.max(b));
    let second = store.segments.remove(a.min(b));
    first.delete_file()?;
    second.delete_file()?;
    merged.rename(newer_path)?;

    let at = store
        .segments
        .iter()
        .position(|s| s.id < merged.id)
        .unwrap_or(store.segments.len());
    store.segments.insert(at, merged);
    Ok(())
}

/// Copy every live pair of `source` into `target`, skipping keys `target`
/// already binds.
fn copy_live_records(source: &mut Segment, target: &mut Segment) -> Result<()> {
    for key in source.live_keys() {
        if target.index.contains(key) {
            continue;
        }
        if let Some(value) = source.read(key)? {
            target.append(key, &value, Tombstone::Insert)?;
        }
    }
    Ok(())
}

fn find_merge_pair(segments: &[Segment], max_segment_size: u32) -> Option<(usize, usize)> {
    for a in 0..segments.len() {
        for b in 0..segments.len() {
            if a == b {
                continue;
            }
            if u64::from(segments[a].size) + u64::from(segments[b].size)
                < u64::from(max_segment_size)
            {
                return Some((a, b));
            }
        }
    }
    None
}
