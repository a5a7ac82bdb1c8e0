//! Work distribution between rename workers.

use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};

use sanitizefs_core::Entries;

/// Split `[0, len)` into `workers` contiguous ranges.
///
/// Every range but the last holds `len / workers` indices; the last one
/// absorbs the remainder. The ranges are disjoint and cover `[0, len)`.
pub fn static_ranges(len: usize, workers: usize) -> Vec<Range<usize>> {
    let workers = workers.max(1);
    let per_worker = len / workers;

    (0..workers)
        .map(|id| {
            let start = id * per_worker;
            let end = if id == workers - 1 {
                len
            } else {
                (id + 1) * per_worker
            };
            start..end
        })
        .collect()
}

/// Entry indices grouped by depth, handed out in chunks.
///
/// Within one depth stage, workers call [`claim`](Self::claim) until it
/// returns `None`. Each bucket position is claimed by exactly one worker.
#[derive(Debug)]
pub struct DepthBuckets {
    buckets: Vec<Vec<usize>>,
    cursors: Vec<AtomicUsize>,
    chunk_size: usize,
}

impl DepthBuckets {
    /// Bucket the entries by depth, keeping discovery order inside a bucket.
    pub fn new(entries: &Entries, chunk_size: usize) -> Self {
        let mut buckets = vec![Vec::new(); entries.phase_count()];
        for (idx, entry) in entries.iter().enumerate() {
            buckets[entry.depth].push(idx);
        }
        let cursors = buckets.iter().map(|_| AtomicUsize::new(0)).collect();

        Self {
            buckets,
            cursors,
            chunk_size: chunk_size.max(1),
        }
    }

    /// Number of entries at `depth`.
    pub fn bucket_len(&self, depth: usize) -> usize {
        self.buckets.get(depth).map_or(0, Vec::len)
    }

    /// Claim the next chunk of entry indices at `depth`.
    pub fn claim(&self, depth: usize) -> Option<&[usize]> {
        let bucket = self.buckets.get(depth)?;
        let cursor = self.cursors.get(depth)?;

        // Stages are separated by the barrier, so the cursor only needs to
        // hand out disjoint positions.
        let start = cursor.fetch_add(self.chunk_size, Ordering::Relaxed);
        if start >= bucket.len() {
            return None;
        }
        let end = (start + self.chunk_size).min(bucket.len());
        Some(&bucket[start..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sanitizefs_core::{Entry, EntryKind};

    fn assert_partition(len: usize, workers: usize) {
        let ranges = static_ranges(len, workers);
        assert_eq!(ranges.len(), workers.max(1));

        let mut next = 0;
        for range in &ranges {
            assert_eq!(range.start, next);
            assert!(range.start <= range.end);
            next = range.end;
        }
        assert_eq!(next, len);
    }

    #[test]
    fn test_static_ranges_cover_exactly() {
        for len in [0, 1, 3, 7, 8, 100, 1001] {
            for workers in [1, 2, 3, 8, 16] {
                assert_partition(len, workers);
            }
        }
    }

    #[test]
    fn test_last_range_absorbs_remainder() {
        let ranges = static_ranges(10, 3);
        assert_eq!(ranges, vec![0..3, 3..6, 6..10]);
    }

    #[test]
    fn test_fewer_entries_than_workers() {
        let ranges = static_ranges(2, 4);
        assert_eq!(ranges, vec![0..0, 0..0, 0..0, 0..2]);
    }

    #[test]
    fn test_depth_buckets_claim_disjoint() {
        let entries = Entries::from(
            (0..10)
                .map(|i| Entry::new(format!("/r/{i}"), i % 3, EntryKind::File))
                .collect::<Vec<_>>(),
        );
        let buckets = DepthBuckets::new(&entries, 2);
        assert_eq!(buckets.bucket_len(0), 4);
        assert_eq!(buckets.bucket_len(1), 3);
        assert_eq!(buckets.bucket_len(2), 3);
        assert_eq!(buckets.bucket_len(3), 0);

        let mut claimed = Vec::new();
        while let Some(chunk) = buckets.claim(1) {
            claimed.extend_from_slice(chunk);
        }
        assert_eq!(claimed, vec![1, 4, 7]);
        assert!(buckets.claim(7).is_none());
    }
}
