//! Chunked, bounded-concurrency reads over many pools.

use crate::error::BatchError;
use dualstake_protocols::DualStakeError;
use futures::stream::{self, StreamExt};
use std::collections::BTreeMap;
use std::future::Future;
use tracing::{debug, warn};

/// Splits `ids` into consecutive chunks of at most `size` identifiers.
///
/// A zero `size` is treated as one.
#[must_use]
pub fn chunk_ids(ids: &[u64], size: usize) -> Vec<Vec<u64>> {
    ids.chunks(size.max(1)).map(<[u64]>::to_vec).collect()
}

/// Merges `rows` into `merged`; an existing key keeps its first value.
pub fn merge_into<T>(merged: &mut BTreeMap<u64, T>, rows: Vec<(u64, T)>) {
    for (id, row) in rows {
        if merged.contains_key(&id) {
            warn!(id, "Duplicate id across chunks, keeping first");
            continue;
        }
        merged.insert(id, row);
    }
}

/// Issues one read per chunk with a fixed number in flight.
#[derive(Debug, Clone, Copy)]
pub struct BatchCoordinator {
    concurrency: usize,
}

impl BatchCoordinator {
    /// Creates a coordinator; a zero `concurrency` is treated as one.
    #[must_use]
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
        }
    }

    /// Runs `fetch` once per chunk of `ids` and merges the rows by id.
    ///
    /// Chunks may complete in any order; the result is the same. Ids a chunk
    /// returned no row for are absent.
    ///
    /// # Errors
    /// The first failing chunk, with its index and identifiers.
    pub async fn run<T, F, Fut>(
        &self,
        ids: &[u64],
        chunk_size: usize,
        fetch: F,
    ) -> Result<BTreeMap<u64, T>, BatchError>
    where
        F: Fn(Vec<u64>) -> Fut,
        Fut: Future<Output = Result<Vec<(u64, T)>, DualStakeError>>,
    {
        let chunks = chunk_ids(ids, chunk_size);
        debug!(
            ids = ids.len(),
            chunks = chunks.len(),
            concurrency = self.concurrency,
            "Starting batch"
        );

        let mut pending = stream::iter(chunks.into_iter().enumerate())
            .map(|(index, chunk)| {
                let request = fetch(chunk.clone());
                async move { (index, chunk, request.await) }
            })
            .buffer_unordered(self.concurrency);

        let mut merged = BTreeMap::new();
        while let Some((index, chunk, outcome)) = pending.next().await {
            match outcome {
                Ok(rows) => {
                    debug!(chunk = index, rows = rows.len(), "Chunk complete");
                    merge_into(&mut merged, rows);
                }
                Err(source) => {
                    return Err(BatchError {
                        index,
                        ids: chunk,
                        source,
                    });
                }
            }
        }
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dualstake_protocols::TransportError;
    use proptest::prelude::*;
    use std::sync::Mutex;

    #[test]
    fn test_chunk_boundaries() {
        let ids: Vec<u64> = (0..70).collect();
        let sizes: Vec<usize> = chunk_ids(&ids, 32).iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![32, 32, 6]);
        assert!(chunk_ids(&[], 32).is_empty());
        assert_eq!(chunk_ids(&[1, 2], 0), vec![vec![1], vec![2]]);
    }

    #[test]
    fn test_merge_keeps_first_value() {
        let mut merged = BTreeMap::new();
        merge_into(&mut merged, vec![(1, "a"), (2, "b")]);
        merge_into(&mut merged, vec![(2, "late"), (3, "c")]);
        assert_eq!(merged.get(&2), Some(&"b"));
        assert_eq!(merged.len(), 3);
    }

    #[tokio::test]
    async fn test_run_merges_every_chunk() {
        let seen = Mutex::new(Vec::new());
        let ids: Vec<u64> = (0..70).collect();
        let merged = BatchCoordinator::new(4)
            .run(&ids, 32, |chunk| {
                seen.lock().unwrap().push(chunk.len());
                async move {
                    Ok::<_, DualStakeError>(chunk.into_iter().map(|id| (id, id * 10)).collect())
                }
            })
            .await
            .unwrap();
        assert_eq!(merged.len(), 70);
        assert_eq!(merged.get(&69), Some(&690));
        let mut sizes = seen.into_inner().unwrap();
        sizes.sort_unstable();
        assert_eq!(sizes, vec![6, 32, 32]);
    }

    #[tokio::test]
    async fn test_failed_chunk_reports_its_boundaries() {
        let ids: Vec<u64> = (0..10).collect();
        let err = BatchCoordinator::new(1)
            .run(&ids, 4, |chunk| async move {
                if chunk.contains(&5) {
                    Err(DualStakeError::from(TransportError::Simulation(
                        "budget exceeded".to_string(),
                    )))
                } else {
                    Ok(chunk.into_iter().map(|id| (id, ())).collect())
                }
            })
            .await
            .unwrap_err();
        assert_eq!(err.index, 1);
        assert_eq!(err.ids, vec![4, 5, 6, 7]);
    }

    #[tokio::test]
    async fn test_partial_chunks_leave_ids_absent() {
        let ids: Vec<u64> = (0..6).collect();
        let merged = BatchCoordinator::new(2)
            .run(&ids, 3, |chunk| async move {
                // Each simulated read drops its last row.
                let kept = chunk.len() - 1;
                Ok::<_, DualStakeError>(chunk.into_iter().take(kept).map(|id| (id, id)).collect())
            })
            .await
            .unwrap();
        assert_eq!(merged.keys().copied().collect::<Vec<_>>(), vec![0, 1, 3, 4]);
    }

    proptest! {
        #[test]
        fn prop_merge_is_order_independent(
            ids in proptest::collection::btree_set(any::<u64>(), 0..100),
            size in 1usize..40,
            rotate in any::<usize>(),
        ) {
            let ids: Vec<u64> = ids.into_iter().collect();
            let parts: Vec<Vec<(u64, u64)>> = chunk_ids(&ids, size)
                .into_iter()
                .map(|chunk| chunk.into_iter().map(|id| (id, id ^ 7)).collect())
                .collect();

            let mut forward = BTreeMap::new();
            for part in parts.clone() {
                merge_into(&mut forward, part);
            }
            let mut rotated_parts = parts;
            if !rotated_parts.is_empty() {
                let by = rotate % rotated_parts.len();
                rotated_parts.rotate_left(by);
            }
            let mut rotated = BTreeMap::new();
            for part in rotated_parts {
                merge_into(&mut rotated, part);
            }

            prop_assert_eq!(&forward, &rotated);
            prop_assert_eq!(forward.keys().copied().collect::<Vec<_>>(), ids);
        }
    }
}
