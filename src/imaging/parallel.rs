//! Bounded fan-out of index ranges over the rayon pool.
//!
//! Every pixel operation in this crate writes a freshly allocated output
//! buffer in units of whole items (a row, a column). [`parallel`] hands each
//! worker a contiguous run of items and the matching slice of the output, so
//! workers never share mutable state and the borrow checker proves the writes
//! are disjoint.
//!
//! A panic inside a worker is a bug, not a recoverable condition: rayon
//! re-raises it on the calling thread once all workers have stopped.

use std::ops::Range;

use rayon::prelude::*;

/// Number of workers used for `n` items: the pool size, never more than `n`.
pub fn worker_count(n: usize) -> usize {
    rayon::current_num_threads().min(n).max(1)
}

/// Split `dst` into items of `item_len` bytes and process them in parallel.
///
/// `body(items, block)` is called once per worker with the index range of
/// the items it owns and the bytes of exactly those items. Blocks until all
/// workers have returned.
pub fn parallel<F>(dst: &mut [u8], item_len: usize, body: F)
where
    F: Fn(Range<usize>, &mut [u8]) + Sync + Send,
{
    if item_len == 0 || dst.is_empty() {
        return;
    }
    debug_assert_eq!(dst.len() % item_len, 0, "buffer is not a whole number of items");

    let n = dst.len() / item_len;
    let workers = worker_count(n);
    let per_worker = n.div_ceil(workers);
    tracing::trace!(items = n, workers, per_worker, "parallel fan-out");

    dst.par_chunks_mut(per_worker * item_len)
        .enumerate()
        .for_each(|(w, block)| {
            let start = w * per_worker;
            body(start..start + block.len() / item_len, block);
        });
}
