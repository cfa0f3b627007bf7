use std::ops::Range;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Fragments handed to one work-stealing task at a time.
pub(crate) const FRAGMENTS_PER_TASK: usize = 4;

/// Static assignment of contiguous fragment blocks to workers.
///
/// Block `k` covers fragments `offset[k]..offset[k + 1]` with `offset[k] = n * k / workers`, so
/// blocks differ in size by at most one fragment and some may be empty when there are more
/// workers than fragments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    offsets: Vec<usize>,
}

impl Partition {
    pub fn new(n_fragments: usize, workers: usize) -> Self {
        let workers = workers.max(1);
        let offsets = (0..=workers).map(|k| n_fragments * k / workers).collect();
        Self { offsets }
    }

    pub fn workers(&self) -> usize {
        self.offsets.len() - 1
    }

    pub fn n_fragments(&self) -> usize {
        self.offsets.last().copied().unwrap_or(0)
    }

    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    pub fn block(&self, k: usize) -> Range<usize> {
        self.offsets[k]..self.offsets[k + 1]
    }

    pub fn blocks(&self) -> impl Iterator<Item = Range<usize>> + '_ {
        self.offsets.windows(2).map(|w| w[0]..w[1])
    }

    /// Runs `per_fragment` for every fragment, block by block, and gathers the per-fragment
    /// outputs into one array in fragment order.
    ///
    /// Each block's slice is complete before the next block starts, so the returned array is the
    /// same regardless of how fragments were scheduled inside a block.
    pub fn gather<T, F>(&self, per_fragment: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> Vec<T> + Sync + Send,
    {
        let mut all = Vec::new();

        for block in self.blocks() {
            #[cfg(feature = "parallel")]
            let slices: Vec<Vec<T>> = block
                .into_par_iter()
                .with_max_len(FRAGMENTS_PER_TASK)
                .map(&per_fragment)
                .collect();

            #[cfg(not(feature = "parallel"))]
            let slices: Vec<Vec<T>> = block.map(&per_fragment).collect();

            all.extend(slices.into_iter().flatten());
        }

        all
    }
}
