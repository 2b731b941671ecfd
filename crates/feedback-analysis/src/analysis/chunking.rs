//! Splitting a dataset into contiguous chunks for progress reporting.

use std::ops::Range;

/// Contiguous, non-overlapping row ranges covering every row exactly once.
///
/// `min(max_chunks, rows)` chunks are produced. Sizes differ by at most one;
/// the first `rows % chunks` chunks take the extra row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkPlan {
    ranges: Vec<Range<usize>>,
}

impl ChunkPlan {
    pub fn new(rows: usize, max_chunks: usize) -> Self {
        let count = max_chunks.max(1).min(rows);
        if count == 0 {
            return Self { ranges: Vec::new() };
        }

        let base = rows / count;
        let extra = rows % count;
        let mut ranges = Vec::with_capacity(count);
        let mut start = 0;
        for i in 0..count {
            let len = base + usize::from(i < extra);
            ranges.push(start..start + len);
            start += len;
        }
        Self { ranges }
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn ranges(&self) -> &[Range<usize>] {
        &self.ranges
    }

    pub fn sizes(&self) -> Vec<usize> {
        self.ranges.iter().map(|r| r.len()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uneven_split_front_loads_remainder() {
        let plan = ChunkPlan::new(10, 3);
        assert_eq!(plan.sizes(), vec![4, 3, 3]);
        assert_eq!(plan.ranges()[1], 4..7);
    }

    #[test]
    fn test_fewer_rows_than_chunks() {
        let plan = ChunkPlan::new(3, 10);
        assert_eq!(plan.sizes(), vec![1, 1, 1]);
    }

    #[test]
    fn test_remainder_rows_are_covered() {
        let plan = ChunkPlan::new(25, 10);
        assert_eq!(plan.len(), 10);
        assert_eq!(plan.sizes().iter().sum::<usize>(), 25);
        assert_eq!(plan.ranges().last().unwrap().end, 25);
    }

    #[test]
    fn test_empty_dataset() {
        assert!(ChunkPlan::new(0, 10).is_empty());
    }

    #[test]
    fn test_zero_max_chunks_means_one() {
        assert_eq!(ChunkPlan::new(5, 0).sizes(), vec![5]);
    }
}
