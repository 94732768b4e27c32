use std::ops::Range;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PartitionError {
    #[error("part {selected} is outside 1..={total}")]
    InvalidPartition { selected: usize, total: usize },
}

/// `selected_part` (1-based) of `total_parts` contiguous slices.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionSpec {
    pub total_parts: usize,
    pub selected_part: usize,
}

impl PartitionSpec {
    pub fn new(total_parts: usize, selected_part: usize) -> Result<Self, PartitionError> {
        let spec = Self {
            total_parts,
            selected_part,
        };
        spec.check()?;
        Ok(spec)
    }

    pub fn check(&self) -> Result<(), PartitionError> {
        if self.total_parts == 0 || !(1..=self.total_parts).contains(&self.selected_part) {
            return Err(PartitionError::InvalidPartition {
                selected: self.selected_part,
                total: self.total_parts,
            });
        }
        Ok(())
    }

    /// Index range of the selected slice in a sequence of `len` items.
    /// Every slice holds `len / total_parts` items; the first
    /// `len % total_parts` slices take one more.
    pub fn range(&self, len: usize) -> Result<Range<usize>, PartitionError> {
        self.check()?;
        let base = len / self.total_parts;
        let remainder = len % self.total_parts;
        let k = self.selected_part - 1;
        let start = k * base + k.min(remainder);
        let end = start + base + usize::from(k < remainder);
        Ok(start..end)
    }

    pub fn select<'a, T>(&self, items: &'a [T]) -> Result<&'a [T], PartitionError> {
        Ok(&items[self.range(items.len())?])
    }
}

/// Returns part `selected_part` of `total_parts` of `items`, order kept.
pub fn split_partition<T>(
    items: &[T],
    total_parts: usize,
    selected_part: usize,
) -> Result<&[T], PartitionError> {
    PartitionSpec {
        total_parts,
        selected_part,
    }
    .select(items)
}
