//! Fixed-size write batches

use crate::{ArchiveError, ArchiveResult};

/// Records per backfill write request
pub const BACKFILL_BATCH_SIZE: usize = 10_000;

/// One slice of a larger write
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Batch<'a, T> {
    /// 1-based position
    pub number: usize,
    pub total: usize,
    pub items: &'a [T],
}

/// Iterator over consecutive batches of at most `size` items
pub struct Batches<'a, T> {
    chunks: std::slice::Chunks<'a, T>,
    total: usize,
    next: usize,
}

impl<'a, T> Iterator for Batches<'a, T> {
    type Item = Batch<'a, T>;

    fn next(&mut self) -> Option<Self::Item> {
        let items = self.chunks.next()?;
        self.next += 1;
        Some(Batch {
            number: self.next,
            total: self.total,
            items,
        })
    }
}

/// Split `items` into batches; no batch is empty
pub fn split_batches<T>(items: &[T], size: usize) -> ArchiveResult<Batches<'_, T>> {
    if size == 0 {
        return Err(ArchiveError::InvalidBatchSize(size));
    }
    Ok(Batches {
        chunks: items.chunks(size),
        total: items.len().div_ceil(size),
        next: 0,
    })
}
