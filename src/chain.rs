//! Bounded iteration over singly linked on-disk records.

use core::marker::PhantomData;

use crate::constants::RDB_END;
use crate::error::{AffsError, Result};

/// A record that points at its successor.
pub trait ChainLink {
    /// Block number of the next record; `0` or `-1` ends the chain.
    fn next_link(&self) -> u32;
}

/// Returns true for either chain terminator.
#[inline]
pub const fn is_chain_end(block: u32) -> bool {
    block == 0 || block == RDB_END
}

/// Iterator over a linked chain of records.
///
/// Yields `(block, record)` pairs. A link at or beyond `limit` yields
/// [`AffsError::OutOfRange`] instead of being dereferenced, and a chain longer
/// than `limit` records yields [`AffsError::ChainLoop`]. Iteration stops after
/// the first error.
pub struct ChainIter<R, F> {
    read: F,
    next: u32,
    limit: u32,
    steps: u32,
    _record: PhantomData<R>,
}

/// Walk the chain starting at `start`, reading each record with `read`.
pub fn chain_iter<R, F>(start: u32, limit: u32, read: F) -> ChainIter<R, F>
where
    R: ChainLink,
    F: FnMut(u32) -> Result<R>,
{
    ChainIter {
        read,
        next: start,
        limit,
        steps: 0,
        _record: PhantomData,
    }
}

impl<R, F> ChainIter<R, F> {
    fn fail(&mut self, err: AffsError) -> Option<Result<(u32, R)>> {
        self.next = 0;
        Some(Err(err))
    }
}

impl<R, F> Iterator for ChainIter<R, F>
where
    R: ChainLink,
    F: FnMut(u32) -> Result<R>,
{
    type Item = Result<(u32, R)>;

    fn next(&mut self) -> Option<Self::Item> {
        let block = self.next;
        if is_chain_end(block) {
            return None;
        }
        if block >= self.limit {
            log::trace!("chain link {block} beyond limit {}", self.limit);
            return self.fail(AffsError::OutOfRange);
        }
        if self.steps >= self.limit {
            return self.fail(AffsError::ChainLoop);
        }
        self.steps += 1;

        match (self.read)(block) {
            Ok(record) => {
                self.next = record.next_link();
                Some(Ok((block, record)))
            }
            Err(e) => self.fail(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    struct Link(u32);

    impl ChainLink for Link {
        fn next_link(&self) -> u32 {
            self.0
        }
    }

    fn links(table: &[u32]) -> impl FnMut(u32) -> Result<Link> + '_ {
        move |b| Ok(Link(table[b as usize]))
    }

    #[test]
    fn test_walks_until_terminator() {
        let table = [0, 2, 3, RDB_END, 0];
        let blocks: Vec<u32> = chain_iter(1, 5, links(&table))
            .map(|r| r.unwrap().0)
            .collect();
        assert_eq!(blocks, [1, 2, 3]);
    }

    #[test]
    fn test_out_of_range_link() {
        let table = [0, 9, 0];
        let mut it = chain_iter(1, 3, links(&table));
        assert_eq!(it.next().unwrap().unwrap().0, 1);
        assert_eq!(it.next().unwrap().err(), Some(AffsError::OutOfRange));
        assert!(it.next().is_none());
    }

    #[test]
    fn test_cycle_is_bounded() {
        let table = [0, 2, 1];
        let results: Vec<_> = chain_iter(1, 3, links(&table)).collect();
        assert_eq!(results.len(), 4);
        assert_eq!(results[3].as_ref().err(), Some(&AffsError::ChainLoop));
    }

    #[test]
    fn test_empty_chain() {
        let table = [0u32; 2];
        assert_eq!(chain_iter(RDB_END, 2, links(&table)).count(), 0);
        assert_eq!(chain_iter(0, 2, links(&table)).count(), 0);
    }
}
