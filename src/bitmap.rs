//! Free-space bitmap and block allocator.
//!
//! The bitmap covers volume-relative blocks `2..=last`; the two boot blocks
//! are never tracked. A set bit marks a free block. Pages live in ordinary
//! volume blocks listed by the root block and, past 25 pages, by a chain of
//! bitmap extension blocks.

use alloc::vec;
use alloc::vec::Vec;

use crate::block::{BitmapBlock, BitmapExtBlock, RootBlock};
use crate::chain::chain_iter;
use crate::constants::*;
use crate::error::{AffsError, Result, WarningKind};
use crate::types::BlockDevice;
use crate::volume::VolumeMut;

/// Number of bitmap pages needed for a volume whose highest relative block is `last`.
#[inline]
pub const fn page_count(last: u32) -> usize {
    let tracked = (last + 1).saturating_sub(BM_FIRST_BLOCK);
    tracked.div_ceil(BM_BLOCKS_PER_PAGE) as usize
}

/// Number of bitmap extension blocks needed for `pages` pages.
#[inline]
pub const fn ext_count(pages: usize) -> usize {
    pages
        .saturating_sub(BM_PAGES_ROOT_SIZE)
        .div_ceil(BM_PAGES_EXT_SIZE)
}

/// In-memory free-space bitmap of one volume.
#[derive(Debug, Clone)]
pub struct Bitmap {
    pages: Vec<BitmapBlock>,
    /// Volume-relative home block of each page, 0 until placed.
    sectors: Vec<u32>,
    dirty: Vec<bool>,
    last: u32,
    start: u32,
}

impl Bitmap {
    /// A bitmap with every tracked block free and no pages placed on disk.
    ///
    /// Allocation scans upward from `start` (normally the root block).
    pub fn new_free(last: u32, start: u32) -> Self {
        let n = page_count(last);
        let mut bitmap = Self {
            pages: vec![BitmapBlock::all_used(); n],
            sectors: vec![0; n],
            dirty: vec![true; n],
            last,
            start,
        };
        for block in BM_FIRST_BLOCK..=last {
            bitmap.set(block, true);
        }
        bitmap
    }

    fn with_pages(pages: Vec<BitmapBlock>, sectors: Vec<u32>, last: u32, start: u32) -> Self {
        let dirty = vec![false; pages.len()];
        Self {
            pages,
            sectors,
            dirty,
            last,
            start,
        }
    }

    #[inline]
    fn locate(&self, block: u32) -> Option<(usize, usize, u32)> {
        if block < BM_FIRST_BLOCK || block > self.last {
            return None;
        }
        let s = block - BM_FIRST_BLOCK;
        let page = (s / BM_BLOCKS_PER_PAGE) as usize;
        let word = ((s / 32) % BM_MAP_SIZE as u32) as usize;
        Some((page, word, s % 32))
    }

    fn set(&mut self, block: u32, free: bool) -> bool {
        let Some((page, word, bit)) = self.locate(block) else {
            return false;
        };
        let w = &mut self.pages[page].map[word];
        if free {
            *w |= 1 << bit;
        } else {
            *w &= !(1 << bit);
        }
        self.dirty[page] = true;
        true
    }

    /// Highest volume-relative block tracked.
    #[inline]
    pub const fn last_block(&self) -> u32 {
        self.last
    }

    /// Returns true if `block` is tracked and free.
    #[inline]
    pub fn is_free(&self, block: u32) -> bool {
        self.locate(block)
            .is_some_and(|(page, word, bit)| self.pages[page].map[word] & (1 << bit) != 0)
    }

    /// Mark `block` free.
    pub fn mark_free(&mut self, block: u32) -> Result<()> {
        if self.set(block, true) {
            Ok(())
        } else {
            Err(AffsError::OutOfRange)
        }
    }

    /// Mark `block` used.
    pub fn mark_used(&mut self, block: u32) -> Result<()> {
        if self.set(block, false) {
            Ok(())
        } else {
            Err(AffsError::OutOfRange)
        }
    }

    /// Number of free blocks; bits past the end of the volume are ignored.
    pub fn count_free(&self) -> u32 {
        let mut free = 0;
        for (p, page) in self.pages.iter().enumerate() {
            for (w, &word) in page.map.iter().enumerate() {
                let base = BM_FIRST_BLOCK + p as u32 * BM_BLOCKS_PER_PAGE + w as u32 * 32;
                if base > self.last {
                    return free;
                }
                let valid = (self.last - base + 1).min(32);
                let mask = if valid == 32 { u32::MAX } else { (1 << valid) - 1 };
                free += (word & mask).count_ones();
            }
        }
        free
    }

    /// Take `n` free blocks, scanning upward from the start block and
    /// wrapping to block 2.
    ///
    /// Either all `n` blocks are marked used or none are.
    pub fn allocate(&mut self, n: usize) -> Result<Vec<u32>> {
        let mut found = Vec::with_capacity(n);
        if n == 0 {
            return Ok(found);
        }
        if self.last < BM_FIRST_BLOCK {
            return Err(AffsError::DiskFull);
        }
        let start = self.start.clamp(BM_FIRST_BLOCK, self.last);
        let mut block = start;
        loop {
            if self.is_free(block) {
                found.push(block);
                if found.len() == n {
                    break;
                }
            }
            block = if block >= self.last {
                BM_FIRST_BLOCK
            } else {
                block + 1
            };
            if block == start {
                break;
            }
        }
        if found.len() < n {
            log::debug!("allocation of {n} blocks failed, {} free", found.len());
            return Err(AffsError::DiskFull);
        }
        for &b in &found {
            self.set(b, false);
        }
        Ok(found)
    }

    /// Number of bitmap pages.
    #[inline]
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Volume-relative blocks holding each page.
    #[inline]
    pub fn page_blocks(&self) -> &[u32] {
        &self.sectors
    }

    /// Returns true if any page differs from its on-disk copy.
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty.iter().any(|&d| d)
    }
}

impl<D: BlockDevice> VolumeMut<'_, D> {
    /// Load the bitmap pages listed by `root`.
    pub(crate) fn attach_bitmap(&mut self, root: &RootBlock) -> Result<()> {
        let last = self.last_rel();
        let root_block = self.volume().root_block();
        let n = page_count(last);

        if !root.bitmap_valid() {
            self.warn(root_block, WarningKind::BitmapInvalid);
        }

        let mut sectors: Vec<u32> = root
            .bm_pages
            .iter()
            .copied()
            .take_while(|&p| p != 0)
            .take(n)
            .collect();

        if sectors.len() < n {
            let limit = self.chain_limit();
            let this = &*self;
            let exts = chain_iter(root.bm_ext, limit, |b| {
                this.read_block(b).map(|buf| BitmapExtBlock::decode(&buf))
            });
            for item in exts {
                let (_, ext) = item.map_err(|e| match e {
                    AffsError::OutOfRange => AffsError::CorruptBitmap,
                    e => e,
                })?;
                let want = n - sectors.len();
                sectors.extend(ext.pages.iter().copied().take_while(|&p| p != 0).take(want));
                if sectors.len() == n {
                    break;
                }
            }
        }

        if sectors.len() < n {
            log::debug!("bitmap lists {} of {n} pages", sectors.len());
            return Err(AffsError::CorruptBitmap);
        }

        let mut pages = Vec::with_capacity(n);
        for &sector in &sectors {
            if sector < BM_FIRST_BLOCK || sector > last {
                log::debug!("bitmap page at {sector} outside volume");
                return Err(AffsError::CorruptBitmap);
            }
            let buf = self.read_block(sector)?;
            if !BitmapBlock::checksum_valid(&buf) {
                self.warn(sector, WarningKind::ChecksumMismatch);
            }
            pages.push(BitmapBlock::decode(&buf));
        }

        log::debug!("attached bitmap: {n} pages");
        self.volume_mut().bitmap = Some(Bitmap::with_pages(pages, sectors, last, root_block));
        Ok(())
    }

    /// Replace the bitmap with one where every tracked block is free.
    pub(crate) fn initialize_fresh_bitmap(&mut self) {
        let last = self.last_rel();
        let root = self.volume().root_block();
        self.volume_mut().bitmap = Some(Bitmap::new_free(last, root));
    }

    /// Allocate homes for the bitmap pages (and extension blocks if more than
    /// 25 pages are needed) and record them in the root block.
    pub(crate) fn materialize_bitmap(&mut self) -> Result<()> {
        let bitmap = self.bitmap_mut()?;
        let n = bitmap.page_count();
        let sectors = bitmap.allocate(n)?;
        bitmap.sectors.clone_from(&sectors);

        let exts = ext_count(n);
        let ext_blocks = if exts > 0 {
            self.bitmap_mut()?.allocate(exts)?
        } else {
            Vec::new()
        };

        let mut root = self.read_root()?;
        for (slot, &s) in root.bm_pages.iter_mut().zip(&sectors) {
            *slot = s;
        }
        root.bm_ext = ext_blocks.first().copied().unwrap_or(0);

        for (k, &eb) in ext_blocks.iter().enumerate() {
            let lo = BM_PAGES_ROOT_SIZE + k * BM_PAGES_EXT_SIZE;
            let hi = (lo + BM_PAGES_EXT_SIZE).min(n);
            let mut ext = BitmapExtBlock {
                pages: [0; BM_PAGES_EXT_SIZE],
                next: ext_blocks.get(k + 1).copied().unwrap_or(0),
            };
            ext.pages[..hi - lo].copy_from_slice(&sectors[lo..hi]);
            self.write_block(eb, &ext.encode())?;
        }

        self.write_root(&root)?;
        log::debug!("bitmap placed: {n} pages, {exts} extension blocks");
        Ok(())
    }

    /// Write dirty bitmap pages, bracketed by invalidating and then
    /// revalidating the root block's bitmap flag.
    pub fn flush(&mut self) -> Result<()> {
        if self.is_read_only() {
            return Err(AffsError::ReadOnly);
        }
        let bitmap = self.bitmap()?;
        let pending: Vec<(usize, u32, [u8; BLOCK_SIZE])> = bitmap
            .dirty
            .iter()
            .enumerate()
            .filter(|&(_, &d)| d)
            .map(|(i, _)| (i, bitmap.sectors[i], bitmap.pages[i].encode()))
            .collect();
        if pending.iter().any(|&(_, sector, _)| sector == 0) {
            return Err(AffsError::InvalidState);
        }

        let mut root = self.read_root()?;
        root.bm_flag = BM_INVALID;
        self.write_root(&root)?;

        for (i, sector, buf) in &pending {
            self.write_block(*sector, buf)?;
            self.bitmap_mut()?.dirty[*i] = false;
        }

        root.bm_flag = BM_VALID;
        root.disk_modified = self.now();
        self.write_root(&root)?;
        log::trace!("bitmap flushed: {} pages written", pending.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_count() {
        assert_eq!(page_count(1759), 1);
        assert_eq!(page_count(BM_BLOCKS_PER_PAGE + 1), 1);
        assert_eq!(page_count(BM_BLOCKS_PER_PAGE + 2), 2);
        assert_eq!(page_count(1), 0);
        assert_eq!(ext_count(25), 0);
        assert_eq!(ext_count(26), 1);
        assert_eq!(ext_count(25 + 127), 1);
        assert_eq!(ext_count(25 + 128), 2);
    }

    #[test]
    fn test_fresh_bitmap_all_free() {
        let bm = Bitmap::new_free(1759, 880);
        assert_eq!(bm.count_free(), 1758);
        assert!(!bm.is_free(0));
        assert!(!bm.is_free(1));
        assert!(bm.is_free(2));
        assert!(bm.is_free(1759));
        assert!(!bm.is_free(1760));
    }

    #[test]
    fn test_bit_layout() {
        let mut bm = Bitmap::new_free(1759, 880);
        bm.mark_used(2).unwrap();
        bm.mark_used(2 + 33).unwrap();
        assert_eq!(bm.pages[0].map[0], !1);
        assert_eq!(bm.pages[0].map[1], !2);
    }

    #[test]
    fn test_mark_out_of_range() {
        let mut bm = Bitmap::new_free(100, 50);
        assert_eq!(bm.mark_used(1), Err(AffsError::OutOfRange));
        assert_eq!(bm.mark_free(101), Err(AffsError::OutOfRange));
    }

    #[test]
    fn test_allocate_starts_at_root_and_wraps() {
        let mut bm = Bitmap::new_free(9, 8);
        assert_eq!(bm.allocate(3).unwrap(), [8, 9, 2]);
        assert_eq!(bm.count_free(), 5);
        assert!(!bm.is_free(8));
        assert!(!bm.is_free(2));
    }

    #[test]
    fn test_allocate_all_or_nothing() {
        let mut bm = Bitmap::new_free(9, 5);
        let before = bm.count_free();
        assert_eq!(bm.allocate(before as usize + 1), Err(AffsError::DiskFull));
        assert_eq!(bm.count_free(), before);
        assert_eq!(bm.allocate(before as usize).unwrap().len(), 8);
        assert_eq!(bm.count_free(), 0);
        assert_eq!(bm.allocate(1), Err(AffsError::DiskFull));
    }

    #[test]
    fn test_allocate_release_consistency() {
        let mut bm = Bitmap::new_free(5000, 2500);
        let blocks = bm.allocate(40).unwrap();
        for &b in &blocks {
            assert!(!bm.is_free(b));
        }
        for &b in &blocks {
            bm.mark_free(b).unwrap();
        }
        assert_eq!(bm.count_free(), 4999);
    }

    #[test]
    fn test_count_ignores_tail_bits() {
        let mut bm = Bitmap::new_free(40, 20);
        bm.pages[0].map[1] = u32::MAX;
        assert_eq!(bm.count_free(), 39);
    }
}
