//! Volumes and the mutable volume view.
//!
//! A [`Volume`] is the metadata of one filesystem on a device: its block
//! range, root block, flavour and (once mounted) its bitmap. All I/O goes
//! through [`VolumeMut`], a short-lived view pairing a volume with the
//! device it lives on.

use alloc::vec::Vec;

use crate::bitmap::Bitmap;
use crate::block::{
    BootBlock, DirCacheBlock, EntryBlock, FileExtBlock, RootBlock, HEADER_CHECKSUM_OFFSET,
};
use crate::checksum::verify_normal_sum;
use crate::constants::*;
use crate::date::AmigaDate;
use crate::error::{AffsError, Diagnostics, Result, Warning, WarningKind};
use crate::types::{BlockDevice, DosType, FsFlags, FsType};
use crate::utf8;

/// One filesystem on a device.
#[derive(Debug, Clone)]
pub struct Volume {
    pub(crate) first_block: u32,
    pub(crate) last_block: u32,
    pub(crate) root_block: u32,
    pub(crate) block_size: u32,
    pub(crate) name: Vec<u8>,
    pub(crate) dos_type: DosType,
    pub(crate) read_only: bool,
    pub(crate) cur_dir: u32,
    pub(crate) bitmap: Option<Bitmap>,
}

impl Volume {
    /// A volume spanning device blocks `first..=last`, root in the middle.
    pub(crate) fn new(first: u32, last: u32, block_size: u32, name: &[u8]) -> Result<Self> {
        if last < first {
            return Err(AffsError::InvalidGeometry);
        }
        let root = (last - first + 1) / 2;
        Ok(Self {
            first_block: first,
            last_block: last,
            root_block: root,
            block_size,
            name: name.to_vec(),
            dos_type: DosType::default(),
            read_only: false,
            cur_dir: root,
            bitmap: None,
        })
    }

    /// First device block of the volume.
    #[inline]
    pub const fn first_block(&self) -> u32 {
        self.first_block
    }

    /// Last device block of the volume.
    #[inline]
    pub const fn last_block(&self) -> u32 {
        self.last_block
    }

    /// Number of blocks in the volume.
    #[inline]
    pub const fn block_count(&self) -> u32 {
        self.last_block - self.first_block + 1
    }

    /// Root block, relative to the first block.
    #[inline]
    pub const fn root_block(&self) -> u32 {
        self.root_block
    }

    /// Block size in bytes.
    #[inline]
    pub const fn block_size(&self) -> u32 {
        self.block_size
    }

    /// Volume name.
    #[inline]
    pub fn name(&self) -> &[u8] {
        &self.name
    }

    /// Volume name as str (if valid UTF-8).
    #[inline]
    pub fn name_str(&self) -> Option<&str> {
        utf8::name_str(&self.name)
    }

    /// DOS type read from the boot block (or set when formatting).
    #[inline]
    pub const fn dos_type(&self) -> DosType {
        self.dos_type
    }

    /// OFS or FFS.
    #[inline]
    pub const fn fs_type(&self) -> FsType {
        self.dos_type.fs_type()
    }

    /// INTL and DIRCACHE flags.
    #[inline]
    pub const fn flags(&self) -> FsFlags {
        self.dos_type.flags()
    }

    /// Whether writes are refused.
    #[inline]
    pub const fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Whether the bitmap is attached.
    #[inline]
    pub const fn is_mounted(&self) -> bool {
        self.bitmap.is_some()
    }

    /// Current directory header block, relative.
    #[inline]
    pub const fn current_dir(&self) -> u32 {
        self.cur_dir
    }

    /// The attached bitmap.
    #[inline]
    pub fn bitmap(&self) -> Option<&Bitmap> {
        self.bitmap.as_ref()
    }
}

/// Mutable view of a volume and the device it lives on.
///
/// Block numbers taken and returned by this type are volume-relative.
pub struct VolumeMut<'a, D: BlockDevice> {
    io: &'a mut D,
    vol: &'a mut Volume,
    diag: &'a mut Diagnostics,
    clock: fn() -> AmigaDate,
}

impl<'a, D: BlockDevice> VolumeMut<'a, D> {
    pub(crate) fn new(
        io: &'a mut D,
        vol: &'a mut Volume,
        diag: &'a mut Diagnostics,
        clock: fn() -> AmigaDate,
    ) -> Self {
        Self {
            io,
            vol,
            diag,
            clock,
        }
    }

    /// Volume metadata.
    #[inline]
    pub fn volume(&self) -> &Volume {
        &*self.vol
    }

    #[inline]
    pub(crate) fn volume_mut(&mut self) -> &mut Volume {
        &mut *self.vol
    }

    /// Warnings collected on the device so far.
    #[inline]
    pub fn warnings(&self) -> &[Warning] {
        self.diag.warnings()
    }

    /// Whether writes are refused.
    #[inline]
    pub fn is_read_only(&self) -> bool {
        self.vol.read_only
    }

    pub(crate) fn warn(&mut self, block: u32, kind: WarningKind) {
        self.diag.warn(self.vol.first_block + block, kind);
    }

    #[inline]
    pub(crate) fn now(&self) -> AmigaDate {
        (self.clock)()
    }

    #[inline]
    pub(crate) fn last_rel(&self) -> u32 {
        self.vol.last_block - self.vol.first_block
    }

    /// Bound for chain walks: no chain can be longer than the volume.
    #[inline]
    pub(crate) fn chain_limit(&self) -> u32 {
        self.last_rel().saturating_add(1)
    }

    pub(crate) fn bitmap(&self) -> Result<&Bitmap> {
        self.vol.bitmap.as_ref().ok_or(AffsError::InvalidState)
    }

    pub(crate) fn bitmap_mut(&mut self) -> Result<&mut Bitmap> {
        self.vol.bitmap.as_mut().ok_or(AffsError::InvalidState)
    }

    /// Read volume-relative `block`.
    pub fn read_block(&self, block: u32) -> Result<[u8; BLOCK_SIZE]> {
        if block > self.last_rel() {
            return Err(AffsError::OutOfRange);
        }
        let mut buf = [0u8; BLOCK_SIZE];
        self.io
            .read_block(self.vol.first_block + block, &mut buf)
            .map_err(|()| AffsError::BlockReadError)?;
        Ok(buf)
    }

    /// Write volume-relative `block`.
    pub fn write_block(&mut self, block: u32, buf: &[u8; BLOCK_SIZE]) -> Result<()> {
        if self.vol.read_only {
            return Err(AffsError::ReadOnly);
        }
        if block > self.last_rel() {
            return Err(AffsError::OutOfRange);
        }
        log::trace!("write block {block}");
        self.io
            .write_block(self.vol.first_block + block, buf)
            .map_err(|()| AffsError::BlockWriteError)
    }

    pub(crate) fn read_boot(&self) -> Result<[u8; BOOT_BLOCK_SIZE]> {
        let mut buf = [0u8; BOOT_BLOCK_SIZE];
        let (lo, hi) = buf.split_at_mut(BLOCK_SIZE);
        lo.copy_from_slice(&self.read_block(0)?);
        hi.copy_from_slice(&self.read_block(1)?);
        Ok(buf)
    }

    pub(crate) fn write_boot(&mut self, boot: &BootBlock) -> Result<()> {
        let buf = boot.encode();
        let (lo, hi) = buf.split_at(BLOCK_SIZE);
        let mut block = [0u8; BLOCK_SIZE];
        block.copy_from_slice(lo);
        self.write_block(0, &block)?;
        block.copy_from_slice(hi);
        self.write_block(1, &block)
    }

    /// Read and verify the root block.
    pub fn read_root(&self) -> Result<RootBlock> {
        let buf = self.read_block(self.vol.root_block)?;
        if !verify_normal_sum(&buf, HEADER_CHECKSUM_OFFSET) {
            return Err(AffsError::ChecksumMismatch);
        }
        RootBlock::decode(&buf)
    }

    pub(crate) fn write_root(&mut self, root: &RootBlock) -> Result<()> {
        self.write_block(self.vol.root_block, &root.encode())
    }

    /// Read and verify a file or directory header.
    pub fn read_entry(&self, block: u32) -> Result<EntryBlock> {
        let buf = self.read_block(block)?;
        if !verify_normal_sum(&buf, HEADER_CHECKSUM_OFFSET) {
            return Err(AffsError::ChecksumMismatch);
        }
        EntryBlock::decode(&buf)
    }

    pub(crate) fn write_entry(&mut self, entry: &EntryBlock) -> Result<()> {
        self.write_block(entry.header_key, &entry.encode())
    }

    pub(crate) fn read_file_ext(&mut self, block: u32) -> Result<FileExtBlock> {
        if block == 0 {
            return Err(AffsError::InvalidDataSequence);
        }
        let buf = self.read_block(block)?;
        if !verify_normal_sum(&buf, HEADER_CHECKSUM_OFFSET) {
            self.warn(block, WarningKind::ChecksumMismatch);
        }
        FileExtBlock::decode(&buf)
    }

    /// Read the boot and root blocks and attach the bitmap.
    pub(crate) fn mount(&mut self) -> Result<()> {
        if self.vol.block_size != BLOCK_SIZE as u32 {
            return Err(AffsError::UnsupportedBlockSize);
        }
        let boot_buf = self.read_boot()?;
        let boot = BootBlock::decode(&boot_buf)?;
        if !BootBlock::checksum_valid(&boot_buf) {
            self.warn(0, WarningKind::ChecksumMismatch);
        }
        self.vol.dos_type = boot.dos_type;

        let root = self.read_root()?;
        if self.vol.name.is_empty() {
            self.vol.name = root.name().to_vec();
        }
        self.attach_bitmap(&root)?;
        self.vol.cur_dir = self.vol.root_block;
        log::debug!(
            "mounted volume at {}..={}, root {}, {:?}",
            self.vol.first_block,
            self.vol.last_block,
            self.vol.root_block,
            self.vol.fs_type()
        );
        Ok(())
    }

    /// Write a fresh, empty filesystem over the whole volume.
    pub(crate) fn format(&mut self, name: &[u8], dos_type: DosType) -> Result<()> {
        if name.len() > MAX_NAME_LEN {
            return Err(AffsError::NameTooLong);
        }
        self.vol.dos_type = dos_type;
        self.vol.name = name.to_vec();

        let boot_root = if self.vol.block_count() == FLOPPY_DD_SECTORS {
            self.vol.root_block
        } else {
            0
        };
        self.write_boot(&BootBlock::new(dos_type, boot_root))?;
        self.initialize_fresh_bitmap();

        let dircache = dos_type.flags().dircache;
        let blocks = self.allocate_blocks(if dircache { 2 } else { 1 })?;
        if blocks.first() != Some(&self.vol.root_block) {
            return Err(AffsError::DiskFull);
        }

        let mut root = RootBlock::new(name, self.now());
        if let Some(&cache) = blocks.get(1) {
            root.extension = cache;
            let dirc = DirCacheBlock {
                header_key: cache,
                parent: self.vol.root_block,
            };
            self.write_block(cache, &dirc.encode())?;
        }
        self.write_root(&root)?;
        self.materialize_bitmap()?;
        self.flush()?;
        self.vol.cur_dir = self.vol.root_block;
        log::debug!(
            "formatted {}..={} as {:?}, {} blocks free",
            self.vol.first_block,
            self.vol.last_block,
            dos_type.fs_type(),
            self.free_block_count()?
        );
        Ok(())
    }

    /// Number of free blocks.
    pub fn free_block_count(&self) -> Result<u32> {
        Ok(self.bitmap()?.count_free())
    }

    /// Returns true if `block` is tracked and free.
    pub fn is_block_free(&self, block: u32) -> Result<bool> {
        Ok(self.bitmap()?.is_free(block))
    }

    /// Take `n` free blocks; on failure nothing is marked.
    pub fn allocate_blocks(&mut self, n: usize) -> Result<Vec<u32>> {
        if self.is_read_only() {
            return Err(AffsError::ReadOnly);
        }
        self.bitmap_mut()?.allocate(n)
    }

    pub(crate) fn allocate_block(&mut self) -> Result<u32> {
        let blocks = self.allocate_blocks(1)?;
        blocks.first().copied().ok_or(AffsError::DiskFull)
    }

    /// Mark `blocks` free.
    pub fn release_blocks(&mut self, blocks: &[u32]) -> Result<()> {
        if self.is_read_only() {
            return Err(AffsError::ReadOnly);
        }
        let bitmap = self.bitmap_mut()?;
        for &b in blocks {
            bitmap.mark_free(b)?;
        }
        Ok(())
    }

    /// Blocks the file described by `header` needs on this volume.
    #[inline]
    pub fn size_on_disk(&self, header: &EntryBlock) -> u32 {
        crate::file::file_real_size(header.byte_size, self.vol.fs_type())
    }
}
