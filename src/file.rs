//! File extent management.
//!
//! A [`File`] is a cursor over one file's extent chain: the header's
//! direct table of 72 data block pointers, then a chain of extension
//! blocks holding 72 more each. Tables are filled back to front, so
//! the first data block sits in the last slot.

use alloc::vec::Vec;

use crate::block::{EntryBlock, FileExtBlock, OfsDataBlock, HEADER_CHECKSUM_OFFSET};
use crate::chain::chain_iter;
use crate::checksum::verify_normal_sum;
use crate::constants::*;
use crate::dir::{resolve_parent, Directory, HashDirectory};
use crate::error::{AffsError, Result, WarningKind};
use crate::types::{BlockDevice, FsType};
use crate::volume::VolumeMut;

/// How a file is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Read an existing file from the start.
    Read,
    /// Create a new file; the name must not exist.
    Write,
    /// Extend an existing file from its end.
    Append,
}

impl OpenMode {
    /// Returns true for modes that modify the file.
    #[inline]
    pub const fn is_write(self) -> bool {
        matches!(self, Self::Write | Self::Append)
    }
}

/// Blocks needed to store `byte_size` bytes: the header, the data blocks and
/// one extension block per 72 data blocks past the first 72.
pub fn file_real_size(byte_size: u32, fs_type: FsType) -> u32 {
    let data = byte_size.div_ceil(fs_type.data_block_size() as u32);
    let ext = data.saturating_sub(MAX_DATABLK as u32).div_ceil(MAX_DATABLK as u32);
    1 + data + ext
}

/// Blocks occupied by one file, header excluded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileBlocks {
    /// Data blocks in file order.
    pub data: Vec<u32>,
    /// Extension blocks in chain order.
    pub extensions: Vec<u32>,
}

impl FileBlocks {
    /// Block count including the header.
    #[inline]
    pub fn total(&self) -> u32 {
        1 + self.data.len() as u32 + self.extensions.len() as u32
    }
}

/// An open file.
///
/// Write and append handles must be closed with [`File::close`]; dropping
/// one discards buffered data and leaves the header unchanged on disk.
pub struct File<'f, 'a, D: BlockDevice, R: Directory = HashDirectory> {
    vol: &'f mut VolumeMut<'a, D>,
    dir: R,
    mode: OpenMode,
    fs_type: FsType,
    header: EntryBlock,
    /// Extension block holding the current data block pointer.
    ext: Option<FileExtBlock>,
    buf: [u8; BLOCK_SIZE],
    /// Absolute byte offset.
    pos: u32,
    /// Offset within the current data block's payload.
    pos_in_data: usize,
    /// Pointers of `ext` consumed so far.
    pos_in_ext: usize,
    cur_data: u32,
    /// Data blocks visited, the current one included.
    n_data_blocks: u32,
}

impl<'f, 'a, D: BlockDevice> File<'f, 'a, D> {
    /// Open `path` with hash-table name resolution.
    pub fn open(
        vol: &'f mut VolumeMut<'a, D>,
        path: impl AsRef<[u8]>,
        mode: OpenMode,
    ) -> Result<Self> {
        Self::open_with(vol, HashDirectory, path, mode)
    }
}

impl<'f, 'a, D: BlockDevice, R: Directory> File<'f, 'a, D, R> {
    /// Open `path`, resolving names through `dir`.
    pub fn open_with(
        vol: &'f mut VolumeMut<'a, D>,
        dir: R,
        path: impl AsRef<[u8]>,
        mode: OpenMode,
    ) -> Result<Self> {
        if mode.is_write() && vol.is_read_only() {
            return Err(AffsError::ReadOnly);
        }
        let (parent, name) = resolve_parent(&dir, vol, path.as_ref())?;
        let existing = dir.lookup(vol, parent, name)?;

        let header = match mode {
            OpenMode::Write => {
                if existing.is_some() {
                    return Err(AffsError::AlreadyExists);
                }
                create_header(&dir, vol, parent, name)?
            }
            OpenMode::Read | OpenMode::Append => {
                let header = vol.read_entry(existing.ok_or(AffsError::NotFound)?)?;
                if !header.is_file() {
                    return Err(AffsError::NotAFile);
                }
                let access = header.access();
                let denied = match mode {
                    OpenMode::Read => access.is_read_protected(),
                    _ => access.is_write_protected(),
                };
                if denied {
                    return Err(AffsError::AccessDenied);
                }
                header
            }
        };

        log::debug!(
            "open {:?} header {} size {}",
            mode,
            header.header_key,
            header.byte_size
        );
        let fs_type = vol.volume().fs_type();
        let mut file = Self {
            vol,
            dir,
            mode,
            fs_type,
            header,
            ext: None,
            buf: [0; BLOCK_SIZE],
            pos: 0,
            pos_in_data: 0,
            pos_in_ext: 0,
            cur_data: 0,
            n_data_blocks: 0,
        };
        if mode == OpenMode::Append {
            file.seek_to(file.header.byte_size)?;
        }
        Ok(file)
    }

    /// File size in bytes, including bytes written through this handle.
    #[inline]
    pub fn size(&self) -> u32 {
        if self.mode.is_write() {
            self.pos.max(self.header.byte_size)
        } else {
            self.header.byte_size
        }
    }

    /// Current byte offset.
    #[inline]
    pub const fn position(&self) -> u32 {
        self.pos
    }

    /// Check if the cursor is at the end of the file.
    #[inline]
    pub fn is_eof(&self) -> bool {
        self.pos >= self.size()
    }

    /// The in-memory file header.
    #[inline]
    pub const fn header(&self) -> &EntryBlock {
        &self.header
    }

    /// Mode the file was opened with.
    #[inline]
    pub const fn mode(&self) -> OpenMode {
        self.mode
    }

    #[inline]
    const fn data_block_size(&self) -> usize {
        self.fs_type.data_block_size()
    }

    #[inline]
    const fn data_offset(&self) -> usize {
        match self.fs_type {
            FsType::Ofs => OfsDataBlock::HEADER_SIZE,
            FsType::Ffs => 0,
        }
    }

    /// Read into `out`; returns fewer bytes than requested only at end of file.
    pub fn read(&mut self, out: &mut [u8]) -> Result<usize> {
        if self.mode != OpenMode::Read {
            return Err(AffsError::InvalidState);
        }
        let remaining = self.header.byte_size.saturating_sub(self.pos) as usize;
        let n = out.len().min(remaining);
        let dsize = self.data_block_size();
        let off = self.data_offset();

        let mut done = 0;
        while done < n {
            if self.n_data_blocks == 0 || self.pos_in_data == dsize {
                let block = self.next_data_pointer()?;
                self.load_data_block(block, self.n_data_blocks + 1)?;
            }
            let chunk = (dsize - self.pos_in_data).min(n - done);
            let start = off + self.pos_in_data;
            out[done..done + chunk].copy_from_slice(&self.buf[start..start + chunk]);
            done += chunk;
            self.pos_in_data += chunk;
            self.pos += chunk as u32;
        }
        Ok(done)
    }

    /// Read everything from the cursor to the end of the file.
    pub fn read_to_vec(&mut self) -> Result<Vec<u8>> {
        let mut out = alloc::vec![0u8; self.size().saturating_sub(self.pos) as usize];
        let n = self.read(&mut out)?;
        out.truncate(n);
        Ok(out)
    }

    /// Append `data` at the cursor, allocating blocks as boundaries are crossed.
    ///
    /// On [`AffsError::DiskFull`] the bytes copied before the failure stay in
    /// the file; [`position`](Self::position) tells how many.
    pub fn write(&mut self, data: &[u8]) -> Result<usize> {
        if !self.mode.is_write() {
            return Err(AffsError::InvalidState);
        }
        let fits = u32::try_from(data.len())
            .ok()
            .and_then(|n| self.pos.checked_add(n))
            .is_some();
        if !fits {
            return Err(AffsError::DiskFull);
        }
        let dsize = self.data_block_size();
        let off = self.data_offset();

        let mut done = 0;
        while done < data.len() {
            if self.n_data_blocks == 0 || self.pos_in_data == dsize {
                self.create_next_block()?;
            }
            let chunk = (dsize - self.pos_in_data).min(data.len() - done);
            let start = off + self.pos_in_data;
            self.buf[start..start + chunk].copy_from_slice(&data[done..done + chunk]);
            done += chunk;
            self.pos_in_data += chunk;
            self.pos += chunk as u32;
        }
        Ok(done)
    }

    /// Move the cursor to `pos`, clamped to the file size.
    ///
    /// Write and append handles only accept their current position.
    pub fn seek(&mut self, pos: u32) -> Result<()> {
        if self.mode.is_write() {
            return if pos == self.pos {
                Ok(())
            } else {
                Err(AffsError::InvalidState)
            };
        }
        self.seek_to(pos)
    }

    fn seek_to(&mut self, pos: u32) -> Result<()> {
        let pos = pos.min(self.header.byte_size);
        self.ext = None;
        self.pos = 0;
        self.pos_in_data = 0;
        self.pos_in_ext = 0;
        self.cur_data = 0;
        self.n_data_blocks = 0;
        if pos == 0 {
            return Ok(());
        }

        let dsize = self.data_block_size() as u32;
        let k = (pos - 1) / dsize;
        let index = k as usize;
        let block = if index < MAX_DATABLK {
            self.header.data_block(index)
        } else {
            let rest = index - MAX_DATABLK;
            let ext = self.nth_extension(rest / MAX_DATABLK)?;
            self.pos_in_ext = rest % MAX_DATABLK + 1;
            let block = ext.data_block(self.pos_in_ext - 1);
            self.ext = Some(ext);
            block
        };
        self.load_data_block(block, k + 1)?;
        self.pos_in_data = (pos - k * dsize) as usize;
        self.pos = pos;
        Ok(())
    }

    fn nth_extension(&mut self, n: usize) -> Result<FileExtBlock> {
        let limit = self.vol.chain_limit();
        let vol = &mut *self.vol;
        let (_, ext) = chain_iter(self.header.extension, limit, |b| vol.read_file_ext(b))
            .nth(n)
            .ok_or(AffsError::InvalidDataSequence)??;
        Ok(ext)
    }

    /// Pointer to the data block after the current one, loading the next
    /// extension block when the current table is used up.
    fn next_data_pointer(&mut self) -> Result<u32> {
        let index = self.n_data_blocks as usize;
        if index < MAX_DATABLK {
            return Ok(self.header.data_block(index));
        }
        let exhausted = self
            .ext
            .as_ref()
            .is_none_or(|_| self.pos_in_ext >= MAX_DATABLK);
        if exhausted {
            let next = match &self.ext {
                Some(ext) => ext.extension,
                None => self.header.extension,
            };
            self.ext = Some(self.vol.read_file_ext(next)?);
            self.pos_in_ext = 0;
        }
        let ext = self.ext.as_ref().ok_or(AffsError::InvalidState)?;
        let block = ext.data_block(self.pos_in_ext);
        self.pos_in_ext += 1;
        Ok(block)
    }

    fn load_data_block(&mut self, block: u32, seq: u32) -> Result<()> {
        if block == 0 {
            return Err(AffsError::InvalidDataSequence);
        }
        let buf = self.vol.read_block(block)?;
        if self.fs_type == FsType::Ofs {
            let data = OfsDataBlock::decode(&buf)?;
            if !verify_normal_sum(&buf, HEADER_CHECKSUM_OFFSET) {
                self.vol.warn(block, WarningKind::ChecksumMismatch);
            }
            if data.seq_num != seq {
                self.vol.warn(
                    block,
                    WarningKind::SequenceMismatch {
                        expected: seq,
                        found: data.seq_num,
                    },
                );
            }
        }
        self.buf = buf;
        self.cur_data = block;
        self.n_data_blocks = seq;
        self.pos_in_data = 0;
        Ok(())
    }

    /// Allocate the next data block, persist the current one and make the
    /// new block current.
    fn create_next_block(&mut self) -> Result<()> {
        let n = self.n_data_blocks as usize;
        let block = if n < MAX_DATABLK {
            let block = self.vol.allocate_block()?;
            if n == 0 {
                self.header.first_data = block;
            }
            self.header.set_data_block(n, block);
            self.header.high_seq += 1;
            block
        } else {
            if self.ext.is_none() || self.pos_in_ext == MAX_DATABLK {
                self.grow_extension()?;
            }
            let block = self.vol.allocate_block()?;
            let ext = self.ext.as_mut().ok_or(AffsError::InvalidState)?;
            ext.set_data_block(self.pos_in_ext, block);
            ext.high_seq += 1;
            self.pos_in_ext += 1;
            block
        };

        if n > 0 {
            if self.fs_type == FsType::Ofs {
                OfsDataBlock {
                    header_key: self.header.header_key,
                    seq_num: self.n_data_blocks,
                    data_size: self.data_block_size() as u32,
                    next_data: block,
                }
                .seal(&mut self.buf);
            }
            self.vol.write_block(self.cur_data, &self.buf)?;
        }
        self.buf = [0; BLOCK_SIZE];
        self.cur_data = block;
        self.n_data_blocks += 1;
        self.pos_in_data = 0;
        Ok(())
    }

    /// Start a new extension block, linking it from the header or from the
    /// previous extension block (which is written out).
    fn grow_extension(&mut self) -> Result<()> {
        let block = self.vol.allocate_block()?;
        if let Some(prev) = self.ext.as_mut() {
            prev.extension = block;
            self.vol.write_block(prev.header_key, &prev.encode())?;
        } else {
            self.header.extension = block;
        }
        log::trace!("file {}: extension block {block}", self.header.header_key);
        self.ext = Some(FileExtBlock::new(block, self.header.header_key));
        self.pos_in_ext = 0;
        Ok(())
    }

    /// Persist buffered data and the header, then flush the bitmap.
    ///
    /// Read handles close without touching the disk.
    pub fn close(self) -> Result<()> {
        let Self {
            vol,
            dir,
            mode,
            fs_type,
            mut header,
            ext,
            mut buf,
            pos,
            pos_in_data,
            cur_data,
            n_data_blocks,
            ..
        } = self;
        if !mode.is_write() {
            return Ok(());
        }

        if let Some(ext) = &ext {
            vol.write_block(ext.header_key, &ext.encode())?;
        }
        if n_data_blocks > 0 {
            if fs_type == FsType::Ofs {
                OfsDataBlock {
                    header_key: header.header_key,
                    seq_num: n_data_blocks,
                    data_size: pos_in_data as u32,
                    next_data: 0,
                }
                .seal(&mut buf);
            }
            vol.write_block(cur_data, &buf)?;
        }

        header.byte_size = pos;
        header.date = vol.now();
        vol.write_entry(&header)?;
        if vol.volume().flags().dircache {
            dir.header_updated(vol, &header)?;
        }
        log::debug!("closed header {} size {pos}", header.header_key);
        vol.flush()
    }
}

fn create_header<R: Directory, D: BlockDevice>(
    dir: &R,
    vol: &mut VolumeMut<'_, D>,
    parent: u32,
    name: &[u8],
) -> Result<EntryBlock> {
    if name.len() > MAX_NAME_LEN {
        return Err(AffsError::NameTooLong);
    }
    let block = vol.allocate_block()?;
    let next = match dir.register(vol, parent, name, block) {
        Ok(next) => next,
        Err(e) => {
            vol.release_blocks(&[block])?;
            return Err(e);
        }
    };
    let mut header = EntryBlock::new_file(block, parent, name, vol.now());
    header.next_same_hash = next;
    vol.write_entry(&header)?;
    Ok(header)
}

impl<'a, D: BlockDevice> VolumeMut<'a, D> {
    /// Open `path` with hash-table name resolution.
    pub fn open(&mut self, path: impl AsRef<[u8]>, mode: OpenMode) -> Result<File<'_, 'a, D>> {
        File::open(self, path, mode)
    }

    /// Every block the file described by `header` occupies, header excluded.
    pub fn blocks_of(&mut self, header: &EntryBlock) -> Result<FileBlocks> {
        let direct = (header.high_seq as usize).min(MAX_DATABLK);
        let mut blocks = FileBlocks {
            data: (0..direct).map(|i| header.data_block(i)).collect(),
            extensions: Vec::new(),
        };
        let limit = self.chain_limit();
        for item in chain_iter(header.extension, limit, |b| self.read_file_ext(b)) {
            let (block, ext) = item?;
            blocks.extensions.push(block);
            let n = (ext.high_seq as usize).min(MAX_DATABLK);
            blocks.data.extend((0..n).map(|i| ext.data_block(i)));
        }
        Ok(blocks)
    }

    /// Release the data, extension and header blocks of a file.
    ///
    /// The bitmap is changed in memory only; [`flush`](Self::flush) persists it.
    pub fn free_blocks_of(&mut self, header: &EntryBlock) -> Result<()> {
        let blocks = self.blocks_of(header)?;
        self.release_blocks(&blocks.data)?;
        self.release_blocks(&blocks.extensions)?;
        self.release_blocks(&[header.header_key])
    }
}
