//! Name resolution.
//!
//! File operations find and register entries through the [`Directory`]
//! trait. [`HashDirectory`] implements it over the 72-slot hash tables of
//! the root and directory header blocks.

use alloc::vec::Vec;

use crate::block::{hash_name, names_equal, EntryBlock, HEADER_CHECKSUM_OFFSET};
use crate::chain::chain_iter;
use crate::checksum::{read_u32_be, set_normal_sum, verify_normal_sum, write_u32_be};
use crate::constants::*;
use crate::date::AmigaDate;
use crate::error::{AffsError, Result};
use crate::types::{Access, BlockDevice};
use crate::volume::VolumeMut;

/// Name lookup and registration for a volume's directory tree.
///
/// `parent` and returned block numbers are volume-relative header blocks.
pub trait Directory {
    /// Find `name` in the directory whose header is at `parent`.
    fn lookup<D: BlockDevice>(
        &self,
        vol: &mut VolumeMut<'_, D>,
        parent: u32,
        name: &[u8],
    ) -> Result<Option<u32>>;

    /// Link a new entry header into `parent`.
    ///
    /// Returns the block the new entry must chain to through its
    /// `next_same_hash` field (0 if none).
    fn register<D: BlockDevice>(
        &self,
        vol: &mut VolumeMut<'_, D>,
        parent: u32,
        name: &[u8],
        header: u32,
    ) -> Result<u32>;

    /// Called after a header is rewritten on a directory-cache volume.
    fn header_updated<D: BlockDevice>(
        &self,
        vol: &mut VolumeMut<'_, D>,
        header: &EntryBlock,
    ) -> Result<()> {
        let _ = (vol, header);
        Ok(())
    }
}

impl<T: Directory> Directory for &T {
    fn lookup<D: BlockDevice>(
        &self,
        vol: &mut VolumeMut<'_, D>,
        parent: u32,
        name: &[u8],
    ) -> Result<Option<u32>> {
        (**self).lookup(vol, parent, name)
    }

    fn register<D: BlockDevice>(
        &self,
        vol: &mut VolumeMut<'_, D>,
        parent: u32,
        name: &[u8],
        header: u32,
    ) -> Result<u32> {
        (**self).register(vol, parent, name, header)
    }

    fn header_updated<D: BlockDevice>(
        &self,
        vol: &mut VolumeMut<'_, D>,
        header: &EntryBlock,
    ) -> Result<()> {
        (**self).header_updated(vol, header)
    }
}

/// Hash-table directory lookup, new entries go to the head of their chain.
#[derive(Debug, Clone, Copy, Default)]
pub struct HashDirectory;

impl Directory for HashDirectory {
    fn lookup<D: BlockDevice>(
        &self,
        vol: &mut VolumeMut<'_, D>,
        parent: u32,
        name: &[u8],
    ) -> Result<Option<u32>> {
        if name.len() > MAX_NAME_LEN {
            return Err(AffsError::NameTooLong);
        }
        let dir = vol.read_entry(parent)?;
        if !dir.is_dir() {
            return Err(AffsError::NotADirectory);
        }
        let intl = vol.volume().flags().intl;
        let start = dir.hash_table[hash_name(name, intl)];

        let limit = vol.chain_limit();
        let this = &*vol;
        for item in chain_iter(start, limit, |b| this.read_entry(b)) {
            let (block, entry) = item?;
            if names_equal(entry.name(), name, intl) {
                return Ok(Some(block));
            }
        }
        Ok(None)
    }

    fn register<D: BlockDevice>(
        &self,
        vol: &mut VolumeMut<'_, D>,
        parent: u32,
        name: &[u8],
        header: u32,
    ) -> Result<u32> {
        let mut buf = vol.read_block(parent)?;
        if !verify_normal_sum(&buf, HEADER_CHECKSUM_OFFSET) {
            return Err(AffsError::ChecksumMismatch);
        }
        let intl = vol.volume().flags().intl;
        let slot = 24 + hash_name(name, intl) * 4;
        let old = read_u32_be(&buf, slot);

        write_u32_be(&mut buf, slot, header);
        vol.now().write(&mut buf, 0x1A4);
        set_normal_sum(&mut buf, HEADER_CHECKSUM_OFFSET);
        vol.write_block(parent, &buf)?;
        log::trace!("registered header {header} in {parent}, chained to {old}");
        Ok(old)
    }
}

/// Split `path` into the directory it lives in and its final component.
pub(crate) fn resolve_parent<'p, R: Directory, D: BlockDevice>(
    dir: &R,
    vol: &mut VolumeMut<'_, D>,
    path: &'p [u8],
) -> Result<(u32, &'p [u8])> {
    let (mut cur, rest) = start_of(vol, path);
    let mut parts = components(rest).peekable();
    while let Some(part) = parts.next() {
        if parts.peek().is_none() {
            return Ok((cur, part));
        }
        cur = enter(dir, vol, cur, part)?;
    }
    Err(AffsError::NotFound)
}

/// Resolve `path` to a directory header; an empty path names the start directory.
pub(crate) fn resolve_dir<R: Directory, D: BlockDevice>(
    dir: &R,
    vol: &mut VolumeMut<'_, D>,
    path: &[u8],
) -> Result<u32> {
    let (mut cur, rest) = start_of(vol, path);
    for part in components(rest) {
        cur = enter(dir, vol, cur, part)?;
    }
    Ok(cur)
}

fn start_of<'p, D: BlockDevice>(vol: &VolumeMut<'_, D>, path: &'p [u8]) -> (u32, &'p [u8]) {
    let root = vol.volume().root_block();
    if let Some(i) = path.iter().position(|&c| c == b':') {
        (root, &path[i + 1..])
    } else if let Some(rest) = path.strip_prefix(b"/") {
        (root, rest)
    } else {
        (vol.volume().current_dir(), path)
    }
}

fn components(path: &[u8]) -> impl Iterator<Item = &[u8]> {
    path.split(|&c| c == b'/').filter(|p| !p.is_empty())
}

fn enter<R: Directory, D: BlockDevice>(
    dir: &R,
    vol: &mut VolumeMut<'_, D>,
    parent: u32,
    name: &[u8],
) -> Result<u32> {
    let block = dir.lookup(vol, parent, name)?.ok_or(AffsError::NotFound)?;
    if !vol.read_entry(block)?.is_dir() {
        return Err(AffsError::NotADirectory);
    }
    Ok(block)
}

/// Directory listing entry.
#[derive(Debug, Clone)]
pub struct DirEntry {
    name: [u8; MAX_NAME_LEN],
    name_len: u8,
    /// Header block, volume-relative.
    pub block: u32,
    /// Secondary type.
    pub sec_type: i32,
    /// File size (0 for directories).
    pub size: u32,
    /// Protection bits.
    pub access: Access,
    /// Last modification date.
    pub date: AmigaDate,
}

impl DirEntry {
    fn from_entry_block(block: u32, entry: &EntryBlock) -> Self {
        let mut name = [0u8; MAX_NAME_LEN];
        name[..entry.name().len()].copy_from_slice(entry.name());
        Self {
            name,
            name_len: entry.name_len,
            block,
            sec_type: entry.sec_type,
            size: entry.byte_size,
            access: entry.access(),
            date: entry.date,
        }
    }

    /// Entry name.
    #[inline]
    pub fn name(&self) -> &[u8] {
        &self.name[..self.name_len as usize]
    }

    /// Entry name as str (if valid UTF-8).
    #[inline]
    pub fn name_str(&self) -> Option<&str> {
        crate::utf8::name_str(self.name())
    }

    /// Check if this is a directory.
    #[inline]
    pub const fn is_dir(&self) -> bool {
        self.sec_type == ST_DIR || self.sec_type == ST_LDIR
    }

    /// Check if this is a file.
    #[inline]
    pub const fn is_file(&self) -> bool {
        self.sec_type == ST_FILE || self.sec_type == ST_LFILE
    }
}

impl<D: BlockDevice> VolumeMut<'_, D> {
    /// Change the current directory; relative paths start there.
    pub fn set_current_dir(&mut self, path: impl AsRef<[u8]>) -> Result<()> {
        self.set_current_dir_with(&HashDirectory, path)
    }

    /// [`set_current_dir`](Self::set_current_dir) through a custom resolver.
    pub fn set_current_dir_with<R: Directory>(
        &mut self,
        dir: &R,
        path: impl AsRef<[u8]>,
    ) -> Result<()> {
        let block = resolve_dir(dir, self, path.as_ref())?;
        self.volume_mut().cur_dir = block;
        Ok(())
    }

    /// List the directory at `path` in hash-table order.
    pub fn read_dir(&mut self, path: impl AsRef<[u8]>) -> Result<Vec<DirEntry>> {
        let block = resolve_dir(&HashDirectory, self, path.as_ref())?;
        let dir = self.read_entry(block)?;
        let limit = self.chain_limit();
        let mut entries = Vec::new();
        for &start in dir.hash_table.iter().filter(|&&b| b != 0) {
            for item in chain_iter(start, limit, |b| self.read_entry(b)) {
                let (b, entry) = item?;
                entries.push(DirEntry::from_entry_block(b, &entry));
            }
        }
        Ok(entries)
    }
}
