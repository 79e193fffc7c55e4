//! Filesystem block codecs.
//!
//! Each record decodes from and encodes to a raw big-endian block. Decoding
//! validates the block and secondary types only; checksums are checked by the
//! caller so that it can decide between a hard failure and a warning.

use crate::chain::ChainLink;
use crate::checksum::{
    boot_sum, read_i32_be, read_u32_be, set_normal_sum, verify_normal_sum, write_i32_be,
    write_u32_be,
};
use crate::constants::*;
use crate::date::AmigaDate;
use crate::error::{AffsError, Result};
use crate::types::{Access, DosType};
use crate::utf8;

/// Checksum offset shared by root, entry, extension and OFS data blocks.
pub const HEADER_CHECKSUM_OFFSET: usize = 20;

/// Parsed boot block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootBlock {
    /// Filesystem flavour from the `DOS\x` signature.
    pub dos_type: DosType,
    /// Stored checksum.
    pub checksum: u32,
    /// Root block number (0 when the disk leaves it implicit).
    pub root_block: u32,
}

impl BootBlock {
    /// Decode from the first two blocks of a volume.
    pub fn decode(buf: &[u8; BOOT_BLOCK_SIZE]) -> Result<Self> {
        let dos_type = DosType::from_signature([buf[0], buf[1], buf[2], buf[3]])
            .ok_or(AffsError::InvalidDosType)?;
        Ok(Self {
            dos_type,
            checksum: read_u32_be(buf, 4),
            root_block: read_u32_be(buf, 8),
        })
    }

    /// A boot block without boot code.
    pub const fn new(dos_type: DosType, root_block: u32) -> Self {
        Self {
            dos_type,
            checksum: 0,
            root_block,
        }
    }

    /// Returns false when boot code is present and its checksum is wrong.
    pub fn checksum_valid(buf: &[u8; BOOT_BLOCK_SIZE]) -> bool {
        buf[12] == 0 || read_u32_be(buf, 4) == boot_sum(buf)
    }

    /// Encode; the checksum is only filled for bootable layouts (root at 880).
    pub fn encode(&self) -> [u8; BOOT_BLOCK_SIZE] {
        let mut buf = [0u8; BOOT_BLOCK_SIZE];
        buf[..4].copy_from_slice(&self.dos_type.signature());
        write_u32_be(&mut buf, 8, self.root_block);
        if self.root_block == FLOPPY_DD_SECTORS / 2 {
            let sum = boot_sum(&buf);
            write_u32_be(&mut buf, 4, sum);
        }
        buf
    }
}

/// Parsed root block.
#[derive(Debug, Clone)]
pub struct RootBlock {
    /// Hash table entries.
    pub hash_table: [u32; HASH_TABLE_SIZE],
    /// Bitmap valid flag (-1 = valid, 0 = invalid).
    pub bm_flag: i32,
    /// Bitmap block pointers.
    pub bm_pages: [u32; BM_PAGES_ROOT_SIZE],
    /// First bitmap extension block.
    pub bm_ext: u32,
    /// Root directory alteration date.
    pub root_modified: AmigaDate,
    /// Disk name length.
    pub name_len: u8,
    /// Disk name (up to 30 chars).
    pub disk_name: [u8; MAX_NAME_LEN],
    /// Last disk alteration date, stamped on every bitmap flush.
    pub disk_modified: AmigaDate,
    /// Filesystem creation date.
    pub created: AmigaDate,
    /// Directory cache extension (FFS only).
    pub extension: u32,
}

impl RootBlock {
    /// An empty root directory for a freshly formatted volume.
    pub fn new(name: &[u8], date: AmigaDate) -> Self {
        let (disk_name, name_len) = fixed_name(name);
        Self {
            hash_table: [0; HASH_TABLE_SIZE],
            bm_flag: BM_VALID,
            bm_pages: [0; BM_PAGES_ROOT_SIZE],
            bm_ext: 0,
            root_modified: date,
            name_len,
            disk_name,
            disk_modified: date,
            created: date,
            extension: 0,
        }
    }

    /// Decode root block from raw data.
    pub fn decode(buf: &[u8; BLOCK_SIZE]) -> Result<Self> {
        if read_i32_be(buf, 0) != T_HEADER {
            return Err(AffsError::InvalidBlockType);
        }
        if read_i32_be(buf, 0x1FC) != ST_ROOT {
            return Err(AffsError::InvalidSecType);
        }

        let mut hash_table = [0u32; HASH_TABLE_SIZE];
        read_table(buf, 24, &mut hash_table);
        let mut bm_pages = [0u32; BM_PAGES_ROOT_SIZE];
        read_table(buf, 0x13C, &mut bm_pages);
        let (disk_name, name_len) = read_name(buf, 0x1B0);

        Ok(Self {
            hash_table,
            bm_flag: read_i32_be(buf, 0x138),
            bm_pages,
            bm_ext: read_u32_be(buf, 0x1A0),
            root_modified: AmigaDate::read(buf, 0x1A4),
            name_len,
            disk_name,
            disk_modified: AmigaDate::read(buf, 0x1D8),
            created: AmigaDate::read(buf, 0x1E4),
            extension: read_u32_be(buf, 0x1F8),
        })
    }

    /// Encode with a fresh checksum.
    pub fn encode(&self) -> [u8; BLOCK_SIZE] {
        let mut buf = [0u8; BLOCK_SIZE];
        write_i32_be(&mut buf, 0, T_HEADER);
        write_u32_be(&mut buf, 12, HASH_TABLE_SIZE as u32);
        write_table(&mut buf, 24, &self.hash_table);
        write_i32_be(&mut buf, 0x138, self.bm_flag);
        write_table(&mut buf, 0x13C, &self.bm_pages);
        write_u32_be(&mut buf, 0x1A0, self.bm_ext);
        self.root_modified.write(&mut buf, 0x1A4);
        write_name(&mut buf, 0x1B0, self.name());
        self.disk_modified.write(&mut buf, 0x1D8);
        self.created.write(&mut buf, 0x1E4);
        write_u32_be(&mut buf, 0x1F8, self.extension);
        write_i32_be(&mut buf, 0x1FC, ST_ROOT);
        set_normal_sum(&mut buf, HEADER_CHECKSUM_OFFSET);
        buf
    }

    /// Disk name as bytes.
    #[inline]
    pub fn name(&self) -> &[u8] {
        &self.disk_name[..self.name_len as usize]
    }

    /// Disk name as str (if valid UTF-8).
    #[inline]
    pub fn name_str(&self) -> Option<&str> {
        utf8::name_str(self.name())
    }

    /// Check if bitmap is valid.
    #[inline]
    pub const fn bitmap_valid(&self) -> bool {
        self.bm_flag == BM_VALID
    }
}

/// Parsed entry block (file header or directory).
#[derive(Debug, Clone)]
pub struct EntryBlock {
    /// This block's sector number.
    pub header_key: u32,
    /// Number of data block pointers in use (files).
    pub high_seq: u32,
    /// First data block (files only).
    pub first_data: u32,
    /// Hash table (directories) or reverse-filled data block pointers (files).
    pub hash_table: [u32; HASH_TABLE_SIZE],
    /// Access flags.
    pub access: u32,
    /// File size in bytes (files only).
    pub byte_size: u32,
    /// Comment length.
    pub comment_len: u8,
    /// Comment (up to 79 chars).
    pub comment: [u8; MAX_COMMENT_LEN],
    /// Last modification date.
    pub date: AmigaDate,
    /// Name length.
    pub name_len: u8,
    /// Entry name (up to 30 chars).
    pub name: [u8; MAX_NAME_LEN],
    /// Real entry (for hard links).
    pub real_entry: u32,
    /// Next link in chain.
    pub next_link: u32,
    /// Next entry with same hash.
    pub next_same_hash: u32,
    /// Parent directory block.
    pub parent: u32,
    /// First extension block (files) or directory cache block.
    pub extension: u32,
    /// Secondary type.
    pub sec_type: i32,
}

impl EntryBlock {
    /// A zero-length file header.
    pub fn new_file(header_key: u32, parent: u32, name: &[u8], date: AmigaDate) -> Self {
        let (name, name_len) = fixed_name(name);
        Self {
            header_key,
            high_seq: 0,
            first_data: 0,
            hash_table: [0; HASH_TABLE_SIZE],
            access: 0,
            byte_size: 0,
            comment_len: 0,
            comment: [0; MAX_COMMENT_LEN],
            date,
            name_len,
            name,
            real_entry: 0,
            next_link: 0,
            next_same_hash: 0,
            parent,
            extension: 0,
            sec_type: ST_FILE,
        }
    }

    /// Decode entry block from raw data.
    pub fn decode(buf: &[u8; BLOCK_SIZE]) -> Result<Self> {
        if read_i32_be(buf, 0) != T_HEADER {
            return Err(AffsError::InvalidBlockType);
        }

        let mut hash_table = [0u32; HASH_TABLE_SIZE];
        read_table(buf, 24, &mut hash_table);

        let comment_len = buf[0x148].min(MAX_COMMENT_LEN as u8);
        let mut comment = [0u8; MAX_COMMENT_LEN];
        comment[..comment_len as usize].copy_from_slice(&buf[0x149..0x149 + comment_len as usize]);
        let (name, name_len) = read_name(buf, 0x1B0);

        Ok(Self {
            header_key: read_u32_be(buf, 4),
            high_seq: read_u32_be(buf, 8),
            first_data: read_u32_be(buf, 16),
            hash_table,
            access: read_u32_be(buf, 0x140),
            byte_size: read_u32_be(buf, 0x144),
            comment_len,
            comment,
            date: AmigaDate::read(buf, 0x1A4),
            name_len,
            name,
            real_entry: read_u32_be(buf, 0x1D4),
            next_link: read_u32_be(buf, 0x1D8),
            next_same_hash: read_u32_be(buf, 0x1F0),
            parent: read_u32_be(buf, 0x1F4),
            extension: read_u32_be(buf, 0x1F8),
            sec_type: read_i32_be(buf, 0x1FC),
        })
    }

    /// Encode with a fresh checksum.
    pub fn encode(&self) -> [u8; BLOCK_SIZE] {
        let mut buf = [0u8; BLOCK_SIZE];
        write_i32_be(&mut buf, 0, T_HEADER);
        write_u32_be(&mut buf, 4, self.header_key);
        write_u32_be(&mut buf, 8, self.high_seq);
        write_u32_be(&mut buf, 16, self.first_data);
        write_table(&mut buf, 24, &self.hash_table);
        write_u32_be(&mut buf, 0x140, self.access);
        write_u32_be(&mut buf, 0x144, self.byte_size);
        buf[0x148] = self.comment_len;
        buf[0x149..0x149 + self.comment_len as usize].copy_from_slice(self.comment());
        self.date.write(&mut buf, 0x1A4);
        write_name(&mut buf, 0x1B0, self.name());
        write_u32_be(&mut buf, 0x1D4, self.real_entry);
        write_u32_be(&mut buf, 0x1D8, self.next_link);
        write_u32_be(&mut buf, 0x1F0, self.next_same_hash);
        write_u32_be(&mut buf, 0x1F4, self.parent);
        write_u32_be(&mut buf, 0x1F8, self.extension);
        write_i32_be(&mut buf, 0x1FC, self.sec_type);
        set_normal_sum(&mut buf, HEADER_CHECKSUM_OFFSET);
        buf
    }

    /// Get entry name as byte slice.
    #[inline]
    pub fn name(&self) -> &[u8] {
        &self.name[..self.name_len as usize]
    }

    /// Get comment as byte slice.
    #[inline]
    pub fn comment(&self) -> &[u8] {
        &self.comment[..self.comment_len as usize]
    }

    /// Protection bits.
    #[inline]
    pub const fn access(&self) -> Access {
        Access(self.access)
    }

    /// Check if this is a directory.
    #[inline]
    pub const fn is_dir(&self) -> bool {
        self.sec_type == ST_DIR || self.sec_type == ST_LDIR || self.sec_type == ST_ROOT
    }

    /// Check if this is a file.
    #[inline]
    pub const fn is_file(&self) -> bool {
        self.sec_type == ST_FILE || self.sec_type == ST_LFILE
    }

    /// Data block pointer at write-order index (0 is the first data block).
    #[inline]
    pub const fn data_block(&self, index: usize) -> u32 {
        table_get(&self.hash_table, index)
    }

    /// Set the data block pointer at write-order index.
    #[inline]
    pub fn set_data_block(&mut self, index: usize, block: u32) {
        table_set(&mut self.hash_table, index, block);
    }
}

impl ChainLink for EntryBlock {
    fn next_link(&self) -> u32 {
        self.next_same_hash
    }
}

/// Parsed file extension block.
#[derive(Debug, Clone)]
pub struct FileExtBlock {
    /// This block's sector number.
    pub header_key: u32,
    /// Number of data block pointers in use.
    pub high_seq: u32,
    /// Reverse-filled data block pointers.
    pub data_blocks: [u32; MAX_DATABLK],
    /// Parent (file header block).
    pub parent: u32,
    /// Next extension block.
    pub extension: u32,
}

impl FileExtBlock {
    /// An empty extension block owned by `parent`.
    pub const fn new(header_key: u32, parent: u32) -> Self {
        Self {
            header_key,
            high_seq: 0,
            data_blocks: [0; MAX_DATABLK],
            parent,
            extension: 0,
        }
    }

    /// Decode file extension block from raw data.
    pub fn decode(buf: &[u8; BLOCK_SIZE]) -> Result<Self> {
        if read_i32_be(buf, 0) != T_LIST {
            return Err(AffsError::InvalidBlockType);
        }
        if read_i32_be(buf, 0x1FC) != ST_FILE {
            return Err(AffsError::InvalidSecType);
        }
        let mut data_blocks = [0u32; MAX_DATABLK];
        read_table(buf, 24, &mut data_blocks);
        Ok(Self {
            header_key: read_u32_be(buf, 4),
            high_seq: read_u32_be(buf, 8),
            data_blocks,
            parent: read_u32_be(buf, 0x1F4),
            extension: read_u32_be(buf, 0x1F8),
        })
    }

    /// Encode with a fresh checksum.
    pub fn encode(&self) -> [u8; BLOCK_SIZE] {
        let mut buf = [0u8; BLOCK_SIZE];
        write_i32_be(&mut buf, 0, T_LIST);
        write_u32_be(&mut buf, 4, self.header_key);
        write_u32_be(&mut buf, 8, self.high_seq);
        write_table(&mut buf, 24, &self.data_blocks);
        write_u32_be(&mut buf, 0x1F4, self.parent);
        write_u32_be(&mut buf, 0x1F8, self.extension);
        write_i32_be(&mut buf, 0x1FC, ST_FILE);
        set_normal_sum(&mut buf, HEADER_CHECKSUM_OFFSET);
        buf
    }

    /// Data block pointer at write-order index.
    #[inline]
    pub const fn data_block(&self, index: usize) -> u32 {
        table_get(&self.data_blocks, index)
    }

    /// Set the data block pointer at write-order index.
    #[inline]
    pub fn set_data_block(&mut self, index: usize, block: u32) {
        table_set(&mut self.data_blocks, index, block);
    }
}

impl ChainLink for FileExtBlock {
    fn next_link(&self) -> u32 {
        self.extension
    }
}

/// OFS data block header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OfsDataBlock {
    /// File header block pointer.
    pub header_key: u32,
    /// Sequence number (1-based).
    pub seq_num: u32,
    /// Payload bytes used in this block.
    pub data_size: u32,
    /// Next data block.
    pub next_data: u32,
}

impl OfsDataBlock {
    /// OFS data block header size.
    pub const HEADER_SIZE: usize = 24;

    /// Decode the header of an OFS data block.
    pub fn decode(buf: &[u8; BLOCK_SIZE]) -> Result<Self> {
        if read_i32_be(buf, 0) != T_DATA {
            return Err(AffsError::InvalidBlockType);
        }
        Ok(Self {
            header_key: read_u32_be(buf, 4),
            seq_num: read_u32_be(buf, 8),
            data_size: read_u32_be(buf, 12),
            next_data: read_u32_be(buf, 16),
        })
    }

    /// Write this header over `buf` and checksum the whole block, payload included.
    pub fn seal(&self, buf: &mut [u8; BLOCK_SIZE]) {
        write_i32_be(buf, 0, T_DATA);
        write_u32_be(buf, 4, self.header_key);
        write_u32_be(buf, 8, self.seq_num);
        write_u32_be(buf, 12, self.data_size);
        write_u32_be(buf, 16, self.next_data);
        set_normal_sum(buf, HEADER_CHECKSUM_OFFSET);
    }
}

/// One page of the free-space bitmap; a set bit marks a free block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitmapBlock {
    /// Map words, bit `i` of word `w` covers block `w * 32 + i` of the page.
    pub map: [u32; BM_MAP_SIZE],
}

impl BitmapBlock {
    /// A page with every block marked used.
    pub const fn all_used() -> Self {
        Self {
            map: [0; BM_MAP_SIZE],
        }
    }

    /// Decode; checksum is at offset 0 and checked by the caller.
    pub fn decode(buf: &[u8; BLOCK_SIZE]) -> Self {
        let mut map = [0u32; BM_MAP_SIZE];
        read_table(buf, 4, &mut map);
        Self { map }
    }

    /// Encode with a fresh checksum.
    pub fn encode(&self) -> [u8; BLOCK_SIZE] {
        let mut buf = [0u8; BLOCK_SIZE];
        write_table(&mut buf, 4, &self.map);
        set_normal_sum(&mut buf, 0);
        buf
    }

    /// Check the stored checksum.
    #[inline]
    pub fn checksum_valid(buf: &[u8; BLOCK_SIZE]) -> bool {
        verify_normal_sum(buf, 0)
    }
}

/// Continuation of the root block's bitmap page table. Carries no checksum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitmapExtBlock {
    /// Bitmap block pointers.
    pub pages: [u32; BM_PAGES_EXT_SIZE],
    /// Next bitmap extension block, 0 if last.
    pub next: u32,
}

impl BitmapExtBlock {
    /// Decode from raw data.
    pub fn decode(buf: &[u8; BLOCK_SIZE]) -> Self {
        let mut pages = [0u32; BM_PAGES_EXT_SIZE];
        read_table(buf, 0, &mut pages);
        Self {
            pages,
            next: read_u32_be(buf, 0x1FC),
        }
    }

    /// Encode to raw data.
    pub fn encode(&self) -> [u8; BLOCK_SIZE] {
        let mut buf = [0u8; BLOCK_SIZE];
        write_table(&mut buf, 0, &self.pages);
        write_u32_be(&mut buf, 0x1FC, self.next);
        buf
    }
}

impl ChainLink for BitmapExtBlock {
    fn next_link(&self) -> u32 {
        self.next
    }
}

/// An empty directory cache block, written when formatting DIRCACHE volumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirCacheBlock {
    /// This block's sector number.
    pub header_key: u32,
    /// Directory the cache belongs to.
    pub parent: u32,
}

impl DirCacheBlock {
    /// Encode with no records and no successor.
    pub fn encode(&self) -> [u8; BLOCK_SIZE] {
        let mut buf = [0u8; BLOCK_SIZE];
        write_i32_be(&mut buf, 0, T_DIRC);
        write_u32_be(&mut buf, 4, self.header_key);
        write_u32_be(&mut buf, 8, self.parent);
        set_normal_sum(&mut buf, HEADER_CHECKSUM_OFFSET);
        buf
    }
}

#[inline]
const fn table_get(table: &[u32; MAX_DATABLK], index: usize) -> u32 {
    if index < MAX_DATABLK {
        table[MAX_DATABLK - 1 - index]
    } else {
        0
    }
}

#[inline]
fn table_set(table: &mut [u32; MAX_DATABLK], index: usize, block: u32) {
    debug_assert!(index < MAX_DATABLK);
    table[MAX_DATABLK - 1 - index] = block;
}

fn read_table(buf: &[u8], offset: usize, out: &mut [u32]) {
    for (i, slot) in out.iter_mut().enumerate() {
        *slot = read_u32_be(buf, offset + i * 4);
    }
}

fn write_table(buf: &mut [u8], offset: usize, table: &[u32]) {
    for (i, &v) in table.iter().enumerate() {
        write_u32_be(buf, offset + i * 4, v);
    }
}

fn read_name(buf: &[u8], offset: usize) -> ([u8; MAX_NAME_LEN], u8) {
    let len = buf[offset].min(MAX_NAME_LEN as u8);
    let mut name = [0u8; MAX_NAME_LEN];
    name[..len as usize].copy_from_slice(&buf[offset + 1..offset + 1 + len as usize]);
    (name, len)
}

fn write_name(buf: &mut [u8], offset: usize, name: &[u8]) {
    buf[offset] = name.len() as u8;
    buf[offset + 1..offset + 1 + name.len()].copy_from_slice(name);
}

fn fixed_name(name: &[u8]) -> ([u8; MAX_NAME_LEN], u8) {
    let len = name.len().min(MAX_NAME_LEN);
    let mut out = [0u8; MAX_NAME_LEN];
    out[..len].copy_from_slice(&name[..len]);
    (out, len as u8)
}

/// Compute hash value for a name.
///
/// This implements the Amiga filename hashing algorithm.
#[inline]
pub fn hash_name(name: &[u8], intl: bool) -> usize {
    let hash = name.iter().fold(name.len() as u32, |hash, &c| {
        let upper = if intl {
            intl_to_upper(c)
        } else {
            c.to_ascii_uppercase()
        };
        (hash.wrapping_mul(13).wrapping_add(upper as u32)) & 0x7FF
    });
    (hash % HASH_TABLE_SIZE as u32) as usize
}

/// Convert character to uppercase with international support.
///
/// Latin-1 lowercase letters 224-254 (except the division sign 247) map to
/// their uppercase forms by subtracting 32.
#[inline]
pub const fn intl_to_upper(c: u8) -> u8 {
    if c.is_ascii_lowercase() || (c >= 224 && c <= 254 && c != 247) {
        c - 32
    } else {
        c
    }
}

/// Compare two names for equality (case-insensitive).
#[inline]
pub fn names_equal(a: &[u8], b: &[u8], intl: bool) -> bool {
    if intl {
        a.len() == b.len()
            && a
                .iter()
                .zip(b)
                .all(|(&x, &y)| intl_to_upper(x) == intl_to_upper(y))
    } else {
        a.eq_ignore_ascii_case(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::sums_to_zero;

    #[test]
    fn test_hash_name() {
        assert!(hash_name(b"test", false) < HASH_TABLE_SIZE);
        assert_eq!(hash_name(b"", false), 0);
        assert_eq!(hash_name(b"Readme", false), hash_name(b"README", false));
    }

    #[test]
    fn test_intl_to_upper() {
        assert_eq!(intl_to_upper(b'a'), b'A');
        assert_eq!(intl_to_upper(b'A'), b'A');
        assert_eq!(intl_to_upper(224), 192);
        assert_eq!(intl_to_upper(247), 247);
    }

    #[test]
    fn test_names_equal() {
        assert!(names_equal(b"Test", b"test", false));
        assert!(!names_equal(b"Test", b"test2", false));
        assert!(names_equal(&[224], &[192], true));
        assert!(!names_equal(&[224], &[192], false));
    }

    #[test]
    fn test_root_encode_decode() {
        let mut root = RootBlock::new(b"Workbench", AmigaDate::new(10, 20, 30));
        root.bm_pages[0] = 881;
        root.hash_table[5] = 900;
        let buf = root.encode();
        assert!(sums_to_zero(&buf));
        assert_eq!(read_u32_be(&buf, 12), 72);

        let back = RootBlock::decode(&buf).unwrap();
        assert_eq!(back.name(), b"Workbench");
        assert_eq!(back.bm_pages[0], 881);
        assert_eq!(back.hash_table[5], 900);
        assert_eq!(back.created, AmigaDate::new(10, 20, 30));
        assert!(back.bitmap_valid());
    }

    #[test]
    fn test_entry_reverse_fill() {
        let mut hdr = EntryBlock::new_file(900, 880, b"file", AmigaDate::default());
        hdr.set_data_block(0, 901);
        hdr.set_data_block(1, 902);
        assert_eq!(hdr.hash_table[71], 901);
        assert_eq!(hdr.hash_table[70], 902);
        assert_eq!(hdr.data_block(1), 902);
        assert_eq!(hdr.data_block(72), 0);

        let buf = hdr.encode();
        assert!(sums_to_zero(&buf));
        assert_eq!(read_u32_be(&buf, 24 + 71 * 4), 901);
        assert_eq!(read_i32_be(&buf, 0x1FC), ST_FILE);
        let back = EntryBlock::decode(&buf).unwrap();
        assert!(back.is_file());
        assert_eq!(back.name(), b"file");
    }

    #[test]
    fn test_ext_block_rejects_wrong_type() {
        let ext = FileExtBlock::new(1000, 900);
        let mut buf = ext.encode();
        assert!(FileExtBlock::decode(&buf).is_ok());
        write_i32_be(&mut buf, 0, T_HEADER);
        assert_eq!(
            FileExtBlock::decode(&buf).unwrap_err(),
            AffsError::InvalidBlockType
        );
    }

    #[test]
    fn test_ofs_seal_covers_payload() {
        let mut buf = [0u8; BLOCK_SIZE];
        buf[OfsDataBlock::HEADER_SIZE..].fill(0x33);
        let hdr = OfsDataBlock {
            header_key: 900,
            seq_num: 1,
            data_size: 488,
            next_data: 0,
        };
        hdr.seal(&mut buf);
        assert!(sums_to_zero(&buf));
        assert_eq!(OfsDataBlock::decode(&buf).unwrap(), hdr);
    }

    #[test]
    fn test_bitmap_block_checksum() {
        let mut page = BitmapBlock::all_used();
        page.map[0] = 0xFFFF_FFFC;
        let buf = page.encode();
        assert!(BitmapBlock::checksum_valid(&buf));
        assert_eq!(BitmapBlock::decode(&buf), page);
    }

    #[test]
    fn test_boot_block_signature() {
        let boot = BootBlock::new(DosType::FFS, 880);
        let buf = boot.encode();
        assert_eq!(&buf[..4], b"DOS\x01");
        assert_eq!(read_u32_be(&buf, 4), boot_sum(&buf));
        let back = BootBlock::decode(&buf).unwrap();
        assert_eq!(back.root_block, 880);
        assert!(BootBlock::checksum_valid(&buf));

        let mut bad = buf;
        bad[0] = b'X';
        assert_eq!(BootBlock::decode(&bad), Err(AffsError::InvalidDosType));
    }
}
