//! Rigid Disk Block partition table records.
//!
//! A partitioned hard disk starts with an `RDSK` block at sector 0 that heads
//! two chains: the `PART` blocks describing each volume's cylinder range, and
//! the `FSHD` blocks naming filesystem drivers, each followed by its own
//! chain of `LSEG` blocks carrying the driver code. All four share a header
//! of identifier, size in longwords and a checksum at offset 8.

use crate::chain::ChainLink;
use crate::checksum::{
    read_i32_be, read_u16_be, read_u32_be, set_normal_sum, verify_normal_sum, write_i32_be,
    write_u16_be, write_u32_be,
};
use crate::constants::*;
use crate::error::{AffsError, Diagnostics, Result, WarningKind};
use crate::types::DosType;

/// Checksum offset shared by every RDB record.
pub const RDB_CHECKSUM_OFFSET: usize = 8;

/// Host id written into fresh records.
const HOST_ID: u32 = 7;

/// Shared codec contract of the partition table records.
pub trait Record: Sized {
    /// Four-byte identifier at offset 0.
    const ID: [u8; 4];
    /// Size in longwords written to new records.
    const LONGS: u32;

    /// Decode the record fields; fails if the identifier does not match.
    fn decode(buf: &[u8; BLOCK_SIZE]) -> Result<Self>;

    /// Encode the record fields with a fresh checksum.
    fn encode(&self) -> [u8; BLOCK_SIZE];

    /// Decode and report size or checksum problems for `block` as warnings.
    fn decode_checked(buf: &[u8; BLOCK_SIZE], block: u32, diag: &mut Diagnostics) -> Result<Self> {
        let record = Self::decode(buf)?;
        let size = read_u32_be(buf, 4);
        if size != Self::LONGS {
            diag.warn(block, WarningKind::UnexpectedSize(size));
        }
        if !checksum_valid(buf, Self::LONGS) {
            diag.warn(block, WarningKind::ChecksumMismatch);
        }
        Ok(record)
    }
}

/// Check the checksum over the record's declared size, falling back to `default_longs`.
pub fn checksum_valid(buf: &[u8; BLOCK_SIZE], default_longs: u32) -> bool {
    let declared = read_u32_be(buf, 4);
    let longs = if (3..=LSEG_RECORD_LONGS).contains(&declared) {
        declared
    } else {
        default_longs
    };
    verify_normal_sum(&buf[..longs as usize * 4], RDB_CHECKSUM_OFFSET)
}

fn check_id(buf: &[u8; BLOCK_SIZE], id: [u8; 4]) -> Result<()> {
    if buf[..4] == id {
        Ok(())
    } else {
        Err(AffsError::InvalidBlockType)
    }
}

fn seal<R: Record>(mut buf: [u8; BLOCK_SIZE]) -> [u8; BLOCK_SIZE] {
    buf[..4].copy_from_slice(&R::ID);
    write_u32_be(&mut buf, 4, R::LONGS);
    set_normal_sum(&mut buf[..R::LONGS as usize * 4], RDB_CHECKSUM_OFFSET);
    buf
}

fn bytes<const N: usize>(buf: &[u8], offset: usize) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&buf[offset..offset + N]);
    out
}

/// Printable prefix of a fixed-width text field, up to the first NUL.
fn text(field: &[u8]) -> &[u8] {
    let end = memchr::memchr(0, field).unwrap_or(field.len());
    &field[..end]
}

/// Rigid Disk Block: device geometry and the heads of the record chains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RigidDiskBlock {
    /// SCSI host id of the controller.
    pub host_id: u32,
    /// Declared physical block size in bytes.
    pub block_size: u32,
    /// Drive flags.
    pub flags: u32,
    /// Head of the bad block list.
    pub bad_block_list: u32,
    /// Head of the partition chain.
    pub partition_list: u32,
    /// Head of the filesystem header chain.
    pub fs_header_list: u32,
    /// Drive init code block.
    pub drive_init: u32,
    /// Cylinder count.
    pub cylinders: u32,
    /// Sectors per track.
    pub sectors: u32,
    /// Head count.
    pub heads: u32,
    /// Interleave.
    pub interleave: u32,
    /// Parking zone cylinder.
    pub parking_zone: u32,
    /// First block reserved for the RDB area.
    pub rdb_block_lo: u32,
    /// Last block reserved for the RDB area.
    pub rdb_block_hi: u32,
    /// First cylinder available to partitions.
    pub lo_cylinder: u32,
    /// Last cylinder available to partitions.
    pub hi_cylinder: u32,
    /// Blocks per cylinder.
    pub cyl_blocks: u32,
    /// Highest block used by the RDB area.
    pub high_rdsk_block: u32,
    /// Disk vendor, space padded.
    pub disk_vendor: [u8; 8],
    /// Disk product, space padded.
    pub disk_product: [u8; 16],
    /// Disk revision.
    pub disk_revision: [u8; 4],
}

impl RigidDiskBlock {
    /// A fresh RDB for a disk of the given geometry with `partitions` PART blocks.
    pub fn new(cylinders: u32, heads: u32, sectors: u32, partitions: u32) -> Self {
        Self {
            host_id: HOST_ID,
            block_size: BLOCK_SIZE as u32,
            flags: 0,
            bad_block_list: RDB_END,
            partition_list: 1,
            fs_header_list: 1 + partitions,
            drive_init: RDB_END,
            cylinders,
            sectors,
            heads,
            interleave: 0,
            parking_zone: 0,
            rdb_block_lo: 0,
            rdb_block_hi: (sectors * heads * RDB_RESERVED_CYLINDERS).saturating_sub(1),
            lo_cylinder: RDB_RESERVED_CYLINDERS,
            hi_cylinder: cylinders.saturating_sub(1),
            cyl_blocks: sectors * heads,
            high_rdsk_block: partitions + 2,
            disk_vendor: *b"ADFlib  ",
            disk_product: *b"harddisk.adf    ",
            disk_revision: *b"v1.0",
        }
    }

    /// Decode and additionally warn on an unexpected block size or cylinder size.
    pub fn decode_rdb(buf: &[u8; BLOCK_SIZE], diag: &mut Diagnostics) -> Result<Self> {
        let rdsk = Self::decode_checked(buf, 0, diag)?;
        if rdsk.block_size != BLOCK_SIZE as u32 {
            diag.warn(0, WarningKind::UnexpectedBlockSize(rdsk.block_size));
        }
        if rdsk.cyl_blocks != rdsk.sectors.wrapping_mul(rdsk.heads) {
            diag.warn(0, WarningKind::GeometryMismatch);
        }
        Ok(rdsk)
    }

    /// Disk vendor without padding.
    pub fn vendor(&self) -> &[u8] {
        text(&self.disk_vendor).trim_ascii_end()
    }

    /// Disk product without padding.
    pub fn product(&self) -> &[u8] {
        text(&self.disk_product).trim_ascii_end()
    }
}

impl Record for RigidDiskBlock {
    const ID: [u8; 4] = ID_RDSK;
    const LONGS: u32 = RDB_RECORD_LONGS;

    fn decode(buf: &[u8; BLOCK_SIZE]) -> Result<Self> {
        check_id(buf, Self::ID)?;
        Ok(Self {
            host_id: read_u32_be(buf, 0x0C),
            block_size: read_u32_be(buf, 0x10),
            flags: read_u32_be(buf, 0x14),
            bad_block_list: read_u32_be(buf, 0x18),
            partition_list: read_u32_be(buf, 0x1C),
            fs_header_list: read_u32_be(buf, 0x20),
            drive_init: read_u32_be(buf, 0x24),
            cylinders: read_u32_be(buf, 0x40),
            sectors: read_u32_be(buf, 0x44),
            heads: read_u32_be(buf, 0x48),
            interleave: read_u32_be(buf, 0x4C),
            parking_zone: read_u32_be(buf, 0x50),
            rdb_block_lo: read_u32_be(buf, 0x80),
            rdb_block_hi: read_u32_be(buf, 0x84),
            lo_cylinder: read_u32_be(buf, 0x88),
            hi_cylinder: read_u32_be(buf, 0x8C),
            cyl_blocks: read_u32_be(buf, 0x90),
            high_rdsk_block: read_u32_be(buf, 0x98),
            disk_vendor: bytes(buf, 0xA0),
            disk_product: bytes(buf, 0xA8),
            disk_revision: bytes(buf, 0xB8),
        })
    }

    fn encode(&self) -> [u8; BLOCK_SIZE] {
        let mut buf = [0u8; BLOCK_SIZE];
        write_u32_be(&mut buf, 0x0C, self.host_id);
        write_u32_be(&mut buf, 0x10, self.block_size);
        write_u32_be(&mut buf, 0x14, self.flags);
        write_u32_be(&mut buf, 0x18, self.bad_block_list);
        write_u32_be(&mut buf, 0x1C, self.partition_list);
        write_u32_be(&mut buf, 0x20, self.fs_header_list);
        write_u32_be(&mut buf, 0x24, self.drive_init);
        write_u32_be(&mut buf, 0x40, self.cylinders);
        write_u32_be(&mut buf, 0x44, self.sectors);
        write_u32_be(&mut buf, 0x48, self.heads);
        write_u32_be(&mut buf, 0x4C, self.interleave);
        write_u32_be(&mut buf, 0x50, self.parking_zone);
        write_u32_be(&mut buf, 0x80, self.rdb_block_lo);
        write_u32_be(&mut buf, 0x84, self.rdb_block_hi);
        write_u32_be(&mut buf, 0x88, self.lo_cylinder);
        write_u32_be(&mut buf, 0x8C, self.hi_cylinder);
        write_u32_be(&mut buf, 0x90, self.cyl_blocks);
        write_u32_be(&mut buf, 0x98, self.high_rdsk_block);
        buf[0xA0..0xA8].copy_from_slice(&self.disk_vendor);
        buf[0xA8..0xB8].copy_from_slice(&self.disk_product);
        buf[0xB8..0xBC].copy_from_slice(&self.disk_revision);
        seal::<Self>(buf)
    }
}

/// Partition Block: one volume's cylinder range and DOS environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionBlock {
    /// SCSI host id.
    pub host_id: u32,
    /// Next partition block.
    pub next: u32,
    /// Partition flags (bootable, no-mount).
    pub flags: u32,
    /// Device flags.
    pub dev_flags: u32,
    /// Drive name length.
    pub name_len: u8,
    /// Drive name (BCPL string body).
    pub name: [u8; 31],
    /// Size of the DOS environment vector in longwords.
    pub vector_size: u32,
    /// Filesystem block size in longwords.
    pub block_size: u32,
    /// Sector origin.
    pub sec_org: u32,
    /// Heads.
    pub surfaces: u32,
    /// Sectors per filesystem block.
    pub sectors_per_block: u32,
    /// Sectors per track.
    pub blocks_per_track: u32,
    /// Reserved blocks at the start of the partition.
    pub dos_reserved: u32,
    /// Reserved blocks at the end of the partition.
    pub dos_pre_alloc: u32,
    /// Interleave.
    pub interleave: u32,
    /// First cylinder.
    pub low_cyl: u32,
    /// Last cylinder (inclusive).
    pub high_cyl: u32,
    /// Buffers to allocate.
    pub num_buffer: u32,
    /// Buffer memory type.
    pub buf_mem_type: u32,
    /// Maximum transfer size.
    pub max_transfer: u32,
    /// DMA address mask.
    pub mask: u32,
    /// Boot priority.
    pub boot_pri: i32,
    /// Filesystem signature.
    pub dos_type: [u8; 4],
}

impl PartitionBlock {
    /// A fresh partition over `low_cyl..=high_cyl`.
    pub fn new(
        name: &[u8],
        low_cyl: u32,
        high_cyl: u32,
        heads: u32,
        sectors: u32,
        dos_type: DosType,
    ) -> Self {
        let len = name.len().min(MAX_NAME_LEN);
        let mut fixed = [0u8; 31];
        fixed[..len].copy_from_slice(&name[..len]);
        Self {
            host_id: HOST_ID,
            next: RDB_END,
            flags: 0,
            dev_flags: 0,
            name_len: len as u8,
            name: fixed,
            vector_size: 16,
            block_size: (BLOCK_SIZE / 4) as u32,
            sec_org: 0,
            surfaces: heads,
            sectors_per_block: 1,
            blocks_per_track: sectors,
            dos_reserved: 2,
            dos_pre_alloc: 0,
            interleave: 0,
            low_cyl,
            high_cyl,
            num_buffer: 0,
            buf_mem_type: 0,
            max_transfer: 0,
            mask: 0,
            boot_pri: 0,
            dos_type: DosType(dos_type.0 & DOSFS_FFS).signature(),
        }
    }

    /// Drive name.
    pub fn name(&self) -> &[u8] {
        text(&self.name[..(self.name_len as usize).min(31)])
    }

    /// Filesystem block size in bytes.
    #[inline]
    pub const fn block_size_bytes(&self) -> u32 {
        self.block_size * 4
    }
}

impl ChainLink for PartitionBlock {
    fn next_link(&self) -> u32 {
        self.next
    }
}

impl Record for PartitionBlock {
    const ID: [u8; 4] = ID_PART;
    const LONGS: u32 = RDB_RECORD_LONGS;

    fn decode(buf: &[u8; BLOCK_SIZE]) -> Result<Self> {
        check_id(buf, Self::ID)?;
        Ok(Self {
            host_id: read_u32_be(buf, 0x0C),
            next: read_u32_be(buf, 0x10),
            flags: read_u32_be(buf, 0x14),
            dev_flags: read_u32_be(buf, 0x20),
            name_len: buf[0x24],
            name: bytes(buf, 0x25),
            vector_size: read_u32_be(buf, 0x80),
            block_size: read_u32_be(buf, 0x84),
            sec_org: read_u32_be(buf, 0x88),
            surfaces: read_u32_be(buf, 0x8C),
            sectors_per_block: read_u32_be(buf, 0x90),
            blocks_per_track: read_u32_be(buf, 0x94),
            dos_reserved: read_u32_be(buf, 0x98),
            dos_pre_alloc: read_u32_be(buf, 0x9C),
            interleave: read_u32_be(buf, 0xA0),
            low_cyl: read_u32_be(buf, 0xA4),
            high_cyl: read_u32_be(buf, 0xA8),
            num_buffer: read_u32_be(buf, 0xAC),
            buf_mem_type: read_u32_be(buf, 0xB0),
            max_transfer: read_u32_be(buf, 0xB4),
            mask: read_u32_be(buf, 0xB8),
            boot_pri: read_i32_be(buf, 0xBC),
            dos_type: bytes(buf, 0xC0),
        })
    }

    fn encode(&self) -> [u8; BLOCK_SIZE] {
        let mut buf = [0u8; BLOCK_SIZE];
        write_u32_be(&mut buf, 0x0C, self.host_id);
        write_u32_be(&mut buf, 0x10, self.next);
        write_u32_be(&mut buf, 0x14, self.flags);
        write_u32_be(&mut buf, 0x20, self.dev_flags);
        buf[0x24] = self.name_len;
        buf[0x25..0x44].copy_from_slice(&self.name);
        write_u32_be(&mut buf, 0x80, self.vector_size);
        write_u32_be(&mut buf, 0x84, self.block_size);
        write_u32_be(&mut buf, 0x88, self.sec_org);
        write_u32_be(&mut buf, 0x8C, self.surfaces);
        write_u32_be(&mut buf, 0x90, self.sectors_per_block);
        write_u32_be(&mut buf, 0x94, self.blocks_per_track);
        write_u32_be(&mut buf, 0x98, self.dos_reserved);
        write_u32_be(&mut buf, 0x9C, self.dos_pre_alloc);
        write_u32_be(&mut buf, 0xA0, self.interleave);
        write_u32_be(&mut buf, 0xA4, self.low_cyl);
        write_u32_be(&mut buf, 0xA8, self.high_cyl);
        write_u32_be(&mut buf, 0xAC, self.num_buffer);
        write_u32_be(&mut buf, 0xB0, self.buf_mem_type);
        write_u32_be(&mut buf, 0xB4, self.max_transfer);
        write_u32_be(&mut buf, 0xB8, self.mask);
        write_i32_be(&mut buf, 0xBC, self.boot_pri);
        buf[0xC0..0xC4].copy_from_slice(&self.dos_type);
        seal::<Self>(buf)
    }
}

/// Filesystem Header Block: identifies a filesystem driver stored on the disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsHeaderBlock {
    /// SCSI host id.
    pub host_id: u32,
    /// Next filesystem header.
    pub next: u32,
    /// Flags.
    pub flags: u32,
    /// Filesystem signature handled by this driver.
    pub dos_type: [u8; 4],
    /// Driver major version.
    pub major_version: u16,
    /// Driver minor version.
    pub minor_version: u16,
    /// Which of the following fields override the partition's environment.
    pub patch_flags: u32,
    /// Device node type.
    pub node_type: u32,
    /// Device node task.
    pub task: u32,
    /// Device node lock.
    pub lock: u32,
    /// Device node handler.
    pub handler: u32,
    /// Stack size.
    pub stack_size: u32,
    /// Task priority.
    pub priority: i32,
    /// Startup message.
    pub startup: u32,
    /// First load segment block of the driver code.
    pub seg_list_block: u32,
    /// Global vector.
    pub global_vec: u32,
}

impl FsHeaderBlock {
    /// A fresh header whose code starts at `seg_list_block`.
    pub fn new(dos_type: DosType, seg_list_block: u32) -> Self {
        Self {
            host_id: HOST_ID,
            next: RDB_END,
            flags: 0,
            dos_type: dos_type.signature(),
            major_version: 0,
            minor_version: 0,
            patch_flags: 0,
            node_type: 0,
            task: 0,
            lock: 0,
            handler: 0,
            stack_size: 0,
            priority: 0,
            startup: 0,
            seg_list_block,
            global_vec: 0,
        }
    }
}

impl ChainLink for FsHeaderBlock {
    fn next_link(&self) -> u32 {
        self.next
    }
}

impl Record for FsHeaderBlock {
    const ID: [u8; 4] = ID_FSHD;
    const LONGS: u32 = RDB_RECORD_LONGS;

    fn decode(buf: &[u8; BLOCK_SIZE]) -> Result<Self> {
        check_id(buf, Self::ID)?;
        Ok(Self {
            host_id: read_u32_be(buf, 0x0C),
            next: read_u32_be(buf, 0x10),
            flags: read_u32_be(buf, 0x14),
            dos_type: bytes(buf, 0x20),
            major_version: read_u16_be(buf, 0x24),
            minor_version: read_u16_be(buf, 0x26),
            patch_flags: read_u32_be(buf, 0x28),
            node_type: read_u32_be(buf, 0x2C),
            task: read_u32_be(buf, 0x30),
            lock: read_u32_be(buf, 0x34),
            handler: read_u32_be(buf, 0x38),
            stack_size: read_u32_be(buf, 0x3C),
            priority: read_i32_be(buf, 0x40),
            startup: read_u32_be(buf, 0x44),
            seg_list_block: read_u32_be(buf, 0x48),
            global_vec: read_u32_be(buf, 0x4C),
        })
    }

    fn encode(&self) -> [u8; BLOCK_SIZE] {
        let mut buf = [0u8; BLOCK_SIZE];
        write_u32_be(&mut buf, 0x0C, self.host_id);
        write_u32_be(&mut buf, 0x10, self.next);
        write_u32_be(&mut buf, 0x14, self.flags);
        buf[0x20..0x24].copy_from_slice(&self.dos_type);
        write_u16_be(&mut buf, 0x24, self.major_version);
        write_u16_be(&mut buf, 0x26, self.minor_version);
        write_u32_be(&mut buf, 0x28, self.patch_flags);
        write_u32_be(&mut buf, 0x2C, self.node_type);
        write_u32_be(&mut buf, 0x30, self.task);
        write_u32_be(&mut buf, 0x34, self.lock);
        write_u32_be(&mut buf, 0x38, self.handler);
        write_u32_be(&mut buf, 0x3C, self.stack_size);
        write_i32_be(&mut buf, 0x40, self.priority);
        write_u32_be(&mut buf, 0x44, self.startup);
        write_u32_be(&mut buf, 0x48, self.seg_list_block);
        write_u32_be(&mut buf, 0x4C, self.global_vec);
        seal::<Self>(buf)
    }
}

/// Load Segment Block: one slice of a filesystem driver's code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadSegBlock {
    /// SCSI host id.
    pub host_id: u32,
    /// Next load segment block.
    pub next: u32,
    /// Raw driver bytes.
    pub load_data: [u8; LSEG_DATA_SIZE],
}

impl LoadSegBlock {
    /// A fresh, empty and final segment.
    pub const fn new() -> Self {
        Self {
            host_id: HOST_ID,
            next: RDB_END,
            load_data: [0; LSEG_DATA_SIZE],
        }
    }
}

impl Default for LoadSegBlock {
    fn default() -> Self {
        Self::new()
    }
}

impl ChainLink for LoadSegBlock {
    fn next_link(&self) -> u32 {
        self.next
    }
}

impl Record for LoadSegBlock {
    const ID: [u8; 4] = ID_LSEG;
    const LONGS: u32 = LSEG_RECORD_LONGS;

    fn decode(buf: &[u8; BLOCK_SIZE]) -> Result<Self> {
        check_id(buf, Self::ID)?;
        Ok(Self {
            host_id: read_u32_be(buf, 0x0C),
            next: read_u32_be(buf, 0x10),
            load_data: bytes(buf, 0x14),
        })
    }

    fn encode(&self) -> [u8; BLOCK_SIZE] {
        let mut buf = [0u8; BLOCK_SIZE];
        write_u32_be(&mut buf, 0x0C, self.host_id);
        write_u32_be(&mut buf, 0x10, self.next);
        buf[0x14..].copy_from_slice(&self.load_data);
        seal::<Self>(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::sums_to_zero;

    #[test]
    fn test_rdsk_fresh_layout_fields() {
        let rdsk = RigidDiskBlock::new(100, 4, 32, 3);
        assert_eq!(rdsk.cyl_blocks, 128);
        assert_eq!(rdsk.rdb_block_hi, 255);
        assert_eq!(rdsk.fs_header_list, 4);

        let buf = rdsk.encode();
        assert_eq!(&buf[..4], b"RDSK");
        assert_eq!(read_u32_be(&buf, 4), 64);
        assert!(sums_to_zero(&buf));
        assert!(sums_to_zero(&buf[..256]));

        let mut diag = Diagnostics::new();
        let back = RigidDiskBlock::decode_rdb(&buf, &mut diag).unwrap();
        assert!(diag.is_empty());
        assert_eq!(back, rdsk);
        assert_eq!(back.vendor(), b"ADFlib");
        assert_eq!(back.product(), b"harddisk.adf");
    }

    #[test]
    fn test_part_roundtrip_and_name() {
        let part = PartitionBlock::new(b"DH0", 2, 49, 4, 32, DosType(3));
        assert_eq!(part.dos_type, *b"DOS\x01");
        assert_eq!(part.block_size_bytes(), 512);
        let buf = part.encode();
        assert!(sums_to_zero(&buf));
        let back = PartitionBlock::decode(&buf).unwrap();
        assert_eq!(back.name(), b"DH0");
        assert_eq!(back.low_cyl, 2);
        assert_eq!(back.high_cyl, 49);
        assert_eq!(back.next, RDB_END);
    }

    #[test]
    fn test_checksum_mismatch_is_warning() {
        let mut buf = PartitionBlock::new(b"DH1", 2, 9, 1, 1, DosType::FFS).encode();
        buf[0x30] ^= 1;
        let mut diag = Diagnostics::new();
        let part = PartitionBlock::decode_checked(&buf, 5, &mut diag).unwrap();
        assert_eq!(part.low_cyl, 2);
        assert_eq!(diag.warnings().len(), 1);
        assert_eq!(diag.warnings()[0].block, 5);
        assert_eq!(diag.warnings()[0].kind, WarningKind::ChecksumMismatch);
    }

    #[test]
    fn test_wrong_id_is_error() {
        let buf = FsHeaderBlock::new(DosType::FFS, 9).encode();
        assert_eq!(
            PartitionBlock::decode(&buf).unwrap_err(),
            AffsError::InvalidBlockType
        );
    }

    #[test]
    fn test_fshd_and_lseg() {
        let fshd = FsHeaderBlock::new(DosType::FFS, 6);
        let buf = fshd.encode();
        assert!(sums_to_zero(&buf));
        assert_eq!(FsHeaderBlock::decode(&buf).unwrap().seg_list_block, 6);

        let mut lseg = LoadSegBlock::new();
        lseg.load_data[0] = 0x4E;
        let buf = lseg.encode();
        assert_eq!(read_u32_be(&buf, 4), 128);
        assert!(sums_to_zero(&buf));
        let mut diag = Diagnostics::new();
        let back = LoadSegBlock::decode_checked(&buf, 6, &mut diag).unwrap();
        assert!(diag.is_empty());
        assert_eq!(back.load_data[0], 0x4E);
    }
}
