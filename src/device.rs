//! Devices: classification, mounting and partition layout.
//!
//! A [`Device`] owns the backing store and the volumes found on it. Floppy
//! images hold one volume over the whole disk, hardfiles one volume whose
//! root block is found by scanning, and partitioned hard disks one volume
//! per `PART` record of their rigid disk block.

use alloc::vec;
use alloc::vec::Vec;

use crate::block::RootBlock;
use crate::chain::chain_iter;
use crate::checksum::read_i32_be;
use crate::constants::*;
use crate::error::{AffsError, Diagnostics, Result, Warning};
use crate::rdb::{FsHeaderBlock, LoadSegBlock, PartitionBlock, Record, RigidDiskBlock};
use crate::types::{BlockDevice, DosType, MountOptions};
use crate::volume::{Volume, VolumeMut};

const FLOPPY_DD_BYTES_PER_CYL: u64 = (SECTORS_PER_TRACK_DD * HEADS) as u64 * BLOCK_SIZE as u64;
const FLOPPY_HD_BYTES: u64 = FLOPPY_HD_SECTORS as u64 * BLOCK_SIZE as u64;

/// What a backing store holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    /// 880 KB double-density floppy (80 to 83 cylinders).
    FloppyDd,
    /// 1.76 MB high-density floppy.
    FloppyHd,
    /// Hard disk image holding a single filesystem and no partition table.
    Hardfile,
    /// Hard disk with a rigid disk block.
    PartitionedHardDisk,
}

impl DeviceKind {
    /// Check if this is a floppy.
    #[inline]
    pub const fn is_floppy(self) -> bool {
        matches!(self, Self::FloppyDd | Self::FloppyHd)
    }
}

/// Cylinder, head and sector counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    /// Cylinders.
    pub cylinders: u32,
    /// Heads (surfaces).
    pub heads: u32,
    /// Sectors per track.
    pub sectors: u32,
}

impl Geometry {
    /// Double-density floppy.
    pub const FLOPPY_DD: Self = Self::new(CYLINDERS, HEADS, SECTORS_PER_TRACK_DD);
    /// High-density floppy.
    pub const FLOPPY_HD: Self = Self::new(CYLINDERS, HEADS, SECTORS_PER_TRACK_HD);

    /// Create a geometry.
    #[inline]
    pub const fn new(cylinders: u32, heads: u32, sectors: u32) -> Self {
        Self {
            cylinders,
            heads,
            sectors,
        }
    }

    /// Blocks per cylinder.
    #[inline]
    pub const fn cyl_blocks(&self) -> u32 {
        self.heads * self.sectors
    }

    /// Blocks covered by all cylinders.
    #[inline]
    pub const fn total_blocks(&self) -> u64 {
        self.cylinders as u64 * self.heads as u64 * self.sectors as u64
    }
}

/// One partition requested from [`Device::create_hard_disk_layout`].
#[derive(Debug, Clone, Copy)]
pub struct PartitionSpec<'n> {
    /// Volume name.
    pub name: &'n [u8],
    /// First cylinder; cylinders below 2 hold the partition table.
    pub start_cyl: u32,
    /// Number of cylinders.
    pub len_cyl: u32,
    /// Filesystem flavour.
    pub dos_type: DosType,
}

/// A filesystem driver record and its code segments.
#[derive(Debug, Clone)]
pub struct FileSystemDriver {
    /// Block holding the `FSHD` record.
    pub block: u32,
    /// Parsed header.
    pub header: FsHeaderBlock,
    /// `LSEG` records in chain order.
    pub segments: Vec<LoadSegBlock>,
}

/// Classify a backing store by size and, for hard disks, by the signature
/// in sector 0.
pub fn classify<D: BlockDevice>(io: &D) -> Result<DeviceKind> {
    let size = io.size_bytes();
    if (80..=83).any(|cyl| size == FLOPPY_DD_BYTES_PER_CYL * cyl) {
        return Ok(DeviceKind::FloppyDd);
    }
    if size == FLOPPY_HD_BYTES {
        return Ok(DeviceKind::FloppyHd);
    }
    if size < FLOPPY_HD_BYTES {
        log::debug!("unknown device size {size}");
        return Err(AffsError::UnknownDevice);
    }
    let buf = read_raw(io, 0)?;
    if !io.is_native() && buf.starts_with(b"DOS") {
        Ok(DeviceKind::Hardfile)
    } else {
        Ok(DeviceKind::PartitionedHardDisk)
    }
}

fn read_raw<D: BlockDevice>(io: &D, block: u32) -> Result<[u8; BLOCK_SIZE]> {
    let mut buf = [0u8; BLOCK_SIZE];
    io.read_block(block, &mut buf)
        .map_err(|()| AffsError::BlockReadError)?;
    Ok(buf)
}

/// Structural failures while probing a root block mean there is no
/// filesystem; I/O failures stay I/O failures.
fn probe_error(e: AffsError) -> AffsError {
    match e {
        AffsError::BlockReadError | AffsError::OutOfRange => e,
        _ => AffsError::NoFilesystem,
    }
}

/// A mounted or freshly formatted device.
pub struct Device<D: BlockDevice> {
    io: D,
    kind: DeviceKind,
    geometry: Geometry,
    options: MountOptions,
    volumes: Vec<Volume>,
    rdb: Option<RigidDiskBlock>,
    filesystems: Vec<FileSystemDriver>,
    diag: Diagnostics,
}

impl<D: BlockDevice> Device<D> {
    fn new(io: D, kind: DeviceKind, geometry: Geometry, options: MountOptions) -> Self {
        Self {
            io,
            kind,
            geometry,
            options,
            volumes: Vec::new(),
            rdb: None,
            filesystems: Vec::new(),
            diag: Diagnostics::new(),
        }
    }

    /// Classify `io` and list its volumes.
    ///
    /// Volumes are not mounted yet; see [`mount_volume`](Self::mount_volume).
    pub fn mount(io: D, options: MountOptions) -> Result<Self> {
        match classify(&io)? {
            DeviceKind::FloppyDd | DeviceKind::FloppyHd => Self::mount_floppy(io, options),
            DeviceKind::Hardfile => Self::mount_hardfile(io, options),
            DeviceKind::PartitionedHardDisk => Self::mount_partitioned(io, options),
        }
    }

    fn floppy_geometry(io: &D) -> Result<(DeviceKind, Geometry)> {
        match classify(io)? {
            DeviceKind::FloppyDd => Ok((DeviceKind::FloppyDd, Geometry::FLOPPY_DD)),
            DeviceKind::FloppyHd => Ok((DeviceKind::FloppyHd, Geometry::FLOPPY_HD)),
            _ => Err(AffsError::UnknownDevice),
        }
    }

    /// One volume over the whole floppy.
    pub fn mount_floppy(io: D, options: MountOptions) -> Result<Self> {
        let (kind, geometry) = Self::floppy_geometry(&io)?;
        let last = geometry.total_blocks() as u32 - 1;
        let mut vol = Volume::new(0, last, BLOCK_SIZE as u32, b"")?;
        vol.read_only = options.read_only;

        let buf = read_raw(&io, vol.root_block()).map_err(probe_error)?;
        let root = RootBlock::decode(&buf).map_err(probe_error)?;
        vol.name = root.name().to_vec();

        log::debug!("mounted {kind:?} floppy, root {}", vol.root_block());
        let mut dev = Self::new(io, kind, geometry, options);
        dev.volumes.push(vol);
        Ok(dev)
    }

    /// One volume whose root block is located by scanning down from the
    /// middle of the image; the first match wins.
    pub fn mount_hardfile(io: D, options: MountOptions) -> Result<Self> {
        let size = io.size_bytes();
        let blocks = u32::try_from(size / BLOCK_SIZE as u64).map_err(|_| AffsError::InvalidGeometry)?;
        let padded = size + BLOCK_SIZE as u64 - size % BLOCK_SIZE as u64;
        let mut root = u32::try_from(padded / BLOCK_SIZE as u64 / 2)
            .map_err(|_| AffsError::InvalidGeometry)?;

        let mut buf = [0u8; BLOCK_SIZE];
        loop {
            if root <= 1 {
                log::debug!("no root block found in hardfile");
                return Err(AffsError::NoFilesystem);
            }
            let found = io.read_block(root, &mut buf).is_ok()
                && read_i32_be(&buf, 0) == T_HEADER
                && read_i32_be(&buf, 508) == ST_ROOT;
            if found {
                break;
            }
            root -= 1;
        }

        let last = (root * 2 - 1).min(blocks.saturating_sub(1));
        let mut vol = Volume::new(0, last, BLOCK_SIZE as u32, b"")?;
        vol.root_block = root;
        vol.cur_dir = root;
        vol.read_only = options.read_only;
        if let Ok(r) = RootBlock::decode(&buf) {
            vol.name = r.name().to_vec();
        }

        log::debug!("mounted hardfile, root {root}, last {last}");
        let mut dev = Self::new(io, DeviceKind::Hardfile, Geometry::new(blocks, 1, 1), options);
        dev.volumes.push(vol);
        Ok(dev)
    }

    /// One volume per partition record, plus the filesystem driver records.
    pub fn mount_partitioned(io: D, options: MountOptions) -> Result<Self> {
        let mut diag = Diagnostics::new();
        let rdsk = RigidDiskBlock::decode_rdb(&read_raw(&io, 0)?, &mut diag).map_err(probe_error)?;
        let limit = u32::try_from(io.size_bytes() / BLOCK_SIZE as u64).unwrap_or(u32::MAX);
        let cyl_blocks = rdsk.cyl_blocks;

        let mut volumes = Vec::new();
        let parts = chain_iter(rdsk.partition_list, limit, |b| {
            PartitionBlock::decode_checked(&read_raw(&io, b)?, b, &mut diag)
        });
        for item in parts {
            let (block, part) = item?;
            let first = cyl_blocks
                .checked_mul(part.low_cyl)
                .ok_or(AffsError::InvalidGeometry)?;
            let last = part
                .high_cyl
                .checked_add(1)
                .and_then(|c| c.checked_mul(cyl_blocks))
                .and_then(|b| b.checked_sub(1))
                .ok_or(AffsError::InvalidGeometry)?;
            let mut vol = Volume::new(first, last, part.block_size_bytes(), part.name())?;
            vol.dos_type = DosType::from_signature(part.dos_type).unwrap_or_default();
            vol.read_only = options.read_only;
            log::debug!("partition at {block}: blocks {first}..={last}");
            volumes.push(vol);
        }

        let mut filesystems = Vec::new();
        let headers: Vec<(u32, FsHeaderBlock)> = chain_iter(rdsk.fs_header_list, limit, |b| {
            FsHeaderBlock::decode_checked(&read_raw(&io, b)?, b, &mut diag)
        })
        .collect::<Result<_>>()?;
        for (block, header) in headers {
            let mut segments = Vec::new();
            let segs = chain_iter(header.seg_list_block, limit, |b| {
                LoadSegBlock::decode_checked(&read_raw(&io, b)?, b, &mut diag)
            });
            for seg in segs {
                match seg {
                    Ok((_, lseg)) => segments.push(lseg),
                    Err(e) => {
                        log::warn!("filesystem at {block}: load segment chain cut short: {e}");
                        break;
                    }
                }
            }
            filesystems.push(FileSystemDriver {
                block,
                header,
                segments,
            });
        }

        let geometry = Geometry::new(rdsk.cylinders, rdsk.heads, rdsk.sectors);
        let mut dev = Self::new(io, DeviceKind::PartitionedHardDisk, geometry, options);
        dev.volumes = volumes;
        dev.rdb = Some(rdsk);
        dev.filesystems = filesystems;
        dev.diag = diag;
        Ok(dev)
    }

    /// Format a floppy image with a single volume.
    pub fn create_floppy(
        io: D,
        name: &[u8],
        dos_type: DosType,
        options: MountOptions,
    ) -> Result<Self> {
        let (kind, geometry) = Self::floppy_geometry(&io)?;
        let mut dev = Self::new(io, kind, geometry, options);
        dev.create_volume(0, CYLINDERS, name, dos_type)?;
        Ok(dev)
    }

    /// Format the whole image as one unpartitioned volume.
    pub fn create_hardfile(
        io: D,
        name: &[u8],
        dos_type: DosType,
        options: MountOptions,
    ) -> Result<Self> {
        let blocks = u32::try_from(io.size_bytes() / BLOCK_SIZE as u64)
            .map_err(|_| AffsError::InvalidGeometry)?;
        let mut dev = Self::new(io, DeviceKind::Hardfile, Geometry::new(blocks, 1, 1), options);
        dev.create_volume(0, blocks, name, dos_type)?;
        Ok(dev)
    }

    /// Write a rigid disk block, one `PART` record per partition, a `FSHD`
    /// and an empty `LSEG`, then format every partition.
    pub fn create_hard_disk_layout(
        io: D,
        geometry: Geometry,
        partitions: &[PartitionSpec<'_>],
        options: MountOptions,
    ) -> Result<Self> {
        if options.read_only {
            return Err(AffsError::ReadOnly);
        }
        let first = partitions.first().ok_or(AffsError::InvalidGeometry)?;
        let n = partitions.len() as u32;
        let reserved = u64::from(geometry.cyl_blocks()) * u64::from(RDB_RESERVED_CYLINDERS);
        if io.size_bytes() / (BLOCK_SIZE as u64) < geometry.total_blocks()
            || u64::from(n) + 3 > reserved
        {
            return Err(AffsError::InvalidGeometry);
        }
        for (i, p) in partitions.iter().enumerate() {
            let end = p.start_cyl.checked_add(p.len_cyl);
            if p.start_cyl < RDB_RESERVED_CYLINDERS
                || p.len_cyl == 0
                || end.is_none_or(|e| e > geometry.cylinders)
                || partitions[..i]
                    .iter()
                    .any(|q| p.start_cyl < q.start_cyl + q.len_cyl && q.start_cyl < p.start_cyl + p.len_cyl)
            {
                log::debug!("partition {i} overlaps or leaves the disk");
                return Err(AffsError::InvalidGeometry);
            }
        }

        let mut dev = Self::new(io, DeviceKind::PartitionedHardDisk, geometry, options);
        let rdsk = RigidDiskBlock::new(geometry.cylinders, geometry.heads, geometry.sectors, n);
        dev.write_raw(0, &rdsk.encode())?;

        for (i, p) in partitions.iter().enumerate() {
            let block = i as u32 + 1;
            let mut part = PartitionBlock::new(
                p.name,
                p.start_cyl,
                p.start_cyl + p.len_cyl - 1,
                geometry.heads,
                geometry.sectors,
                p.dos_type,
            );
            part.next = if block < n { block + 1 } else { RDB_END };
            dev.write_raw(block, &part.encode())?;
        }

        let fshd = FsHeaderBlock::new(first.dos_type, n + 2);
        let lseg = LoadSegBlock::new();
        dev.write_raw(n + 1, &fshd.encode())?;
        dev.write_raw(n + 2, &lseg.encode())?;
        dev.rdb = Some(rdsk);
        dev.filesystems = vec![FileSystemDriver {
            block: n + 1,
            header: fshd,
            segments: vec![lseg],
        }];

        for p in partitions {
            dev.create_volume(p.start_cyl, p.len_cyl, p.name, p.dos_type)?;
        }
        Ok(dev)
    }

    fn write_raw(&mut self, block: u32, buf: &[u8; BLOCK_SIZE]) -> Result<()> {
        self.io
            .write_block(block, buf)
            .map_err(|()| AffsError::BlockWriteError)
    }

    /// Format a new volume over `len_cyl` cylinders from `start_cyl` and
    /// return its index. The volume is left mounted.
    pub fn create_volume(
        &mut self,
        start_cyl: u32,
        len_cyl: u32,
        name: &[u8],
        dos_type: DosType,
    ) -> Result<usize> {
        if self.options.read_only {
            return Err(AffsError::ReadOnly);
        }
        let cyl_blocks = self.geometry.cyl_blocks();
        let first = start_cyl.checked_mul(cyl_blocks);
        let count = len_cyl.checked_mul(cyl_blocks).filter(|&c| c > 0);
        let last = first
            .zip(count)
            .and_then(|(f, c)| f.checked_add(c - 1))
            .ok_or(AffsError::InvalidGeometry)?;
        if u64::from(last) >= self.block_count() {
            return Err(AffsError::InvalidGeometry);
        }

        let vol = Volume::new(start_cyl * cyl_blocks, last, BLOCK_SIZE as u32, name)?;
        self.volumes.push(vol);
        let index = self.volumes.len() - 1;
        let clock = self.options.clock;
        let mut view = VolumeMut::new(&mut self.io, &mut self.volumes[index], &mut self.diag, clock);
        if let Err(e) = view.format(name, dos_type) {
            self.volumes.pop();
            return Err(e);
        }
        Ok(index)
    }

    /// Mount volume `index` (boot block, root block and bitmap) and return a
    /// view of it. Mounting an already mounted volume only returns the view.
    pub fn mount_volume(&mut self, index: usize) -> Result<VolumeMut<'_, D>> {
        let clock = self.options.clock;
        let vol = self.volumes.get_mut(index).ok_or(AffsError::OutOfRange)?;
        let mounted = vol.is_mounted();
        let mut view = VolumeMut::new(&mut self.io, vol, &mut self.diag, clock);
        if !mounted {
            view.mount()?;
        }
        Ok(view)
    }

    /// Drop the in-memory bitmap of volume `index`.
    pub fn unmount_volume(&mut self, index: usize) -> Result<()> {
        let vol = self.volumes.get_mut(index).ok_or(AffsError::OutOfRange)?;
        vol.bitmap = None;
        Ok(())
    }

    /// Release every volume and hand back the backing store.
    pub fn unmount(self) -> D {
        log::debug!("unmount {:?} with {} volumes", self.kind, self.volumes.len());
        self.io
    }

    /// Device kind.
    #[inline]
    pub const fn kind(&self) -> DeviceKind {
        self.kind
    }

    /// Device geometry.
    #[inline]
    pub const fn geometry(&self) -> Geometry {
        self.geometry
    }

    /// Whether writes are refused.
    #[inline]
    pub const fn is_read_only(&self) -> bool {
        self.options.read_only
    }

    /// Whole blocks in the backing store.
    #[inline]
    pub fn block_count(&self) -> u64 {
        self.io.size_bytes() / BLOCK_SIZE as u64
    }

    /// Volumes in on-disk order.
    #[inline]
    pub fn volumes(&self) -> &[Volume] {
        &self.volumes
    }

    /// The rigid disk block of a partitioned device.
    #[inline]
    pub fn rdb(&self) -> Option<&RigidDiskBlock> {
        self.rdb.as_ref()
    }

    /// Filesystem drivers listed by the rigid disk block.
    #[inline]
    pub fn filesystems(&self) -> &[FileSystemDriver] {
        &self.filesystems
    }

    /// Non-fatal findings collected so far.
    #[inline]
    pub fn warnings(&self) -> &[Warning] {
        self.diag.warnings()
    }

    /// The backing store.
    #[inline]
    pub fn io(&self) -> &D {
        &self.io
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::MemoryImage;

    #[test]
    fn test_classify_floppies() {
        for cyl in 80..=83 {
            let img = MemoryImage::new(cyl * 11 * 2 * 512);
            assert_eq!(classify(&img), Ok(DeviceKind::FloppyDd));
        }
        let img = MemoryImage::with_blocks(FLOPPY_HD_SECTORS);
        assert_eq!(classify(&img), Ok(DeviceKind::FloppyHd));
        let img = MemoryImage::with_blocks(1000);
        assert_eq!(classify(&img), Err(AffsError::UnknownDevice));
    }

    #[test]
    fn test_classify_hard_disks() {
        let mut img = MemoryImage::with_blocks(8192);
        assert_eq!(classify(&img), Ok(DeviceKind::PartitionedHardDisk));
        let mut buf = [0u8; BLOCK_SIZE];
        buf[..4].copy_from_slice(b"DOS\x01");
        img.write_block(0, &buf).unwrap();
        assert_eq!(classify(&img), Ok(DeviceKind::Hardfile));
    }

    #[test]
    fn test_geometry() {
        assert_eq!(Geometry::FLOPPY_DD.total_blocks(), 1760);
        assert_eq!(Geometry::FLOPPY_HD.cyl_blocks(), 44);
    }

    #[test]
    fn test_unformatted_floppy_has_no_filesystem() {
        let img = MemoryImage::with_blocks(FLOPPY_DD_SECTORS);
        assert_eq!(
            Device::mount(img, MountOptions::new(true)).err(),
            Some(AffsError::NoFilesystem)
        );
    }
}
