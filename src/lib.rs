//! # affs-rw
//!
//! A `no_std` block-level engine for Amiga OFS/FFS volumes.
//!
//! The crate mounts and formats ADF floppy images, hardfiles and hard disks
//! partitioned with a Rigid Disk Block, keeps each volume's free-space bitmap,
//! and reads and writes files through their chain of data and extension
//! blocks.
//!
//! ## Features
//!
//! - `no_std` compatible (needs `alloc`); `std` adds [`FileImage`] and a system clock
//! - OFS and FFS data layouts, INTL and DIRCACHE flavours
//! - Bitmap allocation with the two-phase valid flag on flush
//! - Partition tables: `RDSK`, `PART`, `FSHD` and `LSEG` records
//! - Checksum problems on tolerant paths are collected as [`Warning`]s
//!
//! ## Example
//!
//! ```
//! use affs_rw::{Device, DosType, MemoryImage, MountOptions, OpenMode};
//!
//! let img = MemoryImage::with_blocks(1760);
//! let mut dev = Device::create_floppy(img, b"Work", DosType::FFS, MountOptions::default())?;
//! let mut vol = dev.mount_volume(0)?;
//!
//! let mut file = vol.open("hello.txt", OpenMode::Write)?;
//! file.write(b"Hello, Amiga!")?;
//! file.close()?;
//!
//! let mut file = vol.open("hello.txt", OpenMode::Read)?;
//! assert_eq!(file.read_to_vec()?, b"Hello, Amiga!");
//! # Ok::<(), affs_rw::AffsError>(())
//! ```

#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]
#![warn(clippy::all)]

#[cfg(feature = "std")]
extern crate std;

extern crate alloc;

mod bitmap;
mod block;
mod chain;
mod checksum;
mod constants;
mod date;
mod device;
mod dir;
mod error;
mod file;
mod image;
mod rdb;
mod types;
mod utf8;
mod volume;

pub use bitmap::{Bitmap, ext_count, page_count};
pub use block::*;
pub use chain::{ChainIter, ChainLink, chain_iter, is_chain_end};
pub use checksum::{
    bitmap_sum, boot_sum, normal_sum, normal_sum_slice, read_u16_be, read_u32_be, sums_to_zero,
};
pub use constants::*;
pub use date::{AmigaDate, DateTime};
pub use device::{
    Device, DeviceKind, FileSystemDriver, Geometry, PartitionSpec, classify,
};
pub use dir::{DirEntry, Directory, HashDirectory};
pub use error::{AffsError, Diagnostics, Result, Warning, WarningKind};
pub use file::{File, FileBlocks, OpenMode, file_real_size};
#[cfg(feature = "std")]
pub use image::FileImage;
pub use image::MemoryImage;
pub use rdb::{
    FsHeaderBlock, LoadSegBlock, PartitionBlock, RDB_CHECKSUM_OFFSET, Record, RigidDiskBlock,
};
pub use types::*;
pub use volume::{Volume, VolumeMut};
