//! Core types for AFFS.

use crate::constants::*;
use crate::date::AmigaDate;

/// Block device trait for reading and writing blocks of a backing store.
///
/// Implement this trait for your storage medium (file, memory, hardware, etc.).
/// Block numbers are device-absolute and each call must transfer one whole
/// block atomically.
pub trait BlockDevice {
    /// Read a single 512-byte block.
    ///
    /// # Returns
    /// `Ok(())` on success, `Err(())` on failure.
    #[allow(clippy::result_unit_err)]
    fn read_block(&self, block: u32, buf: &mut [u8; BLOCK_SIZE]) -> Result<(), ()>;

    /// Write a single 512-byte block.
    #[allow(clippy::result_unit_err)]
    fn write_block(&mut self, block: u32, buf: &[u8; BLOCK_SIZE]) -> Result<(), ()>;

    /// Size of the backing store in bytes.
    fn size_bytes(&self) -> u64;

    /// Whether this is a native block device rather than an image file.
    ///
    /// Native devices are never treated as hardfiles.
    fn is_native(&self) -> bool {
        false
    }
}

/// Filesystem type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsType {
    /// Original File System.
    Ofs,
    /// Fast File System.
    Ffs,
}

impl FsType {
    /// Returns the data payload size per block.
    #[inline]
    pub const fn data_block_size(self) -> usize {
        match self {
            Self::Ofs => OFS_DATA_SIZE,
            Self::Ffs => FFS_DATA_SIZE,
        }
    }
}

/// The flavour byte of a `DOS\x` signature.
///
/// Bit 0 selects FFS, bit 1 international name handling, bit 2 the
/// directory cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DosType(pub u8);

impl DosType {
    /// Plain OFS (`DOS\0`).
    pub const OFS: Self = Self(DOSFS_OFS);
    /// Plain FFS (`DOS\1`).
    pub const FFS: Self = Self(DOSFS_FFS);

    /// Extract from a four-byte signature, rejecting anything not starting with `DOS`.
    #[inline]
    pub const fn from_signature(sig: [u8; 4]) -> Option<Self> {
        if sig[0] == b'D' && sig[1] == b'O' && sig[2] == b'S' && sig[3] <= 7 {
            Some(Self(sig[3]))
        } else {
            None
        }
    }

    /// The four-byte on-disk signature.
    #[inline]
    pub const fn signature(self) -> [u8; 4] {
        [b'D', b'O', b'S', self.0]
    }

    /// OFS or FFS data blocks.
    #[inline]
    pub const fn fs_type(self) -> FsType {
        if self.0 & DOSFS_FFS != 0 {
            FsType::Ffs
        } else {
            FsType::Ofs
        }
    }

    /// Name handling and directory cache flags.
    #[inline]
    pub const fn flags(self) -> FsFlags {
        FsFlags::from_dos_type(self.0)
    }
}

/// Filesystem flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FsFlags {
    /// International mode enabled.
    pub intl: bool,
    /// Directory cache enabled.
    pub dircache: bool,
}

impl FsFlags {
    /// Create flags from DOS type byte.
    #[inline]
    pub const fn from_dos_type(dos_type: u8) -> Self {
        Self {
            intl: (dos_type & (DOSFS_INTL | DOSFS_DIRCACHE)) != 0,
            dircache: (dos_type & DOSFS_DIRCACHE) != 0,
        }
    }
}

/// Access permissions.
#[derive(Debug, Clone, Copy, Default)]
pub struct Access(pub u32);

impl Access {
    /// Check if read is protected.
    #[inline]
    pub const fn is_read_protected(self) -> bool {
        (self.0 & ACC_READ) != 0
    }

    /// Check if write is protected.
    #[inline]
    pub const fn is_write_protected(self) -> bool {
        (self.0 & ACC_WRITE) != 0
    }
}

/// Runtime options for mounting and formatting.
#[derive(Debug, Clone, Copy)]
pub struct MountOptions {
    /// Refuse every write to the device.
    pub read_only: bool,
    /// Timestamp source used to stamp headers and the root block.
    pub clock: fn() -> AmigaDate,
}

impl MountOptions {
    /// Options with the given read-only flag and the default clock.
    pub fn new(read_only: bool) -> Self {
        Self {
            read_only,
            ..Self::default()
        }
    }

    /// Replace the timestamp source.
    pub fn with_clock(mut self, clock: fn() -> AmigaDate) -> Self {
        self.clock = clock;
        self
    }
}

impl Default for MountOptions {
    fn default() -> Self {
        #[cfg(feature = "std")]
        let clock: fn() -> AmigaDate = AmigaDate::now;
        #[cfg(not(feature = "std"))]
        let clock: fn() -> AmigaDate = crate::date::epoch;
        Self {
            read_only: false,
            clock,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dos_type_signature() {
        let dt = DosType::from_signature(*b"DOS\x03").unwrap();
        assert_eq!(dt.fs_type(), FsType::Ffs);
        assert!(dt.flags().intl);
        assert!(!dt.flags().dircache);
        assert_eq!(dt.signature(), *b"DOS\x03");
        assert!(DosType::from_signature(*b"RDSK").is_none());
        assert!(DosType::from_signature(*b"DOS\x09").is_none());
    }

    #[test]
    fn test_dircache_implies_intl() {
        let flags = FsFlags::from_dos_type(DOSFS_DIRCACHE);
        assert!(flags.intl);
        assert!(flags.dircache);
    }

    #[test]
    fn test_data_block_size() {
        assert_eq!(FsType::Ofs.data_block_size(), 488);
        assert_eq!(FsType::Ffs.data_block_size(), 512);
    }
}
