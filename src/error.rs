//! Error and diagnostic types for AFFS operations.

use alloc::vec::Vec;
use core::fmt;

/// Error type for AFFS operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AffsError {
    /// Block read failed.
    BlockReadError,
    /// Block write failed.
    BlockWriteError,
    /// Path or name does not resolve to an entry.
    NotFound,
    /// A write-mode open named an entry that already exists.
    AlreadyExists,
    /// Mutation attempted on a read-only volume or device.
    ReadOnly,
    /// The allocator cannot satisfy a request.
    DiskFull,
    /// Bitmap layout references blocks outside the volume or is incomplete.
    CorruptBitmap,
    /// Checksum verification failed on a block that must be intact.
    ChecksumMismatch,
    /// Block number referenced outside the volume or device bounds.
    OutOfRange,
    /// No recognizable root structure was found.
    NoFilesystem,
    /// Device size matches no known geometry.
    UnknownDevice,
    /// Partition uses a block size this engine cannot mount.
    UnsupportedBlockSize,
    /// Geometry or partition layout is inconsistent.
    InvalidGeometry,
    /// Invalid DOS type signature.
    InvalidDosType,
    /// Invalid block type or record identifier.
    InvalidBlockType,
    /// Invalid secondary type.
    InvalidSecType,
    /// Invalid data block sequence.
    InvalidDataSequence,
    /// A linked chain of records revisits itself.
    ChainLoop,
    /// Name too long (max 30 characters).
    NameTooLong,
    /// Operation not valid in the handle's current state.
    InvalidState,
    /// Not a file entry.
    NotAFile,
    /// Not a directory entry.
    NotADirectory,
    /// Entry protection bits deny the operation.
    AccessDenied,
}

impl fmt::Display for AffsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BlockReadError => write!(f, "block read error"),
            Self::BlockWriteError => write!(f, "block write error"),
            Self::NotFound => write!(f, "entry not found"),
            Self::AlreadyExists => write!(f, "entry already exists"),
            Self::ReadOnly => write!(f, "volume is read-only"),
            Self::DiskFull => write!(f, "disk full"),
            Self::CorruptBitmap => write!(f, "corrupt bitmap"),
            Self::ChecksumMismatch => write!(f, "checksum mismatch"),
            Self::OutOfRange => write!(f, "block out of range"),
            Self::NoFilesystem => write!(f, "no filesystem found"),
            Self::UnknownDevice => write!(f, "unknown device type"),
            Self::UnsupportedBlockSize => write!(f, "unsupported block size"),
            Self::InvalidGeometry => write!(f, "invalid geometry"),
            Self::InvalidDosType => write!(f, "invalid DOS type signature"),
            Self::InvalidBlockType => write!(f, "invalid block type"),
            Self::InvalidSecType => write!(f, "invalid secondary type"),
            Self::InvalidDataSequence => write!(f, "invalid data block sequence"),
            Self::ChainLoop => write!(f, "block chain loops"),
            Self::NameTooLong => write!(f, "name too long"),
            Self::InvalidState => write!(f, "invalid handle state"),
            Self::NotAFile => write!(f, "not a file"),
            Self::NotADirectory => write!(f, "not a directory"),
            Self::AccessDenied => write!(f, "access denied"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for AffsError {}

/// Result type for AFFS operations.
pub type Result<T> = core::result::Result<T, AffsError>;

/// Kind of a non-fatal finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// Stored checksum does not match the block contents.
    ChecksumMismatch,
    /// Record declares an unexpected size in longwords.
    UnexpectedSize(u32),
    /// Rigid disk block declares a block size other than 512.
    UnexpectedBlockSize(u32),
    /// OFS data block carries the wrong sequence number.
    SequenceMismatch {
        /// Sequence number the chain position implies.
        expected: u32,
        /// Sequence number stored in the block.
        found: u32,
    },
    /// Root block marks the bitmap as not in sync with the disk.
    BitmapInvalid,
    /// Blocks per cylinder disagree with sectors times heads.
    GeometryMismatch,
}

/// A non-fatal finding tied to the device block it was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Warning {
    /// Device-absolute block number.
    pub block: u32,
    /// What was found.
    pub kind: WarningKind,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            WarningKind::ChecksumMismatch => write!(f, "block {}: checksum mismatch", self.block),
            WarningKind::UnexpectedSize(n) => {
                write!(f, "block {}: unexpected record size {}", self.block, n)
            }
            WarningKind::UnexpectedBlockSize(n) => {
                write!(f, "block {}: unexpected block size {}", self.block, n)
            }
            WarningKind::SequenceMismatch { expected, found } => write!(
                f,
                "block {}: sequence number {} (expected {})",
                self.block, found, expected
            ),
            WarningKind::BitmapInvalid => write!(f, "block {}: bitmap flagged invalid", self.block),
            WarningKind::GeometryMismatch => {
                write!(f, "block {}: cylinder size disagrees with geometry", self.block)
            }
        }
    }
}

/// Warnings collected while walking on-disk structures.
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Create an empty list.
    pub const fn new() -> Self {
        Self {
            warnings: Vec::new(),
        }
    }

    /// Record a warning and log it.
    pub fn warn(&mut self, block: u32, kind: WarningKind) {
        let warning = Warning { block, kind };
        log::warn!("{warning}");
        self.warnings.push(warning);
    }

    /// All warnings recorded so far, oldest first.
    #[inline]
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Returns true if nothing has been recorded.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Drop all recorded warnings.
    pub fn clear(&mut self) {
        self.warnings.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn test_diagnostics_collect() {
        let mut diag = Diagnostics::new();
        assert!(diag.is_empty());
        diag.warn(3, WarningKind::ChecksumMismatch);
        diag.warn(7, WarningKind::UnexpectedSize(12));
        assert_eq!(diag.warnings().len(), 2);
        assert_eq!(diag.warnings()[0].block, 3);
        diag.clear();
        assert!(diag.is_empty());
    }

    #[test]
    fn test_warning_display() {
        let w = Warning {
            block: 9,
            kind: WarningKind::SequenceMismatch {
                expected: 2,
                found: 5,
            },
        };
        assert_eq!(w.to_string(), "block 9: sequence number 5 (expected 2)");
    }
}
