//! Block device backends for disk images.

use alloc::vec;
use alloc::vec::Vec;

use crate::constants::BLOCK_SIZE;
use crate::types::BlockDevice;

/// A disk image held in memory.
#[derive(Debug, Clone)]
pub struct MemoryImage {
    data: Vec<u8>,
}

impl MemoryImage {
    /// A zero-filled image of `size` bytes.
    pub fn new(size: usize) -> Self {
        Self {
            data: vec![0u8; size],
        }
    }

    /// A zero-filled image of `blocks` whole blocks.
    pub fn with_blocks(blocks: u32) -> Self {
        Self::new(blocks as usize * BLOCK_SIZE)
    }

    /// Wrap existing image bytes.
    pub fn from_vec(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// Raw image bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Consume and return the image bytes.
    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    fn range(&self, block: u32) -> Option<core::ops::Range<usize>> {
        let start = (block as usize).checked_mul(BLOCK_SIZE)?;
        let end = start.checked_add(BLOCK_SIZE)?;
        (end <= self.data.len()).then_some(start..end)
    }
}

impl BlockDevice for MemoryImage {
    fn read_block(&self, block: u32, buf: &mut [u8; BLOCK_SIZE]) -> Result<(), ()> {
        let range = self.range(block).ok_or(())?;
        buf.copy_from_slice(&self.data[range]);
        Ok(())
    }

    fn write_block(&mut self, block: u32, buf: &[u8; BLOCK_SIZE]) -> Result<(), ()> {
        let range = self.range(block).ok_or(())?;
        self.data[range].copy_from_slice(buf);
        Ok(())
    }

    fn size_bytes(&self) -> u64 {
        self.data.len() as u64
    }
}

#[cfg(feature = "std")]
pub use self::file_image::FileImage;

#[cfg(feature = "std")]
mod file_image {
    use std::fs::{File, OpenOptions};
    use std::io::{self, Read, Seek, SeekFrom, Write};
    use std::path::Path;

    use crate::constants::BLOCK_SIZE;
    use crate::types::BlockDevice;

    /// A disk image file on the host filesystem.
    #[derive(Debug)]
    pub struct FileImage {
        file: File,
        size: u64,
        read_only: bool,
    }

    impl FileImage {
        /// Open an existing image.
        pub fn open(path: impl AsRef<Path>, read_only: bool) -> io::Result<Self> {
            let file = OpenOptions::new()
                .read(true)
                .write(!read_only)
                .open(path)?;
            let size = file.metadata()?.len();
            Ok(Self {
                file,
                size,
                read_only,
            })
        }

        /// Create (or truncate) an image of `size` bytes.
        pub fn create(path: impl AsRef<Path>, size: u64) -> io::Result<Self> {
            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(true)
                .open(path)?;
            file.set_len(size)?;
            Ok(Self {
                file,
                size,
                read_only: false,
            })
        }

        /// Whether the image was opened without write access.
        #[inline]
        pub fn is_read_only(&self) -> bool {
            self.read_only
        }

        fn seek_to(&self, block: u32) -> io::Result<()> {
            let offset = u64::from(block) * BLOCK_SIZE as u64;
            if offset + BLOCK_SIZE as u64 > self.size {
                return Err(io::ErrorKind::UnexpectedEof.into());
            }
            (&self.file).seek(SeekFrom::Start(offset))?;
            Ok(())
        }
    }

    impl BlockDevice for FileImage {
        fn read_block(&self, block: u32, buf: &mut [u8; BLOCK_SIZE]) -> Result<(), ()> {
            self.seek_to(block)
                .and_then(|()| (&self.file).read_exact(buf))
                .map_err(|e| log::debug!("read of block {block} failed: {e}"))
        }

        fn write_block(&mut self, block: u32, buf: &[u8; BLOCK_SIZE]) -> Result<(), ()> {
            if self.read_only {
                return Err(());
            }
            self.seek_to(block)
                .and_then(|()| self.file.write_all(buf))
                .map_err(|e| log::debug!("write of block {block} failed: {e}"))
        }

        fn size_bytes(&self) -> u64 {
            self.size
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_image_bounds() {
        let mut img = MemoryImage::with_blocks(4);
        let mut buf = [0xAAu8; BLOCK_SIZE];
        assert!(img.write_block(3, &buf).is_ok());
        assert!(img.write_block(4, &buf).is_err());
        buf.fill(0);
        assert!(img.read_block(3, &mut buf).is_ok());
        assert!(buf.iter().all(|&b| b == 0xAA));
        assert!(img.read_block(u32::MAX, &mut buf).is_err());
        assert_eq!(img.size_bytes(), 2048);
    }

    #[cfg(feature = "std")]
    #[test]
    fn test_file_image_roundtrip() {
        let path = std::env::temp_dir().join(alloc::format!(
            "affs-rw-image-{}.adf",
            std::process::id()
        ));
        {
            let mut img = FileImage::create(&path, 4 * BLOCK_SIZE as u64).unwrap();
            let buf = [0x5Au8; BLOCK_SIZE];
            img.write_block(2, &buf).unwrap();
            assert!(img.write_block(4, &buf).is_err());
        }
        let img = FileImage::open(&path, true).unwrap();
        let mut buf = [0u8; BLOCK_SIZE];
        img.read_block(2, &mut buf).unwrap();
        assert_eq!(buf[511], 0x5A);
        assert!(img.is_read_only());
        std::fs::remove_file(&path).unwrap();
    }
}
