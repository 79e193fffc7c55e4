#![no_main]

use affs_rw::{
    BitmapBlock, BitmapExtBlock, BootBlock, Diagnostics, EntryBlock, FileExtBlock, FsHeaderBlock,
    LoadSegBlock, OfsDataBlock, PartitionBlock, Record, RigidDiskBlock, RootBlock,
};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() >= 1024 {
        let boot_buf: &[u8; 1024] = data[..1024].try_into().unwrap();
        let _ = BootBlock::decode(boot_buf);
        let _ = BootBlock::checksum_valid(boot_buf);
    }

    if data.len() >= 512 {
        let buf: &[u8; 512] = data[..512].try_into().unwrap();

        let _ = RootBlock::decode(buf);
        let _ = EntryBlock::decode(buf);
        let _ = FileExtBlock::decode(buf);
        let _ = OfsDataBlock::decode(buf);
        let _ = BitmapBlock::decode(buf);
        let _ = BitmapExtBlock::decode(buf);

        // Re-encoding whatever decoded must not panic.
        if let Ok(entry) = EntryBlock::decode(buf) {
            let _ = entry.encode();
        }

        let mut diag = Diagnostics::new();
        let _ = RigidDiskBlock::decode_rdb(buf, &mut diag);
        let _ = PartitionBlock::decode_checked(buf, 1, &mut diag);
        let _ = FsHeaderBlock::decode_checked(buf, 2, &mut diag);
        let _ = LoadSegBlock::decode_checked(buf, 3, &mut diag);
    }
});
