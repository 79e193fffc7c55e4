#![no_main]

use affs_rw::{BootBlock, RDB_CHECKSUM_OFFSET, boot_sum, normal_sum, normal_sum_slice, sums_to_zero};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() < 1024 {
        return;
    }

    // A stored normal sum always makes the block sum to zero.
    let mut block = [0u8; 512];
    block.copy_from_slice(&data[..512]);
    for offset in [0, RDB_CHECKSUM_OFFSET, 20] {
        let sum = normal_sum(&block, offset);
        block[offset..offset + 4].copy_from_slice(&sum.to_be_bytes());
        assert!(sums_to_zero(&block));
    }

    // Same for the 256-byte prefix of a partition table record.
    let mut record = [0u8; 256];
    record.copy_from_slice(&data[512..768]);
    let sum = normal_sum_slice(&record, RDB_CHECKSUM_OFFSET);
    record[8..12].copy_from_slice(&sum.to_be_bytes());
    assert!(sums_to_zero(&record));

    let mut boot = [0u8; 1024];
    boot.copy_from_slice(&data[..1024]);
    let sum = boot_sum(&boot);
    boot[4..8].copy_from_slice(&sum.to_be_bytes());
    assert!(BootBlock::checksum_valid(&boot));
});
