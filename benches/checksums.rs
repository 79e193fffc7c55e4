//! Benchmarks for checksum calculations.

use affs_rw::{
    BitmapBlock, PartitionBlock, Record, RootBlock, AmigaDate, DosType, bitmap_sum, boot_sum,
    normal_sum_slice,
};

fn main() {
    divan::main();
}

#[divan::bench]
fn bench_normal_sum_512(bencher: divan::Bencher) {
    let buf = [0u8; 512];
    bencher.bench_local(|| divan::black_box(normal_sum_slice(divan::black_box(&buf), 20)));
}

#[divan::bench]
fn bench_rdb_sum_256(bencher: divan::Bencher) {
    let buf = PartitionBlock::new(b"DH0", 2, 99, 4, 32, DosType::FFS).encode();
    bencher.bench_local(|| divan::black_box(normal_sum_slice(divan::black_box(&buf[..256]), 8)));
}

#[divan::bench]
fn bench_boot_sum(bencher: divan::Bencher) {
    let mut buf = [0u8; 1024];
    for (i, b) in buf.iter_mut().enumerate() {
        *b = ((i * 7 + 13) % 256) as u8;
    }
    bencher.bench_local(|| divan::black_box(boot_sum(divan::black_box(&buf))));
}

#[divan::bench]
fn bench_bitmap_sum(bencher: divan::Bencher) {
    let buf = BitmapBlock::all_used().encode();
    bencher.bench_local(|| divan::black_box(bitmap_sum(divan::black_box(&buf))));
}

#[divan::bench]
fn bench_root_encode(bencher: divan::Bencher) {
    let root = RootBlock::new(b"Workbench", AmigaDate::new(8035, 750, 0));
    bencher.bench_local(|| divan::black_box(divan::black_box(&root).encode()));
}
