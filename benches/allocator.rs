//! Benchmarks for bitmap scans and allocation.

use affs_rw::{Bitmap, Device, DosType, MemoryImage, MountOptions, OpenMode};

fn main() {
    divan::main();
}

/// Blocks in a 100 MB partition.
const LARGE: u32 = 204_800;

#[divan::bench(args = [1760, 3520, LARGE])]
fn bench_count_free(bencher: divan::Bencher, blocks: u32) {
    let bitmap = Bitmap::new_free(blocks - 1, blocks / 2);
    bencher.bench_local(|| divan::black_box(divan::black_box(&bitmap).count_free()));
}

#[divan::bench(args = [1, 72, 1000])]
fn bench_allocate_release(bencher: divan::Bencher, n: usize) {
    let mut bitmap = Bitmap::new_free(LARGE - 1, LARGE / 2);
    bencher.bench_local(|| {
        let blocks = bitmap.allocate(n).unwrap();
        for &b in &blocks {
            bitmap.mark_free(b).unwrap();
        }
        divan::black_box(blocks)
    });
}

#[divan::bench]
fn bench_allocate_near_full(bencher: divan::Bencher) {
    let mut bitmap = Bitmap::new_free(LARGE - 1, LARGE / 2);
    bitmap.allocate(LARGE as usize - 10).unwrap();
    bencher.bench_local(|| {
        let blocks = bitmap.allocate(1).unwrap();
        bitmap.mark_free(blocks[0]).unwrap();
        divan::black_box(blocks)
    });
}

#[divan::bench]
fn bench_write_file_100k(bencher: divan::Bencher) {
    let data = vec![0xA5u8; 100 * 1024];
    bencher.bench_local(|| {
        let img = MemoryImage::with_blocks(3520);
        let mut dev = Device::create_floppy(img, b"Bench", DosType::FFS, MountOptions::default())
            .unwrap();
        let mut vol = dev.mount_volume(0).unwrap();
        let mut file = vol.open("data", OpenMode::Write).unwrap();
        file.write(&data).unwrap();
        file.close().unwrap();
    });
}
