#![no_main]

use affs_rw::{Device, MemoryImage, MountOptions, OpenMode};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Pad the input up to a double-density floppy so the mount path runs.
    let mut image = data.to_vec();
    if image.len() < 1760 * 512 {
        image.resize(1760 * 512, 0);
    }
    let img = MemoryImage::from_vec(image);

    let Ok(mut dev) = Device::mount(img, MountOptions::new(false)) else {
        return;
    };
    let Ok(mut vol) = dev.mount_volume(0) else {
        return;
    };
    let _ = vol.free_block_count();

    let Ok(entries) = vol.read_dir("") else {
        return;
    };
    for entry in entries.iter().filter(|e| e.is_file()).take(4) {
        if let Ok(mut file) = vol.open(entry.name(), OpenMode::Read) {
            let mut buf = [0u8; 4096];
            for _ in 0..64 {
                match file.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(_) => {}
                }
            }
        }
    }

    if let Ok(mut file) = vol.open("fuzz", OpenMode::Write) {
        let _ = file.write(data);
        let _ = file.close();
    }
});
