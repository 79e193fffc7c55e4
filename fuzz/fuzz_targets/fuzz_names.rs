#![no_main]

use affs_rw::{HASH_TABLE_SIZE, hash_name, intl_to_upper, names_equal};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let name = &data[..data.len().min(30)];

    for intl in [false, true] {
        let h = hash_name(name, intl);
        assert!(h < HASH_TABLE_SIZE);
        assert!(names_equal(name, name, intl));

        // Case-insensitive equality must land in the same hash slot.
        let upper: Vec<u8> = if intl {
            name.iter().map(|&c| intl_to_upper(c)).collect()
        } else {
            name.to_ascii_uppercase()
        };
        assert!(names_equal(name, &upper, intl));
        assert_eq!(hash_name(&upper, intl), h);
    }
});
