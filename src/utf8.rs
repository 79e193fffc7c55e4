//! Text views of on-disk names.
//!
//! Names are stored as raw bytes (usually ISO-8859-1); only those that
//! happen to be valid UTF-8 get a `&str` view.

/// Borrow a stored name as text.
#[inline]
pub fn name_str(name: &[u8]) -> Option<&str> {
    #[cfg(not(miri))]
    {
        simdutf8::basic::from_utf8(name).ok()
    }

    #[cfg(miri)]
    {
        core::str::from_utf8(name).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_name() {
        assert_eq!(name_str(b"Workbench"), Some("Workbench"));
    }

    #[test]
    fn test_latin1_name_has_no_text_view() {
        // "Bilder Übersicht" as ISO-8859-1.
        assert_eq!(name_str(b"Bilder \xDCbersicht"), None);
    }
}
