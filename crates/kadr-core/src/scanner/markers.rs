//! Low-level JPEG marker search primitives.
//!
//! This module implements the byte-level searches needed to locate image
//! boundaries in composite capture files.
//!
//! ## Marker Overview
//!
//! A baseline JPEG bitstream is delimited by two 2-byte markers:
//!
//! - SOI (start of image): `FF D8`
//! - EOI (end of image): `FF D9`
//!
//! Camera firmware concatenates several such bitstreams back to back and
//! appends textual metadata after the final EOI, so both a forward search
//! (frame pairing) and a backward search (metadata region start) are needed.

/// Start-of-image marker (`FF D8`)
pub const SOI: [u8; 2] = [0xFF, 0xD8];

/// End-of-image marker (`FF D9`)
pub const EOI: [u8; 2] = [0xFF, 0xD9];

/// Length in bytes of a JPEG marker
pub const MARKER_LEN: usize = 2;

/// Find the first occurrence of `marker` at or after `from`.
///
/// Returns the absolute byte offset of the marker's first byte.
pub fn find_marker(data: &[u8], from: usize, marker: &[u8; 2]) -> Option<usize> {
    if from >= data.len() {
        return None;
    }
    data[from..]
        .windows(MARKER_LEN)
        .position(|window| window == marker)
        .map(|pos| pos + from)
}

/// Find the last occurrence of `marker` anywhere in `data`.
///
/// Returns the absolute byte offset of the marker's first byte.
pub fn rfind_marker(data: &[u8], marker: &[u8; 2]) -> Option<usize> {
    data.windows(MARKER_LEN)
        .rposition(|window| window == marker)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_marker_from_start() {
        let data = [0x00, 0xFF, 0xD8, 0x41, 0xFF, 0xD9];
        assert_eq!(find_marker(&data, 0, &SOI), Some(1));
        assert_eq!(find_marker(&data, 0, &EOI), Some(4));
    }

    #[test]
    fn test_find_marker_respects_offset() {
        let data = [0xFF, 0xD8, 0x41, 0xFF, 0xD8];
        assert_eq!(find_marker(&data, 0, &SOI), Some(0));
        assert_eq!(find_marker(&data, 1, &SOI), Some(3));
        assert_eq!(find_marker(&data, 4, &SOI), None);
    }

    #[test]
    fn test_find_marker_out_of_bounds_offset() {
        let data = [0xFF, 0xD8];
        assert_eq!(find_marker(&data, 2, &SOI), None);
        assert_eq!(find_marker(&data, 100, &SOI), None);
    }

    #[test]
    fn test_rfind_marker_picks_last() {
        let data = [0xFF, 0xD9, 0x00, 0xFF, 0xD9, 0x7B];
        assert_eq!(rfind_marker(&data, &EOI), Some(3));
    }

    #[test]
    fn test_markers_absent() {
        assert_eq!(find_marker(b"no markers here", 0, &SOI), None);
        assert_eq!(rfind_marker(b"no markers here", &EOI), None);
        assert_eq!(rfind_marker(&[], &EOI), None);
    }

    #[test]
    fn test_single_byte_buffer() {
        assert_eq!(find_marker(&[0xFF], 0, &SOI), None);
        assert_eq!(rfind_marker(&[0xFF], &EOI), None);
    }
}
