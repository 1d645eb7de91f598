//! Binary scanning module for locating image frames and the metadata region.
//!
//! This module provides functionality to scan a composite capture file for
//! the JPEG bitstreams it contains and for the byte region holding the
//! appended metadata text.
//!
//! ## Algorithm Overview
//!
//! 1. Walk the buffer left to right, pairing each SOI marker with the nearest
//!    EOI at or after it; every pair becomes one [`Frame`]
//! 2. Advance past the consumed EOI so no end marker is reused
//! 3. Independently, locate the *last* EOI in the whole buffer; everything
//!    after it is the metadata region
//!
//! Frame pairing and metadata location are deliberately decoupled: on a
//! malformed file the rightmost EOI need not belong to a well-paired frame,
//! and the two answers are allowed to disagree.

mod markers;

use std::ops::Range;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use tracing::{debug, trace};

pub use markers::{find_marker, rfind_marker, EOI, MARKER_LEN, SOI};

/// One self-contained JPEG bitstream found inside a larger buffer
///
/// A frame borrows the scanned input; it is a view, never a copy. Downstream
/// consumers receive frames as base64 text via [`Frame::to_base64`], because
/// the output schema is JSON and carries no raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame<'a> {
    bytes: &'a [u8],
    range: Range<usize>,
}

impl<'a> Frame<'a> {
    fn new(bytes: &'a [u8], range: Range<usize>) -> Self {
        Self { bytes, range }
    }

    /// Returns the frame contents, start and end markers included
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Returns the byte range this frame occupies in the original input
    pub fn range(&self) -> Range<usize> {
        self.range.clone()
    }

    /// Returns the frame length in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns true if the frame is empty (never produced by the scanner)
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Encodes the frame as standard-alphabet base64 text
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.bytes)
    }
}

/// Configuration for the scanner
#[derive(Debug, Clone, Default)]
pub struct ScannerConfig {
    /// Maximum number of frames to extract (0 = unlimited)
    pub max_frames: usize,
}

impl ScannerConfig {
    /// Creates a new scanner config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum number of frames to extract
    pub fn max_frames(mut self, max: usize) -> Self {
        self.max_frames = max;
        self
    }
}

/// Scanner for frames and the trailing metadata region
#[derive(Debug, Clone, Default)]
pub struct Scanner {
    config: ScannerConfig,
}

impl Scanner {
    /// Creates a new scanner with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new scanner with custom configuration
    pub fn with_config(config: ScannerConfig) -> Self {
        Self { config }
    }

    /// Extracts every well-paired frame from `data`, in file order
    ///
    /// A dangling SOI with no following EOI is discarded, not emitted, and
    /// an EOI is never shared between two frames. A buffer with no valid
    /// marker pair yields an empty vector; that is not an error.
    pub fn frames<'a>(&self, data: &'a [u8]) -> Vec<Frame<'a>> {
        let mut frames = Vec::new();
        let mut cursor = 0;

        debug!("scanning {} bytes for frames", data.len());

        while let Some(start) = find_marker(data, cursor, &SOI) {
            let Some(end) = find_marker(data, start, &EOI) else {
                trace!("dangling frame start at offset {}, discarding", start);
                break;
            };

            let range = start..end + MARKER_LEN;
            trace!("frame at {}..{} ({} bytes)", range.start, range.end, range.len());
            frames.push(Frame::new(&data[range.clone()], range.clone()));

            if self.config.max_frames > 0 && frames.len() >= self.config.max_frames {
                break;
            }

            cursor = range.end;
        }

        debug!("scan complete: found {} frames", frames.len());
        frames
    }

    /// Returns the byte region strictly after the last EOI in `data`
    ///
    /// This is where camera firmware appends metadata text. Location depends
    /// only on the rightmost EOI, independent of frame pairing. A buffer
    /// without any EOI yields an empty region.
    pub fn metadata_region<'a>(&self, data: &'a [u8]) -> &'a [u8] {
        match rfind_marker(data, &EOI) {
            Some(pos) => &data[pos + MARKER_LEN..],
            None => &[],
        }
    }
}
