//! The parse pipeline: composite capture bytes in, violation record out.
//!
//! Stage order: fail-fast validation, frame extraction and metadata
//! location over the same buffer, multi-encoding decode, resilient JSON
//! recovery, field normalization. Each stage consumes the whole output of
//! the previous one; nothing here performs I/O or holds shared state, so
//! independent call sites may run the pipeline concurrently with one
//! shared config.

use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::config::ParserConfig;
use crate::decode::decode_text;
use crate::error::{Error, Result};
use crate::record::{build_record, ViolationRecord};
use crate::recover::split_objects;
use crate::scanner::{Scanner, ScannerConfig, SOI};

/// Minimum plausible capture size in bytes
pub const MIN_INPUT_LEN: usize = 10;

/// Parses one composite capture into a normalized violation record
///
/// The timestamp fallback uses the wall clock; use [`parse_with_now`] to
/// pin it. Returns a complete record or one typed error, never a partial
/// success.
pub fn parse(data: &[u8], config: &ParserConfig) -> Result<ViolationRecord> {
    parse_with_now(data, config, Utc::now())
}

/// [`parse`] with an injected current time
///
/// Two calls with identical bytes, config, and `now` produce identical
/// records.
pub fn parse_with_now(
    data: &[u8],
    config: &ParserConfig,
    now: DateTime<Utc>,
) -> Result<ViolationRecord> {
    validate_input(data)?;

    let scanner = Scanner::with_config(ScannerConfig::new().max_frames(config.max_frames));
    let frames = scanner.frames(data);
    if frames.is_empty() {
        return Err(Error::insufficient_data("no complete image frames"));
    }

    let region = scanner.metadata_region(data);
    debug!(
        "{} frames, {} metadata bytes",
        frames.len(),
        region.len()
    );

    let text = decode_text(region, &config.encodings)?;
    let objects = split_objects(&text);
    if objects.is_empty() {
        return Err(Error::insufficient_data("no metadata objects recovered"));
    }

    build_record(&frames, &objects, config, now)
}

/// Reads a capture file and parses it
pub fn parse_file(path: impl AsRef<Path>, config: &ParserConfig) -> Result<ViolationRecord> {
    let path = path.as_ref();
    let data = std::fs::read(path).map_err(|source| Error::file_read(path, source))?;
    parse(&data, config)
}

/// Rejects inputs too short to hold a frame or not opening with SOI
fn validate_input(data: &[u8]) -> Result<()> {
    if data.len() < MIN_INPUT_LEN {
        return Err(Error::malformed_input(format!(
            "buffer holds {} bytes, need at least {}",
            data.len(),
            MIN_INPUT_LEN
        )));
    }
    if data[..2] != SOI {
        return Err(Error::malformed_input(
            "input does not begin with a JPEG start marker",
        ));
    }
    Ok(())
}
