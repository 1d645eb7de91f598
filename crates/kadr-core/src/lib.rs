//! # kadr-core
//!
//! A library for extracting and normalizing violation metadata embedded in
//! traffic-camera JPEG composites.
//!
//! Enforcement cameras upload a single file per event: one or more JPEG
//! bitstreams back to back, followed by vendor JSON metadata appended after
//! the last end-of-image marker. This crate provides the core functionality
//! for:
//!
//! - Scanning composite files for the image frames they contain
//! - Decoding the appended metadata under inconsistent text encodings
//! - Recovering JSON objects from fragmented or concatenated metadata
//! - Normalizing the recovered fields into a fixed violation-record schema
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`scanner`]: Frame extraction and metadata-region location
//! - [`decode`]: Ordered multi-encoding text decoding
//! - [`recover`]: Resilient JSON object splitting
//! - [`record`]: Field normalization and the output record
//! - [`config`]: Parser configuration
//! - [`pipeline`]: The end-to-end parse entry points
//! - [`error`]: Error types and handling
//!
//! ## Example
//!
//! ```no_run
//! use kadr_core::{parse, ParserConfig};
//! use std::fs;
//!
//! // Read a composite capture file
//! let data = fs::read("./violation.jpg")?;
//!
//! // Parse it into a normalized record
//! let config = ParserConfig::default();
//! let record = parse(&data, &config)?;
//!
//! println!("{} at {}", record.v_regno, record.v_time_check);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Error behavior
//!
//! Only four conditions abort a parse: malformed input, an undecodable
//! metadata region, an empty extraction result, and (for the file
//! convenience wrapper) a read failure. A malformed value inside a single
//! field collapses to that field's default instead of propagating.

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]

pub mod config;
pub mod decode;
pub mod error;
pub mod pipeline;
pub mod record;
pub mod recover;
pub mod scanner;

// Re-export primary types for convenience
pub use config::{DirectionLabels, ParserConfig};
pub use decode::{decode_text, Encoding};
pub use error::{Error, Result};
pub use pipeline::{parse, parse_file, parse_with_now, MIN_INPUT_LEN};
pub use record::{build_record, ViolationRecord};
pub use recover::{split_objects, JsonObject};
pub use scanner::{Frame, Scanner, ScannerConfig};

/// Crate version for programmatic access
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
