//! Error types for the kadr-core library.
//!
//! This module provides comprehensive error handling using the `thiserror` crate,
//! with detailed error variants for different failure modes.
//!
//! Only four variants can abort a [`parse`](crate::parse) call: malformed
//! input, an undecodable metadata region, an empty extraction result, and
//! (for the file convenience wrapper) a read failure. Everything else inside
//! the pipeline degrades to per-field defaults instead of propagating.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for kadr operations
pub type Result<T> = std::result::Result<T, Error>;

/// Comprehensive error type for all kadr operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Failed to read input file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        /// Path to the file that failed to read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Input buffer is too short or does not open with a JPEG start marker
    #[error("malformed input: {details}")]
    MalformedInput {
        /// Detailed description of the issue
        details: String,
    },

    /// Metadata region bytes survived no configured encoding
    #[error("failed to decode metadata region; tried encodings: {tried}")]
    Decode {
        /// Comma-separated list of the encodings that were attempted
        tried: String,
    },

    /// A recovered JSON fragment failed to parse
    ///
    /// Diagnostic only: the splitter logs and drops the fragment rather than
    /// surfacing this to the caller, because partial recovery beats total
    /// failure.
    #[error("unparseable JSON fragment at character offset {offset}: {source}")]
    JsonRecovery {
        /// Character offset of the fragment start within the decoded text
        offset: usize,
        /// Underlying JSON parse error
        #[source]
        source: serde_json::Error,
    },

    /// No frames or no metadata objects were extracted from the input
    #[error("insufficient data: {details}")]
    InsufficientData {
        /// Detailed description of what was missing
        details: String,
    },
}

impl Error {
    /// Creates a new file read error
    pub fn file_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileRead {
            path: path.into(),
            source,
        }
    }

    /// Creates a new malformed input error
    pub fn malformed_input(details: impl Into<String>) -> Self {
        Self::MalformedInput {
            details: details.into(),
        }
    }

    /// Creates a new decode error from the list of attempted encodings
    pub fn decode(tried: impl Into<String>) -> Self {
        Self::Decode {
            tried: tried.into(),
        }
    }

    /// Creates a new JSON recovery error
    pub fn json_recovery(offset: usize, source: serde_json::Error) -> Self {
        Self::JsonRecovery { offset, source }
    }

    /// Creates a new insufficient data error
    pub fn insufficient_data(details: impl Into<String>) -> Self {
        Self::InsufficientData {
            details: details.into(),
        }
    }

    /// Returns true if this is a recoverable error that should be skipped
    ///
    /// Recoverable errors are logged and swallowed inside the pipeline;
    /// the remaining ones abort the whole parse.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::JsonRecovery { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fragment_error() -> serde_json::Error {
        serde_json::from_str::<serde_json::Value>("{broken").unwrap_err()
    }

    #[test]
    fn test_error_display() {
        let err = Error::malformed_input("buffer holds 3 bytes, need at least 10");
        assert!(err.to_string().contains("malformed input"));
        assert!(err.to_string().contains("3 bytes"));

        let err = Error::decode("utf-8, windows-1251");
        assert!(err.to_string().contains("windows-1251"));
    }

    #[test]
    fn test_is_recoverable() {
        assert!(Error::json_recovery(14, fragment_error()).is_recoverable());
        assert!(!Error::insufficient_data("no frames").is_recoverable());
        assert!(!Error::malformed_input("short").is_recoverable());
    }
}
