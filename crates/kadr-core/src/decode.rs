//! Multi-encoding text decoding for the metadata region.
//!
//! Camera firmware revisions emit the appended metadata in inconsistent
//! encodings: newer units write UTF-8, older ones the legacy Cyrillic code
//! page windows-1251. The decoder walks a configured priority list and
//! returns the first successful decode, so the common cases are recovered
//! while the permissive latin-1 pass-through at the end of the default list
//! guarantees forward progress on arbitrary bytes.

use std::fmt;

use encoding_rs::WINDOWS_1251;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{Error, Result};

/// The single code point windows-1251 leaves unassigned
const UNASSIGNED_CP1251: u8 = 0x98;

/// A text encoding the decoder can attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Encoding {
    /// Strict UTF-8 validation
    #[serde(rename = "utf-8")]
    Utf8,
    /// Windows code page 1251 (legacy single-byte Cyrillic)
    #[serde(rename = "windows-1251")]
    Windows1251,
    /// ISO-8859-1 byte-identity mapping; accepts any byte sequence
    #[serde(rename = "latin-1")]
    Latin1,
}

impl Encoding {
    /// Returns the canonical label for this encoding
    pub fn as_str(&self) -> &'static str {
        match self {
            Encoding::Utf8 => "utf-8",
            Encoding::Windows1251 => "windows-1251",
            Encoding::Latin1 => "latin-1",
        }
    }

    /// Attempts to decode `bytes` under this encoding
    ///
    /// Returns `None` when the bytes are not valid in this encoding.
    /// [`Encoding::Latin1`] never returns `None`: every byte maps to the
    /// code point of the same value.
    pub fn decode(&self, bytes: &[u8]) -> Option<String> {
        match self {
            Encoding::Utf8 => std::str::from_utf8(bytes).ok().map(str::to_owned),
            Encoding::Windows1251 => {
                // 0x98 is the one byte unassigned in cp1251. The WHATWG
                // index behind encoding_rs decodes it to U+0098, which
                // would make this tier infallible; reject it so the
                // fallback ladder keeps a working last resort.
                if bytes.contains(&UNASSIGNED_CP1251) {
                    None
                } else {
                    WINDOWS_1251
                        .decode_without_bom_handling_and_without_replacement(bytes)
                        .map(|text| text.into_owned())
                }
            }
            Encoding::Latin1 => Some(bytes.iter().map(|&b| b as char).collect()),
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Default encoding priority: UTF-8, then the legacy Cyrillic code page,
/// then the infallible latin-1 fallback
pub const DEFAULT_PRIORITY: [Encoding; 3] =
    [Encoding::Utf8, Encoding::Windows1251, Encoding::Latin1];

/// Decodes `bytes` with the first encoding in `priority` that accepts them
///
/// The result is trimmed of leading and trailing whitespace. Fails with
/// [`Error::Decode`] when every configured encoding rejects the bytes
/// (possible only when the priority list omits the latin-1 fallback).
pub fn decode_text(bytes: &[u8], priority: &[Encoding]) -> Result<String> {
    for encoding in priority {
        match encoding.decode(bytes) {
            Some(text) => {
                trace!("decoded {} bytes as {}", bytes.len(), encoding);
                return Ok(text.trim().to_owned());
            }
            None => trace!("{} rejected {} bytes", encoding, bytes.len()),
        }
    }

    let tried = priority
        .iter()
        .map(Encoding::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    Err(Error::decode(if tried.is_empty() {
        "none configured".to_owned()
    } else {
        tried
    }))
}
