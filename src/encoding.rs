//! Encoding-safe text I/O
//!
//! Every read in the pipeline goes through this module so that a legacy
//! encoded file never aborts a run. Content is decoded as UTF-8 first; when
//! that fails the bytes are decoded as ISO-8859-1 (Latin-1), which maps each
//! byte to the code point of the same value and therefore always succeeds.
//! Non-ASCII text from such files may render differently than intended. That
//! is accepted and never corrected later.
//!
//! Writes are always UTF-8.
//!
//! ## Example
//!
//! ```rust,no_run
//! use driftlog::encoding::{read_text, split_lines_inclusive, write_text};
//! use std::path::Path;
//!
//! # fn main() -> driftlog::Result<()> {
//! write_text(Path::new("notes.txt"), "first\nsecond\n")?;
//! let text = read_text(Path::new("notes.txt"))?;
//! assert_eq!(split_lines_inclusive(&text), vec!["first\n", "second\n"]);
//! # Ok(())
//! # }
//! ```

use crate::error::{DriftError, Result};
use crate::utils::atomic_write;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Encoding that produced a decoded text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    /// Primary encoding
    Utf8,
    /// Single-byte fallback accepting every byte value
    Latin1,
}

/// Decoded text together with the encoding that was used
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    /// Decoded content
    pub text: String,
    /// Encoding that decoded it
    pub encoding: TextEncoding,
}

/// Decode bytes as UTF-8, falling back to Latin-1
pub fn decode(bytes: Vec<u8>) -> Decoded {
    match String::from_utf8(bytes) {
        Ok(text) => Decoded {
            text,
            encoding: TextEncoding::Utf8,
        },
        Err(err) => Decoded {
            text: decode_latin1(err.as_bytes()),
            encoding: TextEncoding::Latin1,
        },
    }
}

fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Read a text file, falling back to Latin-1 when it is not valid UTF-8
pub fn read_text(path: &Path) -> Result<String> {
    let decoded = decode(fs::read(path)?);
    if decoded.encoding == TextEncoding::Latin1 {
        debug!("Decoded {:?} with Latin-1 fallback", path);
    }
    Ok(decoded.text)
}

/// Read a text file as UTF-8 only
///
/// # Errors
///
/// - [`DriftError::Encoding`] if the file is not valid UTF-8
/// - [`DriftError::Io`] if the file cannot be read
pub fn read_text_strict(path: &Path) -> Result<String> {
    let bytes = fs::read(path)?;
    String::from_utf8(bytes).map_err(|e| DriftError::encoding(path, e.utf8_error()))
}

/// Read a text file, using the fallback only when `allow_fallback` is set
pub fn read_text_with(path: &Path, allow_fallback: bool) -> Result<String> {
    if allow_fallback {
        read_text(path)
    } else {
        read_text_strict(path)
    }
}

/// Write text as UTF-8, replacing any existing file
pub fn write_text(path: &Path, content: &str) -> Result<()> {
    fs::write(path, content.as_bytes())?;
    Ok(())
}

/// Write text as UTF-8 through a temporary file renamed into place
pub fn write_text_atomic(path: &Path, content: &str) -> Result<()> {
    atomic_write(path, content.as_bytes())
}

/// Split text into lines, keeping each line's `\n` terminator
///
/// The final line has no terminator when the text does not end with one.
pub fn split_lines_inclusive(text: &str) -> Vec<String> {
    text.split_inclusive('\n').map(str::to_string).collect()
}
