//! Sliding-window text chunker.
//!
//! Splits normalized document text into overlapping fixed-size character
//! windows. Each window becomes a [`Chunk`] with a contiguous 0-based index
//! and a deterministic id, so re-ingesting the same text produces the same
//! points.

use anyhow::{bail, Result};
use chrono::Utc;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::models::Chunk;

/// Default window size in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 512;

/// Overlap between successive windows: a fixed character count, or a
/// fraction of the window size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Overlap {
    Chars(usize),
    Fraction(f32),
}

impl Overlap {
    /// Resolve the overlap to a character count for the given window size.
    pub fn resolve(&self, size: usize) -> usize {
        match *self {
            Overlap::Chars(n) => n,
            Overlap::Fraction(f) => (size as f32 * f) as usize,
        }
    }
}

impl Default for Overlap {
    fn default() -> Self {
        Overlap::Chars(100)
    }
}

impl std::str::FromStr for Overlap {
    type Err = anyhow::Error;

    /// Parses `"100"` as a character count and `"20%"` as a fraction.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Some(pct) = s.strip_suffix('%') {
            let value: f32 = pct.trim().parse()?;
            if !(0.0..100.0).contains(&value) {
                bail!("overlap percentage must be in [0, 100), got {value}");
            }
            Ok(Overlap::Fraction(value / 100.0))
        } else {
            Ok(Overlap::Chars(s.parse()?))
        }
    }
}

/// Split text into successive windows of `size` characters, each overlapping
/// the previous one by `overlap` characters.
///
/// Windows cover the whole text with no gaps; the final window ends exactly
/// at the text's end. Empty input yields an empty sequence.
///
/// # Errors
///
/// Returns an error when `size` is zero or the resolved overlap is not
/// strictly smaller than `size` (the window would never advance).
pub fn chunk_text(
    document_url: &str,
    title: &str,
    text: &str,
    size: usize,
    overlap: Overlap,
) -> Result<Vec<Chunk>> {
    if size == 0 {
        bail!("chunk size must be > 0");
    }
    let overlap = overlap.resolve(size);
    if overlap >= size {
        bail!("chunk overlap ({overlap}) must be smaller than chunk size ({size})");
    }

    if text.is_empty() {
        return Ok(Vec::new());
    }

    // Byte offsets of every character boundary, so windows measured in
    // characters never split a multi-byte sequence.
    let mut bounds: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
    bounds.push(text.len());
    let len = bounds.len() - 1;

    let mut chunks = Vec::new();
    let mut start = 0usize;
    let mut index = 0usize;

    loop {
        let end = (start + size).min(len);
        let window = &text[bounds[start]..bounds[end]];
        chunks.push(make_chunk(document_url, title, index, window));
        if end == len {
            break;
        }
        start = end - overlap;
        index += 1;
    }

    Ok(chunks)
}

/// Builds a chunk with an id derived from SHA-256 of url + index + text,
/// folded into a UUID so the vector store accepts it as a point id.
fn make_chunk(document_url: &str, title: &str, index: usize, text: &str) -> Chunk {
    let mut hasher = Sha256::new();
    hasher.update(document_url.as_bytes());
    hasher.update((index as u64).to_le_bytes());
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();

    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    let id = Uuid::from_bytes(bytes).to_string();

    Chunk {
        id,
        document_url: document_url.to_string(),
        text: text.to_string(),
        index,
        title: title.to_string(),
        created_at: Utc::now(),
    }
}
