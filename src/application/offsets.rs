//! Mapping between protocol entity offsets and Rust string slices.
//!
//! The source expresses entity offsets in UTF-16 code units while Rust strings
//! are indexed by UTF-8 byte. This module is the only place that knows about
//! either width; everything else works with byte ranges it hands out.
//!
//! Text must be normalized with [`normalize`] exactly once before an index is
//! built from it. Composed and decomposed forms of the same character differ in
//! length in both encodings, so normalizing after resolving would shift every
//! boundary that follows.

use std::ops::Range;

use unicode_normalization::{is_nfc, UnicodeNormalization};

use crate::domain::EntityError;

/// Normalize text to NFC.
#[must_use]
pub fn normalize(text: &str) -> String {
    if is_nfc(text) {
        text.to_string()
    } else {
        text.nfc().collect()
    }
}

/// Character boundaries of a string in both UTF-16 units and UTF-8 bytes.
#[derive(Debug, Clone)]
pub struct Utf16Index {
    /// `(utf16_position, byte_position)` for every char start plus the end of text.
    boundaries: Vec<(usize, usize)>,
}

impl Utf16Index {
    /// Build the index for an already normalized string.
    #[must_use]
    pub fn new(text: &str) -> Self {
        let mut boundaries = Vec::with_capacity(text.len() + 1);
        let mut units = 0;

        for (byte, ch) in text.char_indices() {
            boundaries.push((units, byte));
            units += ch.len_utf16();
        }
        boundaries.push((units, text.len()));

        Self { boundaries }
    }

    /// Length of the indexed text in UTF-16 code units.
    #[must_use]
    pub fn len_utf16(&self) -> usize {
        self.boundaries.last().map_or(0, |&(units, _)| units)
    }

    /// Byte position of a UTF-16 position.
    ///
    /// # Errors
    /// `OutOfBounds` past the end, `SplitsCharacter` inside a surrogate pair.
    pub fn byte_position(&self, position: usize) -> Result<usize, EntityError> {
        match self
            .boundaries
            .binary_search_by_key(&position, |&(units, _)| units)
        {
            Ok(i) => Ok(self.boundaries[i].1),
            Err(_) if position > self.len_utf16() => Err(EntityError::OutOfBounds {
                offset: position,
                length: 0,
                text_len: self.len_utf16(),
            }),
            Err(_) => Err(EntityError::SplitsCharacter { position }),
        }
    }

    /// Byte range covering `length` UTF-16 units starting at `offset`.
    ///
    /// # Errors
    /// `OutOfBounds` if the span runs past the end of the text (or overflows),
    /// `SplitsCharacter` if either end falls inside a surrogate pair.
    pub fn resolve(&self, offset: usize, length: usize) -> Result<Range<usize>, EntityError> {
        let out_of_bounds = EntityError::OutOfBounds {
            offset,
            length,
            text_len: self.len_utf16(),
        };

        let end = offset.checked_add(length).ok_or_else(|| out_of_bounds.clone())?;
        if end > self.len_utf16() {
            return Err(out_of_bounds);
        }

        let start = self.byte_position(offset)?;
        let end = self.byte_position(end)?;

        Ok(start..end)
    }
}
