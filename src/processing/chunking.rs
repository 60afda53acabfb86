//! Fixed-size character windows with exact overlap.
//!
//! Highlights:
//!
//! - Lengths are counted in `char`s, so windows never split a UTF-8 sequence.
//! - Every window but the last holds exactly `chunk_size` characters; consecutive windows share
//!   exactly `chunk_overlap` characters.
//! - Dropping the first `chunk_overlap` characters of every window after the first and
//!   concatenating reproduces the input byte for byte.
//! - [`TextSplitter::split`] is lazy and borrows the input; the returned iterator is `Clone`,
//!   and calling `split` again starts over.

use super::types::ChunkingError;

/// Default maximum characters per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 10_000;
/// Default characters shared by consecutive chunks.
pub const DEFAULT_CHUNK_OVERLAP: usize = 1_000;

/// Splits text into overlapping windows of bounded length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl TextSplitter {
    /// Create a splitter, rejecting a zero size or an overlap that would never advance.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, ChunkingError> {
        if chunk_size == 0 || chunk_overlap >= chunk_size {
            return Err(ChunkingError::InvalidConfiguration {
                chunk_size,
                chunk_overlap,
            });
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    /// Maximum characters per chunk.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Characters shared by consecutive chunks.
    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Lazily split `text`. Empty input yields nothing.
    pub fn split<'a>(&self, text: &'a str) -> Chunks<'a> {
        Chunks {
            rest: text,
            chunk_size: self.chunk_size,
            step: self.chunk_size - self.chunk_overlap,
            finished: text.is_empty(),
        }
    }
}

impl Default for TextSplitter {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

/// Iterator over the chunks of one text, produced by [`TextSplitter::split`].
#[derive(Debug, Clone)]
pub struct Chunks<'a> {
    rest: &'a str,
    chunk_size: usize,
    step: usize,
    finished: bool,
}

impl<'a> Iterator for Chunks<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        // A char at index `chunk_size` means more text follows this window.
        match byte_offset(self.rest, self.chunk_size) {
            None => {
                self.finished = true;
                Some(self.rest)
            }
            Some(end) => {
                let chunk = &self.rest[..end];
                // `step < chunk_size`, so this offset exists whenever `end` does.
                let advance = byte_offset(self.rest, self.step).unwrap_or(end);
                self.rest = &self.rest[advance..];
                Some(chunk)
            }
        }
    }
}

impl std::iter::FusedIterator for Chunks<'_> {}

fn byte_offset(text: &str, chars: usize) -> Option<usize> {
    text.char_indices().nth(chars).map(|(offset, _)| offset)
}
