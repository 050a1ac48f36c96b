//! Byte-bounded text slicing for menu bodies.
//!
//! # Invariants
//!
//! 1. Every slice ends on a `char` boundary, so each chunk is valid UTF-8 on
//!    its own.
//! 2. [`chunk_text`] always yields at least one chunk (possibly empty), and
//!    only the last chunk has `more == false`.
//! 3. Concatenating the chunks reproduces the input.

/// One slice of a menu body, with the continuation flag the host sends
/// alongside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuChunk<'t> {
    /// The slice to send.
    pub text: &'t str,
    /// Whether further chunks follow.
    pub more: bool,
}

/// Cut `text` to at most `max_bytes` bytes without splitting a character.
#[must_use]
pub fn truncate_utf8(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Split `text` into chunks of at most `chunk_size` bytes.
///
/// A character wider than `chunk_size` still gets its own chunk, so the
/// iterator always makes progress. A `chunk_size` of 0 is treated as 1.
#[must_use]
pub fn chunk_text(text: &str, chunk_size: usize) -> Chunks<'_> {
    Chunks {
        rest: text,
        chunk_size: chunk_size.max(1),
        started: false,
    }
}

/// Iterator returned by [`chunk_text`].
#[derive(Debug, Clone)]
pub struct Chunks<'t> {
    rest: &'t str,
    chunk_size: usize,
    started: bool,
}

impl<'t> Iterator for Chunks<'t> {
    type Item = MenuChunk<'t>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.started && self.rest.is_empty() {
            return None;
        }
        self.started = true;

        let mut end = self.chunk_size.min(self.rest.len());
        while !self.rest.is_char_boundary(end) {
            end -= 1;
        }
        if end == 0 {
            end = self.rest.chars().next().map_or(0, char::len_utf8);
        }

        let (head, tail) = self.rest.split_at(end);
        self.rest = tail;
        Some(MenuChunk {
            text: head,
            more: !tail.is_empty(),
        })
    }
}
