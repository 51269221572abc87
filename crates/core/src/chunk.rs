//! Paragraph-aware chunking of message text into size-bounded blocks.
//!
//! Paragraphs are packed greedily, joined by a blank line, as long as the
//! block stays within `max_chars`. A paragraph that is larger than `max_chars`
//! on its own is hard-sliced into consecutive pieces of exactly `max_chars`
//! characters (the last piece may be shorter), without regard for word
//! boundaries.
//!
//! Lengths are counted in characters, not bytes.

use regex::Regex;
use std::sync::LazyLock;

use crate::helpers::normalize;

static PARAGRAPH_BREAK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n\s*\n").unwrap());

/// Separator placed between paragraphs packed into the same block.
pub const PARAGRAPH_SEPARATOR: &str = "\n\n";

/// Accumulates paragraphs for the block currently being built.
struct Block {
    text: String,
    chars: usize,
}

impl Block {
    fn new() -> Self {
        Self {
            text: String::new(),
            chars: 0,
        }
    }

    fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Length of the block if `para_chars` more characters were appended.
    fn len_with(&self, para_chars: usize) -> usize {
        if self.is_empty() {
            para_chars
        } else {
            self.chars + PARAGRAPH_SEPARATOR.len() + para_chars
        }
    }

    fn push(&mut self, para: &str, para_chars: usize) {
        self.chars = self.len_with(para_chars);
        if !self.text.is_empty() {
            self.text.push_str(PARAGRAPH_SEPARATOR);
        }
        self.text.push_str(para);
    }

    fn flush_into(&mut self, chunks: &mut Vec<String>) {
        if !self.is_empty() {
            chunks.push(std::mem::take(&mut self.text));
        }
        self.chars = 0;
    }
}

/// Split `para` into consecutive slices of `max_chars` characters.
fn hard_split(para: &str, max_chars: usize, chunks: &mut Vec<String>) {
    let mut start = 0;
    let mut count = 0;
    for (idx, _) in para.char_indices() {
        if count == max_chars {
            chunks.push(para[start..idx].to_string());
            start = idx;
            count = 0;
        }
        count += 1;
    }
    if start < para.len() {
        chunks.push(para[start..].to_string());
    }
}

/// Split text into blocks of at most `max_chars` characters.
///
/// The input is normalized first; empty input yields no blocks. Blocks are
/// never empty and appear in source order. `max_chars` must be non-zero.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    debug_assert!(max_chars > 0, "max_chars must be positive");
    let max_chars = max_chars.max(1);

    let normalized = normalize(text);
    if normalized.is_empty() {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut block = Block::new();

    for para in PARAGRAPH_BREAK_RE.split(&normalized) {
        let para = para.trim();
        if para.is_empty() {
            continue;
        }
        let para_chars = para.chars().count();

        if para_chars > max_chars {
            block.flush_into(&mut chunks);
            hard_split(para, max_chars, &mut chunks);
            continue;
        }

        if block.len_with(para_chars) > max_chars {
            block.flush_into(&mut chunks);
        }
        block.push(para, para_chars);
    }

    block.flush_into(&mut chunks);
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_text_single_chunk() {
        assert_eq!(chunk_text("Hello, world!", 1800), vec!["Hello, world!"]);
    }

    #[test]
    fn test_empty_text() {
        assert!(chunk_text("", 1800).is_empty());
        assert!(chunk_text(" \r\n\u{200B}\n ", 1800).is_empty());
    }

    #[test]
    fn test_paragraphs_packed_under_limit() {
        let chunks = chunk_text("First.\n\nSecond.\n\n\n\nThird.", 1800);
        assert_eq!(chunks, vec!["First.\n\nSecond.\n\nThird."]);
    }

    #[test]
    fn test_paragraphs_split_at_limit() {
        // "aaaa\n\nbbbb" is exactly 10 chars, adding "cc" would overflow.
        let chunks = chunk_text("aaaa\n\nbbbb\n\ncc", 10);
        assert_eq!(chunks, vec!["aaaa\n\nbbbb", "cc"]);
    }

    #[test]
    fn test_oversized_paragraph_hard_split() {
        let max = 10;
        let para = "x".repeat(3 * max + 5);
        let chunks = chunk_text(&para, max);
        assert_eq!(chunks.len(), 4);
        assert!(chunks[..3].iter().all(|c| c.chars().count() == max));
        assert_eq!(chunks[3].chars().count(), 5);
    }

    #[test]
    fn test_oversized_paragraph_flushes_buffer() {
        let text = format!("short\n\n{}\n\ntail", "y".repeat(12));
        let chunks = chunk_text(&text, 10);
        assert_eq!(chunks, vec!["short", "yyyyyyyyyy", "yy", "tail"]);
    }

    #[test]
    fn test_multibyte_hard_split() {
        let text = "é".repeat(7);
        let chunks = chunk_text(&text, 3);
        assert_eq!(chunks, vec!["ééé", "ééé", "é"]);
    }

    #[test]
    fn test_chunks_bounded_and_reconstruct() {
        let text = (0..40)
            .map(|i| format!("Paragraph number {} {}", i, "word ".repeat(i % 7)))
            .collect::<Vec<_>>()
            .join("\n\n");
        let max = 60;
        let chunks = chunk_text(&text, max);
        for c in &chunks {
            assert!(!c.is_empty());
            assert!(c.chars().count() <= max);
        }
        // No paragraph here exceeds the limit, so blocks rejoin with the separator.
        assert_eq!(chunks.join(PARAGRAPH_SEPARATOR), normalize(&text));
    }

    #[test]
    fn test_deterministic() {
        let text = "Alpha\n\nBeta\n\nGamma\n\nDelta";
        assert_eq!(chunk_text(text, 7), chunk_text(text, 7));
    }
}
