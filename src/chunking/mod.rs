//! Text chunking for embedding and retrieval.
//!
//! Splits transcript text into overlapping passages bounded by a maximum
//! character size. Splitting prefers natural boundaries (paragraph, line,
//! sentence, word) and only falls back to a hard character cut when no
//! boundary fits the budget. The splitter is a pure function of its input
//! and configuration: identical text always yields identical chunks, which
//! is what makes re-indexing reproducible.

use crate::error::{Result, SvarError};
use std::collections::VecDeque;

/// Boundary preference, coarsest first.
const SEPARATORS: [&str; 4] = ["\n\n", "\n", ". ", " "];

/// Recursive character splitter with overlap.
#[derive(Debug, Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl TextSplitter {
    /// Create a splitter. `chunk_overlap` must be smaller than `chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(SvarError::Config(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if chunk_overlap >= chunk_size {
            return Err(SvarError::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                chunk_overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    /// Split text into ordered, overlapping chunks covering the whole input.
    pub fn split(&self, text: &str) -> Vec<String> {
        if text.is_empty() {
            return Vec::new();
        }

        let mut fragments = Vec::new();
        self.collect_fragments(text, 0, &mut fragments);
        self.merge_fragments(fragments)
    }

    /// Break text into fragments no larger than `chunk_size`, splitting at
    /// the coarsest boundary available. Separators stay attached to the
    /// preceding fragment so no characters are lost.
    fn collect_fragments(&self, text: &str, depth: usize, out: &mut Vec<String>) {
        if text.is_empty() {
            return;
        }
        if char_len(text) <= self.chunk_size {
            out.push(text.to_string());
            return;
        }
        if depth >= SEPARATORS.len() {
            self.hard_cut(text, out);
            return;
        }

        let sep = SEPARATORS[depth];
        if !text.contains(sep) {
            self.collect_fragments(text, depth + 1, out);
            return;
        }

        for part in split_keep_separator(text, sep) {
            self.collect_fragments(&part, depth + 1, out);
        }
    }

    /// Last resort: cut at the size budget on character boundaries.
    fn hard_cut(&self, text: &str, out: &mut Vec<String>) {
        let mut current = String::with_capacity(self.chunk_size);
        let mut count = 0;
        for ch in text.chars() {
            current.push(ch);
            count += 1;
            if count == self.chunk_size {
                out.push(std::mem::take(&mut current));
                count = 0;
            }
        }
        if !current.is_empty() {
            out.push(current);
        }
    }

    /// Greedily pack fragments into chunks, carrying a tail of up to
    /// `chunk_overlap` characters into the next chunk.
    fn merge_fragments(&self, fragments: Vec<String>) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut window: VecDeque<(String, usize)> = VecDeque::new();
        let mut window_len = 0usize;

        for fragment in fragments {
            let fragment_len = char_len(&fragment);

            if !window.is_empty() && window_len + fragment_len > self.chunk_size {
                chunks.push(concat_window(&window));

                // Drop leading fragments until the remainder fits the
                // overlap budget and leaves room for the incoming fragment.
                while window_len > self.chunk_overlap
                    || (window_len + fragment_len > self.chunk_size && window_len > 0)
                {
                    if let Some((_, len)) = window.pop_front() {
                        window_len -= len;
                    } else {
                        break;
                    }
                }
            }

            window_len += fragment_len;
            window.push_back((fragment, fragment_len));
        }

        if !window.is_empty() {
            chunks.push(concat_window(&window));
        }

        chunks
    }
}

fn concat_window(window: &VecDeque<(String, usize)>) -> String {
    let mut chunk = String::new();
    for (fragment, _) in window {
        chunk.push_str(fragment);
    }
    chunk
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Split on a separator, keeping the separator attached to the piece
/// before it.
fn split_keep_separator(text: &str, sep: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut rest = text;

    while let Some(idx) = rest.find(sep) {
        let end = idx + sep.len();
        parts.push(rest[..end].to_string());
        rest = &rest[end..];
    }
    if !rest.is_empty() {
        parts.push(rest.to_string());
    }

    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Verify the chunk sequence fully covers `text` in order with no gaps.
    fn assert_coverage(text: &str, chunks: &[String]) {
        assert!(!chunks.is_empty());

        let mut prev_start = 0usize;
        let mut prev_end = 0usize;
        for (i, chunk) in chunks.iter().enumerate() {
            let pos = text[prev_start..]
                .find(chunk.as_str())
                .map(|p| p + prev_start)
                .unwrap_or_else(|| panic!("chunk {} not found in source text", i));

            if i == 0 {
                assert_eq!(pos, 0, "first chunk must start at the beginning");
            } else {
                assert!(pos <= prev_end, "gap before chunk {}", i);
                assert!(pos > prev_start, "chunk {} does not advance", i);
            }

            prev_start = pos;
            prev_end = pos + chunk.len();
        }

        assert_eq!(prev_end, text.len(), "last chunk must reach the end");
    }

    #[test]
    fn test_short_text_is_one_chunk() {
        let splitter = TextSplitter::new(100, 20).unwrap();
        let chunks = splitter.split("The sky is blue.");
        assert_eq!(chunks, vec!["The sky is blue.".to_string()]);
    }

    #[test]
    fn test_empty_text() {
        let splitter = TextSplitter::new(100, 20).unwrap();
        assert!(splitter.split("").is_empty());
    }

    #[test]
    fn test_rejects_overlap_not_smaller_than_size() {
        assert!(TextSplitter::new(100, 100).is_err());
        assert!(TextSplitter::new(0, 0).is_err());
        assert!(TextSplitter::new(100, 99).is_ok());
    }

    #[test]
    fn test_chunks_respect_size_budget() {
        let splitter = TextSplitter::new(50, 10).unwrap();
        let text = "alpha bravo charlie delta echo foxtrot golf hotel india juliett kilo lima mike november oscar papa";

        let chunks = splitter.split(text);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(char_len(chunk) <= 50, "oversized chunk: {:?}", chunk);
        }
        assert_coverage(text, &chunks);
    }

    #[test]
    fn test_sentence_boundaries_preferred() {
        let splitter = TextSplitter::new(40, 0).unwrap();
        let text = "First sentence here. Second sentence here. Third sentence here.";

        let chunks = splitter.split(text);
        assert!(chunks.len() > 1);
        // No sentence is torn apart mid-word when sentence breaks fit
        for chunk in &chunks {
            assert!(chunk.trim_end().ends_with('.'), "chunk {:?}", chunk);
        }
        assert_coverage(text, &chunks);
    }

    #[test]
    fn test_paragraph_boundaries_preferred() {
        let splitter = TextSplitter::new(30, 0).unwrap();
        let text = "First paragraph words.\n\nSecond paragraph words.";

        let chunks = splitter.split(text);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], "First paragraph words.\n\n");
        assert_eq!(chunks[1], "Second paragraph words.");
    }

    #[test]
    fn test_hard_cut_on_unbreakable_text() {
        let splitter = TextSplitter::new(10, 2).unwrap();
        let text = "abcdefghijklmnopqrstuvwxyz";

        let chunks = splitter.split(text);
        for chunk in &chunks {
            assert!(char_len(chunk) <= 10);
        }
        assert_coverage(text, &chunks);
    }

    #[test]
    fn test_adjacent_chunks_overlap() {
        let splitter = TextSplitter::new(40, 15).unwrap();
        let text = "one two three four five six seven eight nine ten eleven twelve thirteen fourteen";

        let chunks = splitter.split(text);
        assert!(chunks.len() > 1);
        for pair in chunks.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            // The next chunk starts with a suffix of the previous one
            let shared = (1..=a.len().min(b.len()))
                .rev()
                .find(|&n| b.starts_with(&a[a.len() - n..]));
            assert!(shared.is_some(), "no overlap between {:?} and {:?}", a, b);
        }
        assert_coverage(text, &chunks);
    }

    #[test]
    fn test_split_is_deterministic() {
        let splitter = TextSplitter::new(50, 10).unwrap();
        let text = "Determinism matters. The same input must yield the same chunks. Every single time.";

        let first = splitter.split(text);
        let second = splitter.split(text);
        assert_eq!(first, second);
    }

    #[test]
    fn test_split_keep_separator() {
        let parts = split_keep_separator("a. b. c", ". ");
        assert_eq!(parts, vec!["a. ".to_string(), "b. ".to_string(), "c".to_string()]);
    }
}
