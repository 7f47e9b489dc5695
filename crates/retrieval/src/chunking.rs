use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{Chunk, Document};

pub const DEFAULT_CHUNK_SIZE: usize = 900;
pub const MIN_CHUNK_SIZE: usize = 200;
pub const MAX_CHUNK_SIZE: usize = 4000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 150;

/// Window size and overlap, both in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingOptions {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkingOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl ChunkingOptions {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
        }
    }

    /// Size into [200, 4000], overlap into [0, size - 1].
    pub fn clamped(self) -> Self {
        let chunk_size = self.chunk_size.clamp(MIN_CHUNK_SIZE, MAX_CHUNK_SIZE);
        Self {
            chunk_size,
            chunk_overlap: self.chunk_overlap.min(chunk_size - 1),
        }
    }
}

/// Drop `\r`, squeeze space/tab runs to one space, cap newline runs at two, trim.
pub fn normalize_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut newline_run = 0usize;

    for c in text.chars().filter(|&c| c != '\r') {
        match c {
            ' ' | '\t' => {
                newline_run = 0;
                if !out.ends_with(' ') {
                    out.push(' ');
                }
            }
            '\n' => {
                newline_run += 1;
                if newline_run <= 2 {
                    out.push('\n');
                }
            }
            _ => {
                newline_run = 0;
                out.push(c);
            }
        }
    }

    out.trim().to_string()
}

/// Split `text` into overlapping windows of at most `chunk_size` characters.
///
/// Each window after the first starts `chunk_overlap` characters before the
/// previous one ended; the last window ends at the end of the text. Blank
/// input yields no chunks.
pub fn chunk_text(text: &str, options: ChunkingOptions) -> Vec<String> {
    let options = options.clamped();
    let normalized = normalize_whitespace(text);
    if normalized.is_empty() {
        return Vec::new();
    }

    let chars: Vec<char> = normalized.chars().collect();
    let mut chunks = Vec::new();
    let mut start = 0usize;

    loop {
        let end = (start + options.chunk_size).min(chars.len());
        chunks.push(chars[start..end].iter().collect());
        if end >= chars.len() {
            break;
        }
        start = end - options.chunk_overlap;
    }

    chunks
}

/// Chunk every document, in order. `chunk_index` restarts at 0 per document.
pub fn build_chunks_from_documents(documents: &[Document], options: ChunkingOptions) -> Vec<Chunk> {
    let mut chunks = Vec::new();

    for document in documents {
        let pieces = chunk_text(&document.content, options);
        debug!("Document {} split into {} chunks", document.id, pieces.len());
        chunks.extend(
            pieces
                .into_iter()
                .enumerate()
                .map(|(index, content)| Chunk::from_document(document, index, content)),
        );
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn opts(size: usize, overlap: usize) -> ChunkingOptions {
        ChunkingOptions::new(size, overlap)
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  a \t\t b  "), "a b");
        assert_eq!(normalize_whitespace("a\r\nb"), "a\nb");
        assert_eq!(normalize_whitespace("a\n\n\n\n\nb"), "a\n\nb");
        assert_eq!(normalize_whitespace("a\n\nb"), "a\n\nb");
        assert_eq!(normalize_whitespace("\n\n  \n"), "");
    }

    #[test]
    fn test_blank_text_yields_nothing() {
        assert!(chunk_text("", ChunkingOptions::default()).is_empty());
        assert!(chunk_text("   ", ChunkingOptions::default()).is_empty());
        assert!(chunk_text("\r\n\t", ChunkingOptions::default()).is_empty());
    }

    #[test]
    fn test_short_text_is_single_chunk() {
        let chunks = chunk_text("hello world", ChunkingOptions::default());
        assert_eq!(chunks, vec!["hello world".to_string()]);
    }

    #[test]
    fn test_options_are_clamped() {
        assert_eq!(opts(10, 5).clamped(), opts(200, 5));
        assert_eq!(opts(10_000, 0).clamped(), opts(4000, 0));
        assert_eq!(opts(300, 300).clamped(), opts(300, 299));
        assert_eq!(ChunkingOptions::default().clamped(), opts(900, 150));
    }

    #[test]
    fn test_windows_counted_in_chars() {
        let text = "é".repeat(450);
        let chunks = chunk_text(&text, opts(200, 50));
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].chars().count(), 200);
        assert_eq!(chunks[2].chars().count(), 150);
    }

    #[test]
    fn test_exact_multiple_has_no_empty_tail() {
        let text = "x".repeat(900);
        let chunks = chunk_text(&text, ChunkingOptions::default());
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn test_chunk_index_restarts_per_document() {
        let docs = vec![
            Document::new("a", "A", "y".repeat(1000)),
            Document::new("empty", "E", "   "),
            Document::new("b", "B", "short"),
        ];
        let chunks = build_chunks_from_documents(&docs, ChunkingOptions::default());

        let ids: Vec<&str> = chunks.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["a::chunk::0", "a::chunk::1", "b::chunk::0"]);
        assert_eq!(chunks[2].chunk_index, 0);
        assert_eq!(chunks[2].title, "B");
    }

    fn text_strategy() -> impl Strategy<Value = String> {
        proptest::string::string_regex("[a-z0-9 .,\n]{1,3000}").unwrap()
    }

    proptest! {
        #[test]
        fn prop_chunks_cover_normalized_text(
            text in text_strategy(),
            size in 200usize..1200,
            overlap_seed in 0usize..1200,
        ) {
            let overlap = overlap_seed % size;
            let normalized: Vec<char> = normalize_whitespace(&text).chars().collect();
            let chunks = chunk_text(&text, opts(size, overlap));

            if normalized.is_empty() {
                prop_assert!(chunks.is_empty());
            } else {
                // Rebuild the text by dropping each chunk's overlap prefix.
                let mut rebuilt: Vec<char> = chunks[0].chars().collect();
                for chunk in &chunks[1..] {
                    rebuilt.extend(chunk.chars().skip(overlap));
                }
                prop_assert_eq!(rebuilt, normalized);
            }
        }

        #[test]
        fn prop_consecutive_chunks_share_overlap(
            text in text_strategy(),
            size in 200usize..800,
            overlap_seed in 0usize..800,
        ) {
            let overlap = overlap_seed % size;
            let chunks = chunk_text(&text, opts(size, overlap));

            for pair in chunks.windows(2) {
                let previous: Vec<char> = pair[0].chars().collect();
                let next: Vec<char> = pair[1].chars().collect();
                prop_assert_eq!(previous.len(), size);
                prop_assert!(next.len() <= size);
                prop_assert_eq!(&previous[size - overlap..], &next[..overlap]);
            }
        }

        #[test]
        fn prop_chunking_is_deterministic(text in text_strategy()) {
            let options = ChunkingOptions::default();
            prop_assert_eq!(chunk_text(&text, options), chunk_text(&text, options));
        }
    }
}
