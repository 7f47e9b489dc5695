use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::search::sort_by_score_desc;
use crate::types::RetrievedChunk;

pub const DEFAULT_MAX_CONTEXT_CHARS: usize = 5000;
pub const MIN_MAX_CONTEXT_CHARS: usize = 500;
pub const MAX_MAX_CONTEXT_CHARS: usize = 20_000;

const BLOCK_SEPARATOR: &str = "\n\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextOptions {
    /// Character budget for the whole context string
    pub max_context_chars: usize,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            max_context_chars: DEFAULT_MAX_CONTEXT_CHARS,
        }
    }
}

impl ContextOptions {
    pub fn new(max_context_chars: usize) -> Self {
        Self { max_context_chars }
    }

    /// Budget into [500, 20000].
    pub fn clamped(self) -> Self {
        Self {
            max_context_chars: self
                .max_context_chars
                .clamp(MIN_MAX_CONTEXT_CHARS, MAX_MAX_CONTEXT_CHARS),
        }
    }
}

/// Prompt-ready context and the chunks it was built from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssembledContext {
    pub context: String,
    pub used_chunks: Vec<RetrievedChunk>,
}

impl AssembledContext {
    /// No grounding data; what the chat layer falls back to when a query fails.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.used_chunks.is_empty()
    }

    pub fn used_chunk_ids(&self) -> Vec<&str> {
        self.used_chunks.iter().map(|c| c.id()).collect()
    }
}

/// Render one chunk as
///
/// ```text
/// ---
/// Title: <title> | Type: <type> | URL: <url> | Score: 0.1234 | Chunk: <index>
///
/// <content>
/// ```
///
/// `Type`, `URL` and `Score` appear only when known.
pub fn render_block(chunk: &RetrievedChunk) -> String {
    let mut header = vec![format!("Title: {}", chunk.chunk.title)];
    if let Some(source_type) = chunk.chunk.source_type {
        header.push(format!("Type: {}", source_type));
    }
    if let Some(url) = chunk.chunk.source_url.as_deref().filter(|u| !u.is_empty()) {
        header.push(format!("URL: {}", url));
    }
    if let Some(score) = chunk.score {
        header.push(format!("Score: {:.4}", score));
    }
    header.push(format!("Chunk: {}", chunk.chunk.chunk_index));

    format!("---\n{}\n\n{}", header.join(" | "), chunk.chunk.content)
}

/// Pack chunks, highest score first, into at most `max_context_chars` characters.
///
/// Packing stops at the first block that does not fit; blocks after it are
/// dropped even if they would fit.
pub fn build_context_from_chunks(
    chunks: &[RetrievedChunk],
    options: ContextOptions,
) -> AssembledContext {
    let budget = options.clamped().max_context_chars;
    if chunks.is_empty() {
        return AssembledContext::empty();
    }

    let mut ranked = chunks.to_vec();
    sort_by_score_desc(&mut ranked);

    let separator_len = BLOCK_SEPARATOR.chars().count();
    let mut blocks: Vec<String> = Vec::new();
    let mut used_chunks = Vec::new();
    let mut total = 0usize;

    for chunk in ranked {
        let block = render_block(&chunk);
        let added = block.chars().count() + if blocks.is_empty() { 0 } else { separator_len };
        if total + added > budget {
            debug!(
                "Context budget reached at chunk {} ({} + {} > {})",
                chunk.id(),
                total,
                added,
                budget
            );
            break;
        }
        total += added;
        blocks.push(block);
        used_chunks.push(chunk);
    }

    AssembledContext {
        context: blocks.join(BLOCK_SEPARATOR),
        used_chunks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Chunk, Document, SourceType};
    use proptest::prelude::*;

    fn retrieved(id: &str, content: &str, score: Option<f32>) -> RetrievedChunk {
        let doc = Document::new(id, format!("Title {id}"), content);
        RetrievedChunk {
            chunk: Chunk::from_document(&doc, 0, content.to_string()),
            score,
        }
    }

    #[test]
    fn test_block_format_full_header() {
        let doc = Document::new("post", "Intro", "Hello there")
            .with_source_type(SourceType::Blog)
            .with_source_url("https://example.com/intro");
        let chunk = RetrievedChunk::new(Chunk::from_document(&doc, 2, "Hello there".into()), 0.87654);

        assert_eq!(
            render_block(&chunk),
            "---\nTitle: Intro | Type: blog | URL: https://example.com/intro | Score: 0.8765 | Chunk: 2\n\nHello there"
        );
    }

    #[test]
    fn test_block_format_minimal_header() {
        let chunk = retrieved("a", "body", None);
        assert_eq!(render_block(&chunk), "---\nTitle: Title a | Chunk: 0\n\nbody");
    }

    #[test]
    fn test_empty_input_is_empty_context() {
        let assembled = build_context_from_chunks(&[], ContextOptions::default());
        assert!(assembled.is_empty());
        assert_eq!(assembled.context, "");
    }

    #[test]
    fn test_resorts_by_score() {
        let chunks = vec![
            retrieved("low", "l", Some(0.1)),
            retrieved("none", "n", None),
            retrieved("high", "h", Some(0.9)),
        ];
        let assembled = build_context_from_chunks(&chunks, ContextOptions::default());
        assert_eq!(
            assembled.used_chunk_ids(),
            vec!["high::chunk::0", "low::chunk::0", "none::chunk::0"]
        );
        assert!(assembled.context.starts_with("---\nTitle: Title high"));
    }

    #[test]
    fn test_stops_at_first_block_over_budget() {
        let chunks = vec![
            retrieved("a", &"a".repeat(300), Some(0.9)),
            retrieved("big", &"b".repeat(400), Some(0.8)),
            retrieved("small", "c", Some(0.7)),
        ];
        let assembled = build_context_from_chunks(&chunks, ContextOptions::new(500));
        assert_eq!(assembled.used_chunk_ids(), vec!["a::chunk::0"]);
        assert!(!assembled.context.contains("bbbb"));
        assert!(!assembled.context.contains("Title small"));
    }

    #[test]
    fn test_budget_counts_separators() {
        let first = retrieved("x", "1", Some(0.9));
        let second = retrieved("y", "2", Some(0.8));
        let exact = render_block(&first).len() + render_block(&second).len() + 2;

        let fits = build_context_from_chunks(
            &[first.clone(), second.clone()],
            ContextOptions::new(600.max(exact)),
        );
        assert_eq!(fits.used_chunks.len(), 2);
        assert_eq!(fits.context.chars().count(), exact);
    }

    #[test]
    fn test_budget_is_clamped() {
        assert_eq!(ContextOptions::new(1).clamped().max_context_chars, 500);
        assert_eq!(ContextOptions::new(1_000_000).clamped().max_context_chars, 20_000);
    }

    #[test]
    fn test_multibyte_content_counts_chars() {
        let content = "ü".repeat(400);
        let chunk = retrieved("u", &content, Some(0.5));
        let assembled = build_context_from_chunks(&[chunk], ContextOptions::new(500));
        // 400 chars fit even though the byte length is 800
        assert_eq!(assembled.used_chunks.len(), 1);
        assert!(assembled.context.chars().count() <= 500);
    }

    proptest! {
        #[test]
        fn prop_context_fits_budget_and_keeps_score_order(
            specs in prop::collection::vec(
                (0usize..2500, prop::option::of(-1.0f32..1.0)),
                0..12,
            ),
            budget in 0usize..25_000,
        ) {
            let chunks: Vec<RetrievedChunk> = specs
                .iter()
                .enumerate()
                .map(|(i, (len, score))| retrieved(&format!("c{i}"), &"x".repeat(*len), *score))
                .collect();
            let limit = ContextOptions::new(budget).clamped().max_context_chars;

            let assembled = build_context_from_chunks(&chunks, ContextOptions::new(budget));

            prop_assert!(assembled.context.chars().count() <= limit);

            let mut expected = chunks.clone();
            expected.sort_by(|a, b| {
                let key = |c: &RetrievedChunk| c.score.unwrap_or(f32::NEG_INFINITY);
                key(b).partial_cmp(&key(a)).unwrap_or(std::cmp::Ordering::Equal)
            });
            let used = assembled.used_chunk_ids();
            let expected_ids: Vec<&str> = expected.iter().map(|c| c.id()).collect();
            prop_assert_eq!(&used[..], &expected_ids[..used.len()]);

            if let Some(next) = expected.get(used.len()) {
                let separator = if used.is_empty() { 0 } else { BLOCK_SEPARATOR.len() };
                let next_len = render_block(next).chars().count();
                prop_assert!(assembled.context.chars().count() + separator + next_len > limit);
            }
        }
    }
}
