//! Sliding-window chunking over document text.
//!
//! Offsets are character offsets. Chunking stops as soon as a window reaches
//! the end of the text, so for `L > overlap` the fixed window yields
//! `ceil((L - O) / (C - O))` chunks and any text no longer than `C` yields one.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::traits::Chunker;
use crate::types::{Chunk, Document};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { chunk_size: 1000, overlap: 50 }
    }
}

impl ChunkingConfig {
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        let config = Self { chunk_size, overlap };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::InvalidConfig("chunk_size must be positive".into()));
        }
        if self.overlap >= self.chunk_size {
            return Err(Error::InvalidConfig(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.overlap, self.chunk_size
            )));
        }
        Ok(())
    }

    fn step(&self) -> usize {
        self.chunk_size - self.overlap
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkerKind {
    /// Fixed-width character windows.
    #[default]
    Fixed,
    /// Prefer paragraph, line, sentence and word boundaries inside the window.
    Structured,
}

pub fn build_chunker(kind: ChunkerKind, config: ChunkingConfig) -> Result<Box<dyn Chunker>> {
    config.validate()?;
    Ok(match kind {
        ChunkerKind::Fixed => Box::new(FixedWindowChunker { config }),
        ChunkerKind::Structured => Box::new(StructuredChunker { config }),
    })
}

/// Fixed-window chunking of one document.
pub fn chunk(document: &Document, chunk_size: usize, overlap: usize) -> Result<Vec<Chunk>> {
    let config = ChunkingConfig::new(chunk_size, overlap)?;
    Ok(FixedWindowChunker { config }.chunk(document))
}

/// Chunks every document in order.
pub fn chunk_all(chunker: &dyn Chunker, documents: &[Document]) -> Vec<Chunk> {
    documents.iter().flat_map(|d| chunker.chunk(d)).collect()
}

#[derive(Debug, Clone, Copy)]
pub struct FixedWindowChunker {
    config: ChunkingConfig,
}

impl FixedWindowChunker {
    pub fn new(config: ChunkingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }
}

impl Chunker for FixedWindowChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        let text = CharText::new(&document.text);
        let len = text.len();
        let mut chunks = Vec::new();
        let mut start = 0;
        while start < len {
            let end = (start + self.config.chunk_size).min(len);
            chunks.push(text.chunk(document, start, end));
            if end >= len {
                break;
            }
            start += self.config.step();
        }
        chunks
    }
}

#[derive(Debug, Clone, Copy)]
pub struct StructuredChunker {
    config: ChunkingConfig,
}

impl StructuredChunker {
    pub fn new(config: ChunkingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }
}

impl Chunker for StructuredChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        let text = CharText::new(&document.text);
        let len = text.len();
        let overlap = self.config.overlap;
        let mut chunks = Vec::new();
        let mut start = 0;
        while start < len {
            let hard_end = (start + self.config.chunk_size).min(len);
            // Breaks must land past start + overlap so the next window advances.
            let end = if hard_end >= len {
                len
            } else {
                text.find_break(start + overlap, hard_end).unwrap_or(hard_end)
            };
            chunks.push(text.chunk(document, start, end));
            if end >= len {
                break;
            }
            start = end - overlap;
        }
        chunks
    }
}

/// Text indexed by character with byte offsets for slicing.
struct CharText<'a> {
    text: &'a str,
    chars: Vec<char>,
    bytes: Vec<usize>,
}

impl<'a> CharText<'a> {
    fn new(text: &'a str) -> Self {
        let mut chars = Vec::with_capacity(text.len());
        let mut bytes = Vec::with_capacity(text.len() + 1);
        for (offset, c) in text.char_indices() {
            chars.push(c);
            bytes.push(offset);
        }
        bytes.push(text.len());
        Self { text, chars, bytes }
    }

    fn len(&self) -> usize {
        self.chars.len()
    }

    fn chunk(&self, document: &Document, start: usize, end: usize) -> Chunk {
        Chunk {
            content: self.text[self.bytes[start]..self.bytes[end]].to_string(),
            metadata: document.metadata.clone(),
            start,
            end,
        }
    }

    /// Best break position `b` in `(lo, hi]`; the chunk would end before `b`.
    fn find_break(&self, lo: usize, hi: usize) -> Option<usize> {
        let c = &self.chars;
        let paragraph = |b: usize| b >= lo + 2 && c[b - 1] == '\n' && c[b - 2] == '\n';
        let line = |b: usize| c[b - 1] == '\n';
        let sentence = |b: usize| {
            matches!(c[b - 1], '.' | '!' | '?') && c.get(b).map_or(true, |n| n.is_whitespace())
        };
        let word = |b: usize| c[b - 1].is_whitespace();
        let rules: [&dyn Fn(usize) -> bool; 4] = [&paragraph, &line, &sentence, &word];
        rules
            .iter()
            .find_map(|rule| ((lo + 1)..=hi).rev().find(|&b| rule(b)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Provenance;

    fn doc(text: &str) -> Document {
        Document { text: text.to_string(), metadata: Provenance::new("id-1", "notes") }
    }

    fn reconstruct(chunks: &[Chunk]) -> String {
        let mut out: Vec<char> = Vec::new();
        for c in chunks {
            let chars: Vec<char> = c.content.chars().collect();
            let skip = out.len().saturating_sub(c.start);
            out.extend_from_slice(&chars[skip..]);
        }
        out.into_iter().collect()
    }

    #[test]
    fn count_formula_fixed() {
        let text = "x".repeat(1000);
        let chunks = chunk(&doc(&text), 300, 50).expect("chunk");
        assert_eq!(chunks.len(), 4);
        assert_eq!((chunks[3].start, chunks[3].end), (750, 1000));
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.start, i * 250);
        }
    }

    #[test]
    fn count_formula_over_many_lengths() {
        for (c, o) in [(10, 0), (10, 3), (7, 6), (5, 1)] {
            for l in 1..60usize {
                let text = "a".repeat(l);
                let chunks = chunk(&doc(&text), c, o).expect("chunk");
                let expected = if l <= c { 1 } else { (l - o).div_ceil(c - o) };
                assert_eq!(chunks.len(), expected, "L={l} C={c} O={o}");
                assert_eq!(reconstruct(&chunks), text);
            }
        }
    }

    #[test]
    fn degenerate_inputs() {
        assert!(chunk(&doc(""), 10, 2).expect("empty").is_empty());
        let short = chunk(&doc("short"), 100, 0).expect("short");
        assert_eq!(short.len(), 1);
        assert_eq!(short[0].content, "short");
    }

    #[test]
    fn rejects_invalid_params() {
        assert!(matches!(chunk(&doc("abc"), 0, 0), Err(Error::InvalidConfig(_))));
        assert!(matches!(chunk(&doc("abc"), 5, 5), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn respects_multibyte_characters() {
        let text = "héllo wörld ünïcode ✓✓✓";
        let chunks = chunk(&doc(text), 4, 1).expect("chunk");
        assert!(chunks.iter().all(|c| c.content.chars().count() <= 4));
        assert_eq!(reconstruct(&chunks), text);
    }

    #[test]
    fn metadata_is_copied_to_every_chunk() {
        let chunks = chunk(&doc(&"y".repeat(50)), 10, 2).expect("chunk");
        assert!(chunks.iter().all(|c| c.metadata == Provenance::new("id-1", "notes")));
    }

    #[test]
    fn structured_prefers_paragraphs_then_sentences() {
        let text = "First paragraph here.\n\nSecond one follows. It has two sentences and keeps going on";
        let chunker = StructuredChunker::new(ChunkingConfig::new(40, 5).expect("config")).expect("chunker");
        let chunks = chunker.chunk(&doc(text));
        assert_eq!(chunks[0].content, "First paragraph here.\n\n");
        assert!(chunks.iter().all(|c| c.char_len() <= 40));
        assert_eq!(reconstruct(&chunks), text);
        for pair in chunks.windows(2) {
            assert!(pair[0].start < pair[1].start);
            assert!(pair[0].end - pair[1].start <= 5);
        }
    }

    #[test]
    fn structured_falls_back_to_fixed_width() {
        let text = "z".repeat(95);
        let chunker = build_chunker(ChunkerKind::Structured, ChunkingConfig::new(30, 10).expect("config"))
            .expect("chunker");
        let structured = chunker.chunk(&doc(&text));
        let fixed = chunk(&doc(&text), 30, 10).expect("fixed");
        assert_eq!(structured, fixed);
    }

    #[test]
    fn structured_covers_pretty_json() {
        let text = "{\n  \"title\": \"Quarterly planning\",\n  \"owner\": \"Dana\",\n  \"notes\": \"Budget review. Hiring plan. Roadmap!\"\n}";
        for (c, o) in [(16, 0), (20, 4), (33, 8)] {
            let chunker = StructuredChunker::new(ChunkingConfig::new(c, o).expect("config")).expect("chunker");
            let chunks = chunker.chunk(&doc(text));
            assert_eq!(reconstruct(&chunks), text, "C={c} O={o}");
            assert!(chunks.iter().all(|ch| ch.char_len() <= c));
        }
    }
}
