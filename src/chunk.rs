//! Overlapping, boundary-aware text chunker.
//!
//! Splits a document's full text into [`TextChunk`]s of at most
//! `chunk_size` bytes, each overlapping the previous one by `overlap`
//! bytes. Within every window the cut is placed at the cleanest boundary
//! available: a paragraph break (`\n\n`), then a sentence break (`". "`),
//! and only then a hard cut at `chunk_size`.
//!
//! A boundary is only used when it leaves the next window starting strictly
//! after the current one, so the cursor always advances and the loop
//! terminates for any `overlap < chunk_size`. Text without boundaries yields
//! at most `ceil(len / (chunk_size - overlap))` chunks; boundary cuts can
//! shorten a step to a single byte, so in general the count is at most `len`.

use thiserror::Error;

use crate::models::TextChunk;

const PARAGRAPH_BREAK: &str = "\n\n";
const SENTENCE_BREAK: &str = ". ";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChunkError {
    #[error("chunk_size must be > 0")]
    ZeroChunkSize,
    #[error("overlap ({overlap}) must be smaller than chunk_size ({chunk_size})")]
    OverlapTooLarge { chunk_size: usize, overlap: usize },
}

/// Split `text` into overlapping chunks. Empty text yields no chunks.
///
/// Sequence indices are contiguous from 0 over the emitted chunks; windows
/// whose text is blank after trimming are skipped.
pub fn chunk_text(
    text: &str,
    chunk_size: usize,
    overlap: usize,
) -> Result<Vec<TextChunk>, ChunkError> {
    if chunk_size == 0 {
        return Err(ChunkError::ZeroChunkSize);
    }
    if overlap >= chunk_size {
        return Err(ChunkError::OverlapTooLarge {
            chunk_size,
            overlap,
        });
    }

    let mut chunks = Vec::new();
    if text.is_empty() {
        return Ok(chunks);
    }

    let len = text.len();
    let mut cursor = 0usize;

    while cursor < len {
        let end = if cursor + chunk_size >= len {
            len
        } else {
            find_cut(text, cursor, cursor + chunk_size, overlap)
        };

        let piece = text[cursor..end].trim();
        if !piece.is_empty() {
            chunks.push(TextChunk {
                text: piece.to_string(),
                sequence_index: chunks.len(),
                start: cursor,
                end,
            });
        }

        if end >= len {
            break;
        }
        let next = floor_char_boundary(text, end - overlap);
        cursor = if next > cursor {
            next
        } else {
            ceil_char_boundary(text, cursor + 1)
        };
    }

    Ok(chunks)
}

/// Pick the cut point for the window `[cursor, limit)`.
fn find_cut(text: &str, cursor: usize, limit: usize, overlap: usize) -> usize {
    let limit = floor_char_boundary(text, limit);
    let window = &text[cursor..limit];
    // Cuts at or before this point would not move the next window forward.
    let min_cut = cursor + overlap;

    if let Some(pos) = window.rfind(PARAGRAPH_BREAK) {
        let cut = cursor + pos;
        if cut > min_cut {
            return cut;
        }
    }

    if let Some(pos) = window.rfind(SENTENCE_BREAK) {
        let cut = cursor + pos + 1;
        if cut > min_cut {
            return cut;
        }
    }

    if limit > min_cut {
        limit
    } else {
        // A multi-byte char straddles the hard cut; take the whole char.
        ceil_char_boundary(text, min_cut + 1)
    }
}

fn floor_char_boundary(text: &str, mut idx: usize) -> usize {
    if idx >= text.len() {
        return text.len();
    }
    while !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

fn ceil_char_boundary(text: &str, mut idx: usize) -> usize {
    if idx >= text.len() {
        return text.len();
    }
    while !text.is_char_boundary(idx) {
        idx += 1;
    }
    idx
}

#[cfg(test)]
mod tests {
    use super::*;

    fn letters(n: usize) -> String {
        (0..n)
            .map(|i| (b'a' + (i % 26) as u8) as char)
            .collect()
    }

    #[test]
    fn test_empty_text() {
        let chunks = chunk_text("", 3000, 500).unwrap();
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_small_text_single_chunk() {
        let chunks = chunk_text("Hello, world!", 3000, 500).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].sequence_index, 0);
        assert_eq!(chunks[0].text, "Hello, world!");
        assert_eq!(chunks[0].end, 13);
    }

    #[test]
    fn test_overlap_must_be_smaller_than_chunk_size() {
        assert_eq!(
            chunk_text("abc", 10, 10),
            Err(ChunkError::OverlapTooLarge {
                chunk_size: 10,
                overlap: 10
            })
        );
        assert_eq!(chunk_text("abc", 0, 0), Err(ChunkError::ZeroChunkSize));
    }

    #[test]
    fn test_seven_thousand_chars_three_chunks() {
        let text = letters(7000);
        let chunks = chunk_text(&text, 3000, 500).unwrap();
        assert_eq!(chunks.len(), 3);
        assert_eq!(
            chunks.iter().map(|c| c.start).collect::<Vec<_>>(),
            vec![0, 2500, 5000]
        );
        assert!(chunks.windows(2).all(|w| w[0].start <= w[1].start));
        assert_eq!(chunks.last().unwrap().end, text.len());
    }

    #[test]
    fn test_cuts_at_paragraph_break() {
        let text = format!("{}\n\n{}", "a".repeat(60), "b".repeat(60));
        let chunks = chunk_text(&text, 100, 10).unwrap();
        assert_eq!(chunks[0].text, "a".repeat(60));
        assert_eq!(chunks[0].end, 60);
        // Next window starts `overlap` bytes before the cut.
        assert_eq!(chunks[1].start, 50);
        assert!(chunks[1].text.ends_with(&"b".repeat(60)));
    }

    #[test]
    fn test_cuts_after_sentence_break() {
        let text = format!("{}. {}", "a".repeat(70), "b".repeat(70));
        let chunks = chunk_text(&text, 100, 10).unwrap();
        assert_eq!(chunks[0].end, 71);
        assert!(chunks[0].text.ends_with('.'));
    }

    #[test]
    fn test_paragraph_preferred_over_sentence() {
        let text = format!(
            "{}\n\n{}. {}",
            "a".repeat(40),
            "b".repeat(30),
            "c".repeat(80)
        );
        let chunks = chunk_text(&text, 100, 10).unwrap();
        assert_eq!(chunks[0].end, 40);
    }

    #[test]
    fn test_boundary_too_close_to_cursor_is_ignored() {
        // The only break sits inside the overlap zone, so a hard cut is used.
        let text = format!("ab\n\n{}", "c".repeat(200));
        let chunks = chunk_text(&text, 100, 10).unwrap();
        assert_eq!(chunks[0].end, 100);
        assert!(chunks.windows(2).all(|w| w[1].start > w[0].start));
    }

    #[test]
    fn test_indices_contiguous() {
        let text = (0..200)
            .map(|i| format!("Sentence number {}.", i))
            .collect::<Vec<_>>()
            .join(" ");
        let chunks = chunk_text(&text, 120, 20).unwrap();
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.sequence_index, i);
        }
    }

    #[test]
    fn test_deterministic() {
        let text = "Alpha beta. Gamma delta.\n\nEpsilon zeta. Eta theta.\n\n".repeat(40);
        let c1 = chunk_text(&text, 90, 15).unwrap();
        let c2 = chunk_text(&text, 90, 15).unwrap();
        assert_eq!(c1, c2);
    }

    #[test]
    fn test_termination_bound_without_boundaries() {
        // Only hard cuts here, so every step advances `size - overlap` bytes.
        for (size, overlap) in [(50, 0), (50, 49), (300, 100), (1000, 999)] {
            let text = letters(5000);
            let chunks = chunk_text(&text, size, overlap).unwrap();
            let bound = text.len().div_ceil(size - overlap);
            assert!(
                chunks.len() <= bound,
                "size={} overlap={} got {} > {}",
                size,
                overlap,
                chunks.len(),
                bound
            );
        }
    }

    #[test]
    fn test_sentence_heavy_text_terminates() {
        // A sentence break every 81 bytes lets cuts land just past the
        // overlap zone, so steps can be far shorter than `size - overlap`.
        let text = format!("{}. ", "w".repeat(79)).repeat(60);
        let chunks = chunk_text(&text, 100, 60).unwrap();

        assert!(!chunks.is_empty());
        assert!(chunks.len() <= text.len());
        assert_eq!(chunks[0].start, 0);
        assert_eq!(chunks.last().unwrap().end, text.len());
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.sequence_index, i);
            assert!(c.end - c.start <= 100);
        }
        for w in chunks.windows(2) {
            assert!(w[1].start > w[0].start, "cursor stalled at {}", w[0].start);
            assert!(w[1].start <= w[0].end, "gap after {}", w[0].end);
        }
    }

    #[test]
    fn test_coverage_reconstructs_source() {
        let text = letters(4321);
        let overlap = 37;
        let chunks = chunk_text(&text, 400, overlap).unwrap();
        let mut rebuilt = chunks[0].text.clone();
        for c in &chunks[1..] {
            rebuilt.push_str(&c.text[overlap..]);
        }
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn test_whitespace_only_windows_skipped() {
        let text = format!("{}{}", "x".repeat(20), " ".repeat(200));
        let chunks = chunk_text(&text, 50, 5).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "x".repeat(20));
    }

    #[test]
    fn test_multibyte_text_does_not_split_chars() {
        let text = "é".repeat(500);
        let chunks = chunk_text(&text, 101, 10).unwrap();
        assert!(!chunks.is_empty());
        for c in &chunks {
            assert!(c.text.chars().all(|ch| ch == 'é'));
        }
        assert_eq!(chunks.last().unwrap().end, text.len());
    }
}
