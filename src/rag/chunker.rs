//! Word-window document chunker.
//!
//! Splits extracted text into consecutive windows of at most `max_words`
//! words. Chunk ids derived from the window index are the stable keys the
//! vector index is written under.

/// A fixed-size contiguous word window of a source document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// 0-based window position in source order.
    pub index: usize,
    /// Window words joined by single spaces.
    pub text: String,
}

/// Split `text` on whitespace and group the words into windows of
/// `max_words`. The final window holds the remainder. Empty input (or a
/// zero window size) produces no chunks.
pub fn chunk_words(text: &str, max_words: usize) -> Vec<Chunk> {
    if max_words == 0 {
        return Vec::new();
    }

    let words: Vec<&str> = text.split_whitespace().collect();
    words
        .chunks(max_words)
        .enumerate()
        .map(|(index, window)| Chunk {
            index,
            text: window.join(" "),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_into_exact_windows_with_remainder() {
        let chunks = chunk_words("a b c d e", 2);
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["a b", "c d", "e"]);
        assert_eq!(chunks[0].index, 0);
        assert_eq!(chunks[2].index, 2);
    }

    #[test]
    fn empty_input_produces_no_chunks() {
        assert!(chunk_words("", 100).is_empty());
        assert!(chunk_words("   \n\t ", 100).is_empty());
    }

    #[test]
    fn every_chunk_but_the_last_is_full() {
        let text = (0..23).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ");
        let chunks = chunk_words(&text, 5);
        assert_eq!(chunks.len(), 5);
        for chunk in &chunks[..chunks.len() - 1] {
            assert_eq!(chunk.text.split_whitespace().count(), 5);
        }
        let last = chunks.last().unwrap();
        assert_eq!(last.text.split_whitespace().count(), 3);
    }

    #[test]
    fn exact_multiple_has_no_short_tail() {
        let chunks = chunk_words("a b c d", 2);
        assert_eq!(chunks.len(), 2);
        assert!(chunks.iter().all(|c| c.text.split_whitespace().count() == 2));
    }

    #[test]
    fn joining_chunks_reproduces_normalized_input() {
        let text = "  The quick\nbrown   fox\t jumps\n\nover the lazy dog  ";
        let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");

        for max_words in [1, 2, 3, 7, 100] {
            let joined = chunk_words(text, max_words)
                .into_iter()
                .map(|c| c.text)
                .collect::<Vec<_>>()
                .join(" ");
            assert_eq!(joined, normalized, "max_words = {}", max_words);
        }
    }
}
