//! Sentence-boundary chunking of reply text.

use super::types::TextSegment;

/// Split text into ordered speakable segments of at most `max_len`
/// characters.
///
/// Sentences end at `.`, `!` or `?` followed by whitespace, terminal
/// punctuation preserved. Consecutive sentences are merged greedily while
/// the running length stays within `max_len`; a single sentence longer
/// than the limit is emitted alone. Input without any sentence boundary
/// becomes one segment containing the trimmed text verbatim, and
/// whitespace-only input yields no segments at all.
pub fn chunk(text: &str, max_len: usize) -> Vec<TextSegment> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    let sentences = split_sentences(trimmed);
    let mut out: Vec<String> = Vec::new();
    let mut buf = String::new();
    let mut buf_chars = 0usize;

    for sentence in sentences {
        let len = sentence.chars().count();
        if buf.is_empty() {
            buf = sentence;
            buf_chars = len;
        } else if buf_chars + 1 + len <= max_len {
            buf.push(' ');
            buf.push_str(&sentence);
            buf_chars += 1 + len;
        } else {
            out.push(std::mem::replace(&mut buf, sentence));
            buf_chars = len;
        }
    }
    if !buf.is_empty() {
        out.push(buf);
    }

    out.into_iter()
        .enumerate()
        .map(|(index, text)| TextSegment { index, text })
        .collect()
}

/// Split at terminal punctuation followed by whitespace. The trailing
/// remainder (with or without punctuation) is its own sentence.
fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut start = 0usize;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if matches!(c, '.' | '!' | '?')
            && chars.peek().map_or(false, |&(_, next)| next.is_whitespace())
        {
            let end = i + c.len_utf8();
            let sentence = text[start..end].trim();
            if !sentence.is_empty() {
                sentences.push(sentence.to_string());
            }
            start = end;
        }
    }

    let rest = text[start..].trim();
    if !rest.is_empty() {
        sentences.push(rest.to_string());
    }
    sentences
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(segments: &[TextSegment]) -> Vec<&str> {
        segments.iter().map(|s| s.text.as_str()).collect()
    }

    #[test]
    fn empty_and_whitespace_yield_nothing() {
        assert!(chunk("", 180).is_empty());
        assert!(chunk("   \n\t ", 180).is_empty());
    }

    #[test]
    fn no_terminal_punctuation_is_a_single_segment() {
        let segments = chunk("  Hello world  ", 180);
        assert_eq!(texts(&segments), ["Hello world"]);
    }

    #[test]
    fn merges_sentences_up_to_the_limit() {
        let segments = chunk("One. Two. Three is a bit longer. Four!", 12);
        assert_eq!(
            texts(&segments),
            ["One. Two.", "Three is a bit longer.", "Four!"]
        );
    }

    #[test]
    fn preserves_terminal_punctuation_and_order() {
        let text = "First! Second? Third.";
        let segments = chunk(text, 8);
        assert_eq!(texts(&segments), ["First!", "Second?", "Third."]);
        // Joining with spaces reconstructs the input.
        let joined = segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        assert_eq!(joined, text);
    }

    #[test]
    fn indices_are_stable_and_sequential() {
        let segments = chunk("A. B. C. D.", 1);
        let indices: Vec<usize> = segments.iter().map(|s| s.index).collect();
        assert_eq!(indices, [0, 1, 2, 3]);
    }

    #[test]
    fn oversized_sentence_becomes_a_forced_singleton() {
        let long = "This sentence alone is far longer than the limit allows.";
        let text = format!("Short. {long} End.");
        let segments = chunk(&text, 20);
        assert!(segments.iter().any(|s| s.text == long));
        for s in &segments {
            if s.text != long {
                assert!(s.text.chars().count() <= 20, "over limit: {:?}", s.text);
            }
        }
    }

    #[test]
    fn no_chunk_is_empty() {
        let segments = chunk("One.  Two!   Three?    ", 6);
        assert!(!segments.is_empty());
        assert!(segments.iter().all(|s| !s.text.trim().is_empty()));
    }

    #[test]
    fn decimal_points_do_not_split() {
        // '.' not followed by whitespace is not a boundary.
        let segments = chunk("Version 1.5 shipped today. It works.", 60);
        assert_eq!(texts(&segments), ["Version 1.5 shipped today. It works."]);
    }

    #[test]
    fn verse_reply_fits_one_segment() {
        let segments = chunk("Peace be with you. John 14:27", 180);
        assert_eq!(texts(&segments), ["Peace be with you. John 14:27"]);
    }
}
