//! Sentence-aligned chunking of bot replies for speech synthesis.
//!
//! Text is cut after every run of `.`, `!` or `?`.  Consecutive sentences are
//! then packed greedily into chunks of at most `max_chars` characters.  A
//! sentence that is longer than `max_chars` on its own becomes a chunk by
//! itself rather than being cut mid-sentence.
//!
//! Lengths are measured in `char`s, so Devanagari, Tamil and other scripts
//! are counted per code point rather than per byte.

/// Upper bound on chunk length accepted by the synthesis service.
pub const MAX_CHUNK_CHARS: usize = 200;

fn is_terminator(c: char) -> bool {
    matches!(c, '.' | '!' | '?')
}

/// Split `text` into sentences, each keeping its trailing terminators.
///
/// Concatenating the result reproduces `text` exactly.
///
/// ```
/// use loan_voice::speech::split_sentences;
///
/// assert_eq!(
///     split_sentences("Hi! How are you?? Fine"),
///     vec!["Hi!", " How are you??", " Fine"],
/// );
/// ```
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut in_terminators = false;

    for (idx, c) in text.char_indices() {
        if is_terminator(c) {
            in_terminators = true;
        } else if in_terminators {
            sentences.push(&text[start..idx]);
            start = idx;
            in_terminators = false;
        }
    }
    if start < text.len() {
        sentences.push(&text[start..]);
    }
    sentences
}

/// Pack sentences of `text` into chunks of at most `max_chars` characters.
///
/// Chunks are trimmed; whitespace-only chunks are dropped.
///
/// ```
/// use loan_voice::speech::chunk_text;
///
/// let chunks = chunk_text("One. Two. Three.", 10);
/// assert_eq!(chunks, vec!["One. Two.", "Three."]);
/// ```
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_chars = 0;

    for sentence in split_sentences(text) {
        let sentence_chars = sentence.chars().count();
        if current_chars + sentence_chars <= max_chars {
            current.push_str(sentence);
            current_chars += sentence_chars;
        } else {
            push_trimmed(&mut chunks, &current);
            current = sentence.to_string();
            current_chars = sentence_chars;
        }
    }
    push_trimmed(&mut chunks, &current);
    chunks
}

fn push_trimmed(chunks: &mut Vec<String>, chunk: &str) {
    let trimmed = chunk.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
