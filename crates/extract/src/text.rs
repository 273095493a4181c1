//! Free-text normalisation shared by indexing and query evaluation.

use crate::stopwords::is_stop_word;

/// Normalise `text` into an ordered token sequence.
///
/// Steps, in order: lowercase; every ASCII punctuation character becomes
/// a space; split on whitespace; drop tokens whose first character is a
/// decimal digit; drop stop words. Ordering is preserved so callers can
/// do position-aware frequency accounting.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| c.is_ascii_punctuation() || c.is_whitespace())
        .filter(|token| !token.is_empty())
        .filter(|token| !token.starts_with(|c: char| c.is_ascii_digit()))
        .filter(|token| !is_stop_word(token))
        .map(str::to_owned)
        .collect()
}
