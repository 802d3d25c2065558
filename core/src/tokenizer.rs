use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use std::collections::BTreeSet;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref CLEAN: Regex = Regex::new(r"[^\p{Alphabetic}\s]+").expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
}

/// Split text into lowercase words using NFD normalization, dropping every
/// character that is neither alphabetic nor whitespace (digits, punctuation,
/// combining marks).
pub fn tokenize(text: &str) -> Vec<String> {
    let decomposed = text.nfd().collect::<String>();
    let cleaned = CLEAN.replace_all(&decomposed, "").to_lowercase();
    cleaned.split_whitespace().map(str::to_string).collect()
}

/// Snowball English stem of a single word.
pub fn stem(word: &str) -> String {
    STEMMER.stem(word).into_owned()
}

/// Tokenize and stem, preserving order. Position `i` in the result is word `i + 1` of the text.
pub fn stems(text: &str) -> Vec<String> {
    tokenize(text).iter().map(|w| stem(w)).collect()
}

/// Sorted, deduplicated stems of a line; used to canonicalize query lines.
pub fn unique_stems(text: &str) -> BTreeSet<String> {
    tokenize(text).iter().map(|w| stem(w)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_tokenize() {
        let t = stems("Running, runner's run!");
        assert!(t.iter().any(|w| w == "run"));
    }

    #[test]
    fn drops_digits_and_punctuation() {
        assert_eq!(tokenize("  Hello, W0rld!\t42 "), vec!["hello", "wrld"]);
        assert!(tokenize("123 ... !!!").is_empty());
    }
}
