//! Lexical helpers shared by the metric functions.
//!
//! Everything here lowercases its input first, so callers never need to
//! normalize case themselves.

use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref WORD: Regex = Regex::new(r"\w+").expect("valid word regex");
    static ref SENTENCE_BREAK: Regex = Regex::new(r"[.!?]+").expect("valid sentence regex");
    static ref PARAGRAPH_BREAK: Regex = Regex::new(r"\n\s*\n").expect("valid paragraph regex");
}

/// Words signalling explicit structure (ordering, enumeration, summary).
pub const STRUCTURE_WORDS: &[&str] = &[
    "first",
    "second",
    "third",
    "next",
    "then",
    "finally",
    "step",
    "lastly",
    "in summary",
    "in conclusion",
];

/// Words linking one idea to the next.
pub const TRANSITION_WORDS: &[&str] = &[
    "however",
    "therefore",
    "moreover",
    "furthermore",
    "consequently",
    "additionally",
    "also",
    "thus",
    "meanwhile",
    "in addition",
    "as a result",
    "for example",
    "on the other hand",
];

/// Phrases that suggest the response is trying to help the user act.
pub const HELPFULNESS_INDICATORS: &[&str] = &[
    "you can",
    "recommend",
    "suggest",
    "should",
    "try",
    "consider",
    "steps",
    "example",
    "here is",
    "help",
];

/// Lowercased `\w+` tokens in order of appearance.
pub fn words(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    WORD.find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Distinct lowercased tokens.
pub fn word_set(text: &str) -> HashSet<String> {
    words(text).into_iter().collect()
}

pub fn word_count(text: &str) -> usize {
    let lowered = text.to_lowercase();
    WORD.find_iter(&lowered).count()
}

/// Non-blank segments between runs of `.`, `!` or `?`.
pub fn sentences(text: &str) -> Vec<&str> {
    SENTENCE_BREAK
        .split(text)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Number of non-empty blocks separated by blank lines.
pub fn paragraph_count(text: &str) -> usize {
    PARAGRAPH_BREAK
        .split(text)
        .filter(|block| !block.trim().is_empty())
        .count()
}

/// Case-insensitive literal substring test.
pub fn contains_phrase(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Total whole-word occurrences of the given words or phrases.
///
/// Multi-word phrases match on their token sequence, so "as a result" counts
/// once in "As a result, ...".
pub fn count_occurrences(text: &str, vocabulary: &[&str]) -> usize {
    let tokens = words(text);
    vocabulary
        .iter()
        .map(|phrase| {
            let needle: Vec<String> = words(phrase);
            if needle.is_empty() || needle.len() > tokens.len() {
                return 0;
            }
            tokens
                .windows(needle.len())
                .filter(|window| *window == needle.as_slice())
                .count()
        })
        .sum()
}
