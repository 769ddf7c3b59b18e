//! Per-dimension scoring functions.
//!
//! Each function is pure and returns a [`QualityScore`] within `[0, max_score]`.
//! The formulas are deliberately simple lexical heuristics; metadata on each
//! score records the intermediate values the formula used.

use indexmap::IndexMap;
use serde_json::{Value, json};

use super::text::{
    self, HELPFULNESS_INDICATORS, STRUCTURE_WORDS, TRANSITION_WORDS, contains_phrase,
};
use super::types::{QualityDimension, QualityScore, ReferenceData};

/// Scores `dimension` for the given pair.
///
/// Reference-dependent dimensions fall back to their "no reference" rule when
/// `reference` is `None`; callers that want to skip those dimensions instead
/// should check [`ReferenceData::supports`] first.
pub fn score_dimension(
    dimension: QualityDimension,
    query: &str,
    response: &str,
    reference: Option<&ReferenceData>,
    max_score: f64,
) -> QualityScore {
    let empty = ReferenceData::default();
    let reference = reference.unwrap_or(&empty);
    match dimension {
        QualityDimension::Relevance => relevance(query, response, max_score),
        QualityDimension::Accuracy => accuracy(response, &reference.facts, max_score),
        QualityDimension::Completeness => {
            completeness(response, reference.required_elements.as_slice(), max_score)
        }
        QualityDimension::Helpfulness => match &reference.helpfulness_indicators {
            Some(indicators) => helpfulness(response, indicators.as_slice(), max_score),
            None => helpfulness(response, HELPFULNESS_INDICATORS, max_score),
        },
        QualityDimension::Clarity => clarity(response, max_score),
        QualityDimension::Conciseness => conciseness(query, response, max_score),
        QualityDimension::Coherence => coherence(response, max_score),
        QualityDimension::Correctness => correctness(
            response,
            reference.reference_response.as_deref().unwrap_or_default(),
            max_score,
        ),
        QualityDimension::Safety => {
            safety(response, reference.unsafe_patterns.as_slice(), max_score)
        }
    }
}

/// Share of distinct query words that also appear in the response.
pub fn relevance(query: &str, response: &str, max_score: f64) -> QualityScore {
    let query_words = text::word_set(query);
    if query_words.is_empty() {
        return QualityScore::new(QualityDimension::Relevance, max_score, max_score)
            .with_metadata("query_words", 0);
    }
    let response_words = text::word_set(response);
    let matched = query_words.intersection(&response_words).count();
    let score = matched as f64 / query_words.len() as f64 * max_score;

    QualityScore::new(QualityDimension::Relevance, score, max_score)
        .with_metadata("matched_words", matched)
        .with_metadata("query_words", query_words.len())
}

/// Share of facts whose value appears verbatim in the response.
pub fn accuracy(response: &str, facts: &IndexMap<String, Value>, max_score: f64) -> QualityScore {
    if facts.is_empty() {
        return QualityScore::new(QualityDimension::Accuracy, max_score, max_score)
            .with_metadata("total_facts", 0);
    }
    let matched: Vec<&String> = facts
        .iter()
        .filter(|(_, value)| contains_phrase(response, &stringify(value)))
        .map(|(key, _)| key)
        .collect();
    let score = matched.len() as f64 / facts.len() as f64 * max_score;

    QualityScore::new(QualityDimension::Accuracy, score, max_score)
        .with_metadata("matched_facts", json!(matched))
        .with_metadata("total_facts", facts.len())
}

/// Share of required elements present in the response.
pub fn completeness<S: AsRef<str>>(response: &str, elements: &[S], max_score: f64) -> QualityScore {
    if elements.is_empty() {
        return QualityScore::new(QualityDimension::Completeness, max_score, max_score)
            .with_metadata("total_elements", 0);
    }
    let (present, missing): (Vec<&str>, Vec<&str>) = elements
        .iter()
        .map(AsRef::as_ref)
        .partition(|element| contains_phrase(response, element));
    let score = present.len() as f64 / elements.len() as f64 * max_score;

    QualityScore::new(QualityDimension::Completeness, score, max_score)
        .with_metadata("present_elements", present.len())
        .with_metadata("missing_elements", json!(missing))
        .with_metadata("total_elements", elements.len())
}

/// Indicator coverage with double credit, capped at `max_score`.
pub fn helpfulness<S: AsRef<str>>(
    response: &str,
    indicators: &[S],
    max_score: f64,
) -> QualityScore {
    if indicators.is_empty() {
        return QualityScore::new(QualityDimension::Helpfulness, max_score, max_score)
            .with_metadata("total_indicators", 0);
    }
    let present = indicators
        .iter()
        .filter(|indicator| contains_phrase(response, indicator.as_ref()))
        .count();
    let ratio = present as f64 / indicators.len() as f64;
    let score = (ratio * max_score * 2.0).min(max_score);

    QualityScore::new(QualityDimension::Helpfulness, score, max_score)
        .with_metadata("present_indicators", present)
        .with_metadata("total_indicators", indicators.len())
}

/// Sentence-length penalty scaled by the presence of structure words.
pub fn clarity(response: &str, max_score: f64) -> QualityScore {
    let sentences = text::sentences(response);
    if sentences.is_empty() {
        return QualityScore::new(QualityDimension::Clarity, 0.0, max_score)
            .with_metadata("sentences", 0);
    }
    let total_words: usize = sentences.iter().map(|s| text::word_count(s)).sum();
    let avg_len = total_words as f64 / sentences.len() as f64;

    let penalty = if avg_len < 5.0 {
        (5.0 - avg_len) / 5.0
    } else if avg_len > 25.0 {
        (avg_len - 25.0) / 25.0
    } else {
        0.0
    };
    let structure_count = text::count_occurrences(response, STRUCTURE_WORDS);
    let structure = (structure_count as f64 / 3.0).min(1.0);
    let score = max_score * (1.0 - penalty) * (0.7 + 0.3 * structure);

    QualityScore::new(QualityDimension::Clarity, score, max_score)
        .with_metadata("sentences", sentences.len())
        .with_metadata("avg_sentence_length", avg_len)
        .with_metadata("length_penalty", penalty)
        .with_metadata("structure_words", structure_count)
}

/// Penalizes responses that are long relative to the query.
pub fn conciseness(query: &str, response: &str, max_score: f64) -> QualityScore {
    let query_len = text::word_count(query);
    let response_len = text::word_count(response);
    let ratio = response_len as f64 / query_len.max(1) as f64;

    let score = if ratio < 2.0 {
        max_score
    } else if ratio < 5.0 {
        max_score * (1.0 - (ratio - 2.0) / 3.0)
    } else {
        max_score * 0.2
    };

    QualityScore::new(QualityDimension::Conciseness, score, max_score)
        .with_metadata("length_ratio", ratio)
        .with_metadata("response_words", response_len)
        .with_metadata("query_words", query_len)
}

/// Base credit plus bonuses for transition words and paragraphing.
pub fn coherence(response: &str, max_score: f64) -> QualityScore {
    let transition_count = text::count_occurrences(response, TRANSITION_WORDS);
    let transition = (transition_count as f64 / 3.0).min(1.0);
    let paragraphs = text::paragraph_count(response);
    let paragraph_factor = (paragraphs as f64 / 3.0).min(1.0);
    let score = max_score * (0.5 + 0.3 * transition + 0.2 * paragraph_factor);

    QualityScore::new(QualityDimension::Coherence, score, max_score)
        .with_metadata("transition_words", transition_count)
        .with_metadata("paragraphs", paragraphs)
}

/// Share of distinct reference-response words found in the response.
pub fn correctness(response: &str, reference_response: &str, max_score: f64) -> QualityScore {
    let reference_words = text::word_set(reference_response);
    if reference_words.is_empty() {
        return QualityScore::new(QualityDimension::Correctness, 0.0, max_score)
            .with_metadata("reference_words", 0);
    }
    let response_words = text::word_set(response);
    let overlap = response_words.intersection(&reference_words).count();
    let score = overlap as f64 / reference_words.len() as f64 * max_score;

    QualityScore::new(QualityDimension::Correctness, score, max_score)
        .with_metadata("overlapping_words", overlap)
        .with_metadata("reference_words", reference_words.len())
}

/// Full marks minus the share of unsafe patterns found.
pub fn safety<S: AsRef<str>>(response: &str, patterns: &[S], max_score: f64) -> QualityScore {
    if patterns.is_empty() {
        return QualityScore::new(QualityDimension::Safety, max_score, max_score)
            .with_metadata("total_patterns", 0);
    }
    let found: Vec<&str> = patterns
        .iter()
        .map(AsRef::as_ref)
        .filter(|pattern| contains_phrase(response, pattern))
        .collect();
    let score = max_score * (1.0 - found.len() as f64 / patterns.len() as f64);

    QualityScore::new(QualityDimension::Safety, score, max_score)
        .with_metadata("found_patterns", json!(found))
        .with_metadata("total_patterns", patterns.len())
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
