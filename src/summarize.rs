//! Extractive Summarizer: frequency-scored sentence selection within word bounds.
//!
//! Each sentence is scored by how often its content words appear across the
//! whole text, normalized by sentence length. The best five are kept in
//! their original order, then trimmed or topped up until the summary lands
//! inside `[min_words, max_words]`.
//!
//! The bounds are a target, not a guarantee. When the source is too short,
//! the summary is padded by repeating its own leading words; when a
//! sentence has to be cut, the cut is marked with [`ELLIPSIS`].
//!
//! Output is a pure function of `(text, min_words, max_words)`.

use crate::error::SummarizeError;
use crate::utils::{collapse_whitespace, word_count};
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

pub const ELLIPSIS: &str = "...";
pub const ADDITIONAL_CONTEXT: &str = "Additional context:";

/// Inputs shorter than this (in chars) skip sentence scoring entirely.
const SHORT_TEXT_CHARS: usize = 100;
const TOP_SENTENCES: usize = 5;
const BACKFILL_SENTENCES: usize = 5;

static STOPWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
        "is", "are", "was", "were", "be", "been", "this", "that", "it", "as", "from", "has",
        "have",
    ]
    .into_iter()
    .collect()
});

static SENTENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^.!?]+[.!?]+|[^.!?]+$").expect("static regex"));

/// Split whitespace-collapsed text into trimmed, non-empty sentences.
pub fn split_sentences(text: &str) -> Vec<&str> {
    SENTENCE_RE
        .find_iter(text)
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Lowercase tokens longer than one char, stopwords removed.
fn content_words(sentence: &str) -> Vec<String> {
    sentence
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() > 1 && !STOPWORDS.contains(*w))
        .map(str::to_string)
        .collect()
}

/// Extend `text` by cycling through its own words until it has `target` words.
fn cycle_words(text: &str, target: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() || words.len() >= target {
        return text.to_string();
    }
    words
        .iter()
        .cycle()
        .take(target)
        .join(" ")
}

/// First `max` words followed by the ellipsis marker.
fn truncate_words(text: &str, max: usize) -> String {
    let mut out = text.split_whitespace().take(max).join(" ");
    out.push_str(ELLIPSIS);
    out
}

/// Force `text` into the bounds without sentence scoring.
///
/// Short text is padded up to `max`, long text is cut at `max` with an
/// ellipsis, anything in range is returned unchanged.
pub fn fit_to_bounds(text: &str, min_words: usize, max_words: usize) -> String {
    let count = word_count(text);
    if count < min_words {
        cycle_words(text, max_words)
    } else if count > max_words {
        truncate_words(text, max_words)
    } else {
        text.to_string()
    }
}

/// Sentence indices ordered by score (descending), ties by position.
fn rank_sentences(sentences: &[&str]) -> Vec<usize> {
    let tokens: Vec<Vec<String>> = sentences.iter().map(|s| content_words(s)).collect();

    let mut frequency: HashMap<&str, usize> = HashMap::new();
    for word in tokens.iter().flatten() {
        *frequency.entry(word.as_str()).or_default() += 1;
    }

    let scores: Vec<f64> = sentences
        .iter()
        .zip(&tokens)
        .map(|(sentence, words)| {
            let raw = word_count(sentence);
            if raw == 0 {
                return 0.0;
            }
            let total: usize = words
                .iter()
                .map(|w| frequency.get(w.as_str()).copied().unwrap_or(0))
                .sum();
            total as f64 / raw as f64
        })
        .collect();

    (0..sentences.len())
        .sorted_by(|&a, &b| scores[b].total_cmp(&scores[a]).then(a.cmp(&b)))
        .collect()
}

fn try_summarize(text: &str, min_words: usize, max_words: usize) -> Result<String, SummarizeError> {
    if max_words == 0 || min_words > max_words {
        return Err(SummarizeError::InvalidBounds {
            min: min_words,
            max: max_words,
        });
    }

    let clean = collapse_whitespace(text);
    let sentences = split_sentences(&clean);
    if sentences.is_empty() {
        return Err(SummarizeError::NoSentences);
    }
    if sentences.len() <= 3 {
        return Ok(fit_to_bounds(&clean, min_words, max_words));
    }

    let ranked = rank_sentences(&sentences);
    let top: Vec<usize> = ranked.iter().take(TOP_SENTENCES).copied().sorted().collect();

    let mut summary: Vec<&str> = top
        .iter()
        .flat_map(|&i| sentences[i].split_whitespace())
        .collect();

    if summary.len() > max_words {
        summary.clear();
        for &i in &top {
            let words: Vec<&str> = sentences[i].split_whitespace().collect();
            if summary.len() + words.len() <= max_words {
                summary.extend(words);
                continue;
            }
            if summary.is_empty() || summary.len() < min_words {
                let room = max_words - summary.len();
                summary.extend(words.into_iter().take(room));
                let mut cut = summary.join(" ");
                cut.push_str(ELLIPSIS);
                return Ok(cut);
            }
            break;
        }
    }

    if summary.len() < min_words {
        let backfill = ranked
            .iter()
            .skip(TOP_SENTENCES)
            .take(BACKFILL_SENTENCES)
            .copied()
            .sorted();
        for i in backfill {
            if summary.len() >= min_words {
                break;
            }
            let words: Vec<&str> = sentences[i].split_whitespace().collect();
            if summary.len() + words.len() <= max_words {
                summary.extend(words);
            }
        }
    }

    let mut out = summary.join(" ");
    if summary.len() < min_words {
        let shortfall = min_words - summary.len();
        let fragment = sentences[ranked[0]]
            .split_whitespace()
            .take(shortfall)
            .join(" ");
        debug!(shortfall, "Summary short; appending context fragment");
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(ADDITIONAL_CONTEXT);
        out.push(' ');
        out.push_str(&fragment);
    }
    Ok(out)
}

/// Summarize `text` to roughly `min_words..=max_words` words.
///
/// Text under 100 characters skips scoring and is only padded up to
/// `min_words` by repeating its own words. Text of at most three sentences is
/// fitted to the bounds as a whole. Longer text gets the five best-scoring
/// sentences in document order, trimmed or topped up to fit.
///
/// # Arguments
///
/// * `text` - Plain text (article body or feed description)
/// * `min_words` - Lower word target
/// * `max_words` - Upper word target
///
/// # Returns
///
/// The summary. Never fails: internal errors fall back to [`fit_to_bounds`].
///
/// # Examples
///
/// ```ignore
/// let summary = summarize(&article_text, 55, 60);
/// assert!((55..=60).contains(&word_count(&summary)));
/// ```
pub fn summarize(text: &str, min_words: usize, max_words: usize) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() < SHORT_TEXT_CHARS {
        if !trimmed.is_empty() && word_count(trimmed) < min_words {
            return cycle_words(trimmed, min_words);
        }
        return text.to_string();
    }

    match try_summarize(trimmed, min_words, max_words) {
        Ok(summary) => summary,
        Err(e) => {
            warn!(error = %e, min_words, max_words, "Summarization failed; using word-bound fallback");
            let max = max_words.max(1);
            fit_to_bounds(&collapse_whitespace(trimmed), min_words.min(max), max)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIN: usize = 55;
    const MAX: usize = 60;

    fn sentence_with_words(n: usize, tag: &str) -> String {
        let mut words: Vec<String> = (0..n - 1).map(|i| format!("{tag}{i}")).collect();
        words.push("end.".to_string());
        words.join(" ")
    }

    fn varied_text(sentences: usize) -> String {
        let topics = ["council", "transit", "housing", "budget", "schools", "parks", "water"];
        (0..sentences)
            .map(|i| {
                let topic = topics[i % topics.len()];
                format!(
                    "Report {i} says the {topic} plan drew support from residents and the {topic} committee."
                )
            })
            .join(" ")
    }

    fn within_or_marked(summary: &str) -> bool {
        let count = word_count(summary);
        (MIN..=MAX).contains(&count) || summary.ends_with(ELLIPSIS) || summary.contains(ADDITIONAL_CONTEXT)
    }

    #[test]
    fn test_empty_text() {
        assert_eq!(summarize("", MIN, MAX), "");
        assert_eq!(summarize("   ", MIN, MAX), "   ");
    }

    #[test]
    fn test_short_text_padded_to_min() {
        let summary = summarize("Markets rose sharply today.", 10, 12);
        assert_eq!(word_count(&summary), 10);
        assert!(summary.starts_with("Markets rose sharply today. Markets rose"));
    }

    #[test]
    fn test_short_text_with_enough_words_unchanged() {
        assert_eq!(summarize("Markets rose.", 2, 5), "Markets rose.");
    }

    #[test]
    fn test_one_long_sentence_padded_to_max() {
        let text = sentence_with_words(40, "w");
        let summary = summarize(&text, MIN, MAX);
        assert_eq!(word_count(&summary), MAX);
        assert!(summary.starts_with(&text));
    }

    #[test]
    fn test_three_sentences_in_bounds_unchanged() {
        let text = [
            sentence_with_words(19, "a"),
            sentence_with_words(19, "b"),
            sentence_with_words(19, "c"),
        ]
        .join(" ");
        assert_eq!(summarize(&text, MIN, MAX), text);
    }

    #[test]
    fn test_three_sentences_over_max_truncated() {
        let text = [
            sentence_with_words(30, "a"),
            sentence_with_words(30, "b"),
            sentence_with_words(30, "c"),
        ]
        .join("\n\n");
        let summary = summarize(&text, MIN, MAX);
        assert!(summary.ends_with(ELLIPSIS));
        assert_eq!(word_count(&summary), MAX);
    }

    #[test]
    fn test_bounds_for_sentence_counts() {
        for n in [0, 1, 3, 10, 50] {
            let text = varied_text(n);
            let summary = summarize(&text, MIN, MAX);
            if n == 0 {
                assert!(summary.is_empty());
            } else {
                assert!(within_or_marked(&summary), "{n} sentences gave {summary:?}");
            }
        }
    }

    #[test]
    fn test_deterministic() {
        let text = varied_text(50);
        let first = summarize(&text, MIN, MAX);
        for _ in 0..5 {
            assert_eq!(summarize(&text, MIN, MAX), first);
        }
    }

    #[test]
    fn test_selection_keeps_document_order() {
        let text = varied_text(10);
        let sentences = split_sentences(&text);
        let summary = summarize(&text, MIN, MAX);
        let positions: Vec<usize> = sentences
            .iter()
            .enumerate()
            .filter(|(_, s)| summary.contains(*s))
            .map(|(i, _)| i)
            .collect();
        assert!(positions.len() >= 2);
        let in_summary: Vec<usize> = positions
            .iter()
            .map(|&i| summary.find(sentences[i]).unwrap())
            .collect();
        assert!(in_summary.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_long_sentences_cut_with_ellipsis() {
        let text = (0..5)
            .map(|i| sentence_with_words(40, &format!("s{i}x")))
            .join(" ");
        let summary = summarize(&text, MIN, MAX);
        assert_eq!(word_count(&summary), MAX);
        assert!(summary.ends_with(ELLIPSIS));
    }

    #[test]
    fn test_short_sentences_get_additional_context() {
        let text = "The mayor spoke briefly today. Residents listened with care. \
                    Officials promised more updates soon. The meeting ended early tonight.";
        let summary = summarize(text, MIN, MAX);
        assert!(summary.contains(ADDITIONAL_CONTEXT));
        assert!(summary.starts_with("The mayor spoke briefly today."));
    }

    #[test]
    fn test_backfill_from_lower_ranks() {
        // Ten 8-word sentences: top five give 40 words, backfill tops up past 55.
        let text = (0..10)
            .map(|i| format!("Item {i} notes council members debated the budget."))
            .join(" ");
        let summary = summarize(&text, MIN, MAX);
        let count = word_count(&summary);
        assert!((MIN..=MAX).contains(&count), "got {count} words");
        assert!(!summary.contains(ADDITIONAL_CONTEXT));
    }

    #[test]
    fn test_backfill_appends_in_document_order() {
        // High sentences share heavy words and fill the top five (40 words).
        // Low sentence k repeats "quiet" k times, so later lows outrank earlier ones.
        let high = |k: usize| format!("Budget council budget council budget council budget h{k}.");
        let low = |k: usize| {
            let mut words = vec!["quiet".to_string(); k];
            words.extend((0..8 - k).map(|j| format!("l{k}w{j}")));
            format!("{}.", words.join(" "))
        };
        let text = (0..5).map(|k| format!("{} {}", low(k), high(k))).join(" ");

        let summary = summarize(&text, MIN, MAX);

        // Ranks 6-10 are low(4)..low(0); they are taken in document order
        // until the minimum is met, so low(0) and low(1) are appended.
        let expected = (0..5)
            .map(high)
            .chain([low(0), low(1)])
            .join(" ");
        assert_eq!(summary, expected);
        assert_eq!(word_count(&summary), 56);
    }

    #[test]
    fn test_invalid_bounds_fall_back() {
        let text = varied_text(10);
        let summary = summarize(&text, 80, 60);
        assert!(summary.ends_with(ELLIPSIS));
        assert_eq!(word_count(&summary), 60);
    }

    #[test]
    fn test_split_sentences() {
        assert_eq!(
            split_sentences("One. Two! Three? trailing bit"),
            vec!["One.", "Two!", "Three?", "trailing bit"]
        );
        assert!(split_sentences("").is_empty());
    }

    #[test]
    fn test_content_words_drop_stopwords() {
        assert_eq!(
            content_words("The council and a mayor, in 2025!"),
            vec!["council", "mayor", "2025"]
        );
    }
}
