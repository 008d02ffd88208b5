//! Typo-tolerant similarity scoring for free-text search.
//!
//! [`score`] maps a query/candidate pair onto `[0, 1]`. Exact and substring
//! hits short-circuit; everything else is a weighted blend of edit distance,
//! ordered-subsequence coverage and character-set overlap, damped so that
//! weak matches stay well below the substring band.
//!
//! The weights and cut-offs are empirical tuning values.

use std::collections::HashSet;

/// Threshold used by [`is_match`] callers that have no configured value.
pub const DEFAULT_THRESHOLD: f64 = 0.25;
/// Minimum per-word score accepted by [`partial_word_match`].
pub const PARTIAL_WORD_THRESHOLD: f64 = 0.4;

const EXACT_SCORE: f64 = 1.0;
const CONTAINS_SCORE: f64 = 0.9;
const CONTAINS_LENGTH_PENALTY: f64 = 0.1;

const LEVENSHTEIN_WEIGHT: f64 = 0.4;
const SUBSEQUENCE_WEIGHT: f64 = 0.3;
const CHARSET_WEIGHT: f64 = 0.3;
const COMBINED_CUTOFF: f64 = 0.5;
const DAMPING: f64 = 0.7;

/// Score how well `term` matches `target`, case-insensitively.
///
/// Returns `0.0` when either side is blank after trimming. Lengths are
/// counted in characters, not bytes.
///
/// A prefix hit is always a substring hit too, so prefixes land in the
/// substring band rather than getting a band of their own.
pub fn score(term: &str, target: &str) -> f64 {
    let term = term.trim().to_lowercase();
    let target = target.trim().to_lowercase();
    if term.is_empty() || target.is_empty() {
        return 0.0;
    }
    if term == target {
        return EXACT_SCORE;
    }

    let term_chars: Vec<char> = term.chars().collect();
    let target_chars: Vec<char> = target.chars().collect();
    let term_len = term_chars.len() as f64;
    let target_len = target_chars.len() as f64;

    if target.contains(&term) {
        return CONTAINS_SCORE - ((target_len - term_len).abs() / target_len) * CONTAINS_LENGTH_PENALTY;
    }

    let combined = LEVENSHTEIN_WEIGHT * levenshtein_similarity(&term, &target, term_len, target_len)
        + SUBSEQUENCE_WEIGHT * subsequence_similarity(&term_chars, &target_chars)
        + CHARSET_WEIGHT * charset_overlap(&term_chars, &target_chars);

    if combined > COMBINED_CUTOFF {
        combined * DAMPING
    } else {
        0.0
    }
}

/// `true` when [`score`] reaches `threshold`.
pub fn is_match(term: &str, target: &str, threshold: f64) -> bool {
    score(term, target) >= threshold
}

/// `true` when any whitespace-separated word of `term` scores at least
/// [`PARTIAL_WORD_THRESHOLD`] against any word of `target`.
///
/// Catches a single mistyped word inside a multi-word value such as
/// `"Malmö Central"`.
pub fn partial_word_match(term: &str, target: &str) -> bool {
    let target_words: Vec<&str> = target.split_whitespace().collect();
    term.split_whitespace().any(|word| {
        target_words
            .iter()
            .any(|candidate| score(word, candidate) >= PARTIAL_WORD_THRESHOLD)
    })
}

fn levenshtein_similarity(a: &str, b: &str, a_len: f64, b_len: f64) -> f64 {
    let longest = a_len.max(b_len);
    1.0 - strsim::levenshtein(a, b) as f64 / longest
}

/// Characters of the shorter string found in order during one pass over
/// the longer one, relative to the longer length. On equal lengths `target`
/// is the string scanned.
fn subsequence_similarity(term: &[char], target: &[char]) -> f64 {
    let (shorter, longer) = if term.len() <= target.len() {
        (term, target)
    } else {
        (target, term)
    };

    let mut found = 0usize;
    for ch in longer {
        if found < shorter.len() && *ch == shorter[found] {
            found += 1;
        }
    }
    found as f64 / longer.len() as f64
}

fn charset_overlap(term: &[char], target: &[char]) -> f64 {
    let term_set: HashSet<char> = term.iter().copied().collect();
    let target_set: HashSet<char> = target.iter().copied().collect();
    let shared = term_set.intersection(&target_set).count();
    shared as f64 / term_set.len().max(target_set.len()) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn identical_strings_score_one() {
        for value in ["station", "Göteborg C", "x", "SJ 531"] {
            assert_eq!(score(value, value), 1.0);
        }
        assert_eq!(score("Stockholm", "  stockholm "), 1.0);
    }

    #[test]
    fn blank_input_scores_zero() {
        assert_eq!(score("", "Oslo S"), 0.0);
        assert_eq!(score("Oslo", ""), 0.0);
        assert_eq!(score("   ", "Oslo"), 0.0);
    }

    #[test]
    fn substring_is_penalised_by_length_gap() {
        // 0.9 - (9 - 5) / 9 * 0.1
        let expected = 0.9 - (4.0 / 9.0) * 0.1;
        assert!(approx(score("stock", "Stockholm"), expected));
        assert!(score("stock", "Stockholm") > score("st", "Stockholm"));
    }

    #[test]
    fn prefix_lands_in_substring_band() {
        let value = score("mal", "malmö");
        assert!(value > 0.8 && value < 0.9);
    }

    #[test]
    fn transposed_letters_still_match() {
        let value = score("station", "stattion");
        assert!(value >= DEFAULT_THRESHOLD, "score was {value}");
        assert!(is_match("station", "stattion", DEFAULT_THRESHOLD));
    }

    #[test]
    fn unrelated_strings_score_zero() {
        assert_eq!(score("station", "xyz"), 0.0);
        assert!(!is_match("station", "xyz", DEFAULT_THRESHOLD));
    }

    #[test]
    fn fuzzy_band_is_damped() {
        let value = score("stockhlm", "Stockholm");
        assert!(value > 0.5 && value <= DAMPING, "score was {value}");
    }

    #[test]
    fn scores_stay_in_unit_interval() {
        let samples = [
            "", "a", "ab", "Oslo S", "Bergen", "Trondheim S", "Kø", "København H", "åäö",
            "531", "stockholm central", "x y z",
        ];
        for term in samples {
            for target in samples {
                let value = score(term, target);
                assert!((0.0..=1.0).contains(&value), "{term:?} vs {target:?} gave {value}");
            }
        }
    }

    #[test]
    fn partial_words_catch_single_typo() {
        assert!(partial_word_match("centrl", "Helsinki Central"));
        assert!(partial_word_match("Malmo C", "Malmö C"));
        assert!(!partial_word_match("zzz", "Helsinki Central"));
        assert!(!partial_word_match("", "Helsinki Central"));
    }

    #[test]
    fn subsequence_counts_in_order_hits() {
        let a: Vec<char> = "ace".chars().collect();
        let b: Vec<char> = "abcde".chars().collect();
        assert!(approx(subsequence_similarity(&a, &b), 3.0 / 5.0));
        assert!(approx(subsequence_similarity(&b, &a), 3.0 / 5.0));
    }
}
