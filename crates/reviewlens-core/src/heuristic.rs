//! Lexicon-count sentiment estimate used when the LLM cannot deliver.
//!
//! This is a best-effort signal, not a semantic reading: it counts
//! substring hits of two fixed word lists in the lowercased text, so
//! "badly" counts as "bad" and negation is ignored.

use crate::review::SentimentDistribution;

pub const POSITIVE_WORDS: &[&str] = &[
    "good",
    "great",
    "excellent",
    "love",
    "amazing",
    "best",
    "happy",
    "satisfied",
];

pub const NEGATIVE_WORDS: &[&str] = &[
    "bad",
    "poor",
    "terrible",
    "hate",
    "worst",
    "disappointed",
    "awful",
    "horrible",
];

/// Returned when neither lexicon matches.
pub const EVEN_SPLIT: SentimentDistribution = SentimentDistribution {
    positive: 34,
    negative: 33,
    neutral: 33,
};

/// Estimate a sentiment split whose three parts sum to 100.
///
/// Positive and negative shares are floored; neutral absorbs the remainder.
pub fn estimate(text: &str) -> SentimentDistribution {
    let text = text.to_lowercase();
    let pos = count_hits(&text, POSITIVE_WORDS);
    let neg = count_hits(&text, NEGATIVE_WORDS);
    let total = pos + neg;
    if total == 0 {
        return EVEN_SPLIT;
    }

    let positive = (100 * pos / total) as u32;
    let negative = (100 * neg / total) as u32;
    SentimentDistribution {
        positive,
        negative,
        neutral: 100 - positive - negative,
    }
}

/// Non-overlapping substring occurrences of every word in `lexicon`.
fn count_hits(text: &str, lexicon: &[&str]) -> u64 {
    lexicon
        .iter()
        .map(|w| text.matches(w).count() as u64)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(d: SentimentDistribution) -> (u32, u32, u32) {
        (d.positive, d.negative, d.neutral)
    }

    #[test]
    fn empty_text_is_even_split() {
        assert_eq!(split(estimate("")), (34, 33, 33));
    }

    #[test]
    fn no_lexicon_hits_is_even_split() {
        assert_eq!(split(estimate("The parcel arrived on Tuesday.")), (34, 33, 33));
    }

    #[test]
    fn all_positive() {
        assert_eq!(split(estimate("great great")), (100, 0, 0));
    }

    #[test]
    fn three_negative_one_positive() {
        assert_eq!(split(estimate("bad bad bad good")), (25, 75, 0));
    }

    #[test]
    fn case_insensitive() {
        assert_eq!(split(estimate("GREAT service, TERRIBLE app")), (50, 50, 0));
    }

    #[test]
    fn neutral_absorbs_rounding() {
        // 1 positive, 2 negative: 33 + 66 leaves 1 for neutral.
        let d = estimate("good bad awful");
        assert_eq!(split(d), (33, 66, 1));
        assert_eq!(d.total(), 100);
    }

    #[test]
    fn substring_counting_not_tokenised() {
        // "badly" contains "bad"; the heuristic does not understand words.
        assert_eq!(split(estimate("it went badly")), (0, 100, 0));
    }

    #[test]
    fn always_sums_to_100() {
        for text in [
            "love it, best purchase, happy",
            "poor poor poor poor poor poor good",
            "satisfied but disappointed and horrible",
            "",
        ] {
            assert_eq!(estimate(text).total(), 100, "{text:?}");
        }
    }
}
