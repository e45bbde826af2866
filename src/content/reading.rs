//! Reading time estimation

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::ContentSection;

lazy_static! {
    /// ASCII word characters or hyphens
    static ref WORD_RE: Regex = Regex::new(r"[A-Za-z0-9_-]+").unwrap();
}

/// How tokens are counted in a block of text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WordCounting {
    /// Count runs of word characters
    #[default]
    Words,
    /// Count the pieces left after splitting on runs of word characters
    /// (one more than the number of runs, per section)
    Segments,
}

/// Count tokens in `text`
pub fn count_tokens(text: &str, counting: WordCounting) -> usize {
    let runs = WORD_RE.find_iter(text).count();
    match counting {
        WordCounting::Words => runs,
        WordCounting::Segments => runs + 1,
    }
}

/// Minutes needed to read `tokens` at `words_per_minute`, rounded up
pub fn minutes_for(tokens: usize, words_per_minute: usize) -> usize {
    tokens.div_ceil(words_per_minute.max(1))
}

/// Estimated reading time of a post body in whole minutes
///
/// Never below one minute once any section has something to show, even if
/// none of it counts as a word (emoji, punctuation, images).
pub fn reading_time(
    sections: &[ContentSection],
    counting: WordCounting,
    words_per_minute: usize,
) -> usize {
    let tokens = sections
        .iter()
        .map(|section| count_tokens(&section.body.as_text(), counting))
        .sum();
    let minutes = minutes_for(tokens, words_per_minute);
    if sections.iter().any(|section| section.body.has_content()) {
        minutes.max(1)
    } else {
        minutes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::richtext::RichText;

    fn section(text: &str) -> ContentSection {
        let body: RichText = serde_json::from_value(serde_json::json!([
            {"type": "paragraph", "text": text, "spans": []}
        ]))
        .unwrap();
        ContentSection {
            heading: "Seção".to_string(),
            body,
        }
    }

    fn words(n: usize) -> String {
        vec!["word"; n].join(" ")
    }

    #[test]
    fn test_count_tokens() {
        assert_eq!(count_tokens("Hello, big-world!", WordCounting::Words), 2);
        assert_eq!(count_tokens("Hello, big-world!", WordCounting::Segments), 3);
        assert_eq!(count_tokens("", WordCounting::Words), 0);
        assert_eq!(count_tokens("", WordCounting::Segments), 1);
    }

    #[test]
    fn test_non_ascii_letters_split_words() {
        // Matches the ASCII-only word class: "não" is two runs
        assert_eq!(count_tokens("não", WordCounting::Words), 2);
    }

    #[test]
    fn test_400_and_401_tokens() {
        assert_eq!(reading_time(&[section(&words(400))], WordCounting::Words, 200), 2);
        assert_eq!(reading_time(&[section(&words(401))], WordCounting::Words, 200), 3);
    }

    #[test]
    fn test_content_without_words_takes_a_minute() {
        assert_eq!(reading_time(&[section("🚀 — …")], WordCounting::Words, 200), 1);

        let image: RichText = serde_json::from_value(serde_json::json!([
            {"type": "image", "url": "https://images.prismic.io/a.png", "alt": null}
        ]))
        .unwrap();
        let sections = [ContentSection {
            heading: String::new(),
            body: image,
        }];
        assert_eq!(reading_time(&sections, WordCounting::Words, 200), 1);
    }

    #[test]
    fn test_empty_content_takes_no_time() {
        assert_eq!(reading_time(&[], WordCounting::Words, 200), 0);
        assert_eq!(reading_time(&[section("   ")], WordCounting::Words, 200), 0);
    }

    #[test]
    fn test_sections_are_summed() {
        let sections = [section(&words(150)), section(&words(100))];
        assert_eq!(reading_time(&sections, WordCounting::Words, 200), 2);
        // Segments adds one per section: 151 + 101
        assert_eq!(reading_time(&sections, WordCounting::Segments, 200), 2);
    }

    #[test]
    fn test_at_least_one_minute_for_any_word() {
        assert_eq!(reading_time(&[section("one")], WordCounting::Words, 200), 1);
        assert_eq!(reading_time(&[], WordCounting::Words, 200), 0);
    }

    #[test]
    fn test_monotonic_in_tokens() {
        let mut last = 0;
        for tokens in 0..1000 {
            let minutes = minutes_for(tokens, 200);
            assert!(minutes >= last);
            assert_eq!(minutes, (tokens as f64 / 200.0).ceil() as usize);
            last = minutes;
        }
    }
}
