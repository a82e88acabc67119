//! Text normalization for the sentiment pipeline.
//!
//! Turns raw user text into a space-joined sequence of stems:
//! lowercase, drop URLs, mentions and hashtags, keep only letters, drop
//! stopwords and short tokens, stem what remains.

use once_cell::sync::Lazy;
use regex::Regex;

use super::stemmer::PorterStemmer;
use super::stopwords::is_stopword;

static URL_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"http\S+|www\S+").unwrap());
static MENTION_HASHTAG_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"[@#]\w+").unwrap());
static NON_ALPHA_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z\s]").unwrap());
static WHITESPACE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

#[derive(Debug, Clone)]
pub struct TextNormalizer {
    /// Tokens shorter than this are dropped.
    min_token_length: usize,
    stemmer: PorterStemmer,
}

impl TextNormalizer {
    pub fn new() -> Self {
        Self {
            min_token_length: 3,
            stemmer: PorterStemmer::new(),
        }
    }

    /// Lowercases and strips everything but letters and single spaces.
    pub fn clean(&self, text: &str) -> String {
        let text = text.to_lowercase();
        let text = URL_REGEX.replace_all(&text, "");
        let text = MENTION_HASHTAG_REGEX.replace_all(&text, "");
        let text = NON_ALPHA_REGEX.replace_all(&text, "");
        WHITESPACE_REGEX.replace_all(&text, " ").trim().to_string()
    }

    pub fn tokens(&self, text: &str) -> Vec<String> {
        self.clean(text)
            .split_whitespace()
            .filter(|word| word.len() >= self.min_token_length && !is_stopword(word))
            .map(|word| self.stemmer.stem(word))
            .collect()
    }

    pub fn normalize(&self, text: &str) -> String {
        self.tokens(text).join(" ")
    }

    pub fn normalize_batch<S: AsRef<str>>(&self, texts: &[S]) -> Vec<String> {
        texts.iter().map(|t| self.normalize(t.as_ref())).collect()
    }
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_strips_noise() {
        let normalizer = TextNormalizer::new();
        assert_eq!(
            normalizer.clean("Check https://example.com/x?y=1 @user #Deal NOW!!! 100%"),
            "check now"
        );
        assert_eq!(normalizer.clean("visit www.example.com   today"), "visit today");
    }

    #[test]
    fn test_normalize_pipeline() {
        let normalizer = TextNormalizer::new();
        assert_eq!(
            normalizer.normalize("I love this product, it is amazing and fantastic!"),
            "love product amaz fantast"
        );
        assert_eq!(
            normalizer.normalize("Terrible quality, very disappointed with purchase"),
            "terribl qualiti disappoint purchas"
        );
    }

    #[test]
    fn test_drops_stopwords_and_short_tokens() {
        let normalizer = TextNormalizer::new();
        assert_eq!(normalizer.normalize("it is so ok to be an ox"), "");
    }

    #[test]
    fn test_empty_input() {
        let normalizer = TextNormalizer::new();
        assert_eq!(normalizer.normalize(""), "");
        assert_eq!(normalizer.normalize("   !!! 123 "), "");
    }

    #[test]
    fn test_batch_preserves_order() {
        let normalizer = TextNormalizer::new();
        let out = normalizer.normalize_batch(&["great service", "awful service"]);
        assert_eq!(out, vec!["great servic".to_string(), "aw servic".to_string()]);
    }
}
