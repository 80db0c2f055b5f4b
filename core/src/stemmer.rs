use crate::tokenizer::{tokenize, APOSTROPHE};
use lazy_static::lazy_static;
use rust_stemmers::{Algorithm, Stemmer};
use std::collections::HashSet;

lazy_static! {
    static ref STOPWORDS: HashSet<&'static str> =
        ["the", "is", "at", "of", "on", "and", "a"].into_iter().collect();
}

const MAX_STEM_PASSES: usize = 8;

pub fn is_stopword(token: &str) -> bool {
    STOPWORDS.contains(token)
}

/// Tokenizer plus English stemmer. Holds no mutable state, so one value can be
/// shared by reference across indexing, ingredient resolution and querying.
pub struct TextProcessor {
    stemmer: Stemmer,
}

impl Default for TextProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl TextProcessor {
    pub fn new() -> Self {
        Self { stemmer: Stemmer::create(Algorithm::English) }
    }

    fn stem_once(&self, token: &str) -> String {
        let mut stemmed = self.stemmer.stem(token).into_owned();
        if stemmed.ends_with(APOSTROPHE) {
            stemmed.pop();
        }
        stemmed
    }

    /// Stem one (lowercase) token, dropping a trailing apostrophe left by the stemmer.
    /// Snowball is re-applied until the output is stable, so a stem always stems
    /// to itself ("agreed" -> "agre" -> "agr").
    pub fn stem(&self, token: &str) -> String {
        let mut current = self.stem_once(token);
        for _ in 0..MAX_STEM_PASSES {
            let next = self.stem_once(&current);
            if next == current {
                break;
            }
            current = next;
        }
        current
    }

    /// Tokenize, lowercase, optionally drop stopwords, then stem, preserving order.
    pub fn stem_document(&self, text: &str, remove_stopwords: bool) -> Vec<String> {
        tokenize(text)
            .into_iter()
            .map(|t| t.to_lowercase())
            .filter(|t| !(remove_stopwords && is_stopword(t)))
            .map(|t| self.stem(&t))
            .collect()
    }

    /// Lowercase and stem each whitespace separated word of a phrase, rejoined with
    /// single spaces. Used for query ingredient groups.
    pub fn stem_phrase(&self, phrase: &str) -> String {
        phrase
            .split_whitespace()
            .map(|w| self.stem(&w.to_lowercase()))
            .collect::<Vec<_>>()
            .join(" ")
    }
}
