//! Maps a free-text ingredient line ("1/4 cup chopped celery root") onto the
//! canonical ingredient it most likely names.
//!
//! Candidates are scored by the share of their own search words found in the
//! stemmed phrase, so a short exact name beats a long partially-matching one;
//! ties go to the longer, more specific name.

use crate::error::Result;
use crate::model::{Ingredient, IngredientId};
use crate::stemmer::TextProcessor;
use crate::store::Store;
use std::cmp::Ordering;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub struct CandidateScore {
    pub id: IngredientId,
    pub similarity: f64,
    pub length: usize,
}

fn contains_word(search_name: &str, token: &str) -> bool {
    search_name.contains(token) && search_name.split_whitespace().any(|w| w == token)
}

fn score_candidate(ingredient: &Ingredient, target_tokens: &[String]) -> CandidateScore {
    let words: Vec<&str> = ingredient.search_words().collect();
    let overlap = words.iter().filter(|w| target_tokens.iter().any(|t| t == *w)).count();
    let similarity = if words.is_empty() { 0.0 } else { overlap as f64 / words.len() as f64 };
    CandidateScore { id: ingredient.id, similarity, length: words.len() }
}

/// Higher similarity first, then longer name, then lower id so the result is deterministic.
fn rank(a: &CandidateScore, b: &CandidateScore) -> Ordering {
    b.similarity
        .partial_cmp(&a.similarity)
        .unwrap_or(Ordering::Equal)
        .then(b.length.cmp(&a.length))
        .then(a.id.cmp(&b.id))
}

/// Score every candidate that shares a whole word with the stemmed phrase.
pub fn rank_candidates(processor: &TextProcessor, phrase: &str, candidates: &[Ingredient]) -> Vec<CandidateScore> {
    let target_tokens = processor.stem_document(phrase, false);
    if target_tokens.is_empty() {
        return Vec::new();
    }
    let mut pool: BTreeMap<IngredientId, &Ingredient> = BTreeMap::new();
    for token in &target_tokens {
        for ingredient in candidates.iter().filter(|i| contains_word(&i.search_name, token)) {
            pool.entry(ingredient.id).or_insert(ingredient);
        }
    }
    let mut scored: Vec<CandidateScore> = pool.values().map(|i| score_candidate(i, &target_tokens)).collect();
    scored.sort_by(rank);
    scored
}

pub fn match_ingredient(processor: &TextProcessor, phrase: &str, candidates: &[Ingredient]) -> Option<IngredientId> {
    rank_candidates(processor, phrase, candidates).first().map(|c| c.id)
}

/// Resolve against the store, pulling candidates from the ingredient word index.
pub fn resolve_ingredient(store: &dyn Store, processor: &TextProcessor, phrase: &str) -> Result<Option<IngredientId>> {
    let target_tokens = processor.stem_document(phrase, false);
    if target_tokens.is_empty() {
        return Ok(None);
    }
    let mut candidates: BTreeMap<IngredientId, Ingredient> = BTreeMap::new();
    for token in &target_tokens {
        for ingredient in store.ingredients_with_word(token)? {
            candidates.entry(ingredient.id).or_insert(ingredient);
        }
    }
    let candidates: Vec<Ingredient> = candidates.into_values().collect();
    let resolved = match_ingredient(processor, phrase, &candidates);
    if resolved.is_none() {
        tracing::debug!(phrase, "no ingredient matched");
    }
    Ok(resolved)
}
