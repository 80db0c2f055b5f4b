//! Offline TF-IDF passes over the stopword-filtered directions index.
//!
//! `tf = 1 + log10(count)`, `idf = log10(N / df)` (0 when df is 0). A recipe's
//! score is the sum of `tf * idf` over its distinct stems. Idf values are cached
//! per stem and never recomputed.

use crate::error::Result;
use crate::model::{directions_usable, IndexVariant, RecipeId};
use crate::store::Store;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StemReport {
    pub purged_recipes: usize,
    pub scored_stems: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScoreReport {
    pub purged_recipes: usize,
    pub scored_recipes: usize,
    /// Pending recipes with no index rows yet; left null for a later pass.
    pub skipped_unindexed: usize,
    pub new_stems: usize,
}

pub fn term_frequency(count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        1.0 + (count as f64).log10()
    }
}

pub fn inverse_document_frequency(total_recipes: usize, df: usize) -> f64 {
    if df == 0 || total_recipes == 0 {
        0.0
    } else {
        (total_recipes as f64 / df as f64).log10()
    }
}

/// Remove recipes whose directions are null, blank or the placeholder text; they
/// would skew document frequencies.
pub fn purge_unusable_recipes(store: &dyn Store) -> Result<usize> {
    let purged = store.delete_recipes_where(&|r| !directions_usable(r.directions.as_deref()))?;
    if purged > 0 {
        tracing::warn!(purged, "removed recipes without usable directions");
    }
    Ok(purged)
}

/// Look up the cached idf for `stem`, computing and caching it on a miss.
/// Returns the idf and whether this call stored it.
fn idf_for(store: &dyn Store, stem: &str, total_recipes: usize) -> Result<(f64, bool)> {
    if let Some(idf) = store.stem_score(stem)? {
        return Ok((idf, false));
    }
    let df = store.document_frequency(IndexVariant::Filtered, stem)?;
    let idf = inverse_document_frequency(total_recipes, df);
    match store.insert_stem_score_if_absent(stem, idf)? {
        None => Ok((idf, true)),
        Some(existing) => Ok((existing, false)),
    }
}

/// Cache idf for every indexed stem that has none yet.
pub fn score_all_pending_stems(store: &dyn Store) -> Result<StemReport> {
    let purged_recipes = purge_unusable_recipes(store)?;
    let total = store.recipe_count()?;
    let mut scored_stems = 0;
    for stem in store.distinct_stems(IndexVariant::Filtered)? {
        if store.stem_score(&stem)?.is_some() {
            continue;
        }
        let (idf, stored) = idf_for(store, &stem, total)?;
        if stored {
            tracing::debug!(stem = %stem, idf, "scored stem");
            scored_stems += 1;
        }
    }
    tracing::info!(purged_recipes, scored_stems, total_recipes = total, "stem scoring pass complete");
    Ok(StemReport { purged_recipes, scored_stems })
}

/// Score one recipe from its filtered index rows; returns the score and the number
/// of stems this call cached. A recipe that was never indexed is left unscored and
/// yields `None`.
fn score_recipe(store: &dyn Store, recipe_id: RecipeId, total_recipes: usize) -> Result<Option<(f64, usize)>> {
    if !store.is_indexed(recipe_id)? {
        tracing::debug!(recipe_id, "recipe not indexed yet, leaving score null");
        return Ok(None);
    }
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for row in store.index_rows(IndexVariant::Filtered, recipe_id)? {
        *counts.entry(row.stem).or_insert(0) += 1;
    }
    let mut score = 0.0;
    let mut new_stems = 0;
    for (stem, count) in &counts {
        let (idf, stored) = idf_for(store, stem, total_recipes)?;
        if stored {
            new_stems += 1;
        }
        score += term_frequency(*count) * idf;
    }
    store.set_recipe_score(recipe_id, score)?;
    tracing::debug!(recipe_id, score, stems = counts.len(), "scored recipe");
    Ok(Some((score, new_stems)))
}

/// Score every indexed recipe whose score is still null.
pub fn score_all_pending_recipes(store: &dyn Store) -> Result<ScoreReport> {
    let purged_recipes = purge_unusable_recipes(store)?;
    let total = store.recipe_count()?;
    let pending = store.pending_recipe_ids()?;

    #[cfg(feature = "parallel")]
    let results: Vec<Option<(f64, usize)>> = {
        use rayon::prelude::*;
        pending.par_iter().map(|id| score_recipe(store, *id, total)).collect::<Result<_>>()?
    };
    #[cfg(not(feature = "parallel"))]
    let results: Vec<Option<(f64, usize)>> =
        pending.iter().map(|id| score_recipe(store, *id, total)).collect::<Result<_>>()?;

    let scored: Vec<&(f64, usize)> = results.iter().flatten().collect();
    let report = ScoreReport {
        purged_recipes,
        scored_recipes: scored.len(),
        skipped_unindexed: results.len() - scored.len(),
        new_stems: scored.iter().map(|(_, n)| n).sum(),
    };
    if report.skipped_unindexed > 0 {
        tracing::warn!(skipped = report.skipped_unindexed, "pending recipes have no index rows, run the index pass");
    }
    tracing::info!(
        purged_recipes = report.purged_recipes,
        scored_recipes = report.scored_recipes,
        skipped_unindexed = report.skipped_unindexed,
        new_stems = report.new_stems,
        total_recipes = total,
        "recipe scoring pass complete"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tf_is_log_scaled() {
        assert_eq!(term_frequency(0), 0.0);
        assert_eq!(term_frequency(1), 1.0);
        assert!((term_frequency(10) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn idf_is_zero_for_ubiquitous_or_unseen_stems() {
        assert_eq!(inverse_document_frequency(5, 5), 0.0);
        assert_eq!(inverse_document_frequency(5, 0), 0.0);
        assert!((inverse_document_frequency(100, 10) - 1.0).abs() < 1e-12);
    }
}
