use crate::error::{Error, Result};
use crate::model::{IndexRow, IndexVariant, Recipe};
use crate::stemmer::TextProcessor;
use crate::store::Store;
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IndexSummary {
    pub filtered_rows: usize,
    pub fulltext_rows: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReindexReport {
    pub indexed: usize,
    pub already_indexed: usize,
    pub skipped_unusable: usize,
}

fn positional_rows(recipe: &Recipe, stems: Vec<String>) -> Vec<IndexRow> {
    stems
        .into_iter()
        .enumerate()
        .map(|(position, stem)| IndexRow { recipe_id: recipe.id, stem, position: position as u32 })
        .collect()
}

/// Append both positional streams for one recipe. Call once per recipe: existing
/// rows are not checked for.
pub fn index_directions(store: &dyn Store, processor: &TextProcessor, recipe: &Recipe) -> Result<IndexSummary> {
    if !recipe.has_usable_directions() {
        return Err(Error::MissingDirections(recipe.id));
    }
    let directions = recipe.directions_text();
    let filtered = positional_rows(recipe, processor.stem_document(directions, true));
    let fulltext = positional_rows(recipe, processor.stem_document(directions, false));

    store.append_index_rows(IndexVariant::Filtered, &filtered)?;
    store.append_index_rows(IndexVariant::Fulltext, &fulltext)?;
    tracing::debug!(recipe_id = recipe.id, filtered = filtered.len(), fulltext = fulltext.len(), "indexed directions");
    Ok(IndexSummary { filtered_rows: filtered.len(), fulltext_rows: fulltext.len() })
}

/// Index every recipe that has usable directions and no rows yet.
pub fn reindex_all_directions(store: &dyn Store, processor: &TextProcessor) -> Result<ReindexReport> {
    let mut report = ReindexReport::default();
    for id in store.recipe_ids()? {
        let Some(recipe) = store.recipe(id)? else { continue };
        if !recipe.has_usable_directions() {
            report.skipped_unusable += 1;
            continue;
        }
        if store.is_indexed(id)? {
            report.already_indexed += 1;
            continue;
        }
        index_directions(store, processor, &recipe)?;
        report.indexed += 1;
    }
    tracing::info!(
        indexed = report.indexed,
        already_indexed = report.already_indexed,
        skipped_unusable = report.skipped_unusable,
        "directions index pass complete"
    );
    Ok(report)
}

/// Rebuild the ingredient word index from scratch. Returns the number of
/// ingredients indexed.
pub fn index_ingredients(store: &dyn Store) -> Result<usize> {
    store.clear_ingredient_words()?;
    let ingredients = store.ingredients()?;
    for ingredient in &ingredients {
        store.index_ingredient_words(ingredient)?;
    }
    tracing::info!(ingredients = ingredients.len(), "ingredient word index rebuilt");
    Ok(ingredients.len())
}
