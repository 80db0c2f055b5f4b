//! Storage collaborator interface.
//!
//! Every call goes to the backend; nothing here caches across calls. Backends are
//! `Send + Sync` so batch passes may share one store between worker threads.

use crate::error::Result;
use crate::model::{Ingredient, IngredientId, IndexRow, IndexVariant, NewRecipe, Recipe, RecipeId};
use std::collections::BTreeSet;

pub trait Store: Send + Sync {
    fn insert_ingredient(&self, display_name: &str, search_name: &str) -> Result<IngredientId>;
    fn ingredient(&self, id: IngredientId) -> Result<Option<Ingredient>>;
    fn ingredients(&self) -> Result<Vec<Ingredient>>;
    fn ingredient_count(&self) -> Result<usize>;
    /// Ingredients whose `search_name` contains `fragment` as a substring.
    fn ingredients_containing(&self, fragment: &str) -> Result<Vec<Ingredient>>;
    /// Ingredients with `word` as one of their search words, from the word index.
    fn ingredients_with_word(&self, word: &str) -> Result<Vec<Ingredient>>;
    /// Add an ingredient's search words to the word index. `insert_ingredient`
    /// does this itself; repeating it is harmless.
    fn index_ingredient_words(&self, ingredient: &Ingredient) -> Result<()>;
    fn clear_ingredient_words(&self) -> Result<()>;

    /// Fails with `DuplicateSourceUrl` when the url is already stored.
    fn insert_recipe(&self, recipe: NewRecipe) -> Result<RecipeId>;
    fn recipe(&self, id: RecipeId) -> Result<Option<Recipe>>;
    fn recipe_by_source_url(&self, url: &str) -> Result<Option<RecipeId>>;
    /// Ascending id order.
    fn recipe_ids(&self) -> Result<Vec<RecipeId>>;
    fn recipe_count(&self) -> Result<usize>;
    /// Recipes whose score is still null, ascending id order.
    fn pending_recipe_ids(&self) -> Result<Vec<RecipeId>>;
    fn recipes_with_any_ingredient(&self, ingredients: &[IngredientId]) -> Result<BTreeSet<RecipeId>>;
    /// Fails with `ScoreAlreadySet` if the recipe already has a score.
    fn set_recipe_score(&self, id: RecipeId, score: f64) -> Result<()>;
    /// Deletes matching recipes together with their index rows and ingredient links.
    fn delete_recipes_where(&self, predicate: &dyn Fn(&Recipe) -> bool) -> Result<usize>;

    fn append_index_rows(&self, variant: IndexVariant, rows: &[IndexRow]) -> Result<()>;
    /// Rows of one recipe, ordered by position.
    fn index_rows(&self, variant: IndexVariant, recipe_id: RecipeId) -> Result<Vec<IndexRow>>;
    fn is_indexed(&self, recipe_id: RecipeId) -> Result<bool>;
    fn distinct_stems(&self, variant: IndexVariant) -> Result<BTreeSet<String>>;
    /// Number of distinct recipes with at least one row for `stem`.
    fn document_frequency(&self, variant: IndexVariant, stem: &str) -> Result<usize>;

    fn stem_score(&self, stem: &str) -> Result<Option<f64>>;
    /// Compare-and-insert: stores `idf` only if the stem has no score yet.
    /// Returns `None` when this call stored it, or the value already present.
    fn insert_stem_score_if_absent(&self, stem: &str, idf: f64) -> Result<Option<f64>>;
    fn stem_score_count(&self) -> Result<usize>;
}

/// Fetch the ingredients of a recipe, in id order.
pub fn recipe_ingredients(store: &dyn Store, recipe: &Recipe) -> Result<Vec<Ingredient>> {
    let mut out = Vec::with_capacity(recipe.ingredients.len());
    for id in &recipe.ingredients {
        if let Some(ingredient) = store.ingredient(*id)? {
            out.push(ingredient);
        }
    }
    Ok(out)
}
