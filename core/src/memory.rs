use crate::error::{Error, Result};
use crate::model::{Ingredient, IngredientId, IndexRow, IndexVariant, NewRecipe, Recipe, RecipeId};
use crate::store::Store;
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet, HashMap};

#[derive(Default)]
struct Inner {
    next_ingredient: IngredientId,
    next_recipe: RecipeId,
    ingredients: BTreeMap<IngredientId, Ingredient>,
    recipes: BTreeMap<RecipeId, Recipe>,
    urls: HashMap<String, RecipeId>,
    ingredient_words: BTreeMap<String, BTreeSet<IngredientId>>,
    filtered: BTreeMap<RecipeId, Vec<IndexRow>>,
    fulltext: BTreeMap<RecipeId, Vec<IndexRow>>,
    stem_scores: HashMap<String, f64>,
}

impl Inner {
    fn rows(&self, variant: IndexVariant) -> &BTreeMap<RecipeId, Vec<IndexRow>> {
        match variant {
            IndexVariant::Filtered => &self.filtered,
            IndexVariant::Fulltext => &self.fulltext,
        }
    }

    fn add_words(&mut self, ingredient: &Ingredient) {
        for word in ingredient.search_words() {
            self.ingredient_words.entry(word.to_string()).or_default().insert(ingredient.id);
        }
    }

    fn rows_mut(&mut self, variant: IndexVariant) -> &mut BTreeMap<RecipeId, Vec<IndexRow>> {
        match variant {
            IndexVariant::Filtered => &mut self.filtered,
            IndexVariant::Fulltext => &mut self.fulltext,
        }
    }
}

/// In-process store over ordered maps.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn insert_ingredient(&self, display_name: &str, search_name: &str) -> Result<IngredientId> {
        let mut inner = self.inner.write();
        inner.next_ingredient += 1;
        let id = inner.next_ingredient;
        let ingredient =
            Ingredient { id, display_name: display_name.to_string(), search_name: search_name.to_string() };
        inner.add_words(&ingredient);
        inner.ingredients.insert(id, ingredient);
        Ok(id)
    }

    fn ingredient(&self, id: IngredientId) -> Result<Option<Ingredient>> {
        Ok(self.inner.read().ingredients.get(&id).cloned())
    }

    fn ingredients(&self) -> Result<Vec<Ingredient>> {
        Ok(self.inner.read().ingredients.values().cloned().collect())
    }

    fn ingredient_count(&self) -> Result<usize> {
        Ok(self.inner.read().ingredients.len())
    }

    fn ingredients_containing(&self, fragment: &str) -> Result<Vec<Ingredient>> {
        Ok(self
            .inner
            .read()
            .ingredients
            .values()
            .filter(|i| i.search_name.contains(fragment))
            .cloned()
            .collect())
    }

    fn ingredients_with_word(&self, word: &str) -> Result<Vec<Ingredient>> {
        let inner = self.inner.read();
        let Some(ids) = inner.ingredient_words.get(word) else { return Ok(Vec::new()) };
        Ok(ids.iter().filter_map(|id| inner.ingredients.get(id).cloned()).collect())
    }

    fn index_ingredient_words(&self, ingredient: &Ingredient) -> Result<()> {
        self.inner.write().add_words(ingredient);
        Ok(())
    }

    fn clear_ingredient_words(&self) -> Result<()> {
        self.inner.write().ingredient_words.clear();
        Ok(())
    }

    fn insert_recipe(&self, recipe: NewRecipe) -> Result<RecipeId> {
        let mut inner = self.inner.write();
        if inner.urls.contains_key(&recipe.source_url) {
            return Err(Error::DuplicateSourceUrl(recipe.source_url));
        }
        inner.next_recipe += 1;
        let id = inner.next_recipe;
        inner.urls.insert(recipe.source_url.clone(), id);
        inner.recipes.insert(id, recipe.into_recipe(id));
        Ok(id)
    }

    fn recipe(&self, id: RecipeId) -> Result<Option<Recipe>> {
        Ok(self.inner.read().recipes.get(&id).cloned())
    }

    fn recipe_by_source_url(&self, url: &str) -> Result<Option<RecipeId>> {
        Ok(self.inner.read().urls.get(url).copied())
    }

    fn recipe_ids(&self) -> Result<Vec<RecipeId>> {
        Ok(self.inner.read().recipes.keys().copied().collect())
    }

    fn recipe_count(&self) -> Result<usize> {
        Ok(self.inner.read().recipes.len())
    }

    fn pending_recipe_ids(&self) -> Result<Vec<RecipeId>> {
        Ok(self
            .inner
            .read()
            .recipes
            .values()
            .filter(|r| r.score.is_none())
            .map(|r| r.id)
            .collect())
    }

    fn recipes_with_any_ingredient(&self, ingredients: &[IngredientId]) -> Result<BTreeSet<RecipeId>> {
        Ok(self
            .inner
            .read()
            .recipes
            .values()
            .filter(|r| ingredients.iter().any(|i| r.ingredients.contains(i)))
            .map(|r| r.id)
            .collect())
    }

    fn set_recipe_score(&self, id: RecipeId, score: f64) -> Result<()> {
        let mut inner = self.inner.write();
        let recipe = inner.recipes.get_mut(&id).ok_or(Error::RecipeNotFound(id))?;
        if recipe.score.is_some() {
            return Err(Error::ScoreAlreadySet(id));
        }
        recipe.score = Some(score);
        Ok(())
    }

    fn delete_recipes_where(&self, predicate: &dyn Fn(&Recipe) -> bool) -> Result<usize> {
        let mut inner = self.inner.write();
        let doomed: Vec<(RecipeId, String)> = inner
            .recipes
            .values()
            .filter(|r| predicate(r))
            .map(|r| (r.id, r.source_url.clone()))
            .collect();
        for (id, url) in &doomed {
            inner.recipes.remove(id);
            inner.urls.remove(url);
            inner.filtered.remove(id);
            inner.fulltext.remove(id);
        }
        Ok(doomed.len())
    }

    fn append_index_rows(&self, variant: IndexVariant, rows: &[IndexRow]) -> Result<()> {
        let mut inner = self.inner.write();
        let stream = inner.rows_mut(variant);
        for row in rows {
            stream.entry(row.recipe_id).or_default().push(row.clone());
        }
        Ok(())
    }

    fn index_rows(&self, variant: IndexVariant, recipe_id: RecipeId) -> Result<Vec<IndexRow>> {
        let inner = self.inner.read();
        let mut rows = inner.rows(variant).get(&recipe_id).cloned().unwrap_or_default();
        rows.sort_by_key(|r| r.position);
        Ok(rows)
    }

    fn is_indexed(&self, recipe_id: RecipeId) -> Result<bool> {
        let inner = self.inner.read();
        Ok(IndexVariant::ALL.iter().any(|v| inner.rows(*v).contains_key(&recipe_id)))
    }

    fn distinct_stems(&self, variant: IndexVariant) -> Result<BTreeSet<String>> {
        Ok(self
            .inner
            .read()
            .rows(variant)
            .values()
            .flatten()
            .map(|r| r.stem.clone())
            .collect())
    }

    fn document_frequency(&self, variant: IndexVariant, stem: &str) -> Result<usize> {
        Ok(self
            .inner
            .read()
            .rows(variant)
            .values()
            .filter(|rows| rows.iter().any(|r| r.stem == stem))
            .count())
    }

    fn stem_score(&self, stem: &str) -> Result<Option<f64>> {
        Ok(self.inner.read().stem_scores.get(stem).copied())
    }

    fn insert_stem_score_if_absent(&self, stem: &str, idf: f64) -> Result<Option<f64>> {
        let mut inner = self.inner.write();
        if let Some(existing) = inner.stem_scores.get(stem).copied() {
            return Ok(Some(existing));
        }
        inner.stem_scores.insert(stem.to_string(), idf);
        Ok(None)
    }

    fn stem_score_count(&self) -> Result<usize> {
        Ok(self.inner.read().stem_scores.len())
    }
}
