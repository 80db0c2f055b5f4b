//! sled-backed store. Records are bincode encoded under big-endian `u64` keys so
//! tree order is id order; secondary trees carry the url uniqueness index, the
//! ingredient links and the per-stem postings used for document frequency.

use crate::error::{Error, Result};
use crate::model::{Ingredient, IngredientId, IndexRow, IndexVariant, NewRecipe, Recipe, RecipeId};
use crate::store::Store;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::Path;

const INGREDIENTS: &str = "ingredients";
const RECIPES: &str = "recipes";
const RECIPE_URLS: &str = "recipe_urls";
const RECIPE_INGREDIENTS: &str = "recipe_ingredients";
const DIRECTIONS_INDEX: &str = "directions_index";
const DIRECTIONS_FULLTEXT_INDEX: &str = "directions_fulltext_index";
const DIRECTIONS_STEMS: &str = "directions_index_stems";
const DIRECTIONS_FULLTEXT_STEMS: &str = "directions_fulltext_index_stems";
const STEM_SCORES: &str = "stem_scores";
const INGREDIENT_WORDS: &str = "ingredient_words";

const STEM_SEPARATOR: u8 = 0;
const EMPTY: &[u8] = &[];

pub struct SledStore {
    db: sled::Db,
    ingredients: sled::Tree,
    recipes: sled::Tree,
    recipe_urls: sled::Tree,
    recipe_ingredients: sled::Tree,
    directions: sled::Tree,
    directions_fulltext: sled::Tree,
    directions_stems: sled::Tree,
    directions_fulltext_stems: sled::Tree,
    stem_scores: sled::Tree,
    ingredient_words: sled::Tree,
}

impl SledStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::from_db(sled::open(path)?)
    }

    /// A throwaway database removed when dropped.
    pub fn temporary() -> Result<Self> {
        Self::from_db(sled::Config::new().temporary(true).open()?)
    }

    fn from_db(db: sled::Db) -> Result<Self> {
        Ok(Self {
            ingredients: db.open_tree(INGREDIENTS)?,
            recipes: db.open_tree(RECIPES)?,
            recipe_urls: db.open_tree(RECIPE_URLS)?,
            recipe_ingredients: db.open_tree(RECIPE_INGREDIENTS)?,
            directions: db.open_tree(DIRECTIONS_INDEX)?,
            directions_fulltext: db.open_tree(DIRECTIONS_FULLTEXT_INDEX)?,
            directions_stems: db.open_tree(DIRECTIONS_STEMS)?,
            directions_fulltext_stems: db.open_tree(DIRECTIONS_FULLTEXT_STEMS)?,
            stem_scores: db.open_tree(STEM_SCORES)?,
            ingredient_words: db.open_tree(INGREDIENT_WORDS)?,
            db,
        })
    }

    pub fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }

    fn rows_tree(&self, variant: IndexVariant) -> &sled::Tree {
        match variant {
            IndexVariant::Filtered => &self.directions,
            IndexVariant::Fulltext => &self.directions_fulltext,
        }
    }

    fn stems_tree(&self, variant: IndexVariant) -> &sled::Tree {
        match variant {
            IndexVariant::Filtered => &self.directions_stems,
            IndexVariant::Fulltext => &self.directions_fulltext_stems,
        }
    }

    /// Undo a url claim, but only while it still points at `id`.
    fn release_url(&self, url: &str, id: RecipeId) -> Result<()> {
        let _ = self
            .recipe_urls
            .compare_and_swap(url.as_bytes(), Some(&id.to_be_bytes()[..]), None as Option<&[u8]>)?;
        Ok(())
    }

    fn write_recipe(&self, recipe: NewRecipe, id: RecipeId) -> Result<()> {
        for ingredient in &recipe.ingredients {
            self.recipe_ingredients.insert(pair_key(*ingredient, id), EMPTY)?;
        }
        let recipe = recipe.into_recipe(id);
        self.recipes.insert(id.to_be_bytes(), encode(&recipe)?)?;
        Ok(())
    }

    fn remove_index_rows(&self, recipe_id: RecipeId) -> Result<()> {
        for variant in IndexVariant::ALL {
            let rows = self.rows_tree(variant);
            let stems = self.stems_tree(variant);
            for entry in rows.scan_prefix(recipe_id.to_be_bytes()) {
                let (key, stem) = entry?;
                stems.remove(stem_key(&stem, recipe_id))?;
                rows.remove(key)?;
            }
        }
        Ok(())
    }
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(bincode::serialize(value)?)
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    Ok(bincode::deserialize(bytes)?)
}

fn read_u64(tree: &'static str, bytes: &[u8]) -> Result<u64> {
    bytes
        .get(..8)
        .and_then(|b| b.try_into().ok())
        .map(u64::from_be_bytes)
        .ok_or_else(|| Error::Corrupt { tree, detail: format!("expected 8 byte id, got {} bytes", bytes.len()) })
}

fn read_utf8(tree: &'static str, bytes: &[u8]) -> Result<String> {
    String::from_utf8(bytes.to_vec()).map_err(|e| Error::Corrupt { tree, detail: e.to_string() })
}

fn pair_key(a: u64, b: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(16);
    key.extend_from_slice(&a.to_be_bytes());
    key.extend_from_slice(&b.to_be_bytes());
    key
}

fn row_key(recipe_id: RecipeId, position: u32) -> Vec<u8> {
    let mut key = Vec::with_capacity(12);
    key.extend_from_slice(&recipe_id.to_be_bytes());
    key.extend_from_slice(&position.to_be_bytes());
    key
}

/// Postings keys are `word ++ 0x00 ++ id`, so a prefix scan on `word ++ 0x00`
/// finds exactly that word.
fn stem_prefix(stem: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(stem.len() + 1);
    key.extend_from_slice(stem);
    key.push(STEM_SEPARATOR);
    key
}

fn stem_key(stem: &[u8], id: u64) -> Vec<u8> {
    let mut key = stem_prefix(stem);
    key.extend_from_slice(&id.to_be_bytes());
    key
}

fn stems_tree_name(variant: IndexVariant) -> &'static str {
    match variant {
        IndexVariant::Filtered => DIRECTIONS_STEMS,
        IndexVariant::Fulltext => DIRECTIONS_FULLTEXT_STEMS,
    }
}

impl Store for SledStore {
    fn insert_ingredient(&self, display_name: &str, search_name: &str) -> Result<IngredientId> {
        let id = self.db.generate_id()?;
        let ingredient =
            Ingredient { id, display_name: display_name.to_string(), search_name: search_name.to_string() };
        self.ingredients.insert(id.to_be_bytes(), encode(&ingredient)?)?;
        self.index_ingredient_words(&ingredient)?;
        Ok(id)
    }

    fn ingredient(&self, id: IngredientId) -> Result<Option<Ingredient>> {
        self.ingredients.get(id.to_be_bytes())?.map(|b| decode(&b)).transpose()
    }

    fn ingredients(&self) -> Result<Vec<Ingredient>> {
        self.ingredients.iter().map(|entry| decode(&entry?.1)).collect()
    }

    fn ingredient_count(&self) -> Result<usize> {
        Ok(self.ingredients.len())
    }

    fn ingredients_containing(&self, fragment: &str) -> Result<Vec<Ingredient>> {
        let mut out = Vec::new();
        for entry in self.ingredients.iter() {
            let ingredient: Ingredient = decode(&entry?.1)?;
            if ingredient.search_name.contains(fragment) {
                out.push(ingredient);
            }
        }
        Ok(out)
    }

    fn ingredients_with_word(&self, word: &str) -> Result<Vec<Ingredient>> {
        let prefix = stem_prefix(word.as_bytes());
        let mut out = Vec::new();
        for key in self.ingredient_words.scan_prefix(&prefix).keys() {
            let key = key?;
            let id = read_u64(INGREDIENT_WORDS, &key[prefix.len()..])?;
            if let Some(ingredient) = self.ingredient(id)? {
                out.push(ingredient);
            }
        }
        Ok(out)
    }

    fn index_ingredient_words(&self, ingredient: &Ingredient) -> Result<()> {
        for word in ingredient.search_words() {
            self.ingredient_words.insert(stem_key(word.as_bytes(), ingredient.id), EMPTY)?;
        }
        Ok(())
    }

    fn clear_ingredient_words(&self) -> Result<()> {
        self.ingredient_words.clear()?;
        Ok(())
    }

    fn insert_recipe(&self, recipe: NewRecipe) -> Result<RecipeId> {
        let id = self.db.generate_id()?;
        let claimed = self
            .recipe_urls
            .compare_and_swap(recipe.source_url.as_bytes(), None as Option<&[u8]>, Some(&id.to_be_bytes()[..]))?;
        if claimed.is_err() {
            return Err(Error::DuplicateSourceUrl(recipe.source_url));
        }
        let url = recipe.source_url.clone();
        if let Err(e) = self.write_recipe(recipe, id) {
            self.release_url(&url, id)?;
            return Err(e);
        }
        Ok(id)
    }

    fn recipe(&self, id: RecipeId) -> Result<Option<Recipe>> {
        self.recipes.get(id.to_be_bytes())?.map(|b| decode(&b)).transpose()
    }

    fn recipe_by_source_url(&self, url: &str) -> Result<Option<RecipeId>> {
        self.recipe_urls.get(url.as_bytes())?.map(|b| read_u64(RECIPE_URLS, &b)).transpose()
    }

    fn recipe_ids(&self) -> Result<Vec<RecipeId>> {
        self.recipes.iter().keys().map(|k| read_u64(RECIPES, &k?)).collect()
    }

    fn recipe_count(&self) -> Result<usize> {
        Ok(self.recipes.len())
    }

    fn pending_recipe_ids(&self) -> Result<Vec<RecipeId>> {
        let mut out = Vec::new();
        for entry in self.recipes.iter() {
            let recipe: Recipe = decode(&entry?.1)?;
            if recipe.score.is_none() {
                out.push(recipe.id);
            }
        }
        Ok(out)
    }

    fn recipes_with_any_ingredient(&self, ingredients: &[IngredientId]) -> Result<BTreeSet<RecipeId>> {
        let mut out = BTreeSet::new();
        for ingredient in ingredients {
            for key in self.recipe_ingredients.scan_prefix(ingredient.to_be_bytes()).keys() {
                let key = key?;
                out.insert(read_u64(RECIPE_INGREDIENTS, &key[8..])?);
            }
        }
        Ok(out)
    }

    fn set_recipe_score(&self, id: RecipeId, score: f64) -> Result<()> {
        let key = id.to_be_bytes();
        loop {
            let current = self.recipes.get(key)?.ok_or(Error::RecipeNotFound(id))?;
            let mut recipe: Recipe = decode(&current)?;
            if recipe.score.is_some() {
                return Err(Error::ScoreAlreadySet(id));
            }
            recipe.score = Some(score);
            let swapped = self.recipes.compare_and_swap(key, Some(&current), Some(encode(&recipe)?))?;
            if swapped.is_ok() {
                return Ok(());
            }
        }
    }

    fn delete_recipes_where(&self, predicate: &dyn Fn(&Recipe) -> bool) -> Result<usize> {
        let mut doomed = Vec::new();
        for entry in self.recipes.iter() {
            let recipe: Recipe = decode(&entry?.1)?;
            if predicate(&recipe) {
                doomed.push(recipe);
            }
        }
        for recipe in &doomed {
            self.remove_index_rows(recipe.id)?;
            for ingredient in &recipe.ingredients {
                self.recipe_ingredients.remove(pair_key(*ingredient, recipe.id))?;
            }
            self.recipe_urls.remove(recipe.source_url.as_bytes())?;
            self.recipes.remove(recipe.id.to_be_bytes())?;
        }
        Ok(doomed.len())
    }

    fn append_index_rows(&self, variant: IndexVariant, rows: &[IndexRow]) -> Result<()> {
        let tree = self.rows_tree(variant);
        let stems = self.stems_tree(variant);
        for row in rows {
            tree.insert(row_key(row.recipe_id, row.position), row.stem.as_bytes())?;
            stems.insert(stem_key(row.stem.as_bytes(), row.recipe_id), EMPTY)?;
        }
        Ok(())
    }

    fn index_rows(&self, variant: IndexVariant, recipe_id: RecipeId) -> Result<Vec<IndexRow>> {
        let name = match variant {
            IndexVariant::Filtered => DIRECTIONS_INDEX,
            IndexVariant::Fulltext => DIRECTIONS_FULLTEXT_INDEX,
        };
        let mut rows = Vec::new();
        for entry in self.rows_tree(variant).scan_prefix(recipe_id.to_be_bytes()) {
            let (key, stem) = entry?;
            let position = key
                .get(8..12)
                .and_then(|b| b.try_into().ok())
                .map(u32::from_be_bytes)
                .ok_or_else(|| Error::Corrupt { tree: name, detail: "short row key".into() })?;
            rows.push(IndexRow { recipe_id, stem: read_utf8(name, &stem)?, position });
        }
        Ok(rows)
    }

    fn is_indexed(&self, recipe_id: RecipeId) -> Result<bool> {
        for variant in IndexVariant::ALL {
            if self.rows_tree(variant).scan_prefix(recipe_id.to_be_bytes()).next().is_some() {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn distinct_stems(&self, variant: IndexVariant) -> Result<BTreeSet<String>> {
        let mut out = BTreeSet::new();
        for key in self.stems_tree(variant).iter().keys() {
            let key = key?;
            let end = key.iter().position(|b| *b == STEM_SEPARATOR).unwrap_or(key.len());
            out.insert(read_utf8(stems_tree_name(variant), &key[..end])?);
        }
        Ok(out)
    }

    fn document_frequency(&self, variant: IndexVariant, stem: &str) -> Result<usize> {
        let mut count = 0;
        for key in self.stems_tree(variant).scan_prefix(stem_prefix(stem.as_bytes())).keys() {
            key?;
            count += 1;
        }
        Ok(count)
    }

    fn stem_score(&self, stem: &str) -> Result<Option<f64>> {
        self.stem_scores.get(stem.as_bytes())?.map(|b| read_f64(&b)).transpose()
    }

    fn insert_stem_score_if_absent(&self, stem: &str, idf: f64) -> Result<Option<f64>> {
        let swapped = self.stem_scores.compare_and_swap(
            stem.as_bytes(),
            None as Option<&[u8]>,
            Some(&idf.to_be_bytes()[..]),
        )?;
        match swapped {
            Ok(()) => Ok(None),
            Err(conflict) => conflict.current.map(|existing| read_f64(&existing)).transpose(),
        }
    }

    fn stem_score_count(&self) -> Result<usize> {
        Ok(self.stem_scores.len())
    }
}

fn read_f64(bytes: &[u8]) -> Result<f64> {
    bytes
        .try_into()
        .map(f64::from_be_bytes)
        .map_err(|_| Error::Corrupt { tree: STEM_SCORES, detail: format!("expected 8 byte float, got {}", bytes.len()) })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_recipe(url: &str) -> NewRecipe {
        NewRecipe { name: url.into(), source_url: url.into(), directions: Some("Mix.".into()), ..NewRecipe::default() }
    }

    #[test]
    fn released_url_can_be_claimed_again() {
        let store = SledStore::temporary().unwrap();
        let id = store.insert_recipe(new_recipe("http://a")).unwrap();
        store.recipes.remove(id.to_be_bytes()).unwrap();
        store.release_url("http://a", id).unwrap();
        assert_eq!(store.recipe_by_source_url("http://a").unwrap(), None);

        let again = store.insert_recipe(new_recipe("http://a")).unwrap();
        assert_ne!(again, id);
        assert_eq!(store.recipe_by_source_url("http://a").unwrap(), Some(again));
    }

    #[test]
    fn release_leaves_another_claim_alone() {
        let store = SledStore::temporary().unwrap();
        let id = store.insert_recipe(new_recipe("http://a")).unwrap();
        store.release_url("http://a", id + 1000).unwrap();
        assert_eq!(store.recipe_by_source_url("http://a").unwrap(), Some(id));
    }

    #[test]
    fn corrupt_stem_names_its_own_tree() {
        let store = SledStore::temporary().unwrap();
        store.directions_fulltext_stems.insert(stem_key(&[0xff, 0xfe], 1), EMPTY).unwrap();
        store.directions_stems.insert(stem_key(b"stir", 1), EMPTY).unwrap();

        let err = store.distinct_stems(IndexVariant::Fulltext).unwrap_err();
        assert!(matches!(err, Error::Corrupt { tree: DIRECTIONS_FULLTEXT_STEMS, .. }));
        assert_eq!(store.distinct_stems(IndexVariant::Filtered).unwrap(), BTreeSet::from(["stir".to_string()]));
    }
}
