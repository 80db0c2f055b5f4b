use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub type IngredientId = u64;
pub type RecipeId = u64;

/// Placeholder some sources emit when a page carries no instructions.
pub const NO_DIRECTIONS_PLACEHOLDER: &str = "No directions found.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    pub id: IngredientId,
    pub display_name: String,
    /// Space separated, already-stemmed name used for matching, e.g. "celeri root".
    pub search_name: String,
}

impl Ingredient {
    pub fn search_words(&self) -> impl Iterator<Item = &str> {
        self.search_name.split_whitespace()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: RecipeId,
    pub name: String,
    pub source_url: String,
    pub image_url: Option<String>,
    pub description: Option<String>,
    /// Minutes.
    pub prep_time: Option<u32>,
    pub cook_time: Option<u32>,
    pub total_time: Option<u32>,
    pub ingredients: BTreeSet<IngredientId>,
    pub directions: Option<String>,
    /// Written once by the TF-IDF pass; `None` until then.
    pub score: Option<f64>,
}

impl Recipe {
    pub fn has_usable_directions(&self) -> bool {
        directions_usable(self.directions.as_deref())
    }

    pub fn directions_text(&self) -> &str {
        self.directions.as_deref().unwrap_or("")
    }
}

/// A recipe as handed over by ingestion, before the store assigns an id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewRecipe {
    pub name: String,
    pub source_url: String,
    pub image_url: Option<String>,
    pub description: Option<String>,
    pub prep_time: Option<u32>,
    pub cook_time: Option<u32>,
    pub total_time: Option<u32>,
    pub ingredients: BTreeSet<IngredientId>,
    pub directions: Option<String>,
}

impl NewRecipe {
    pub fn into_recipe(self, id: RecipeId) -> Recipe {
        Recipe {
            id,
            name: self.name,
            source_url: self.source_url,
            image_url: self.image_url,
            description: self.description,
            prep_time: self.prep_time,
            cook_time: self.cook_time,
            total_time: self.total_time,
            ingredients: self.ingredients,
            directions: self.directions,
            score: None,
        }
    }
}

/// Null, blank, and the "No directions found." placeholder (any case) are all unusable.
pub fn directions_usable(directions: Option<&str>) -> bool {
    match directions {
        None => false,
        Some(text) => {
            let trimmed = text.trim();
            !trimmed.is_empty() && !trimmed.eq_ignore_ascii_case(NO_DIRECTIONS_PLACEHOLDER)
        }
    }
}

/// Which of the two positional streams a row belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndexVariant {
    /// Stopwords removed; feeds TF-IDF.
    Filtered,
    /// Every token.
    Fulltext,
}

impl IndexVariant {
    pub const ALL: [IndexVariant; 2] = [IndexVariant::Filtered, IndexVariant::Fulltext];
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexRow {
    pub recipe_id: RecipeId,
    pub stem: String,
    pub position: u32,
}
