//! Ingestion boundary: turns records produced by the scraping side into stored,
//! indexed recipes, and loads the canonical ingredient seed list.

use crate::duration::parse_duration;
use crate::error::{Error, Result};
use crate::index::index_directions;
use crate::model::{directions_usable, IngredientId, NewRecipe, RecipeId};
use crate::resolver::resolve_ingredient;
use crate::stemmer::TextProcessor;
use crate::store::Store;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::io::BufRead;

/// A recipe page as extracted by a scraper. Times are free text; ingredients are
/// the raw lines from the page, quantities and prep notes included.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrapedRecipe {
    pub name: String,
    pub source_url: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub prep_time: Option<String>,
    #[serde(default)]
    pub cook_time: Option<String>,
    #[serde(default)]
    pub total_time: Option<String>,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub directions: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum IngestOutcome {
    Inserted { id: RecipeId, resolved: usize, unresolved: usize },
    Duplicate,
    NoDirections,
}

fn parse_time(text: Option<&str>) -> Option<u32> {
    text.and_then(parse_duration)
}

pub fn ingest_recipe(store: &dyn Store, processor: &TextProcessor, scraped: ScrapedRecipe) -> Result<IngestOutcome> {
    if store.recipe_by_source_url(&scraped.source_url)?.is_some() {
        return Ok(IngestOutcome::Duplicate);
    }
    if !directions_usable(scraped.directions.as_deref()) {
        tracing::warn!(url = %scraped.source_url, "skipping recipe without usable directions");
        return Ok(IngestOutcome::NoDirections);
    }

    let mut ingredients: BTreeSet<IngredientId> = BTreeSet::new();
    let mut unresolved = 0;
    for phrase in &scraped.ingredients {
        match resolve_ingredient(store, processor, phrase)? {
            Some(id) => {
                ingredients.insert(id);
            }
            None => {
                tracing::debug!(phrase = %phrase, url = %scraped.source_url, "unresolved ingredient");
                unresolved += 1;
            }
        }
    }
    let resolved = ingredients.len();

    let new_recipe = NewRecipe {
        prep_time: parse_time(scraped.prep_time.as_deref()),
        cook_time: parse_time(scraped.cook_time.as_deref()),
        total_time: parse_time(scraped.total_time.as_deref()),
        name: scraped.name,
        source_url: scraped.source_url,
        image_url: scraped.image_url,
        description: scraped.description,
        ingredients,
        directions: scraped.directions,
    };
    let id = match store.insert_recipe(new_recipe) {
        Ok(id) => id,
        Err(Error::DuplicateSourceUrl(_)) => return Ok(IngestOutcome::Duplicate),
        Err(e) => return Err(e),
    };
    let recipe = store.recipe(id)?.ok_or(Error::RecipeNotFound(id))?;
    index_directions(store, processor, &recipe)?;
    Ok(IngestOutcome::Inserted { id, resolved, unresolved })
}

/// Scraped records from a JSON document holding either one object or an array of them.
pub fn parse_scraped_json(text: &str) -> Result<Vec<ScrapedRecipe>> {
    let json: serde_json::Value = serde_json::from_str(text)?;
    let records: Vec<ScrapedRecipe> = match json {
        serde_json::Value::Array(arr) => {
            arr.into_iter().map(serde_json::from_value).collect::<std::result::Result<Vec<_>, _>>()?
        }
        serde_json::Value::Object(_) => vec![serde_json::from_value(json)?],
        _ => Vec::new(),
    };
    Ok(records)
}

/// One scraped record per non-blank line.
pub fn parse_scraped_jsonl<R: BufRead>(reader: R) -> Result<Vec<ScrapedRecipe>> {
    let mut records = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        records.push(serde_json::from_str(&line)?);
    }
    Ok(records)
}

/// Parse one "display name,search name" line. Blank or single-field lines yield `None`.
pub fn parse_seed_line(line: &str) -> Option<(String, String)> {
    let mut fields = line.trim().split(',');
    let display = fields.next()?.trim();
    let search = fields.next()?.trim();
    if display.is_empty() || search.is_empty() {
        return None;
    }
    Some((display.to_string(), search.to_string()))
}

/// Load the seed list into an empty store; a store that already has ingredients
/// is left alone. Returns the number created.
pub fn seed_ingredients<R: BufRead>(store: &dyn Store, reader: R) -> Result<usize> {
    let existing = store.ingredient_count()?;
    if existing > 0 {
        tracing::info!(existing, "ingredients already seeded");
        return Ok(0);
    }
    let mut created = 0;
    for line in reader.lines() {
        if let Some((display, search)) = parse_seed_line(&line?) {
            store.insert_ingredient(&display, &search)?;
            created += 1;
        }
    }
    tracing::info!(created, "seeded ingredients");
    Ok(created)
}
