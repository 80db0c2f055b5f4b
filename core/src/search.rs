//! Query-time ranking.
//!
//! A query is a comma separated list of ingredients. Each group is stemmed and
//! matched by substring against ingredient search names; recipes containing a
//! match for every group form the strict set. When that set is small the match
//! is relaxed to any group, and strict matches get a flat bonus so they stay on
//! top. The composite score starts from the recipe's TF-IDF score.

use crate::config::{BrothConfig, RankingConfig};
use crate::error::Result;
use crate::model::{Ingredient, IngredientId, Recipe, RecipeId};
use crate::pagination::paginate;
use crate::stemmer::TextProcessor;
use crate::store::{recipe_ingredients, Store};
use serde::Serialize;
use std::collections::BTreeSet;
use std::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPlan {
    /// Stemmed, lowercased ingredient groups in query order.
    pub ingredients: Vec<String>,
    pub exclude_broths: bool,
}

pub fn plan_query(processor: &TextProcessor, broth: &BrothConfig, query: &str) -> QueryPlan {
    let ingredients: Vec<String> = query
        .split(',')
        .map(|group| processor.stem_phrase(group.trim()))
        .filter(|group| !group.is_empty())
        .collect();
    let joined = ingredients.join(",");
    let names_meat = broth.meats.iter().any(|m| joined.contains(m.as_str()));
    let names_broth = broth.keywords.iter().any(|k| joined.contains(k.as_str()));
    QueryPlan { ingredients, exclude_broths: names_meat && !names_broth }
}

#[derive(Debug, Clone, Serialize)]
pub struct RankedRecipe {
    pub recipe: Recipe,
    pub ingredients: Vec<Ingredient>,
    pub score: f64,
    pub full_match: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchPage {
    /// The raw query with a space after each comma, for display.
    pub query: String,
    pub results: Vec<RankedRecipe>,
    pub total_count: usize,
    pub current_page: usize,
    pub total_pages: usize,
    pub page_window: Vec<usize>,
    /// 1-based positions of the first and last result on this page.
    pub first_result: usize,
    pub last_result: usize,
    pub relaxed: bool,
    pub elapsed_seconds: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SearchOutcome {
    Results(SearchPage),
    NoResults { query: String },
}

impl SearchOutcome {
    pub fn is_empty(&self) -> bool {
        matches!(self, SearchOutcome::NoResults { .. })
    }
}

struct Candidates {
    recipes: BTreeSet<RecipeId>,
    strict: BTreeSet<RecipeId>,
    relaxed: bool,
}

fn intersect_all(sets: &[BTreeSet<RecipeId>]) -> BTreeSet<RecipeId> {
    let Some((first, rest)) = sets.split_first() else { return BTreeSet::new() };
    rest.iter()
        .fold(first.clone(), |acc, set| acc.intersection(set).copied().collect())
}

fn union_all(sets: &[BTreeSet<RecipeId>]) -> BTreeSet<RecipeId> {
    sets.iter().flatten().copied().collect()
}

fn is_broth(broth: &BrothConfig, search_name: &str) -> bool {
    broth.keywords.iter().any(|k| search_name.contains(k.as_str()))
}

fn word_count<'a>(texts: impl IntoIterator<Item = &'a str>) -> usize {
    texts.into_iter().map(|t| t.split_whitespace().count()).sum()
}

/// Composite score for one candidate.
fn composite_score(
    config: &RankingConfig,
    recipe: &Recipe,
    ingredients: &[Ingredient],
    matched_names: &BTreeSet<String>,
    query_groups: usize,
    full_match_bonus: bool,
) -> f64 {
    let mut score = recipe.score.unwrap_or(0.0);

    let n_recipe = ingredients.len();
    if n_recipe > 0 && query_groups > 0 {
        let matches = ingredients.iter().filter(|i| matched_names.contains(&i.search_name)).count();
        let (q, r) = (query_groups as f64, n_recipe as f64);
        score += config.overlap_weight * matches as f64 * ((q + r) / (q * r));
    }
    if full_match_bonus {
        score += config.full_match_bonus;
    }

    score *= config.source_weight(&recipe.source_url);

    let ingredient_words = word_count(ingredients.iter().map(|i| i.search_name.as_str()));
    let direction_words = word_count([recipe.directions_text()]);
    if (direction_words as f64) < ingredient_words as f64 * config.quality_ratio {
        score *= config.quality_penalty;
    }
    score
}

fn gather_candidates(
    store: &dyn Store,
    config: &RankingConfig,
    plan: &QueryPlan,
    groups: &[Vec<IngredientId>],
) -> Result<Candidates> {
    let excluded: BTreeSet<RecipeId> = if plan.exclude_broths {
        let broth_ids: Vec<IngredientId> = store
            .ingredients()?
            .into_iter()
            .filter(|i| is_broth(&config.broth, &i.search_name))
            .map(|i| i.id)
            .collect();
        store.recipes_with_any_ingredient(&broth_ids)?
    } else {
        BTreeSet::new()
    };

    let mut per_group = Vec::with_capacity(groups.len());
    for ids in groups {
        let recipes = store.recipes_with_any_ingredient(ids)?;
        per_group.push(recipes.difference(&excluded).copied().collect::<BTreeSet<_>>());
    }

    let strict = intersect_all(&per_group);
    if strict.len() >= config.relax_below {
        return Ok(Candidates { recipes: strict.clone(), strict, relaxed: false });
    }
    Ok(Candidates { recipes: union_all(&per_group), strict, relaxed: true })
}

pub fn search(
    store: &dyn Store,
    processor: &TextProcessor,
    config: &RankingConfig,
    query: &str,
    page: i64,
) -> Result<SearchOutcome> {
    let started = Instant::now();
    let no_results = || SearchOutcome::NoResults { query: query.to_string() };

    let plan = plan_query(processor, &config.broth, query);
    if plan.ingredients.is_empty() {
        return Ok(no_results());
    }
    tracing::debug!(groups = ?plan.ingredients, exclude_broths = plan.exclude_broths, "planned query");

    let mut groups: Vec<Vec<IngredientId>> = Vec::with_capacity(plan.ingredients.len());
    let mut matched_names: BTreeSet<String> = BTreeSet::new();
    for group in &plan.ingredients {
        let found = store.ingredients_containing(group)?;
        groups.push(found.iter().map(|i| i.id).collect());
        for ingredient in found {
            if !(plan.exclude_broths && is_broth(&config.broth, &ingredient.search_name)) {
                matched_names.insert(ingredient.search_name);
            }
        }
    }
    if matched_names.is_empty() {
        return Ok(no_results());
    }

    let candidates = gather_candidates(store, config, &plan, &groups)?;
    if candidates.recipes.is_empty() {
        return Ok(no_results());
    }

    let mut ranked = Vec::with_capacity(candidates.recipes.len());
    for id in &candidates.recipes {
        let Some(recipe) = store.recipe(*id)? else { continue };
        let ingredients = recipe_ingredients(store, &recipe)?;
        let full_match = candidates.strict.contains(id);
        let score = composite_score(
            config,
            &recipe,
            &ingredients,
            &matched_names,
            plan.ingredients.len(),
            candidates.relaxed && full_match,
        );
        ranked.push(RankedRecipe { recipe, ingredients, score, full_match });
    }
    // Full matches first whatever their base score, then by score. Stable: ties
    // keep ascending id order.
    ranked.sort_by(|a, b| {
        b.full_match
            .cmp(&a.full_match)
            .then(b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal))
    });

    let total_count = ranked.len();
    let pages = paginate(total_count, page, config.page_size, config.page_window);
    let results: Vec<RankedRecipe> = ranked.into_iter().skip(pages.offset).take(config.page_size).collect();
    let elapsed_seconds = started.elapsed().as_secs_f64();
    tracing::debug!(total_count, relaxed = candidates.relaxed, elapsed_seconds, "search complete");

    Ok(SearchOutcome::Results(SearchPage {
        query: query.replace(',', ", "),
        first_result: pages.offset + 1,
        last_result: pages.offset + results.len(),
        results,
        total_count,
        current_page: pages.current_page,
        total_pages: pages.total_pages,
        page_window: pages.window,
        relaxed: candidates.relaxed,
        elapsed_seconds,
    }))
}
