use anyhow::Result;
use axum::{extract::{Path, Query, State}, http::{HeaderMap, StatusCode}, routing::{get, post}, Json, Router};
use pantry_core::index::ReindexReport;
use pantry_core::scoring::{ScoreReport, StemReport};
use pantry_core::search::RankedRecipe;
use pantry_core::store::recipe_ingredients;
use pantry_core::{
    reindex_all_directions, score_all_pending_recipes, score_all_pending_stems, search, Config, Ingredient,
    RankingConfig, Recipe, RecipeId, SearchOutcome, SledStore, Store, TextProcessor,
};
use serde::{Deserialize, Serialize};
use std::path::Path as FsPath;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: Option<String>,
    /// Kept as text so a bad value falls back to the first page instead of a 400.
    #[serde(default)]
    pub pg: Option<String>,
}

fn parse_page(pg: Option<&str>) -> i64 {
    pg.and_then(|s| s.trim().parse().ok()).unwrap_or(1)
}

#[derive(Serialize)]
pub struct SearchHit {
    pub id: RecipeId,
    pub name: String,
    pub source_url: String,
    pub image_url: Option<String>,
    pub description: Option<String>,
    pub prep_time: Option<u32>,
    pub cook_time: Option<u32>,
    pub total_time: Option<u32>,
    pub ingredients: Vec<String>,
    pub score: f64,
    pub full_match: bool,
}

impl From<RankedRecipe> for SearchHit {
    fn from(ranked: RankedRecipe) -> Self {
        let recipe = ranked.recipe;
        Self {
            id: recipe.id,
            name: recipe.name,
            source_url: recipe.source_url,
            image_url: recipe.image_url,
            description: recipe.description,
            prep_time: recipe.prep_time,
            cook_time: recipe.cook_time,
            total_time: recipe.total_time,
            ingredients: display_names(ranked.ingredients),
            score: ranked.score,
            full_match: ranked.full_match,
        }
    }
}

#[derive(Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SearchResponse {
    Results {
        query: String,
        results: Vec<SearchHit>,
        total_count: usize,
        current_page: usize,
        total_pages: usize,
        page_window: Vec<usize>,
        first_result: usize,
        last_result: usize,
        relaxed: bool,
        elapsed_seconds: f64,
    },
    NoResults {
        query: String,
    },
}

impl From<SearchOutcome> for SearchResponse {
    fn from(outcome: SearchOutcome) -> Self {
        match outcome {
            SearchOutcome::NoResults { query } => SearchResponse::NoResults { query },
            SearchOutcome::Results(page) => SearchResponse::Results {
                query: page.query,
                results: page.results.into_iter().map(SearchHit::from).collect(),
                total_count: page.total_count,
                current_page: page.current_page,
                total_pages: page.total_pages,
                page_window: page.page_window,
                first_result: page.first_result,
                last_result: page.last_result,
                relaxed: page.relaxed,
                elapsed_seconds: page.elapsed_seconds,
            },
        }
    }
}

#[derive(Serialize)]
pub struct RecipeDetail {
    pub id: RecipeId,
    pub name: String,
    pub source_url: String,
    pub image_url: Option<String>,
    pub description: Option<String>,
    pub prep_time: Option<u32>,
    pub cook_time: Option<u32>,
    pub total_time: Option<u32>,
    pub ingredients: Vec<String>,
    pub directions: Option<String>,
    pub score: Option<f64>,
}

impl RecipeDetail {
    fn new(recipe: Recipe, ingredients: Vec<Ingredient>) -> Self {
        Self {
            id: recipe.id,
            name: recipe.name,
            source_url: recipe.source_url,
            image_url: recipe.image_url,
            description: recipe.description,
            prep_time: recipe.prep_time,
            cook_time: recipe.cook_time,
            total_time: recipe.total_time,
            ingredients: display_names(ingredients),
            directions: recipe.directions,
            score: recipe.score,
        }
    }
}

fn display_names(ingredients: Vec<Ingredient>) -> Vec<String> {
    ingredients.into_iter().map(|i| i.display_name).collect()
}

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub processor: Arc<TextProcessor>,
    pub ranking: Arc<RankingConfig>,
    pub admin_token: Option<String>,
}

/// Open the sled store and build the router; `ADMIN_TOKEN` enables the admin routes.
pub fn build_app(db_path: &FsPath, config: Config) -> Result<Router> {
    let store = SledStore::open(db_path)?;
    tracing::info!(
        path = %db_path.display(),
        recipes = store.recipe_count()?,
        ingredients = store.ingredient_count()?,
        "opened store"
    );
    let admin_token = std::env::var("ADMIN_TOKEN").ok();
    if admin_token.is_none() {
        tracing::warn!("ADMIN_TOKEN not set, admin endpoints will refuse every request");
    }
    let state = AppState {
        store: Arc::new(store),
        processor: Arc::new(TextProcessor::new()),
        ranking: Arc::new(config.ranking),
        admin_token,
    };
    Ok(router(state))
}

fn cors_layer() -> CorsLayer {
    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let any = || CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);
    match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val.split(',').filter_map(|s| s.trim().parse().ok()).collect();
            if origins.is_empty() {
                any()
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => any(),
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/recipe/:id", get(recipe_handler))
        .route("/admin/reindex", post(admin_reindex))
        .route("/admin/score/stems", post(admin_score_stems))
        .route("/admin/score/recipes", post(admin_score_recipes))
        .with_state(state)
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
}

pub async fn search_handler(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Json<SearchResponse> {
    let query = params.q.unwrap_or_default();
    let page = parse_page(params.pg.as_deref());
    let q = query.clone();
    let joined =
        tokio::task::spawn_blocking(move || search(state.store.as_ref(), &state.processor, &state.ranking, &q, page))
            .await;
    let outcome = match joined {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(e)) => {
            tracing::error!(error = %e, query = %query, "search failed");
            SearchOutcome::NoResults { query }
        }
        Err(e) => {
            tracing::error!(error = %e, query = %query, "search task failed");
            SearchOutcome::NoResults { query }
        }
    };
    Json(SearchResponse::from(outcome))
}

fn internal(e: impl std::fmt::Display) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

pub async fn recipe_handler(
    State(state): State<AppState>,
    Path(id): Path<RecipeId>,
) -> Result<Json<RecipeDetail>, (StatusCode, String)> {
    let found = tokio::task::spawn_blocking(move || -> pantry_core::Result<Option<RecipeDetail>> {
        let Some(recipe) = state.store.recipe(id)? else { return Ok(None) };
        let ingredients = recipe_ingredients(state.store.as_ref(), &recipe)?;
        Ok(Some(RecipeDetail::new(recipe, ingredients)))
    })
    .await
    .map_err(internal)?
    .map_err(internal)?;
    found.map(Json).ok_or_else(|| (StatusCode::NOT_FOUND, format!("recipe {id} not found")))
}

// --- Admin endpoints ---

/// Run a batch pass on the blocking pool; a failed pass answers 500 with its error.
async fn run_pass<T, F>(state: AppState, pass: &'static str, job: F) -> Result<Json<T>, (StatusCode, String)>
where
    T: Send + 'static,
    F: FnOnce(&AppState) -> pantry_core::Result<T> + Send + 'static,
{
    match tokio::task::spawn_blocking(move || job(&state)).await {
        Ok(Ok(report)) => Ok(Json(report)),
        Ok(Err(e)) => {
            tracing::error!(error = %e, pass, "admin pass failed");
            Err(internal(e))
        }
        Err(e) => Err(internal(e)),
    }
}

async fn admin_reindex(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ReindexReport>, (StatusCode, String)> {
    authorize(&state, &headers)?;
    run_pass(state, "reindex", |s| reindex_all_directions(s.store.as_ref(), &s.processor)).await
}

async fn admin_score_stems(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<StemReport>, (StatusCode, String)> {
    authorize(&state, &headers)?;
    run_pass(state, "score_stems", |s| score_all_pending_stems(s.store.as_ref())).await
}

async fn admin_score_recipes(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ScoreReport>, (StatusCode, String)> {
    authorize(&state, &headers)?;
    run_pass(state, "score_recipes", |s| score_all_pending_recipes(s.store.as_ref())).await
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), (StatusCode, String)> {
    let required = match &state.admin_token {
        Some(t) => t,
        None => return Err((StatusCode::UNAUTHORIZED, "ADMIN_TOKEN not set".into())),
    };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err((StatusCode::UNAUTHORIZED, "invalid admin token".into()))
    }
}
