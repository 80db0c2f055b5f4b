use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use pantry_core::{index_directions, IngredientId, MemoryStore, NewRecipe, RankingConfig, RecipeId, Store, TextProcessor};
use serde_json::Value;
use server::{router, AppState};
use std::sync::Arc;
use tower::ServiceExt;

const TOKEN: &str = "s3cret";
const DIRECTIONS: &str = "Rinse the rice, then simmer it gently with the chicken until tender.";

struct Fixture {
    store: Arc<MemoryStore>,
    processor: Arc<TextProcessor>,
    chicken: IngredientId,
    rice: IngredientId,
}

impl Fixture {
    fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let chicken = store.insert_ingredient("Chicken", "chicken").unwrap();
        let rice = store.insert_ingredient("Long Grain Rice", "long grain rice").unwrap();
        Self { store, processor: Arc::new(TextProcessor::new()), chicken, rice }
    }

    fn recipe(&self, url: &str, ingredients: &[IngredientId], index: bool) -> RecipeId {
        let id = self
            .store
            .insert_recipe(NewRecipe {
                name: format!("Recipe at {url}"),
                source_url: url.to_string(),
                ingredients: ingredients.iter().copied().collect(),
                directions: Some(DIRECTIONS.to_string()),
                prep_time: Some(10),
                ..NewRecipe::default()
            })
            .unwrap();
        if index {
            let recipe = self.store.recipe(id).unwrap().unwrap();
            index_directions(self.store.as_ref(), &self.processor, &recipe).unwrap();
        }
        id
    }

    fn app(&self, admin_token: Option<&str>) -> Router {
        router(AppState {
            store: self.store.clone(),
            processor: self.processor.clone(),
            ranking: Arc::new(RankingConfig::default()),
            admin_token: admin_token.map(str::to_string),
        })
    }
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let resp = app.oneshot(request).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn admin_post(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::post(uri);
    if let Some(token) = token {
        builder = builder.header("X-ADMIN-TOKEN", token);
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn health_is_ok() {
    let fixture = Fixture::new();
    let resp = fixture.app(None).oneshot(get("/health")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"ok");
}

#[tokio::test]
async fn search_returns_tagged_results_page() {
    let fixture = Fixture::new();
    let both = fixture.recipe("http://example.com/chicken-rice", &[fixture.chicken, fixture.rice], true);
    fixture.recipe("http://example.com/plain-rice", &[fixture.rice], true);

    let (status, json) = send(fixture.app(None), get("/search?q=chicken,rice&pg=abc")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["outcome"], "results");
    assert_eq!(json["query"], "chicken, rice");
    assert_eq!(json["current_page"], 1);
    assert_eq!(json["total_count"], 2);
    assert_eq!(json["relaxed"], true);
    let results = json["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["id"].as_u64().unwrap(), both);
    assert_eq!(results[0]["full_match"], true);
    assert_eq!(results[0]["prep_time"], 10);
    assert_eq!(results[0]["ingredients"], serde_json::json!(["Chicken", "Long Grain Rice"]));
}

#[tokio::test]
async fn empty_or_missing_query_is_no_results() {
    let fixture = Fixture::new();
    fixture.recipe("http://example.com/plain-rice", &[fixture.rice], true);

    for uri in ["/search", "/search?q=", "/search?q=unicorn&pg=2"] {
        let (status, json) = send(fixture.app(None), get(uri)).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
        assert_eq!(json["outcome"], "no_results", "{uri}");
    }
}

#[tokio::test]
async fn recipe_lookup_and_not_found() {
    let fixture = Fixture::new();
    let id = fixture.recipe("http://example.com/chicken", &[fixture.chicken], false);

    let (status, json) = send(fixture.app(None), get(&format!("/recipe/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["source_url"], "http://example.com/chicken");
    assert_eq!(json["ingredients"], serde_json::json!(["Chicken"]));
    assert_eq!(json["score"], Value::Null);

    let (status, _) = send(fixture.app(None), get("/recipe/9999")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn admin_routes_require_matching_token() {
    let fixture = Fixture::new();
    let (status, _) = send(fixture.app(None), admin_post("/admin/reindex", Some(TOKEN))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(fixture.app(Some(TOKEN)), admin_post("/admin/reindex", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(fixture.app(Some(TOKEN)), admin_post("/admin/score/recipes", Some("wrong"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_passes_index_then_score() {
    let fixture = Fixture::new();
    let a = fixture.recipe("http://example.com/a", &[fixture.chicken], false);
    fixture.recipe("http://example.com/b", &[fixture.rice], false);

    let (status, json) = send(fixture.app(Some(TOKEN)), admin_post("/admin/reindex", Some(TOKEN))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["indexed"], 2);
    assert_eq!(json["already_indexed"], 0);

    let (status, json) = send(fixture.app(Some(TOKEN)), admin_post("/admin/score/stems", Some(TOKEN))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["purged_recipes"], 0);
    assert!(json["scored_stems"].as_u64().unwrap() > 0);

    let (status, json) = send(fixture.app(Some(TOKEN)), admin_post("/admin/score/recipes", Some(TOKEN))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["scored_recipes"], 2);
    assert_eq!(json["new_stems"], 0);

    // Identical directions everywhere: every stem has idf 0.
    assert_eq!(fixture.store.recipe(a).unwrap().unwrap().score, Some(0.0));
}
