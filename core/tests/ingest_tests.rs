use pantry_core::ingest::{ingest_recipe, seed_ingredients, IngestOutcome, ScrapedRecipe};
use pantry_core::{IndexVariant, MemoryStore, Store, TextProcessor};
use std::io::Cursor;

const SEED: &str = "Celery Root,celeri root\nCarrot,carrot\n\nKosher Salt,kosher salt\n";

fn seeded() -> MemoryStore {
    let store = MemoryStore::new();
    assert_eq!(seed_ingredients(&store, Cursor::new(SEED)).unwrap(), 3);
    store
}

fn scraped(url: &str, directions: Option<&str>) -> ScrapedRecipe {
    ScrapedRecipe {
        name: "Celery Root Slaw".into(),
        source_url: url.into(),
        prep_time: Some("PT15M".into()),
        cook_time: Some("1 hour 5 minutes".into()),
        ingredients: vec![
            "1/4 cup chopped celery root".into(),
            "2 carrots, grated".into(),
            "1 cup water".into(),
        ],
        directions: directions.map(str::to_string),
        ..ScrapedRecipe::default()
    }
}

#[test]
fn seeding_only_fills_an_empty_store() {
    let store = seeded();
    assert_eq!(seed_ingredients(&store, Cursor::new("Rice,rice\n")).unwrap(), 0);
    assert_eq!(store.ingredient_count().unwrap(), 3);
}

#[test]
fn inserts_resolves_and_indexes() {
    let store = seeded();
    let p = TextProcessor::new();
    let outcome = ingest_recipe(&store, &p, scraped("http://example.com/slaw", Some("Toss the vegetables."))).unwrap();
    let IngestOutcome::Inserted { id, resolved, unresolved } = outcome else {
        panic!("expected insert, got {outcome:?}");
    };
    assert_eq!((resolved, unresolved), (2, 1));

    let recipe = store.recipe(id).unwrap().unwrap();
    assert_eq!(recipe.prep_time, Some(15));
    assert_eq!(recipe.cook_time, Some(65));
    assert_eq!(recipe.total_time, None);
    assert_eq!(recipe.score, None);
    assert_eq!(recipe.ingredients.len(), 2);
    assert!(store.is_indexed(id).unwrap());
    assert_eq!(store.index_rows(IndexVariant::Filtered, id).unwrap().len(), 2);
}

#[test]
fn duplicate_url_is_reported_not_inserted() {
    let store = seeded();
    let p = TextProcessor::new();
    ingest_recipe(&store, &p, scraped("http://example.com/slaw", Some("Toss."))).unwrap();
    let again = ingest_recipe(&store, &p, scraped("http://example.com/slaw", Some("Toss again."))).unwrap();
    assert_eq!(again, IngestOutcome::Duplicate);
    assert_eq!(store.recipe_count().unwrap(), 1);
}

#[test]
fn recipes_without_directions_are_skipped() {
    let store = seeded();
    let p = TextProcessor::new();
    for directions in [None, Some(""), Some("No directions found.")] {
        let outcome = ingest_recipe(&store, &p, scraped("http://example.com/empty", directions)).unwrap();
        assert_eq!(outcome, IngestOutcome::NoDirections);
    }
    assert_eq!(store.recipe_count().unwrap(), 0);
}

#[test]
fn scraped_json_fills_missing_fields_with_defaults() {
    let record: ScrapedRecipe =
        serde_json::from_str(r#"{"name": "Toast", "source_url": "http://example.com/toast"}"#).unwrap();
    assert_eq!(record.name, "Toast");
    assert!(record.ingredients.is_empty());
    assert_eq!(record.directions, None);
}
