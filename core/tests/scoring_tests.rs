use pantry_core::scoring::{inverse_document_frequency, term_frequency};
use pantry_core::{
    index_directions, reindex_all_directions, score_all_pending_recipes, score_all_pending_stems, MemoryStore,
    NewRecipe, RecipeId, SledStore, Store, TextProcessor,
};

fn add(store: &dyn Store, p: &TextProcessor, url: &str, directions: &str) -> RecipeId {
    let id = store
        .insert_recipe(NewRecipe {
            name: url.into(),
            source_url: url.into(),
            directions: Some(directions.into()),
            ..NewRecipe::default()
        })
        .unwrap();
    let recipe = store.recipe(id).unwrap().unwrap();
    index_directions(store, p, &recipe).unwrap();
    id
}

fn add_unindexed(store: &dyn Store, url: &str, directions: Option<&str>) -> RecipeId {
    store
        .insert_recipe(NewRecipe {
            name: url.into(),
            source_url: url.into(),
            directions: directions.map(str::to_string),
            ..NewRecipe::default()
        })
        .unwrap()
}

fn check_tfidf(store: &dyn Store) {
    let p = TextProcessor::new();
    let a = add(store, &p, "http://a", "Stir the soup. Stir again.");
    let b = add(store, &p, "http://b", "Stir the rice.");
    let c = add(store, &p, "http://c", "Stir and bake.");
    assert_eq!(store.recipe(a).unwrap().unwrap().score, None);

    let report = score_all_pending_recipes(store).unwrap();
    assert_eq!(report.scored_recipes, 3);
    assert_eq!(report.purged_recipes, 0);

    // "stir" appears in every recipe.
    assert_eq!(store.stem_score("stir").unwrap(), Some(0.0));

    let idf_single = inverse_document_frequency(3, 1);
    let score_a = store.recipe(a).unwrap().unwrap().score.unwrap();
    // stir: (1 + log10 2) * 0, soup: 1 * idf, again: 1 * idf
    assert!((score_a - 2.0 * idf_single).abs() < 1e-9);
    let score_b = store.recipe(b).unwrap().unwrap().score.unwrap();
    assert!((score_b - idf_single).abs() < 1e-9);
    let score_c = store.recipe(c).unwrap().unwrap().score.unwrap();
    assert!((score_c - idf_single).abs() < 1e-9);
    assert!(term_frequency(2) > 1.0);
}

#[test]
fn scores_from_cached_idf_in_memory() {
    check_tfidf(&MemoryStore::new());
}

#[test]
fn scores_from_cached_idf_in_sled() {
    check_tfidf(&SledStore::temporary().unwrap());
}

#[test]
fn scores_are_never_recomputed() {
    let store = MemoryStore::new();
    let p = TextProcessor::new();
    let a = add(&store, &p, "http://a", "Whisk eggs.");
    score_all_pending_recipes(&store).unwrap();
    let first = store.recipe(a).unwrap().unwrap().score;

    add(&store, &p, "http://b", "Whisk cream.");
    let report = score_all_pending_recipes(&store).unwrap();
    assert_eq!(report.scored_recipes, 1);
    assert_eq!(store.recipe(a).unwrap().unwrap().score, first);
    // "whisk" was cached while only one recipe existed and keeps that value.
    assert_eq!(store.stem_score("whisk").unwrap(), Some(0.0));
}

#[test]
fn unusable_recipes_are_purged_before_scoring() {
    let store = MemoryStore::new();
    let p = TextProcessor::new();
    add(&store, &p, "http://a", "Boil water.");
    add_unindexed(&store, "http://b", Some("No Directions Found."));
    add_unindexed(&store, "http://c", Some(""));
    add_unindexed(&store, "http://d", None);

    let report = score_all_pending_recipes(&store).unwrap();
    assert_eq!(report.purged_recipes, 3);
    assert_eq!(report.scored_recipes, 1);
    assert_eq!(store.recipe_count().unwrap(), 1);
    // Single recipe corpus: every stem has idf 0.
    assert_eq!(store.stem_score("boil").unwrap(), Some(0.0));
}

#[test]
fn unindexed_recipes_stay_pending_until_indexed() {
    let store = MemoryStore::new();
    let p = TextProcessor::new();
    add(&store, &p, "http://a", "Boil the pasta.");
    let late = add_unindexed(&store, "http://b", Some("Simmer the tomatoes gently."));

    let first = score_all_pending_recipes(&store).unwrap();
    assert_eq!((first.scored_recipes, first.skipped_unindexed), (1, 1));
    assert_eq!(store.recipe(late).unwrap().unwrap().score, None);

    reindex_all_directions(&store, &p).unwrap();
    let second = score_all_pending_recipes(&store).unwrap();
    assert_eq!((second.scored_recipes, second.skipped_unindexed), (1, 0));
    let score = store.recipe(late).unwrap().unwrap().score.unwrap();
    assert!(score > 0.0);
}

#[test]
fn indexed_recipe_of_only_stopwords_scores_zero() {
    let store = MemoryStore::new();
    let p = TextProcessor::new();
    let id = add(&store, &p, "http://a", "The.");
    score_all_pending_recipes(&store).unwrap();
    assert_eq!(store.recipe(id).unwrap().unwrap().score, Some(0.0));
}

#[test]
fn stem_pass_fills_only_missing_stems() {
    let store = MemoryStore::new();
    let p = TextProcessor::new();
    add(&store, &p, "http://a", "Chop onions.");
    add(&store, &p, "http://b", "Chop garlic.");
    store.insert_stem_score_if_absent("onion", 42.0).unwrap();

    let report = score_all_pending_stems(&store).unwrap();
    assert_eq!(report.scored_stems, 2);
    assert_eq!(store.stem_score("onion").unwrap(), Some(42.0));
    assert_eq!(store.stem_score("chop").unwrap(), Some(0.0));
    let garlic = store.stem_score("garlic").unwrap().unwrap();
    assert!((garlic - 2f64.log10()).abs() < 1e-9);

    assert_eq!(score_all_pending_stems(&store).unwrap().scored_stems, 0);
}
