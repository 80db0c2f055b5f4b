use pantry_core::scoring::{inverse_document_frequency, term_frequency};
use pantry_core::{
    index_directions, score_all_pending_recipes, IndexVariant, MemoryStore, NewRecipe, SledStore, Store,
    TextProcessor,
};
use std::collections::BTreeMap;
use std::sync::Barrier;
use std::thread;

const WRITERS: usize = 16;

fn race_on_one_stem(store: &dyn Store) {
    let barrier = Barrier::new(WRITERS);
    let results: Vec<(f64, Option<f64>)> = thread::scope(|scope| {
        let handles: Vec<_> = (0..WRITERS)
            .map(|i| {
                let barrier = &barrier;
                scope.spawn(move || {
                    let idf = i as f64 + 0.5;
                    barrier.wait();
                    (idf, store.insert_stem_score_if_absent("simmer", idf).unwrap())
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let winners: Vec<f64> = results.iter().filter(|(_, r)| r.is_none()).map(|(idf, _)| *idf).collect();
    assert_eq!(winners.len(), 1, "exactly one writer stores the score");
    let stored = store.stem_score("simmer").unwrap().unwrap();
    assert_eq!(stored, winners[0]);
    for (_, result) in results.iter().filter(|(_, r)| r.is_some()) {
        assert_eq!(*result, Some(stored));
    }
    assert_eq!(store.stem_score_count().unwrap(), 1);
}

#[test]
fn first_stem_score_writer_wins_in_memory() {
    race_on_one_stem(&MemoryStore::new());
}

#[test]
fn first_stem_score_writer_wins_in_sled() {
    race_on_one_stem(&SledStore::temporary().unwrap());
}

const DIRECTIONS: [&str; 5] = [
    "Simmer the tomatoes with garlic and basil.",
    "Roast the garlic, then mash it into butter.",
    "Whisk eggs with milk and simmer gently.",
    "Toss basil with pasta and olive oil.",
    "Bake the bread until golden and crisp.",
];

/// Recompute a recipe's score from the cached idf values and its filtered rows.
fn expected_score(store: &dyn Store, id: u64) -> f64 {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for row in store.index_rows(IndexVariant::Filtered, id).unwrap() {
        *counts.entry(row.stem).or_insert(0) += 1;
    }
    counts
        .iter()
        .map(|(stem, count)| term_frequency(*count) * store.stem_score(stem).unwrap().unwrap())
        .sum()
}

fn score_a_corpus(store: &dyn Store) {
    let p = TextProcessor::new();
    let mut ids = Vec::new();
    for n in 0..40 {
        let id = store
            .insert_recipe(NewRecipe {
                name: format!("recipe {n}"),
                source_url: format!("http://example.com/{n}"),
                directions: Some(DIRECTIONS[n % DIRECTIONS.len()].to_string()),
                ..NewRecipe::default()
            })
            .unwrap();
        index_directions(store, &p, &store.recipe(id).unwrap().unwrap()).unwrap();
        ids.push(id);
    }

    let report = score_all_pending_recipes(store).unwrap();
    assert_eq!(report.scored_recipes, 40);
    assert_eq!(report.new_stems, store.stem_score_count().unwrap());

    let total = store.recipe_count().unwrap();
    for stem in store.distinct_stems(IndexVariant::Filtered).unwrap() {
        let df = store.document_frequency(IndexVariant::Filtered, &stem).unwrap();
        let idf = store.stem_score(&stem).unwrap().unwrap();
        assert!((idf - inverse_document_frequency(total, df)).abs() < 1e-12, "{stem}");
    }
    for id in ids {
        let score = store.recipe(id).unwrap().unwrap().score.unwrap();
        assert!((score - expected_score(store, id)).abs() < 1e-9);
    }
}

#[test]
fn scoring_a_corpus_is_consistent_in_memory() {
    score_a_corpus(&MemoryStore::new());
}

#[test]
fn scoring_a_corpus_is_consistent_in_sled() {
    score_a_corpus(&SledStore::temporary().unwrap());
}
