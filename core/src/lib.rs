pub mod config;
pub mod duration;
pub mod error;
pub mod index;
pub mod ingest;
pub mod memory;
pub mod model;
pub mod pagination;
pub mod persist;
pub mod resolver;
pub mod scoring;
pub mod search;
pub mod stemmer;
pub mod store;
pub mod tokenizer;

pub use config::{Config, RankingConfig};
pub use error::{Error, Result};
pub use index::{index_directions, index_ingredients, reindex_all_directions};
pub use memory::MemoryStore;
pub use model::{Ingredient, IngredientId, IndexRow, IndexVariant, NewRecipe, Recipe, RecipeId};
pub use persist::SledStore;
pub use scoring::{score_all_pending_recipes, score_all_pending_stems};
pub use search::{search, SearchOutcome, SearchPage};
pub use stemmer::TextProcessor;
pub use store::Store;
