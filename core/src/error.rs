use crate::model::RecipeId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),

    #[error("codec error: {0}")]
    Codec(#[from] bincode::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("a recipe with source url {0} already exists")]
    DuplicateSourceUrl(String),

    #[error("recipe {0} not found")]
    RecipeNotFound(RecipeId),

    #[error("recipe {0} already has a score")]
    ScoreAlreadySet(RecipeId),

    #[error("recipe {0} has no usable directions")]
    MissingDirections(RecipeId),

    #[error("corrupt record in {tree}: {detail}")]
    Corrupt { tree: &'static str, detail: String },
}

pub type Result<T> = std::result::Result<T, Error>;
