//! TOML configuration. Every field has a default, so an empty file (or no file)
//! yields the stock ranking.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,

    #[serde(default)]
    pub ranking: RankingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self { store_path: default_store_path(), ranking: RankingConfig::default() }
    }
}

impl Config {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let text = std::fs::read_to_string(path)?;
                let config = Self::from_toml(&text)?;
                tracing::debug!(path = %path.display(), "loaded config");
                Ok(config)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingConfig {
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Number of page links shown once there are at least this many pages.
    #[serde(default = "default_page_window")]
    pub page_window: usize,

    /// Strict (AND) matching is relaxed to OR when it finds fewer recipes than this.
    #[serde(default = "default_relax_below")]
    pub relax_below: usize,

    #[serde(default = "default_full_match_bonus")]
    pub full_match_bonus: f64,

    #[serde(default = "default_overlap_weight")]
    pub overlap_weight: f64,

    /// Penalize when directions have fewer words than `quality_ratio` times the
    /// ingredient names.
    #[serde(default = "default_quality_ratio")]
    pub quality_ratio: f64,

    #[serde(default = "default_quality_penalty")]
    pub quality_penalty: f64,

    /// First pattern found in the source url wins.
    #[serde(default = "default_source_weights")]
    pub source_weights: Vec<SourceWeight>,

    #[serde(default)]
    pub broth: BrothConfig,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            page_window: default_page_window(),
            relax_below: default_relax_below(),
            full_match_bonus: default_full_match_bonus(),
            overlap_weight: default_overlap_weight(),
            quality_ratio: default_quality_ratio(),
            quality_penalty: default_quality_penalty(),
            source_weights: default_source_weights(),
            broth: BrothConfig::default(),
        }
    }
}

impl RankingConfig {
    pub fn source_weight(&self, source_url: &str) -> f64 {
        self.source_weights
            .iter()
            .find(|w| source_url.contains(&w.pattern))
            .map_or(1.0, |w| w.weight)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceWeight {
    pub pattern: String,
    pub weight: f64,
}

/// A query naming a meat but no broth word should not surface broths and stocks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrothConfig {
    #[serde(default = "default_broth_meats")]
    pub meats: Vec<String>,

    #[serde(default = "default_broth_keywords")]
    pub keywords: Vec<String>,
}

impl Default for BrothConfig {
    fn default() -> Self {
        Self { meats: default_broth_meats(), keywords: default_broth_keywords() }
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from("./data/pantry.sled")
}

fn default_page_size() -> usize {
    10
}

fn default_page_window() -> usize {
    10
}

fn default_relax_below() -> usize {
    10
}

fn default_full_match_bonus() -> f64 {
    10.0
}

fn default_overlap_weight() -> f64 {
    0.5
}

fn default_quality_ratio() -> f64 {
    2.0
}

fn default_quality_penalty() -> f64 {
    0.1
}

fn default_source_weights() -> Vec<SourceWeight> {
    vec![
        SourceWeight { pattern: "bigoven".into(), weight: 0.9 },
        SourceWeight { pattern: "epicurious".into(), weight: 1.5 },
    ]
}

fn default_broth_meats() -> Vec<String> {
    ["chicken", "beef", "pork"].map(String::from).to_vec()
}

fn default_broth_keywords() -> Vec<String> {
    ["broth", "base", "soup", "bouillon", "stock"].map(String::from).to_vec()
}
