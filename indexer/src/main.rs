use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pantry_core::ingest::{
    ingest_recipe, parse_scraped_json, parse_scraped_jsonl, seed_ingredients, IngestOutcome, ScrapedRecipe,
};
use pantry_core::{
    index_ingredients, reindex_all_directions, score_all_pending_recipes, score_all_pending_stems, Config, SledStore,
    TextProcessor,
};
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Load recipes and run the directions index and TF-IDF passes", long_about = None)]
struct Cli {
    /// TOML config file
    #[arg(long, global = true, env = "PANTRY_CONFIG")]
    config: Option<PathBuf>,
    /// Database directory, overrides `store_path` from the config
    #[arg(long, global = true, env = "PANTRY_DB")]
    db: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the canonical ingredient list ("display name,search name" per line)
    Seed {
        #[arg(long)]
        file: PathBuf,
    },
    /// Ingest scraped recipes from a JSON/JSONL file or a directory of them
    Ingest {
        #[arg(long)]
        input: PathBuf,
    },
    /// Rebuild the ingredient word index used to resolve ingredient lines
    IndexIngredients,
    /// Index directions of every usable recipe that has no index rows yet
    Index,
    /// Cache idf for every indexed stem that has none
    ScoreStems,
    /// Score every recipe whose score is still null
    ScoreRecipes,
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref()).context("loading config")?;
    let db_path = cli.db.unwrap_or(config.store_path);
    let store = SledStore::open(&db_path).with_context(|| format!("opening store at {}", db_path.display()))?;
    let processor = TextProcessor::new();

    match cli.command {
        Commands::Seed { file } => {
            let reader = BufReader::new(File::open(&file).with_context(|| format!("opening {}", file.display()))?);
            let created = seed_ingredients(&store, reader)?;
            tracing::info!(created, file = %file.display(), "seed complete");
        }
        Commands::Ingest { input } => ingest(&store, &processor, &input)?,
        Commands::IndexIngredients => {
            index_ingredients(&store)?;
        }
        Commands::Index => {
            reindex_all_directions(&store, &processor)?;
        }
        Commands::ScoreStems => {
            score_all_pending_stems(&store)?;
        }
        Commands::ScoreRecipes => {
            score_all_pending_recipes(&store)?;
        }
    }
    store.flush()?;
    Ok(())
}

#[derive(Debug, Default)]
struct IngestTally {
    inserted: usize,
    duplicate: usize,
    no_directions: usize,
    unresolved_ingredients: usize,
}

impl IngestTally {
    fn record(&mut self, outcome: IngestOutcome) {
        match outcome {
            IngestOutcome::Inserted { unresolved, .. } => {
                self.inserted += 1;
                self.unresolved_ingredients += unresolved;
            }
            IngestOutcome::Duplicate => self.duplicate += 1,
            IngestOutcome::NoDirections => self.no_directions += 1,
        }
    }
}

fn input_files(input: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    if input.is_dir() {
        for entry in WalkDir::new(input).into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() {
                if let Some(ext) = p.extension().and_then(|s| s.to_str()) {
                    if matches!(ext, "json" | "jsonl") {
                        files.push(p.to_path_buf());
                    }
                }
            }
        }
        files.sort();
    } else if input.is_file() {
        files.push(input.to_path_buf());
    }
    files
}

fn ingest(store: &SledStore, processor: &TextProcessor, input: &Path) -> Result<()> {
    let files = input_files(input);
    if files.is_empty() {
        tracing::warn!(input = %input.display(), "no json or jsonl files found");
    }
    let mut tally = IngestTally::default();
    for file in files {
        let records = read_records(&file).with_context(|| format!("reading {}", file.display()))?;
        tracing::debug!(file = %file.display(), records = records.len(), "read scraped recipes");
        for record in records {
            tally.record(ingest_recipe(store, processor, record)?);
        }
    }
    tracing::info!(
        inserted = tally.inserted,
        duplicate = tally.duplicate,
        no_directions = tally.no_directions,
        unresolved_ingredients = tally.unresolved_ingredients,
        "ingest complete"
    );
    Ok(())
}

fn read_records(file: &Path) -> Result<Vec<ScrapedRecipe>> {
    if file.extension().and_then(|s| s.to_str()) == Some("jsonl") {
        let reader = BufReader::new(File::open(file)?);
        return Ok(parse_scraped_jsonl(reader)?);
    }
    Ok(parse_scraped_json(&fs::read_to_string(file)?)?)
}
