//! Import a recipe from a link or from photos and print it as JSON.
//!
//! ```text
//! recipe-import --url https://www.xiachufang.com/recipe/100/
//! recipe-import --image page1.jpg --image page2.jpg
//! ```

use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use clap::Parser;
use dotenvy::dotenv;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use recipe_extraction::ai::OpenAI;
use recipe_extraction::fetch::HttpFetcher;
use recipe_extraction::stores::{LocalBlobStore, MemoryVocabulary, PostgresVocabulary};
use recipe_extraction::{PipelineConfig, RecipeInput, RecipePipeline, VocabularyStore};

#[derive(Parser)]
#[command(name = "recipe-import")]
#[command(about = "Extract a structured recipe from a link or photos")]
struct Cli {
    /// Recipe page URL
    #[arg(long, conflicts_with = "images")]
    url: Option<String>,

    /// Recipe photo(s)
    #[arg(long = "image", value_name = "FILE", num_args = 1..)]
    images: Vec<PathBuf>,
}

/// Binary configuration loaded from environment variables
#[derive(Debug, Clone)]
struct Config {
    openai_api_key: String,
    openai_model: String,
    database_url: Option<String>,
    media_path: PathBuf,
}

impl Config {
    fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            openai_api_key: env::var("OPENAI_API_KEY").context("OPENAI_API_KEY must be set")?,
            openai_model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o".to_string()),
            database_url: env::var("DATABASE_URL").ok(),
            media_path: env::var("MEDIA_PATH")
                .unwrap_or_else(|_| "./media".to_string())
                .into(),
        })
    }
}

fn media_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "image/jpeg",
    }
}

async fn read_image(path: &Path) -> Result<String> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(format!(
        "data:{};base64,{}",
        media_type_for(path),
        STANDARD.encode(bytes)
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,recipe_extraction=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to load configuration")?;
    let pipeline_config = PipelineConfig::from_env().context("Invalid RECIPE_* settings")?;

    let vocabulary: Arc<dyn VocabularyStore> = match &config.database_url {
        Some(url) => {
            tracing::info!("Connecting to database...");
            Arc::new(
                PostgresVocabulary::new(url)
                    .await
                    .context("Failed to connect to database")?,
            )
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory vocabulary");
            Arc::new(MemoryVocabulary::with_default_units())
        }
    };

    let pipeline = RecipePipeline::builder()
        .inference(Arc::new(
            OpenAI::new(&config.openai_api_key).with_model(&config.openai_model),
        ))
        .vocabulary(vocabulary)
        .fetcher(Arc::new(HttpFetcher::new(&pipeline_config)?))
        .blobs(Arc::new(LocalBlobStore::new(&config.media_path)))
        .config(pipeline_config)
        .build()?;

    let mut images = Vec::with_capacity(cli.images.len());
    for path in &cli.images {
        images.push(read_image(path).await?);
    }
    let images = (!images.is_empty()).then_some(images);

    let result = match RecipeInput::from_parts(cli.url, images) {
        Ok(input) => pipeline.parse(input).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(recipe) => {
            println!("{}", serde_json::to_string_pretty(&recipe)?);
            Ok(())
        }
        Err(e) => {
            tracing::error!(error = %e, "Recipe import failed");
            eprintln!("{}", e.user_message());
            std::process::exit(1);
        }
    }
}
