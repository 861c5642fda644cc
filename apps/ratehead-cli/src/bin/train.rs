//! Train the rating head and export its weights.
//!
//! ```bash
//! export GEMINI_API_KEY=...
//! ratehead-train --csv books.csv --output src/lib/rating-head.json
//! APP_USE_FAKE_EMBEDDINGS=1 ratehead-train --csv books.csv --limit 0 --epochs 5
//! ```

use anyhow::{anyhow, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ratehead_core::config::{resolve_with_base, BackendKind, Config, Settings};
use ratehead_core::dataset::load_dataset;
use ratehead_core::error::Error;
use ratehead_embed::{get_default_service, EmbeddingFetcher};
use ratehead_train::{export_head, select_device, train_head};

#[derive(Clone, Copy, ValueEnum)]
enum BackendArg {
    Adam,
    Gd,
}

/// Train rating head and export weights to JSON.
#[derive(Parser)]
#[command(name = "ratehead-train", version, about)]
struct Cli {
    /// Path to CSV with description and rating columns
    #[arg(long)]
    csv: Option<String>,

    /// Output JSON path for head weights
    #[arg(long)]
    output: Option<String>,

    /// CSV column for description text
    #[arg(long)]
    description_col: Option<String>,

    /// CSV column for rating number
    #[arg(long)]
    rating_col: Option<String>,

    /// Max rows after cleaning. Use 0 for no limit (full CSV)
    #[arg(long)]
    limit: Option<usize>,

    /// Validation fraction (0..1)
    #[arg(long)]
    val_frac: Option<f64>,

    /// Training epochs
    #[arg(long)]
    epochs: Option<usize>,

    /// Optimizer backend
    #[arg(long, value_enum)]
    backend: Option<BackendArg>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn apply(self, s: &mut Settings) {
        if let Some(v) = self.csv { s.dataset.csv = Some(v); }
        if let Some(v) = self.output { s.export.output = v; }
        if let Some(v) = self.description_col { s.dataset.text_column = v; }
        if let Some(v) = self.rating_col { s.dataset.label_column = v; }
        if let Some(v) = self.limit { s.dataset.limit = v; }
        if let Some(v) = self.val_frac { s.training.val_frac = v; }
        if let Some(v) = self.epochs { s.training.epochs = v; }
        if let Some(v) = self.backend {
            s.training.backend = match v { BackendArg::Adam => BackendKind::Adam, BackendArg::Gd => BackendKind::Gd };
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?;
    let mut settings = config.settings()?;
    cli.apply(&mut settings);
    settings.validate()?;

    let cwd = std::env::current_dir()?;
    let csv: PathBuf = settings
        .dataset
        .csv
        .as_deref()
        .map(|p| resolve_with_base(&cwd, p))
        .ok_or_else(|| anyhow!("--csv is required (or set dataset.csv in config)"))?;
    let output = resolve_with_base(&cwd, &settings.export.output);

    // Fail on a missing credential before touching the CSV.
    let service = get_default_service(&settings.embedding)?;

    let dataset = load_dataset(
        &csv,
        &settings.dataset.text_column,
        &settings.dataset.label_column,
        settings.dataset.row_cap(),
    )?;
    if dataset.is_empty() {
        return Err(Error::EmptyDataset.into());
    }

    let xs = EmbeddingFetcher::new(service.as_ref(), &settings.embedding).fetch(&dataset.texts)?;

    let device = select_device();
    let outcome = train_head(&xs, &dataset.labels, &settings.training, &device)?;
    if let Some(last) = outcome.history.last() {
        info!("Final epoch {}: loss={:.4} val_mse={:?} val_mae={:?}", last.epoch, last.train_loss, last.val_mse, last.val_mae);
    }

    export_head(&outcome.head, &output)?;
    info!("Done.");
    Ok(())
}
