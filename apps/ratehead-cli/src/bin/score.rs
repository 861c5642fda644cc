//! Score one description against an exported head.
//!
//! Embeds the text with the same model, dimension and task type used for
//! training, normalises it, and prints `{"rating": x}`.

use anyhow::{bail, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use ratehead_core::config::{resolve_with_base, Config};
use ratehead_embed::{get_default_service, EmbeddingFetcher};
use ratehead_train::load_head;

/// Upper bound in UTF-16 code units, the unit the web scorer counts in.
const MAX_DESCRIPTION_LENGTH: usize = 10_000;

/// Predict a rating for a description.
#[derive(Parser)]
#[command(name = "ratehead-score", version, about)]
struct Cli {
    /// Description text to score
    description: String,

    /// Head weights JSON (defaults to export.output)
    #[arg(long)]
    head: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

/// Trim `raw` and enforce the non-empty and length limits.
fn validate_description(raw: &str) -> Result<&str> {
    let description = raw.trim();
    if description.is_empty() {
        bail!("Missing or empty description.");
    }
    if description.encode_utf16().count() > MAX_DESCRIPTION_LENGTH {
        bail!("Description must be at most {MAX_DESCRIPTION_LENGTH} characters.");
    }
    Ok(description)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if cli.verbose { "debug" } else { "warn" }));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).with_writer(std::io::stderr).init();

    let settings = Config::load()?.settings()?;
    let description = validate_description(&cli.description)?;

    let cwd = std::env::current_dir()?;
    let head_path = resolve_with_base(&cwd, cli.head.as_deref().unwrap_or(&settings.export.output));
    let head = load_head(&head_path, settings.embedding.dimension)?;

    let service = get_default_service(&settings.embedding)?;
    let mut vectors = EmbeddingFetcher::new(service.as_ref(), &settings.embedding).fetch(&[description.to_string()])?;
    let Some(embedding) = vectors.pop() else { bail!("Embedding failed: no vector returned.") };
    let rating = head.predict(&embedding)?;

    println!("{}", serde_json::json!({ "rating": rating }));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_description_is_rejected() {
        assert!(validate_description("").is_err());
        assert!(validate_description(" \n\t ").is_err());
    }

    #[test]
    fn description_is_trimmed() {
        assert_eq!(validate_description("  a good book \n").unwrap(), "a good book");
    }

    #[test]
    fn length_limit_counts_utf16_units() {
        let ascii = "a".repeat(MAX_DESCRIPTION_LENGTH);
        assert!(validate_description(&ascii).is_ok());
        assert!(validate_description(&format!("{ascii}a")).is_err());

        // Each emoji is one char but two UTF-16 units.
        let emoji = "\u{1F600}".repeat(MAX_DESCRIPTION_LENGTH / 2);
        assert!(validate_description(&emoji).is_ok());
        assert!(validate_description(&format!("{emoji}\u{1F600}")).is_err());
        let over = "\u{1F600}".repeat(MAX_DESCRIPTION_LENGTH / 2 + 1);
        assert!(over.chars().count() <= MAX_DESCRIPTION_LENGTH);
        assert!(validate_description(&over).is_err());
    }
}
