//! Bulk-loads the ingredient catalogue.
//!
//! Accepts either a JSON array of `{name, measurement_unit}` objects or a
//! headerless two-column CSV of `name,unit` rows.

use anyhow::Context;
use clap::Parser;
use foodgram_services::database::{PgStorage, SqlStorage};
use serde::Deserialize;
use sqlx::postgres::PgPoolOptions;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "load-ingredients")]
#[command(about = "Load ingredients into the Foodgram database", long_about = None)]
struct Cli {
    /// JSON (`[{"name": ..., "measurement_unit": ...}]`) or `name,unit` CSV file
    #[arg(long, short = 'f')]
    file: PathBuf,

    #[arg(long, env = "DATABASE_URL")]
    database_url: String,
}

#[derive(Debug, Deserialize)]
struct IngredientRecord {
    name: String,
    measurement_unit: String,
}

fn parse_records(raw: &str) -> anyhow::Result<Vec<IngredientRecord>> {
    let raw = raw.trim_start_matches('\u{feff}');
    if raw.trim_start().starts_with('[') {
        serde_json::from_str(raw)
            .context("ingredient file is not a JSON array of {name, measurement_unit}")
    } else {
        parse_csv(raw)
    }
}

fn parse_csv(raw: &str) -> anyhow::Result<Vec<IngredientRecord>> {
    raw.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            let fields = split_csv_line(line).with_context(|| format!("line {}", index + 1))?;
            match <[String; 2]>::try_from(fields) {
                Ok([name, measurement_unit]) => Ok(IngredientRecord {
                    name,
                    measurement_unit,
                }),
                Err(fields) => anyhow::bail!(
                    "line {}: expected 2 columns, found {}",
                    index + 1,
                    fields.len()
                ),
            }
        })
        .collect()
}

/// Splits one CSV row, honouring `"quoted, fields"` and `""` escapes.
fn split_csv_line(line: &str) -> anyhow::Result<Vec<String>> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if quoted && chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            '"' => quoted = !quoted,
            ',' if !quoted => fields.push(std::mem::take(&mut field)),
            _ => field.push(c),
        }
    }
    if quoted {
        anyhow::bail!("unterminated quoted field");
    }
    fields.push(field);
    Ok(fields)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let raw = tokio::fs::read_to_string(&cli.file)
        .await
        .with_context(|| format!("failed to read {}", cli.file.display()))?;
    let records = parse_records(&raw)?;

    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&cli.database_url)
        .await?;
    let storage = PgStorage::new(pool);

    let mut created = 0usize;
    let mut skipped = 0usize;
    for record in &records {
        let name = record.name.trim();
        let unit = record.measurement_unit.trim();
        if name.is_empty() || unit.is_empty() {
            warn!(?record, "skipping ingredient with an empty field");
            skipped += 1;
            continue;
        }

        if storage.ingredients_upsert(name, unit).await? {
            created += 1;
        } else {
            skipped += 1;
        }
    }

    info!(created, skipped, total = records.len(), "Ingredients loaded");

    Ok(())
}
