use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use datasheet_recon_lib::{
    core::{
        config::ReconConfig,
        errors::{AppError, AppResult},
        types::{DocumentInput, OcrToken, PropertyEntry, RawTable},
    },
    init_logging,
    schema::SchemaSpec,
    DocumentPipeline,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{error, info};

/// Reconcile OCR tokens and extracted tables into a canonical datasheet record
#[derive(Parser, Debug)]
#[command(name = "datasheet-recon")]
#[command(version, about, long_about = None)]
struct Args {
    /// Schema document declaring the canonical entities
    #[arg(long)]
    schema: PathBuf,

    /// Extracted tables (a list, or an object with a `tables` list)
    #[arg(long)]
    tables: PathBuf,

    /// OCR tokens (a list, or an object with an `ocr_tokens` list)
    #[arg(long)]
    ocr: Option<PathBuf>,

    /// Property entries to align (a list, or an object with a `properties` list)
    #[arg(long)]
    properties: Option<PathBuf>,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Document identifier used as the root uuid
    #[arg(long)]
    document_id: Option<String>,

    /// Output file (stdout when omitted)
    #[arg(long)]
    out: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();
    match run(Args::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(code = err.code(), error = %err, "reconciliation failed");
            match serde_json::to_string(&err) {
                Ok(body) => eprintln!("{body}"),
                Err(_) => eprintln!("{err}"),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> AppResult<()> {
    let config = ReconConfig::load(args.config.as_deref())?;
    let schema = Arc::new(SchemaSpec::load(&args.schema)?);
    info!(entities = schema.len(), schema = %args.schema.display(), "schema loaded");

    let input = DocumentInput {
        document_id: args.document_id,
        tables: read_list::<RawTable>(&args.tables, "tables")?,
        ocr_tokens: match &args.ocr {
            Some(path) => read_list::<OcrToken>(path, "ocr_tokens")?,
            None => vec![],
        },
        properties: match &args.properties {
            Some(path) => read_list::<PropertyEntry>(path, "properties")?,
            None => vec![],
        },
    };

    let pipeline = DocumentPipeline::from_config(schema, config)?;
    let output = pipeline.run(input).await?;
    let body = serde_json::to_string_pretty(&output)?;

    match &args.out {
        Some(path) => {
            std::fs::write(path, body)?;
            info!(out = %path.display(), "record written");
        }
        None => println!("{body}"),
    }
    Ok(())
}

/// Reads a JSON list from `path`, accepting either a bare array or an object
/// holding the array under `key`.
fn read_list<T: DeserializeOwned>(path: &Path, key: &str) -> AppResult<Vec<T>> {
    let text = std::fs::read_to_string(path)
        .map_err(|err| AppError::Io(format!("{}: {err}", path.display())))?;
    let value: Value = serde_json::from_str(&text)?;
    let list = match value {
        Value::Array(items) => Value::Array(items),
        Value::Object(mut map) => map.remove(key).ok_or_else(|| {
            AppError::InvalidInput(format!("{} has no '{key}' list", path.display()))
        })?,
        _ => {
            return Err(AppError::InvalidInput(format!(
                "{} must hold a JSON list",
                path.display()
            )))
        }
    };
    Ok(serde_json::from_value(list)?)
}
