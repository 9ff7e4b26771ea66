//! CVX CLI - Command-line interface
//!
//! Usage:
//!   cvx extract <paths...>
//!   cvx rules
//!   cvx payload <path> --link <url>

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use chrono::Utc;
use clap::{Parser, Subcommand};
use serde_json::json;

use cvx_core::config::{AppConfig, EntityPolicy, LoggingConfig};
use cvx_core::CvError;
use cvx_dispatch::{next_send_time, FollowUpEmail, PayloadMetadata, SheetRow, WebhookPayload};
use cvx_extractor::{BatchItem, Pipeline};

#[derive(Parser)]
#[command(name = "cvx")]
#[command(about = "Résumé extraction pipeline CLI")]
#[command(version)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true, env = "CVX_CONFIG")]
    config: Option<PathBuf>,

    /// Pretrained NER checkpoint directory (config.json, tokenizer.json, model.safetensors)
    #[arg(long, global = true)]
    model_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract candidate records from PDF/DOCX files
    Extract {
        /// Documents to process
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Declared type for every file (default: file extension)
        #[arg(long = "type")]
        doc_type: Option<String>,

        /// Skip entity recognition
        #[arg(long)]
        no_entities: bool,

        /// Fail documents when the entity model is unavailable
        #[arg(long)]
        strict_entities: bool,

        /// Pretty-print JSON
        #[arg(long)]
        pretty: bool,

        /// Worker threads (0 = one per core)
        #[arg(long)]
        workers: Option<usize>,
    },
    /// List the field extraction rules
    Rules,
    /// Show the webhook payload and sheet row for a document
    Payload {
        path: PathBuf,

        /// Public link to the stored original
        #[arg(long)]
        link: String,

        #[arg(long = "type")]
        doc_type: Option<String>,
    },
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("cvx_extractor={0},cvx_parser={0}", logging.level).into());

    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter);
    if logging.json_format {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn declared_type(path: &Path, doc_type: Option<&str>) -> String {
    doc_type
        .map(str::to_string)
        .or_else(|| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .map(str::to_string)
        })
        .unwrap_or_default()
}

fn to_json(value: &serde_json::Value, pretty: bool) -> anyhow::Result<String> {
    Ok(if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    })
}

fn error_json(err: &CvError) -> serde_json::Value {
    json!({ "code": err.code(), "message": err.to_string() })
}

fn extract(
    config: &AppConfig,
    paths: Vec<PathBuf>,
    doc_type: Option<String>,
    pretty: bool,
) -> anyhow::Result<()> {
    let pipeline = Pipeline::from_config(&config.extraction);
    let total = paths.len();
    let mut failed = 0;

    let mut items = Vec::with_capacity(paths.len());
    for path in paths {
        let id = path.display().to_string();
        match std::fs::read(&path) {
            Ok(bytes) => {
                let declared = declared_type(&path, doc_type.as_deref());
                items.push(BatchItem::new(id, bytes, declared));
            }
            Err(e) => {
                failed += 1;
                let line = json!({ "file": id, "error": { "code": "IO_ERROR", "message": e.to_string() } });
                println!("{}", to_json(&line, pretty)?);
            }
        }
    }

    for outcome in pipeline.process_batch(items) {
        let line = match &outcome.result {
            Ok(record) => json!({ "file": outcome.id, "record": record }),
            Err(e) => {
                failed += 1;
                json!({ "file": outcome.id, "error": error_json(e) })
            }
        };
        println!("{}", to_json(&line, pretty)?);
    }

    if failed > 0 {
        bail!("{failed} of {total} documents failed");
    }
    Ok(())
}

fn rules() {
    let table = cvx_extractor::RuleSet::standard();
    for rule in table.rules() {
        println!(
            "{:<22} {:<14} {:<11} {}",
            rule.id,
            rule.field.to_string(),
            rule.scope().to_string(),
            rule.matcher.describe()
        );
    }
}

fn payload(config: &AppConfig, path: &Path, link: &str, doc_type: Option<&str>) -> anyhow::Result<()> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let pipeline = Pipeline::from_config(&config.extraction);
    let record = pipeline.process_document(&bytes, &declared_type(path, doc_type))?;

    let now = Utc::now();
    let dispatch = &config.dispatch;
    let metadata = PayloadMetadata::from_config(&record, dispatch).with_timestamp(now);
    let followup = FollowUpEmail::for_record(&record, dispatch);
    let followup_at = match &followup {
        Some(_) => Some(next_send_time(now, dispatch.followup_time_of_day()?)),
        None => None,
    };

    let output = json!({
        "webhook_payload": WebhookPayload::build(&record, link, metadata),
        "sheet_row": SheetRow::from_record(&record, link),
        "followup": followup,
        "followup_at": followup_at,
    });
    println!("{}", to_json(&output, true)?);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = AppConfig::load(cli.config)?;
    init_tracing(&config.logging);
    if let Some(dir) = cli.model_dir {
        config.extraction.ner_model_dir = Some(dir);
    }

    match cli.command {
        Commands::Extract {
            paths,
            doc_type,
            no_entities,
            strict_entities,
            pretty,
            workers,
        } => {
            if no_entities {
                config.extraction.ner_enabled = false;
            }
            if strict_entities {
                config.extraction.entity_policy = EntityPolicy::Abort;
            }
            if let Some(workers) = workers {
                config.extraction.workers = workers;
            }
            extract(&config, paths, doc_type, pretty)?;
        }
        Commands::Rules => rules(),
        Commands::Payload {
            path,
            link,
            doc_type,
        } => payload(&config, &path, &link, doc_type.as_deref())?,
    }

    Ok(())
}
