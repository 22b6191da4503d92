use std::{collections::HashSet, fs, path::PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use intake_engine::{
    CheckoutHandshake,
    checkout::{CheckoutScript, ScriptedPopupHost},
    documents::{group_by_category, outstanding_documents, render_checklist, resolve_required, validate},
    parse_catalog_file, select_catalog,
};
use intake_types::{AnswerSet, CheckoutSource, DocumentRequirement, ServiceCatalog};
use intake_util::IntakeConfig;
use serde_json::json;
use tokio::sync::mpsc::unbounded_channel;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "intake", version, about = "Service intake document resolution and checkout handshake")]
struct Cli {
    /// Path to the intake config file (defaults to $INTAKE_CONFIG_PATH or the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the documents required by the current answers
    Resolve(CatalogArgs),
    /// Render the categorized document checklist
    Checklist(CatalogArgs),
    /// Check supplied document ids against the whole catalog
    Validate(UploadArgs),
    /// List required documents that have not been supplied
    Outstanding(UploadArgs),
    /// Replay a scripted checkout session and print its outcome
    Checkout(CheckoutArgs),
}

#[derive(Debug, Args)]
struct CatalogArgs {
    /// Catalog file (YAML or JSON)
    #[arg(long, short = 'c')]
    catalog: PathBuf,
    /// Service id within a catalog bundle
    #[arg(long, short = 's')]
    service: Option<String>,
    /// Answers as an inline JSON object
    #[arg(long, conflicts_with = "answers_file")]
    answers: Option<String>,
    /// Answers read from a JSON file
    #[arg(long)]
    answers_file: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct UploadArgs {
    #[command(flatten)]
    catalog: CatalogArgs,
    /// Comma-separated ids of supplied documents
    #[arg(long, short = 'u', value_delimiter = ',')]
    uploaded: Vec<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SourceArg {
    Consultation,
    Subscription,
    Service,
}

impl From<SourceArg> for CheckoutSource {
    fn from(source: SourceArg) -> Self {
        match source {
            SourceArg::Consultation => CheckoutSource::Consultation,
            SourceArg::Subscription => CheckoutSource::Subscription,
            SourceArg::Service => CheckoutSource::Service,
        }
    }
}

#[derive(Debug, Args)]
struct CheckoutArgs {
    /// Workflow kind that started the checkout
    #[arg(long, value_enum, default_value = "service")]
    source: SourceArg,
    /// Checkout page URL
    #[arg(long)]
    url: String,
    /// JSON script describing what the checkout window does
    #[arg(long)]
    script: PathBuf,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = match cli.config.as_deref() {
        Some(path) => IntakeConfig::load_from(path)?,
        None => IntakeConfig::load()?,
    };

    match cli.command {
        Command::Resolve(args) => {
            let catalog = load_catalog(&args)?;
            let resolved = resolve_required(&catalog.required_documents, &load_answers(&args)?);
            print_json(&json!({ "required": document_ids(&resolved) }))
        }
        Command::Checklist(args) => {
            let catalog = load_catalog(&args)?;
            let resolved = resolve_required(&catalog.required_documents, &load_answers(&args)?);
            print!("{}", render_checklist(&group_by_category(&resolved, &catalog.document_categories)));
            Ok(())
        }
        Command::Validate(args) => {
            let catalog = load_catalog(&args.catalog)?;
            let validation = validate(&catalog.required_documents, &uploaded_set(&args.uploaded));
            print_json(&json!({ "ok": validation.ok, "missing": document_ids(&validation.missing) }))
        }
        Command::Outstanding(args) => {
            let catalog = load_catalog(&args.catalog)?;
            let resolved = resolve_required(&catalog.required_documents, &load_answers(&args.catalog)?);
            let outstanding = outstanding_documents(&resolved, &uploaded_set(&args.uploaded));
            print_json(&json!({ "outstanding": document_ids(&outstanding) }))
        }
        Command::Checkout(args) => run_checkout(&config, args).await,
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn run_checkout(config: &IntakeConfig, args: CheckoutArgs) -> Result<()> {
    let script_text = fs::read_to_string(&args.script).with_context(|| format!("Failed to read checkout script: {}", args.script.display()))?;
    let script: CheckoutScript = serde_json::from_str(&script_text).context("Failed to parse checkout script")?;

    let host = ScriptedPopupHost::new(config.host_origin()?).blocked(script.blocked);
    let (message_tx, mut message_rx) = unbounded_channel();
    let cancel = CancellationToken::new();

    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt.cancel();
        }
    });

    let source = CheckoutSource::from(args.source);
    let mut handshake = CheckoutHandshake::from_settings(&host, source, &config.checkout);
    let playback = host.play(script.steps, message_tx);
    info!(%source, url = %args.url, "starting scripted checkout");

    let result = handshake.run(&args.url, &mut message_rx, &cancel).await;
    playback.abort();

    match result {
        Ok(outcome) => print_json(&json!({ "source": source, "result": outcome })),
        Err(error) => print_json(&json!({ "source": source, "error": error.to_string() })),
    }
}

fn load_catalog(args: &CatalogArgs) -> Result<ServiceCatalog> {
    let bundle = parse_catalog_file(&args.catalog)?;
    select_catalog(&bundle, args.service.as_deref()).cloned()
}

fn load_answers(args: &CatalogArgs) -> Result<AnswerSet> {
    let raw = match (&args.answers, &args.answers_file) {
        (Some(inline), _) => inline.clone(),
        (None, Some(path)) => fs::read_to_string(path).with_context(|| format!("Failed to read answers file: {}", path.display()))?,
        (None, None) => return Ok(AnswerSet::new()),
    };
    serde_json::from_str(&raw).context("answers must be a JSON object of strings, booleans, numbers, or string lists")
}

fn uploaded_set(uploaded: &[String]) -> HashSet<String> {
    uploaded
        .iter()
        .map(|id| id.trim())
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

fn document_ids(documents: &[DocumentRequirement]) -> Vec<&str> {
    documents.iter().map(|document| document.id.as_str()).collect()
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
