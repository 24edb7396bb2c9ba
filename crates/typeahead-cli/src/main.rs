use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde_json::{Value, json};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use typeahead_core::{MatchSpec, Scope, StaticSource, TypeaheadConfig, highlight, trust_html};
use typeahead_widget::Typeahead;

/// Used when neither the flag nor the config file names an expression.
const DEFAULT_EXPRESSION: &str = "item for item in lookup($viewValue)";

// ─── CLI Definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "typeahead",
    about = "Drive a typeahead headlessly from the terminal",
    version,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output in JSON format.
    /// Also enabled by setting TYPEAHEAD_JSON=1.
    #[arg(long, global = true)]
    json: bool,

    /// Config file (defaults to ~/.config/typeahead/config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a match specification and show its parts.
    Parse { expression: String },

    /// Highlight occurrences of a query inside text.
    Highlight { text: String, query: String },

    /// Type a query into a widget backed by a JSON file of candidates.
    Complete {
        query: String,
        /// JSON array of candidates, exposed as `lookup(query)` and `items`.
        #[arg(long)]
        data: PathBuf,
        #[arg(long)]
        expression: Option<String>,
        /// Object property the lookup matches against.
        #[arg(long)]
        field: Option<String>,
        #[arg(long, default_value = "0")]
        latency_ms: u64,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        wait_ms: Option<u64>,
        #[arg(long)]
        min_length: Option<usize>,
        #[arg(long)]
        non_editable: bool,
        /// Commit the match at this index after the lookup settles.
        #[arg(long)]
        select: Option<usize>,
    },

    /// Config management.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

// ─── Config Actions ─────────────────────────────────────────────────────────

#[derive(Subcommand)]
enum ConfigAction {
    /// Show the effective config.
    Show,
    /// Print the config file path.
    Path,
    /// Write a default config file.
    Init {
        #[arg(long)]
        force: bool,
    },
}

// ─── Main ───────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let start = Instant::now();
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("TYPEAHEAD_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let json_output = cli.json || std::env::var("TYPEAHEAD_JSON").as_deref() == Ok("1");
    let config_path = cli.config.clone().unwrap_or_else(TypeaheadConfig::config_path);
    let config = TypeaheadConfig::load_from(&config_path)
        .with_context(|| format!("loading config from {}", config_path.display()))?;
    debug!("config loaded from {}", config_path.display());

    match cli.command {
        Commands::Parse { expression } => {
            let spec = MatchSpec::parse(&expression)?;
            if json_output {
                print_json(&json!({
                    "status": "ok",
                    "data": {
                        "item": spec.item_name(),
                        "model": spec.model().source(),
                        "label": spec.label().source(),
                        "source": spec.source().source(),
                    },
                    "meta": { "duration_ms": start.elapsed().as_millis() }
                }))?;
            } else {
                println!("item    {}", spec.item_name());
                println!("model   {}", spec.model().source());
                println!("label   {}", spec.label().source());
                println!("source  {}", spec.source().source());
            }
        }

        Commands::Highlight { text, query } => {
            let marked = trust_html(highlight(&text, Some(&query)));
            if json_output {
                print_json(&json!({
                    "status": "ok",
                    "data": { "text": text, "query": query, "html": marked.as_str() },
                    "meta": { "duration_ms": start.elapsed().as_millis() }
                }))?;
            } else {
                println!("{marked}");
            }
        }

        Commands::Complete {
            query,
            data,
            expression,
            field,
            latency_ms,
            limit,
            wait_ms,
            min_length,
            non_editable,
            select,
        } => {
            let mut config = config;
            if let Some(expression) = expression {
                config.bindings.expression = expression;
            }
            if config.bindings.expression.trim().is_empty() {
                config.bindings.expression = DEFAULT_EXPRESSION.to_string();
            }
            if let Some(wait_ms) = wait_ms {
                config.behavior.wait_ms = wait_ms;
            }
            if let Some(min_length) = min_length {
                config.behavior.min_length = min_length;
            }
            if non_editable {
                config.behavior.editable = false;
            }
            config.validate()?;

            let raw = std::fs::read_to_string(&data)
                .with_context(|| format!("reading candidates from {}", data.display()))?;
            let mut source = StaticSource::from_json("lookup", &raw)?
                .latency(Duration::from_millis(latency_ms));
            if let Some(field) = field {
                source = source.search_field(field);
            }
            if let Some(limit) = limit {
                source = source.limit(limit);
            }

            let mut scope = Scope::new().with_value("items", Value::Array(source.items().to_vec()));
            scope.define_source("lookup", Arc::new(source));

            let mut widget = Typeahead::new(config, scope)?;
            widget.focus();
            widget.input(query.as_str());
            widget.run_until_idle().await;

            let matches: Vec<Value> = widget
                .matches()
                .iter()
                .enumerate()
                .map(|(i, m)| {
                    json!({
                        "index": i,
                        "label": m.label,
                        "html": highlight(&m.label, widget.query()),
                        "model": m.select_value,
                        "active": widget.state().is_active(i),
                    })
                })
                .collect();
            let open = widget.is_open();

            let selection = match select {
                Some(index) => Some(widget.select(index)?),
                None => None,
            };
            let dur = start.elapsed().as_millis();

            if json_output {
                print_json(&json!({
                    "status": "ok",
                    "data": {
                        "query": query,
                        "open": open,
                        "matches": matches,
                        "selection": selection.as_ref().map(|s| json!({
                            "item": s.item,
                            "model": s.model,
                            "label": s.label,
                        })),
                        "model": widget.model(),
                        "text": widget.display_text(),
                    },
                    "meta": { "duration_ms": dur }
                }))?;
            } else {
                if matches.is_empty() {
                    println!("No matches for: {query}");
                } else {
                    for m in &matches {
                        let marker = if m["active"] == json!(true) { ">" } else { " " };
                        println!("{marker} {}  {}", m["index"], m["html"].as_str().unwrap_or_default());
                    }
                }
                if let Some(selection) = &selection {
                    println!("Selected: {} -> {}", selection.label, selection.model);
                }
                println!("Model: {}", widget.model());
                println!("Text:  {}", widget.display_text());
            }
        }

        Commands::Config { action } => match action {
            ConfigAction::Show => {
                if json_output {
                    print_json(&json!({
                        "status": "ok",
                        "data": config,
                        "meta": { "duration_ms": start.elapsed().as_millis() }
                    }))?;
                } else {
                    print!("{}", toml::to_string_pretty(&config)?);
                }
            }
            ConfigAction::Path => {
                println!("{}", config_path.display());
            }
            ConfigAction::Init { force } => {
                if config_path.exists() && !force {
                    bail!("{} already exists (use --force to overwrite)", config_path.display());
                }
                let mut config = TypeaheadConfig::default();
                config.bindings.expression = DEFAULT_EXPRESSION.to_string();
                config.save_to(&config_path)?;
                println!("Wrote {}", config_path.display());
            }
        },
    }

    Ok(())
}

fn print_json(val: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(val)?);
    Ok(())
}
