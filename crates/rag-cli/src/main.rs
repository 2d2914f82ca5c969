mod server;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use rag_core::{AssembledPrompt, Timestamp, render_preview};
use rag_store::{
    AssemblerConfig, ContextAssembler, PassageIndex, hours_to_window, index_documents,
    list_history_between, load_history, save_exchange,
};
use rmcp::{ServiceExt, transport::stdio};

/// Lookback for `history` when no range is given.
pub(crate) const DEFAULT_HISTORY_HOURS: f64 = 24.0;

#[derive(Parser)]
#[command(name = "rag", about = "Priority-weighted retrieval context assembler")]
struct Cli {
    /// Knowledge-base root directory
    #[arg(long, global = true, env = "RAG_BASE_DIR", default_value = ".")]
    base_dir: PathBuf,

    /// Enable verbose debug output
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assemble the prompt for a question and print a preview
    Prompt {
        question: String,

        /// Context budget (passages plus history exchanges)
        #[arg(short = 'k', long = "top-k")]
        k: Option<usize>,

        /// Include conversation history from the last N hours
        #[arg(long)]
        history_hours: Option<f64>,

        /// Prompt template override
        #[arg(long)]
        template: Option<PathBuf>,

        /// Emit JSON instead of the markdown preview
        #[arg(long)]
        json: bool,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Build the passage index from markdown under the base directory
    Index {
        /// Only add files not already indexed
        #[arg(long)]
        partial: bool,
    },

    /// List saved exchanges, by default those from the last 24 hours
    History {
        /// Lookback window in hours
        #[arg(long, conflicts_with_all = ["all", "since", "until"])]
        hours: Option<f64>,

        /// List every saved exchange regardless of age
        #[arg(long, conflicts_with_all = ["since", "until"])]
        all: bool,

        /// Earliest exchange to list, e.g. 2025-03-01 or 2025-03-01T09:30:00Z
        #[arg(long, value_parser = parse_timestamp)]
        since: Option<Timestamp>,

        /// Latest exchange to list, inclusive
        #[arg(long, value_parser = parse_timestamp)]
        until: Option<Timestamp>,
    },

    /// Save a question/answer exchange to the history directory
    Save {
        question: String,
        answer: String,

        #[arg(long)]
        title: Option<String>,

        /// Source the answer cited (repeatable)
        #[arg(long = "source")]
        sources: Vec<String>,
    },

    /// Start MCP server on stdio transport
    Serve,
}

fn parse_timestamp(raw: &str) -> std::result::Result<Timestamp, String> {
    Timestamp::parse_iso8601(raw)
        .ok_or_else(|| format!("expected YYYY-MM-DD[THH:MM[:SS]][Z], got {raw:?}"))
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

fn load_config(cli: &Cli) -> Result<AssemblerConfig> {
    AssemblerConfig::load(&cli.base_dir)
        .with_context(|| format!("failed to load config for {}", cli.base_dir.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Serve => cmd_serve(&cli).await,
        Commands::Prompt {
            question,
            k,
            history_hours,
            template,
            json,
            output,
        } => cmd_prompt(
            &cli,
            question,
            *k,
            *history_hours,
            template.as_deref(),
            *json,
            output.as_deref(),
        ),
        Commands::Index { partial } => cmd_index(&cli, *partial),
        Commands::History {
            hours,
            all,
            since,
            until,
        } => cmd_history(&cli, *hours, *all, *since, *until),
        Commands::Save {
            question,
            answer,
            title,
            sources,
        } => cmd_save(&cli, question, answer, title.as_deref(), sources),
    }
}

async fn cmd_serve(cli: &Cli) -> Result<()> {
    let base_dir = std::path::absolute(&cli.base_dir)
        .with_context(|| format!("invalid base dir {}", cli.base_dir.display()))?;
    tracing::info!("starting MCP server for {}", base_dir.display());

    let service = server::RagServer::new(base_dir)
        .serve(stdio())
        .await
        .context("failed to start MCP server")?;
    service.waiting().await?;
    Ok(())
}

/// The machine-readable view of an assembled prompt.
pub(crate) fn prompt_json(prompt: &AssembledPrompt) -> serde_json::Value {
    serde_json::json!({
        "prompt": prompt.prompt,
        "context": prompt.context,
        "history": prompt.history,
        "sources": prompt.sources,
        "k": prompt.k,
    })
}

fn cmd_prompt(
    cli: &Cli,
    question: &str,
    k: Option<usize>,
    history_hours: Option<f64>,
    template: Option<&Path>,
    json: bool,
    output: Option<&Path>,
) -> Result<()> {
    let mut config = load_config(cli)?;
    if let Some(k) = k {
        config = config.with_k(k);
    }
    if let Some(hours) = history_hours {
        config = config.with_history_hours(hours);
    }
    if let Some(template) = template {
        config = config.with_template(template);
    }

    let index = PassageIndex::open(&config.index_path)
        .context("passage index unavailable, run `rag index` first")?;
    let prompt = ContextAssembler::new(config, index)
        .assemble(question)
        .context("failed to assemble context")?;

    let rendered = if json {
        serde_json::to_string_pretty(&prompt_json(&prompt))?
    } else {
        render_preview(question, &prompt, Timestamp::now())
    };

    match output {
        Some(path) => {
            std::fs::write(path, &rendered)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("wrote {}", path.display());
        }
        None => println!("{rendered}"),
    }

    if cli.verbose {
        let m = &prompt.metrics;
        eprintln!(
            "--- metrics: pool={}, excluded={}, backfilled={}, retrieved={}, history={} ---",
            m.pool, m.excluded, m.backfilled, m.retrieved, m.history
        );
    }
    Ok(())
}

fn cmd_index(cli: &Cli, partial: bool) -> Result<()> {
    let config = load_config(cli)?;
    let index = PassageIndex::create(&config.index_path)
        .with_context(|| format!("failed to open {}", config.index_path.display()))?;
    let report =
        index_documents(&index, &config.base_dir, partial).context("failed to index documents")?;

    println!(
        "indexed {} files, {} chunks ({} unchanged, {} removed, {} skipped)",
        report.files, report.chunks, report.unchanged, report.removed, report.skipped
    );
    let total = index.passage_count().context("failed to count passages")?;
    println!("index now holds {total} passages");
    Ok(())
}

fn cmd_history(
    cli: &Cli,
    hours: Option<f64>,
    all: bool,
    since: Option<Timestamp>,
    until: Option<Timestamp>,
) -> Result<()> {
    if let (Some(since), Some(until)) = (since, until)
        && since > until
    {
        bail!("--since {since} is after --until {until}");
    }
    let config = load_config(cli)?;
    let ranged = all || since.is_some() || until.is_some();
    let hours = hours.unwrap_or(DEFAULT_HISTORY_HOURS);
    let loaded = if ranged {
        list_history_between(&config.history_dir, &config.base_dir, since, until)
    } else {
        let Some(window) = hours_to_window(hours) else {
            bail!("--hours must be a positive number");
        };
        load_history(&config.history_dir, &config.base_dir, Timestamp::now(), window)
    };
    let exchanges = loaded.context("failed to read history")?;

    if exchanges.is_empty() {
        if ranged {
            println!("(no history)");
        } else {
            println!("(no history in the last {hours} hours)");
        }
    }
    for exchange in &exchanges {
        println!(
            "{}  {}  ({})",
            exchange.timestamp, exchange.title, exchange.source
        );
        if !exchange.sources.is_empty() {
            println!("    cites: {}", exchange.sources.join(", "));
        }
    }
    Ok(())
}

fn cmd_save(
    cli: &Cli,
    question: &str,
    answer: &str,
    title: Option<&str>,
    sources: &[String],
) -> Result<()> {
    let config = load_config(cli)?;
    let path = save_exchange(
        &config.history_dir,
        question,
        answer,
        title,
        sources,
        Timestamp::now(),
    )
    .context("failed to save exchange")?;
    println!("saved {}", path.display());
    Ok(())
}
