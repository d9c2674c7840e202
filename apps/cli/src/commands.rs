//! CLI command definitions, routing, and tracing setup.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use seocontext_core::{ProgressReporter, RunOutcome, RunState, process_product};
use seocontext_shared::{AppConfig, ConnectorKind, Product, SourceId, init_config, load_config, load_config_from};
use seocontext_sources::ConnectorRegistry;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// seocontext: aggregate product marketing signals into one SEO context.
#[derive(Parser)]
#[command(
    name = "seocontext",
    version,
    about = "Merge analytics, search, merchant, competitor and trend signals into a product SEO context.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to ~/.seocontext/seocontext.toml).
    #[arg(long, global = true, env = "SEOCONTEXT_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Build the SEO context for one product.
    Run {
        /// Product JSON file.
        #[arg(long)]
        product: PathBuf,

        /// Write the context here instead of stdout.
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Print stages, failures and diagnostics to stderr.
        #[arg(long)]
        report: bool,
    },

    /// Build contexts for every product in a JSON array, one run each.
    Batch {
        /// JSON file holding an array of products.
        #[arg(long)]
        products: PathBuf,

        /// Output directory (defaults to `defaults.output_dir`).
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },

    /// List configured data sources.
    Sources,

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "seocontext=info",
        1 => "seocontext=debug",
        _ => "seocontext=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    // Logs go to stderr so the context JSON on stdout stays clean.
    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Run {
            product,
            out,
            report,
        } => cmd_run(config_path, &product, out.as_deref(), report).await,
        Command::Batch { products, out_dir } => {
            cmd_batch(config_path, &products, out_dir.as_deref()).await
        }
        Command::Sources => cmd_sources(config_path),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(config_path),
        },
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(p) => load_config_from(p)?,
        None => load_config()?,
    };
    Ok(config)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("cannot read '{}'", path.display()))?;
    serde_json::from_str(&raw).wrap_err_with(|| format!("invalid JSON in '{}'", path.display()))
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_run(
    config_path: Option<&Path>,
    product_path: &Path,
    out: Option<&Path>,
    report: bool,
) -> Result<()> {
    let config = resolve_config(config_path)?;
    let registry = ConnectorRegistry::from_config(&config)?;
    let product: Product = read_json(product_path)?;

    info!(product = %product.key(), sources = registry.len(), "building context");

    let reporter = CliProgress::new();
    let outcome = process_product(&registry, &product, &reporter).await?;

    if report {
        print_report(&outcome);
    }

    let context = outcome
        .context
        .as_ref()
        .ok_or_else(|| eyre!("run {} failed: no source or analysis produced data", outcome.run_id))?;
    let json = serde_json::to_string_pretty(context)?;

    match out {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, json)?;
            eprintln!("Context written to: {}", path.display());
        }
        None => println!("{json}"),
    }

    Ok(())
}

async fn cmd_batch(
    config_path: Option<&Path>,
    products_path: &Path,
    out_dir: Option<&Path>,
) -> Result<()> {
    let config = resolve_config(config_path)?;
    let registry = ConnectorRegistry::from_config(&config)?;
    let products: Vec<Product> = read_json(products_path)?;

    let out_dir = out_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(&config.defaults.output_dir));
    std::fs::create_dir_all(&out_dir)
        .wrap_err_with(|| format!("cannot create '{}'", out_dir.display()))?;

    info!(products = products.len(), out_dir = %out_dir.display(), "starting batch");

    let mut written = 0usize;
    let mut failed: Vec<String> = Vec::new();
    let mut claimed: HashSet<String> = HashSet::new();

    for product in &products {
        let key = product.key();
        if !claim_output_key(&mut claimed, &key) {
            warn!(product = %key, "empty or duplicate product key, skipped");
            failed.push(key);
            continue;
        }
        let reporter = CliProgress::new();
        let outcome = match process_product(&registry, product, &reporter).await {
            Ok(outcome) => outcome,
            Err(e) if !matches!(e, seocontext_shared::SeoContextError::FatalConfiguration { .. }) => {
                warn!(product = %key, error = %e, "product skipped");
                failed.push(key);
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        match &outcome.context {
            Some(context) => {
                let path = out_dir.join(format!("{key}.json"));
                std::fs::write(&path, serde_json::to_string_pretty(context)?)?;
                written += 1;
            }
            None => failed.push(key),
        }
    }

    println!();
    println!("  Batch finished");
    println!("  Written: {written}");
    println!("  Failed:  {}", failed.len());
    println!("  Output:  {}", out_dir.display());
    println!();

    if failed.is_empty() {
        Ok(())
    } else {
        Err(eyre!("{} product run(s) failed: {}", failed.len(), failed.join(", ")))
    }
}

/// Each batch output file belongs to exactly one product.
fn claim_output_key(claimed: &mut HashSet<String>, key: &str) -> bool {
    !key.is_empty() && claimed.insert(key.to_string())
}

fn cmd_sources(config_path: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    if config.sources.is_empty() {
        println!("No sources configured. Run `seocontext config init` to create a starter config.");
        return Ok(());
    }

    println!("{:<18} {:<6} {:<8} LOCATION", "SOURCE", "KIND", "ENABLED");
    for source in &config.sources {
        let (kind, location) = match source.kind {
            ConnectorKind::File => ("file", source.path.as_deref().unwrap_or("-")),
            ConnectorKind::Http => ("http", source.url.as_deref().unwrap_or("-")),
        };
        println!(
            "{:<18} {:<6} {:<8} {location}",
            source.id.as_str(),
            kind,
            if source.enabled { "yes" } else { "no" },
        );
    }

    let missing: Vec<&str> = SourceId::ALL
        .iter()
        .filter(|id| !config.enabled_sources().any(|s| s.id == **id))
        .map(|id| id.as_str())
        .collect();
    if !missing.is_empty() {
        println!();
        println!("Not collected: {}", missing.join(", "));
    }

    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

fn print_report(outcome: &RunOutcome) {
    eprintln!();
    eprintln!("  Run:       {}", outcome.run_id);
    eprintln!("  Product:   {}", outcome.product_key);
    eprintln!("  State:     {}", outcome.state);
    eprintln!("  Stages:    {}", outcome.stages.join(", "));
    if !outcome.empty_stages.is_empty() {
        eprintln!("  Empty:     {}", outcome.empty_stages.join(", "));
    }
    for failure in &outcome.failures {
        eprintln!("  Failed:    {} ({})", failure.stage, failure.error);
    }
    for diagnostic in &outcome.diagnostics {
        eprintln!("  Note:      {}", diagnostic.message());
    }
    eprintln!("  Time:      {:.1}s", outcome.elapsed.as_secs_f64());
    eprintln!();
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, state: RunState) {
        self.spinner.set_message(state.to_string());
    }

    fn source_finished(&self, source: SourceId, ok: bool, current: usize, total: usize) {
        let status = if ok { "ok" } else { "failed" };
        self.spinner
            .set_message(format!("Collecting [{current}/{total}] {source} {status}"));
    }

    fn done(&self, _outcome: &RunOutcome) {
        self.spinner.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_keys_are_claimed_once() {
        let mut claimed = HashSet::new();
        assert!(claim_output_key(&mut claimed, "9312432031183"));
        assert!(!claim_output_key(&mut claimed, "9312432031183"));
        assert!(!claim_output_key(&mut claimed, ""));
        assert!(claim_output_key(&mut claimed, "sage-smart-kettle"));
    }
}
