//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use kbindex_core::assembler::validate_index_file_against_manifest;
use kbindex_core::check::check_index;
use kbindex_core::parse::parse_index;
use kbindex_core::pipeline::{GenerateConfig, GenerateResult, ProgressReporter, generate};
use kbindex_core::slug::slugify;
use kbindex_shared::{AppConfig, init_config, load_config};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// kbindex — generate numbered Markdown topic indexes.
#[derive(Parser)]
#[command(
    name = "kbindex",
    version,
    about = "Generate and check numbered, linked Markdown topic indexes.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

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
    /// Render the index (and stub topic files) from a topic list.
    Generate {
        /// Topic list: .toml, .json, or plain text with one title per line.
        #[arg(short, long)]
        topics: PathBuf,

        /// Output directory (defaults to config `output_dir`).
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Document heading.
        #[arg(long)]
        title: Option<String>,

        /// Subject named on the Context line.
        #[arg(long)]
        context: Option<String>,

        /// Generator credited in banner and footer.
        #[arg(long)]
        generator: Option<String>,

        /// Noun in the section heading, e.g. "Deep Dives".
        #[arg(long)]
        noun: Option<String>,

        /// Generation date (YYYY-MM-DD). Defaults to today (UTC).
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Index file name inside the output directory.
        #[arg(long)]
        index_file: Option<String>,

        /// Do not create stub files for topics without one.
        #[arg(long)]
        no_scaffold: bool,

        /// Delete topic files the index no longer links to.
        #[arg(long)]
        prune: bool,
    },

    /// Check an existing index for broken numbering, links and counts.
    Check {
        /// Index file to check.
        index: PathBuf,

        /// Directory holding the linked topic files (reports missing ones).
        #[arg(long)]
        docs: Option<PathBuf>,

        /// Also verify the index against the manifest.json next to it.
        #[arg(long)]
        manifest: bool,
    },

    /// Print the slug derived from each title.
    Slug {
        /// Titles to slugify.
        #[arg(required = true)]
        titles: Vec<String>,
    },

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

/// Initialize tracing based on CLI flags. Logs go to stderr so command
/// output on stdout stays pipeable.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "kbindex=warn",
        1 => "kbindex=info",
        2 => "kbindex=debug",
        _ => "kbindex=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

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
    match cli.command {
        Command::Generate {
            topics,
            out,
            title,
            context,
            generator,
            noun,
            date,
            index_file,
            no_scaffold,
            prune,
        } => {
            let config = load_config()?;
            let out_dir = out.unwrap_or_else(|| PathBuf::from(&config.defaults.output_dir));
            let gen_config = GenerateConfig {
                topics_path: topics,
                out_dir,
                title,
                context,
                generator,
                topic_noun: noun,
                index_file,
                generated_on: date.unwrap_or_else(|| Utc::now().date_naive()),
                scaffold: config.defaults.scaffold && !no_scaffold,
                prune,
                tool_version: env!("CARGO_PKG_VERSION").to_string(),
                defaults: config.defaults,
            };
            cmd_generate(gen_config).await
        }
        Command::Check {
            index,
            docs,
            manifest,
        } => cmd_check(&index, docs.as_deref(), manifest).await,
        Command::Slug { titles } => cmd_slug(&titles),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_generate(config: GenerateConfig) -> Result<()> {
    info!(
        topics = %config.topics_path.display(),
        out = %config.out_dir.display(),
        date = %config.generated_on,
        "generating index"
    );

    let reporter = CliProgress::new();
    let result = tokio::task::spawn_blocking(move || generate(&config, &reporter))
        .await
        .map_err(|e| eyre!("generate task failed: {e}"))??;

    println!();
    println!("  Index {}!", result.index_status);
    println!("  Topics:  {}", result.topic_count);
    println!("  Stubs:   {}", result.stubs_created);
    println!("  Path:    {}", result.index_path.display());
    if !result.stale_files.is_empty() {
        let verb = if result.pruned > 0 { "Pruned" } else { "Stale" };
        println!("  {verb}:   {}", result.stale_files.len());
        for path in &result.stale_files {
            println!("    - {}", path.display());
        }
    }
    println!("  Time:    {:.1}s", result.elapsed.as_secs_f64());
    println!();

    Ok(())
}

async fn cmd_check(index: &Path, docs: Option<&Path>, manifest: bool) -> Result<()> {
    let content = std::fs::read_to_string(index)
        .map_err(|e| eyre!("cannot read '{}': {e}", index.display()))?;
    let parsed = parse_index(&content)?;
    let report = check_index(&parsed, docs);

    for issue in &report.issues {
        println!("{}: {issue}", index.display());
    }

    if manifest {
        let manifest = validate_index_file_against_manifest(index)?;
        info!(topics = manifest.topic_count, "manifest matches index");
    }

    let errors = report.errors().count();
    let warnings = report.warnings().count();
    if errors > 0 {
        return Err(eyre!(
            "{} failed: {errors} error(s), {warnings} warning(s)",
            index.display()
        ));
    }

    println!(
        "{}: ok ({} topics, {warnings} warning(s))",
        index.display(),
        report.entries_checked
    );
    Ok(())
}

fn cmd_slug(titles: &[String]) -> Result<()> {
    for title in titles {
        let slug = slugify(title);
        if slug.is_empty() {
            return Err(eyre!("title {title:?} has no letters or digits to slugify"));
        }
        println!("{slug}");
    }
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
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
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn done(&self, _result: &GenerateResult) {
        self.spinner.finish_and_clear();
    }
}

impl Drop for CliProgress {
    fn drop(&mut self) {
        // Clears the spinner when the pipeline bails out before `done`.
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
        }
    }
}
