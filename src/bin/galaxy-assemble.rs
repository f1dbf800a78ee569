//! CLI binary for galaxy-assemble.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `AssemblyConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use galaxy_assemble::{
    assemble, AssemblyConfig, AssemblyOutput, AssemblyProgressCallback, ProgressCallback,
    ReadFiles, RunMode, Stage,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a spinner naming the current stage, and one
/// log line per finished stage.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Start time of the stage in flight.
    stage_started: Mutex<Option<Instant>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Starting");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            stage_started: Mutex::new(None),
        })
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl AssemblyProgressCallback for CliProgressCallback {
    fn on_stage_start(&self, stage: Stage) {
        if let Ok(mut started) = self.stage_started.lock() {
            *started = Some(Instant::now());
        }
        self.bar.set_prefix(stage.to_string());
        self.bar.set_message("");
    }

    fn on_stage_complete(&self, stage: Stage) {
        let elapsed = self
            .stage_started
            .lock()
            .ok()
            .and_then(|mut s| s.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0);
        self.bar.println(format!(
            "  {} {:<18} {}",
            green("✓"),
            stage.to_string(),
            dim(&format!("{elapsed:.1}s")),
        ));
    }

    fn on_upload(&self, file: &str, index: usize, total: usize) {
        self.bar.set_message(format!("{file} ({index}/{total})"));
    }

    fn on_poll(&self, what: &str, elapsed_secs: u64, states: &[String]) {
        self.bar.set_message(format!(
            "{what}  {}  {}",
            dim(&format!("{elapsed_secs}s")),
            summarize_states(states)
        ));
    }
}

/// `ok×2 running×1`, sorted by state name.
fn summarize_states(states: &[String]) -> String {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for s in states {
        *counts.entry(s.as_str()).or_default() += 1;
    }
    counts
        .iter()
        .map(|(state, n)| format!("{state}×{n}"))
        .collect::<Vec<_>>()
        .join(" ")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Paired-end reads, credentials from the environment
  export GALAXY_URL=https://usegalaxy.org
  export GALAXY_API_KEY=...
  galaxy-assemble --fastq1 sample_R1.fastq.gz --fastq2 sample_R2.fastq.gz

  # Single-end reads to a custom output path
  galaxy-assemble --fastq1 reads.fastq -o transcripts.fasta

  # Only accept Trinity, fail instead of converting locally
  galaxy-assemble --fastq1 r1.fq --fastq2 r2.fq --assembler trinity --no-local-fallback

  # Machine-readable summary
  galaxy-assemble --fastq1 r1.fq --json > run.json

WHAT HAPPENS:
  1. The reads are uploaded into a new history on the Galaxy server.
  2. The first assembler matching a keyword (rnaSPAdes, Trinity, RNA-Bloom,
     Trans-ABySS, Oases, ...) runs on the server.
  3. If none can take the reads, a FASTQ→FASTA tool runs instead; if the
     server has none, the reads are converted locally.
  4. The resulting FASTA is downloaded. The history stays on the server.

ENVIRONMENT VARIABLES:
  GALAXY_URL       Galaxy server base URL
  GALAXY_API_KEY   API key (User → Preferences → Manage API Key)
  RUST_LOG         Override log filter (e.g. galaxy_assemble=debug)
"#;

/// Assemble FASTQ reads into a FASTA file on a Galaxy server.
#[derive(Parser, Debug)]
#[command(
    name = "galaxy-assemble",
    version,
    about = "Assemble FASTQ reads into FASTA on a Galaxy server",
    long_about = "Upload one or two FASTQ files to a Galaxy server, run a de novo transcriptome \
assembler there, and download the resulting FASTA. Falls back to FASTQ→FASTA conversion when no \
assembler is available.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Galaxy server base URL (e.g. https://usegalaxy.org).
    #[arg(long, env = "GALAXY_URL")]
    galaxy_url: Option<String>,

    /// Galaxy API key.
    #[arg(long, env = "GALAXY_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// R1 (or single-end) FASTQ file, optionally gzipped.
    #[arg(long)]
    fastq1: PathBuf,

    /// R2 FASTQ file for paired-end reads.
    #[arg(long)]
    fastq2: Option<PathBuf>,

    /// Name of the history created for this run.
    #[arg(long, default_value = "fastq_to_fasta_history")]
    history_name: String,

    /// Where to write the FASTA.
    #[arg(short, long = "out", default_value = "assembly.fasta")]
    out: PathBuf,

    /// Overall wait budget in seconds for server-side jobs.
    #[arg(long, default_value_t = 3600,
          value_parser = clap::value_parser!(u64).range(1..))]
    wait_timeout: u64,

    /// Assembler keyword to search for; repeat to give several in priority order.
    #[arg(long = "assembler", value_name = "KEYWORD")]
    assemblers: Vec<String>,

    /// Fail instead of converting locally when the server has no converter.
    #[arg(long)]
    no_local_fallback: bool,

    /// Print the run summary as JSON on stdout.
    #[arg(long)]
    json: bool,

    /// Disable the progress spinner.
    #[arg(long)]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner covers what INFO logs would say, so keep them quiet while
    // it is shown.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let progress = show_progress.then(CliProgressCallback::new);
    let config = build_config(
        &cli,
        progress
            .clone()
            .map(|cb| cb as Arc<dyn AssemblyProgressCallback>),
    )?;

    // ── Run ──────────────────────────────────────────────────────────────
    let result = assemble(&config).await;
    if let Some(cb) = &progress {
        cb.finish();
    }
    let output = result.context("Assembly failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    } else if !cli.quiet {
        print_summary(&output);
    }

    Ok(())
}

/// Map CLI args to `AssemblyConfig`.
///
/// Missing credentials are reported here, before any network call.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<AssemblyConfig> {
    let galaxy_url = cli
        .galaxy_url
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .context("No Galaxy URL given: pass --galaxy-url or set GALAXY_URL")?;
    let api_key = cli
        .api_key
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .context("No Galaxy API key given: pass --api-key or set GALAXY_API_KEY")?;

    let mut builder = AssemblyConfig::builder()
        .galaxy_url(galaxy_url)
        .api_key(api_key)
        .reads(ReadFiles::new(&cli.fastq1, cli.fastq2.clone()))
        .history_name(&cli.history_name)
        .output_path(&cli.out)
        .wait_timeout_secs(cli.wait_timeout)
        .local_fallback(!cli.no_local_fallback);

    if !cli.assemblers.is_empty() {
        builder = builder.assembler_keywords(cli.assemblers.iter().cloned());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn print_summary(output: &AssemblyOutput) {
    let how = match &output.mode {
        RunMode::Assembly { tool_id } => format!("assembled with {}", cyan(tool_id)),
        RunMode::ServerConversion { tool_id } => {
            format!("{} with {}", yellow("converted (no assembler)"), cyan(tool_id))
        }
        RunMode::LocalConversion { counts } => format!(
            "{} ({} reads)",
            yellow("converted locally (no assembler or converter on server)"),
            counts.records
        ),
    };
    eprintln!(
        "{}  {}  {} bytes  {}ms  →  {}",
        green("✔"),
        how,
        output.bytes_written,
        output.stats.total_ms,
        bold(&output.output_path.display().to_string()),
    );
    eprintln!("   History: {}", output.history_url);
}
