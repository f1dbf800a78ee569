//! # galaxy-assemble
//!
//! Turn one or two FASTQ read files into a FASTA file using a Galaxy server.
//!
//! The heavy lifting happens on the server: this crate uploads the reads,
//! finds a de novo transcriptome assembler among the server's tools, runs it,
//! waits for the job and downloads the resulting FASTA. When no assembler can
//! take the reads it falls back to a FASTQ→FASTA conversion tool, and when the
//! server has none of those either, to converting the reads locally.
//!
//! ## Pipeline Overview
//!
//! ```text
//! FASTQ (R1 [+ R2])
//!  │
//!  ├─ 1. Input     check the read files exist and look like FASTQ
//!  ├─ 2. Auth      GET /api/whoami with the API key
//!  ├─ 3. History   create a fresh history for the run
//!  ├─ 4. Upload    upload1 per file, wait for the datasets to settle
//!  ├─ 5. Select    assembler by keyword → map reads onto its inputs
//!  │               (else converter, else local conversion)
//!  ├─ 6. Run       launch the job, poll until terminal, find the FASTA
//!  └─ 7. Download  stream the dataset to the output path
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use galaxy_assemble::{assemble, AssemblyConfig, ReadFiles};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AssemblyConfig::builder()
//!         .galaxy_url("https://usegalaxy.org")
//!         .api_key(std::env::var("GALAXY_API_KEY")?)
//!         .reads(ReadFiles::new("sample_R1.fastq.gz", Some("sample_R2.fastq.gz".into())))
//!         .output_path("assembly.fasta")
//!         .build()?;
//!     let output = assemble(&config).await?;
//!     eprintln!("{} bytes written, history at {}", output.bytes_written, output.history_url);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `galaxy-assemble` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! galaxy-assemble = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod api;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod workflow;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use api::{GalaxyApi, GalaxyClient};
pub use config::{AssemblyConfig, AssemblyConfigBuilder, PollSettings, ReadFiles};
pub use error::GalaxyError;
pub use output::{AssemblyOutput, RunMode, RunStats};
pub use progress::{AssemblyProgressCallback, NoopProgressCallback, ProgressCallback, Stage};
pub use workflow::{assemble, assemble_sync, assemble_with};
