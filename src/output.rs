//! Result types returned by a successful run.

use crate::api::HistoryItem;
use crate::pipeline::convert::ConversionCounts;
use serde::Serialize;
use std::path::PathBuf;

/// How the FASTA was produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunMode {
    /// A de novo assembler ran on the server.
    Assembly { tool_id: String },
    /// No usable assembler; a FASTQ→FASTA tool ran on the server.
    ServerConversion { tool_id: String },
    /// Neither was available; the reads were converted locally.
    LocalConversion { counts: ConversionCounts },
}

impl RunMode {
    pub fn tool_id(&self) -> Option<&str> {
        match self {
            RunMode::Assembly { tool_id } | RunMode::ServerConversion { tool_id } => Some(tool_id),
            RunMode::LocalConversion { .. } => None,
        }
    }
}

/// Wall-clock timings, in milliseconds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    /// Uploading and waiting for uploads to be processed.
    pub upload_ms: u64,
    /// Tool selection, job launch and waiting for output.
    pub job_ms: u64,
    /// Downloading (or locally writing) the FASTA.
    pub download_ms: u64,
    pub total_ms: u64,
}

/// Everything a caller needs after a successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssemblyOutput {
    pub history_id: String,
    /// Link to the history in the Galaxy web UI.
    pub history_url: String,
    pub mode: RunMode,
    /// The downloaded dataset; `None` for local conversion.
    pub dataset: Option<HistoryItem>,
    pub output_path: PathBuf,
    pub bytes_written: u64,
    pub stats: RunStats,
}
