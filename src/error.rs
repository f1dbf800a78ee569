//! Error types for the galaxy-assemble library.
//!
//! Everything that can go wrong is a [`GalaxyError`]. There is no recovery
//! layer: a failed request, a missing tool or a timed-out job aborts the run
//! and is handed back to the caller as-is. The variants are grouped by where
//! the failure originates so the CLI can print an actionable hint.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the galaxy-assemble library.
#[derive(Debug, Error)]
pub enum GalaxyError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// A read file was not found at the given path.
    #[error("FASTQ file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The path exists but is a directory or other non-regular file.
    #[error("Not a regular file: '{path}'\nPass a FASTQ file, not a directory.")]
    NotAFile { path: PathBuf },

    /// The file could be opened but not read.
    #[error("Failed to read '{path}': {source}")]
    UnreadableInput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A FASTQ record could not be parsed during local conversion.
    #[error("Malformed FASTQ at line {line}: {detail}")]
    MalformedFastq { line: usize, detail: String },

    // ── Auth / transport errors ───────────────────────────────────────────
    /// Galaxy rejected the API key (HTTP 401/403).
    #[error("Galaxy rejected the API key for '{url}': {detail}\nCheck --api-key / GALAXY_API_KEY.")]
    AuthFailed { url: String, detail: String },

    /// The request never produced an HTTP response.
    #[error("Request to '{url}' failed: {reason}\nCheck --galaxy-url and your network connection.")]
    Http { url: String, reason: String },

    /// A single HTTP request exceeded the configured request timeout.
    #[error("Request to '{url}' timed out after {secs}s")]
    RequestTimeout { url: String, secs: u64 },

    /// Galaxy answered 404 for a history, tool or dataset.
    #[error("Not found on Galaxy: {url}")]
    NotFound { url: String },

    /// Galaxy answered with another non-success status.
    #[error("Galaxy API error (HTTP {status}) at '{url}': {message}")]
    Api {
        url: String,
        status: u16,
        message: String,
    },

    /// The response body did not match the expected JSON shape.
    #[error("Unexpected response from '{url}': {detail}")]
    InvalidResponse { url: String, detail: String },

    // ── Server-side workflow errors ───────────────────────────────────────
    /// Uploads finished but none of them could be found in the history.
    #[error("Uploaded datasets not found in history {history_id}")]
    UploadedDatasetsNotFound { history_id: String },

    /// A dataset id for a specific uploaded file is missing.
    #[error("Cannot find dataset id for '{file}' in history {history_id}")]
    DatasetMissing { file: String, history_id: String },

    /// No FASTQ→FASTA conversion tool exists and local fallback is disabled.
    #[error("Could not find a FASTQ→FASTA conversion tool (searched: {keywords})")]
    NoConverterFound { keywords: String },

    /// The selected tool exposes no input that can take the reads.
    #[error("Could not find a suitable read input on tool '{tool_id}' for {layout} reads")]
    NoReadInputSlot { tool_id: String, layout: String },

    // ── Polling errors ────────────────────────────────────────────────────
    /// Waiting on the history exceeded its budget.
    #[error("Timed out after {secs}s while {what}")]
    Timeout { what: String, secs: u64 },

    /// The job finished but no FASTA dataset appeared in the history.
    #[error("Timed out after {secs}s waiting for FASTA output in history {history_id}.\nHistory contents:\n{contents}")]
    OutputNotFound {
        history_id: String,
        secs: u64,
        contents: String,
    },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create or write the output FASTA file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The download completed but produced zero bytes.
    #[error("Downloaded dataset {dataset_id} is empty ('{path}')")]
    EmptyOutput { dataset_id: String, path: PathBuf },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GalaxyError {
    /// True for errors caused by the server's answer rather than the network
    /// or local files.
    pub fn is_api_error(&self) -> bool {
        matches!(
            self,
            GalaxyError::AuthFailed { .. }
                | GalaxyError::NotFound { .. }
                | GalaxyError::Api { .. }
                | GalaxyError::InvalidResponse { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_display() {
        let e = GalaxyError::Timeout {
            what: "waiting for uploads".into(),
            secs: 900,
        };
        let msg = e.to_string();
        assert!(msg.contains("900s"), "got: {msg}");
        assert!(msg.contains("uploads"), "got: {msg}");
    }

    #[test]
    fn api_error_display() {
        let e = GalaxyError::Api {
            url: "https://usegalaxy.org/api/tools".into(),
            status: 400,
            message: "Tool not found".into(),
        };
        assert!(e.to_string().contains("HTTP 400"));
        assert!(e.to_string().contains("Tool not found"));
        assert!(e.is_api_error());
    }

    #[test]
    fn auth_failed_hints_at_key() {
        let e = GalaxyError::AuthFailed {
            url: "https://usegalaxy.org".into(),
            detail: "Provided API key is not valid.".into(),
        };
        assert!(e.to_string().contains("GALAXY_API_KEY"));
        assert!(e.is_api_error());
    }

    #[test]
    fn output_not_found_lists_contents() {
        let e = GalaxyError::OutputNotFound {
            history_id: "f2db41e1fa331b3e".into(),
            secs: 1200,
            contents: " - 1 reads.fastq fastqsanger ok".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("f2db41e1fa331b3e"));
        assert!(msg.contains("reads.fastq"));
        assert!(!e.is_api_error());
    }
}
