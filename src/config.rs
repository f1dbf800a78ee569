//! Configuration types for an upload-assemble-download run.
//!
//! All run behaviour is controlled through [`AssemblyConfig`], built via its
//! [`AssemblyConfigBuilder`]. Server URL, API key and the read files are
//! required; everything else has a default matching the historical behaviour
//! of the tool (one hour job budget, rnaSPAdes first, FASTA written to
//! `assembly.fasta`).

use crate::error::GalaxyError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Assembler keywords, searched in this order against tool ids and names.
pub const DEFAULT_ASSEMBLER_KEYWORDS: &[&str] = &[
    "rnaSPAdes",
    "rnaspades",
    "trinity",
    "rnaplants",
    "rna-bloom",
    "rna_bloom",
    "transabyss",
    "oases",
];

/// FASTQ→FASTA conversion tools used when no assembler can be run.
pub const DEFAULT_CONVERTER_KEYWORDS: &[&str] = &[
    "toolshed.g2.bx.psu.edu/repos/devteam/fastq_to_fasta/fastq_to_fasta",
    "seqtk_seq",
    "seqtk_seq_v2",
];

/// Dataset extensions that count as FASTA output.
pub const DEFAULT_FASTA_EXTENSIONS: &[&str] =
    &["fasta", "fa", "fna", "fasta.gz", "fa.gz", "fna.gz"];

/// One single-end read file or an R1/R2 pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReadFiles {
    Single(PathBuf),
    Paired(PathBuf, PathBuf),
}

impl ReadFiles {
    /// Build from CLI-style arguments: R1 always, R2 optionally.
    pub fn new(r1: impl Into<PathBuf>, r2: Option<PathBuf>) -> Self {
        match r2 {
            Some(r2) => ReadFiles::Paired(r1.into(), r2),
            None => ReadFiles::Single(r1.into()),
        }
    }

    pub fn r1(&self) -> &Path {
        match self {
            ReadFiles::Single(p) | ReadFiles::Paired(p, _) => p,
        }
    }

    pub fn r2(&self) -> Option<&Path> {
        match self {
            ReadFiles::Single(_) => None,
            ReadFiles::Paired(_, p) => Some(p),
        }
    }

    pub fn is_paired(&self) -> bool {
        matches!(self, ReadFiles::Paired(..))
    }

    /// Paths in upload order (R1 first).
    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        std::iter::once(self.r1()).chain(self.r2())
    }

    /// File names as Galaxy will name the uploaded datasets.
    pub fn basenames(&self) -> Vec<String> {
        self.iter().map(basename).collect()
    }

    /// "paired-end" or "single-end", for messages.
    pub fn layout(&self) -> &'static str {
        if self.is_paired() {
            "paired-end"
        } else {
            "single-end"
        }
    }
}

/// Last path component as a lossy string, or the whole path if it has none.
pub fn basename(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// Poll intervals and output-search budgets.
///
/// The job-wait budgets themselves derive from
/// [`AssemblyConfig::wait_timeout`]; see [`AssemblyConfig::upload_budget`] and
/// friends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollSettings {
    /// Interval between history checks while uploads are processed. Default: 3 s.
    pub upload_interval: Duration,
    /// Interval between history checks while an assembler runs. Default: 10 s.
    pub assembly_interval: Duration,
    /// Interval between history checks while a converter runs. Default: 5 s.
    pub conversion_interval: Duration,
    /// Interval between scans for the FASTA dataset. Default: 5 s.
    pub output_interval: Duration,
    /// How long to look for FASTA output after an assembler. Default: 1200 s.
    pub assembly_output_timeout: Duration,
    /// How long to look for FASTA output after a converter. Default: 900 s.
    pub conversion_output_timeout: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            upload_interval: Duration::from_secs(3),
            assembly_interval: Duration::from_secs(10),
            conversion_interval: Duration::from_secs(5),
            output_interval: Duration::from_secs(5),
            assembly_output_timeout: Duration::from_secs(1200),
            conversion_output_timeout: Duration::from_secs(900),
        }
    }
}

impl PollSettings {
    /// Every interval and budget set to `d`. Handy for tests against mocks.
    pub fn uniform(d: Duration) -> Self {
        Self {
            upload_interval: d,
            assembly_interval: d,
            conversion_interval: d,
            output_interval: d,
            assembly_output_timeout: d,
            conversion_output_timeout: d,
        }
    }
}

/// Configuration for one upload → assemble → download run.
///
/// Built via [`AssemblyConfig::builder()`].
///
/// # Example
/// ```rust
/// use galaxy_assemble::{AssemblyConfig, ReadFiles};
///
/// let config = AssemblyConfig::builder()
///     .galaxy_url("https://usegalaxy.org")
///     .api_key("0123456789abcdef")
///     .reads(ReadFiles::new("sample_R1.fastq.gz", None))
///     .build()
///     .unwrap();
/// assert_eq!(config.history_name, "fastq_to_fasta_history");
/// ```
#[derive(Clone)]
pub struct AssemblyConfig {
    /// Galaxy base URL without trailing slash, e.g. `https://usegalaxy.org`.
    pub galaxy_url: String,

    /// Galaxy API key, sent as the `x-api-key` header.
    pub api_key: String,

    /// Read files to upload.
    pub reads: ReadFiles,

    /// Name of the history created for this run. Default: `fastq_to_fasta_history`.
    pub history_name: String,

    /// Local path the FASTA result is written to. Default: `assembly.fasta`.
    pub output_path: PathBuf,

    /// Overall job budget. Default: 3600 s.
    ///
    /// Uploads get a quarter of it, a fallback conversion half, an assembler
    /// all of it.
    pub wait_timeout: Duration,

    /// Per-request HTTP timeout. Default: 300 s.
    pub request_timeout: Duration,

    /// Tool-search keywords for assemblers, in priority order.
    pub assembler_keywords: Vec<String>,

    /// Tool-search keywords for FASTQ→FASTA converters, in priority order.
    pub converter_keywords: Vec<String>,

    /// Dataset extensions accepted as the FASTA output.
    pub fasta_extensions: Vec<String>,

    /// Convert locally when the server has no conversion tool. Default: true.
    pub local_fallback: bool,

    /// Poll intervals and output-search budgets.
    pub poll: PollSettings,

    /// Optional per-stage progress callback.
    pub progress_callback: Option<ProgressCallback>,
}

impl fmt::Debug for AssemblyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssemblyConfig")
            .field("galaxy_url", &self.galaxy_url)
            .field("api_key", &"<redacted>")
            .field("reads", &self.reads)
            .field("history_name", &self.history_name)
            .field("output_path", &self.output_path)
            .field("wait_timeout", &self.wait_timeout)
            .field("request_timeout", &self.request_timeout)
            .field("assembler_keywords", &self.assembler_keywords)
            .field("converter_keywords", &self.converter_keywords)
            .field("local_fallback", &self.local_fallback)
            .field("poll", &self.poll)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn AssemblyProgressCallback>"),
            )
            .finish()
    }
}

impl AssemblyConfig {
    /// Create a new builder for `AssemblyConfig`.
    pub fn builder() -> AssemblyConfigBuilder {
        AssemblyConfigBuilder {
            galaxy_url: None,
            api_key: None,
            reads: None,
            history_name: "fastq_to_fasta_history".to_string(),
            output_path: PathBuf::from("assembly.fasta"),
            wait_timeout: Duration::from_secs(60 * 60),
            request_timeout: Duration::from_secs(300),
            assembler_keywords: to_strings(DEFAULT_ASSEMBLER_KEYWORDS),
            converter_keywords: to_strings(DEFAULT_CONVERTER_KEYWORDS),
            fasta_extensions: to_strings(DEFAULT_FASTA_EXTENSIONS),
            local_fallback: true,
            poll: PollSettings::default(),
            progress_callback: None,
        }
    }

    /// Budget for uploads to finish processing: a quarter of `wait_timeout`.
    pub fn upload_budget(&self) -> Duration {
        self.wait_timeout / 4
    }

    /// Budget for a fallback conversion job: half of `wait_timeout`.
    pub fn conversion_budget(&self) -> Duration {
        self.wait_timeout / 2
    }

    /// Budget for the assembler job: all of `wait_timeout`.
    pub fn assembly_budget(&self) -> Duration {
        self.wait_timeout
    }

    /// Web UI link for a history.
    pub fn history_url(&self, history_id: &str) -> String {
        format!("{}/h/{}", self.galaxy_url, history_id)
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Trimmed keywords, with blank ones dropped.
fn non_blank<I, S>(keywords: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    keywords
        .into_iter()
        .map(|k| k.into().trim().to_string())
        .filter(|k| !k.is_empty())
        .collect()
}

/// Builder for [`AssemblyConfig`].
pub struct AssemblyConfigBuilder {
    galaxy_url: Option<String>,
    api_key: Option<String>,
    reads: Option<ReadFiles>,
    history_name: String,
    output_path: PathBuf,
    wait_timeout: Duration,
    request_timeout: Duration,
    assembler_keywords: Vec<String>,
    converter_keywords: Vec<String>,
    fasta_extensions: Vec<String>,
    local_fallback: bool,
    poll: PollSettings,
    progress_callback: Option<ProgressCallback>,
}

impl AssemblyConfigBuilder {
    pub fn galaxy_url(mut self, url: impl Into<String>) -> Self {
        self.galaxy_url = Some(url.into());
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn reads(mut self, reads: ReadFiles) -> Self {
        self.reads = Some(reads);
        self
    }

    pub fn history_name(mut self, name: impl Into<String>) -> Self {
        self.history_name = name.into();
        self
    }

    pub fn output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = path.into();
        self
    }

    pub fn wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = timeout;
        self
    }

    pub fn wait_timeout_secs(self, secs: u64) -> Self {
        self.wait_timeout(Duration::from_secs(secs))
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn assembler_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.assembler_keywords = non_blank(keywords);
        self
    }

    pub fn converter_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.converter_keywords = non_blank(keywords);
        self
    }

    pub fn fasta_extensions<I, S>(mut self, exts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fasta_extensions = exts.into_iter().map(Into::into).collect();
        self
    }

    pub fn local_fallback(mut self, v: bool) -> Self {
        self.local_fallback = v;
        self
    }

    pub fn poll(mut self, poll: PollSettings) -> Self {
        self.poll = poll;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<AssemblyConfig, GalaxyError> {
        let galaxy_url = self
            .galaxy_url
            .map(|u| u.trim().trim_end_matches('/').to_string())
            .filter(|u| !u.is_empty())
            .ok_or_else(|| {
                GalaxyError::InvalidConfig(
                    "Galaxy URL must be provided via --galaxy-url or GALAXY_URL".into(),
                )
            })?;
        if !galaxy_url.starts_with("http://") && !galaxy_url.starts_with("https://") {
            return Err(GalaxyError::InvalidConfig(format!(
                "Galaxy URL must start with http:// or https://, got '{galaxy_url}'"
            )));
        }

        let api_key = self
            .api_key
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                GalaxyError::InvalidConfig(
                    "API key must be provided via --api-key or GALAXY_API_KEY".into(),
                )
            })?;

        let reads = self
            .reads
            .ok_or_else(|| GalaxyError::InvalidConfig("At least one FASTQ file is required".into()))?;

        if self.wait_timeout < Duration::from_secs(1) {
            return Err(GalaxyError::InvalidConfig(
                "Wait timeout must be ≥ 1s".into(),
            ));
        }
        if self.fasta_extensions.is_empty() {
            return Err(GalaxyError::InvalidConfig(
                "At least one FASTA extension is required".into(),
            ));
        }

        Ok(AssemblyConfig {
            galaxy_url,
            api_key,
            reads,
            history_name: self.history_name,
            output_path: self.output_path,
            wait_timeout: self.wait_timeout,
            request_timeout: self.request_timeout,
            assembler_keywords: self.assembler_keywords,
            converter_keywords: self.converter_keywords,
            fasta_extensions: self.fasta_extensions,
            local_fallback: self.local_fallback,
            poll: self.poll,
            progress_callback: self.progress_callback,
        })
    }
}
