//! Progress-callback trait for run stage events.
//!
//! Inject an [`Arc<dyn AssemblyProgressCallback>`] via
//! [`crate::config::AssemblyConfigBuilder::progress_callback`] to receive
//! events as the run moves through its stages. The CLI uses this to drive a
//! terminal spinner; library users can forward events anywhere.
//!
//! # Example
//!
//! ```rust
//! use galaxy_assemble::{AssemblyProgressCallback, Stage};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     polls: Arc<AtomicUsize>,
//! }
//!
//! impl AssemblyProgressCallback for CountingCallback {
//!     fn on_poll(&self, _what: &str, _elapsed_secs: u64, _states: &[String]) {
//!         self.polls.fetch_add(1, Ordering::SeqCst);
//!     }
//! }
//!
//! let cb: Arc<dyn AssemblyProgressCallback> = Arc::new(CountingCallback {
//!     polls: Arc::new(AtomicUsize::new(0)),
//! });
//! cb.on_stage_start(Stage::Upload);
//! ```

use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// The stages of a run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Stage {
    Authenticate,
    CreateHistory,
    Upload,
    SelectTool,
    RunJob,
    Poll,
    Download,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Authenticate => "Authenticating",
            Stage::CreateHistory => "Creating history",
            Stage::Upload => "Uploading",
            Stage::SelectTool => "Selecting tool",
            Stage::RunJob => "Launching job",
            Stage::Poll => "Waiting",
            Stage::Download => "Downloading",
        };
        f.write_str(s)
    }
}

/// Called by the workflow as it moves through each [`Stage`].
///
/// All methods have default no-op implementations so callers only override
/// what they care about. The run is sequential, so events never overlap.
pub trait AssemblyProgressCallback: Send + Sync {
    /// Called when a stage begins.
    fn on_stage_start(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called when a stage finishes successfully.
    fn on_stage_complete(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called before each file upload.
    ///
    /// # Arguments
    /// * `file`: basename of the file being uploaded
    /// * `index`: 1-indexed position in the upload order
    /// * `total`: number of files (1 or 2)
    fn on_upload(&self, file: &str, index: usize, total: usize) {
        let _ = (file, index, total);
    }

    /// Called after each look at the history while waiting.
    ///
    /// # Arguments
    /// * `what`: what is being waited for
    /// * `elapsed_secs`: seconds since the wait began
    /// * `states`: dataset states seen on this poll
    fn on_poll(&self, what: &str, elapsed_secs: u64, states: &[String]) {
        let _ = (what, elapsed_secs, states);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl AssemblyProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::AssemblyConfig`].
pub type ProgressCallback = Arc<dyn AssemblyProgressCallback>;
