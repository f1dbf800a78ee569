//! Galaxy REST API access.
//!
//! [`GalaxyApi`] is the only seam between the workflow and the network. The
//! production implementation is [`GalaxyClient`] (reqwest); tests substitute
//! a `mockall` mock so the whole workflow can run without a server.
//!
//! ```text
//! whoami ─▶ create_history ─▶ upload_file ×N ─▶ history_contents (poll)
//!        ─▶ list_tools / show_tool ─▶ [create_collection] ─▶ run_tool
//!        ─▶ history_contents (poll) ─▶ download_dataset
//! ```

pub mod client;
pub mod types;

pub use client::GalaxyClient;
pub use types::*;

use crate::error::GalaxyError;
use async_trait::async_trait;
use std::path::Path;

/// The subset of the Galaxy API used by this crate.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GalaxyApi: Send + Sync {
    /// Current user; doubles as an API-key check.
    async fn whoami(&self) -> Result<User, GalaxyError>;

    /// Create a new history named `name`.
    async fn create_history(&self, name: &str) -> Result<History, GalaxyError>;

    /// Upload a local file into a history via the `upload1` tool.
    async fn upload_file(&self, history_id: &str, path: &Path) -> Result<ToolRun, GalaxyError>;

    /// All items in a history, including deleted ones.
    async fn history_contents(&self, history_id: &str) -> Result<Vec<HistoryItem>, GalaxyError>;

    /// Every tool installed on the server.
    async fn list_tools(&self) -> Result<Vec<ToolSummary>, GalaxyError>;

    /// A tool's full input tree.
    async fn show_tool(&self, tool_id: &str) -> Result<ToolInfo, GalaxyError>;

    /// Create a dataset collection in a history.
    async fn create_collection(
        &self,
        history_id: &str,
        desc: &CollectionDescription,
    ) -> Result<Collection, GalaxyError>;

    /// Launch a tool. Returns as soon as the job is queued.
    async fn run_tool(
        &self,
        history_id: &str,
        tool_id: &str,
        inputs: &ToolInputs,
    ) -> Result<ToolRun, GalaxyError>;

    /// Stream a dataset to `dest`, returning the number of bytes written.
    async fn download_dataset(
        &self,
        dataset_id: &str,
        ext: &str,
        dest: &Path,
    ) -> Result<u64, GalaxyError>;
}
