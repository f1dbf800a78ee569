//! Waiting on the server: poll a history until its datasets settle or a
//! FASTA dataset shows up.
//!
//! Both loops have the same shape: look, decide, check the budget, sleep.
//! The budget is checked after looking, so a history that is already ready
//! never times out, even with a zero budget.

use crate::api::{GalaxyApi, HistoryItem};
use crate::error::GalaxyError;
use crate::progress::ProgressCallback;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::debug;

/// Poll until every dataset in the history is `ok`, `error` or `discarded`.
///
/// Returns the final history contents.
pub async fn wait_for_history_ready(
    api: &dyn GalaxyApi,
    history_id: &str,
    what: &str,
    interval: Duration,
    timeout: Duration,
    progress: Option<&ProgressCallback>,
) -> Result<Vec<HistoryItem>, GalaxyError> {
    let start = Instant::now();
    loop {
        let contents = api.history_contents(history_id).await?;
        let states: Vec<String> = contents.iter().map(|d| d.state().to_string()).collect();
        if let Some(cb) = progress {
            cb.on_poll(what, start.elapsed().as_secs(), &states);
        }

        if contents.iter().all(HistoryItem::is_terminal) {
            debug!("History {} ready ({} items)", history_id, contents.len());
            return Ok(contents);
        }
        if start.elapsed() > timeout {
            return Err(GalaxyError::Timeout {
                what: what.to_string(),
                secs: timeout.as_secs(),
            });
        }
        debug!("History {} states: {:?}", history_id, states);
        sleep(interval).await;
    }
}

/// True if `item` looks like a dataset with one of `exts`.
///
/// Either the datatype matches exactly, or the name ends in `.<ext>`
/// (case-insensitive). `name_contains` further restricts the match.
pub fn matches_extension<S: AsRef<str>>(
    item: &HistoryItem,
    exts: &[S],
    name_contains: Option<&str>,
) -> bool {
    let ext = item.ext();
    let name = item.name().to_lowercase();
    let ext_match = exts.iter().any(|e| {
        let e = e.as_ref();
        ext == e || name.ends_with(&format!(".{}", e.to_lowercase()))
    });
    ext_match
        && name_contains
            .map(|needle| name.contains(&needle.to_lowercase()))
            .unwrap_or(true)
}

/// Poll until a dataset with one of `exts` appears in the history.
pub async fn poll_for_dataset_with_ext<S: AsRef<str> + Sync>(
    api: &dyn GalaxyApi,
    history_id: &str,
    exts: &[S],
    name_contains: Option<&str>,
    interval: Duration,
    timeout: Duration,
    progress: Option<&ProgressCallback>,
) -> Result<HistoryItem, GalaxyError> {
    let start = Instant::now();
    loop {
        let contents = api.history_contents(history_id).await?;
        if let Some(cb) = progress {
            let states: Vec<String> = contents.iter().map(|d| d.state().to_string()).collect();
            cb.on_poll("FASTA output", start.elapsed().as_secs(), &states);
        }

        if let Some(found) = contents
            .into_iter()
            .find(|d| matches_extension(d, exts, name_contains))
        {
            return Ok(found);
        }
        if start.elapsed() > timeout {
            return Err(GalaxyError::Timeout {
                what: "waiting for FASTA output in history".to_string(),
                secs: timeout.as_secs(),
            });
        }
        sleep(interval).await;
    }
}
