//! End-to-end run: authenticate, upload, assemble (or convert), poll,
//! download.
//!
//! Each step is one awaited call (or one polling loop) against
//! [`GalaxyApi`]; the first error aborts the run. The history is left on the
//! server either way so the user can inspect it in the web UI.

use crate::api::{GalaxyApi, GalaxyClient, HistoryItem, ToolSummary};
use crate::config::{basename, AssemblyConfig};
use crate::error::GalaxyError;
use crate::output::{AssemblyOutput, RunMode, RunStats};
use crate::pipeline::inputs::{conversion_inputs, plan_assembly, InputPlan};
use crate::pipeline::{convert, input, poll, tools, upload};
use crate::progress::{ProgressCallback, Stage};
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Run the full workflow against the server named in `config`.
///
/// # Errors
/// Returns the first failure: an unreadable read file, a rejected API key,
/// an API error, a missing tool, or a timed-out job.
pub async fn assemble(config: &AssemblyConfig) -> Result<AssemblyOutput, GalaxyError> {
    let client = GalaxyClient::from_config(config)?;
    assemble_with(&client, config).await
}

/// Synchronous wrapper around [`assemble`].
///
/// Creates a temporary tokio runtime internally.
pub fn assemble_sync(config: &AssemblyConfig) -> Result<AssemblyOutput, GalaxyError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| GalaxyError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(assemble(config))
}

/// Run the full workflow against any [`GalaxyApi`] implementation.
pub async fn assemble_with(
    api: &dyn GalaxyApi,
    config: &AssemblyConfig,
) -> Result<AssemblyOutput, GalaxyError> {
    let total_start = Instant::now();
    let cb = config.progress_callback.as_ref();

    // ── Step 1: Validate local reads ─────────────────────────────────────
    let reads = input::resolve_reads(&config.reads)?;

    // ── Step 2: Authenticate ─────────────────────────────────────────────
    info!("Connecting to Galaxy at {}", config.galaxy_url);
    stage_start(cb, Stage::Authenticate);
    let user = api.whoami().await?;
    info!("Authenticated as {}", user.display_name());
    stage_complete(cb, Stage::Authenticate);

    // ── Step 3: Create history ───────────────────────────────────────────
    info!("Creating history: {}", config.history_name);
    stage_start(cb, Stage::CreateHistory);
    let history = api.create_history(&config.history_name).await?;
    let history_id = history.id;
    stage_complete(cb, Stage::CreateHistory);

    // ── Step 4: Upload reads ─────────────────────────────────────────────
    let upload_start = Instant::now();
    stage_start(cb, Stage::Upload);
    upload::upload_reads(api, &history_id, &reads, cb).await?;
    info!("Waiting for uploads to complete...");
    let contents = poll::wait_for_history_ready(
        api,
        &history_id,
        "waiting for uploads to finish processing",
        config.poll.upload_interval,
        config.upload_budget(),
        cb,
    )
    .await?;
    let basenames: Vec<String> = reads.iter().map(|r| r.basename.clone()).collect();
    let datasets = upload::map_uploaded_datasets(&contents, &basenames, &history_id)?;
    info!("Uploaded dataset IDs: {:?}", datasets);
    stage_complete(cb, Stage::Upload);
    let upload_ms = upload_start.elapsed().as_millis() as u64;

    // ── Step 5: Pick assembler or fallback ───────────────────────────────
    let job_start = Instant::now();
    stage_start(cb, Stage::SelectTool);
    let server_tools = api.list_tools().await?;
    debug!("Server offers {} tools", server_tools.len());
    let assembler = select_assembler(api, config, &server_tools, &datasets, &history_id).await?;
    stage_complete(cb, Stage::SelectTool);

    // ── Step 6: Run the job and find its FASTA ───────────────────────────
    let produced = match assembler {
        Some((tool_id, plan)) => {
            let dataset = run_assembler(api, config, &history_id, &tool_id, plan).await?;
            Produced::Dataset(RunMode::Assembly { tool_id }, dataset)
        }
        None => run_conversion(api, config, &server_tools, &datasets, &history_id).await?,
    };
    let job_ms = job_start.elapsed().as_millis() as u64;

    // ── Step 7: Download ─────────────────────────────────────────────────
    let download_start = Instant::now();
    let (mode, dataset, bytes_written) = match produced {
        Produced::Dataset(mode, dataset) => {
            let bytes = download(api, config, &dataset).await?;
            (mode, Some(dataset), bytes)
        }
        Produced::Local(mode) => {
            let bytes = tokio::fs::metadata(&config.output_path)
                .await
                .map(|m| m.len())
                .map_err(|e| GalaxyError::OutputWriteFailed {
                    path: config.output_path.clone(),
                    source: e,
                })?;
            if bytes == 0 {
                return Err(GalaxyError::EmptyOutput {
                    dataset_id: "local".to_string(),
                    path: config.output_path.clone(),
                });
            }
            (mode, None, bytes)
        }
    };
    let download_ms = download_start.elapsed().as_millis() as u64;

    let history_url = config.history_url(&history_id);
    info!("Output saved to: {}", config.output_path.display());
    info!("History URL (view in web browser): {}", history_url);

    Ok(AssemblyOutput {
        history_id,
        history_url,
        mode,
        dataset,
        output_path: config.output_path.clone(),
        bytes_written,
        stats: RunStats {
            upload_ms,
            job_ms,
            download_ms,
            total_ms: total_start.elapsed().as_millis() as u64,
        },
    })
}

/// What the job stage produced.
enum Produced {
    /// A dataset on the server, still to be downloaded.
    Dataset(RunMode, HistoryItem),
    /// Already written to the output path.
    Local(RunMode),
}

/// Find an assembler and plan its inputs, or `None` to fall back.
///
/// Falls back when no tool matches or the matching tool has no input the
/// reads fit into. Any other failure aborts.
async fn select_assembler(
    api: &dyn GalaxyApi,
    config: &AssemblyConfig,
    server_tools: &[ToolSummary],
    datasets: &HashMap<String, String>,
    history_id: &str,
) -> Result<Option<(String, InputPlan)>, GalaxyError> {
    let Some(found) = tools::find_tool_by_keywords(server_tools, &config.assembler_keywords)
    else {
        warn!(
            "No assembler matching {:?} on this server; falling back to FASTQ→FASTA conversion",
            config.assembler_keywords
        );
        return Ok(None);
    };
    info!("Selected tool id: {}", found.id);

    let info = api.show_tool(&found.id).await?;
    match plan_assembly(&found.id, &info, datasets, &config.reads, history_id) {
        Ok(plan) => {
            debug!("Prepared tool inputs: {:?}", plan);
            Ok(Some((found.id.clone(), plan)))
        }
        Err(e @ GalaxyError::NoReadInputSlot { .. }) => {
            warn!("{}; falling back to FASTQ→FASTA conversion", e);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

async fn run_assembler(
    api: &dyn GalaxyApi,
    config: &AssemblyConfig,
    history_id: &str,
    tool_id: &str,
    plan: InputPlan,
) -> Result<HistoryItem, GalaxyError> {
    let cb = config.progress_callback.as_ref();

    stage_start(cb, Stage::RunJob);
    let collection_id = match &plan {
        InputPlan::NeedsCollection { desc, .. } => {
            info!("Building dataset collection '{}' for the reads", desc.name);
            Some(api.create_collection(history_id, desc).await?.id)
        }
        InputPlan::Ready(_) => None,
    };
    let inputs = plan.into_inputs(collection_id.as_deref());

    info!("Launching {}; the job runs on the Galaxy server", tool_id);
    let run = api.run_tool(history_id, tool_id, &inputs).await?;
    info!(
        "Tool run queued: {} job(s), {} output(s)",
        run.jobs.len(),
        run.outputs.len()
    );
    stage_complete(cb, Stage::RunJob);

    stage_start(cb, Stage::Poll);
    info!("Waiting for the assembler to finish (this may take a long time)...");
    poll::wait_for_history_ready(
        api,
        history_id,
        "waiting for the assembler to finish",
        config.poll.assembly_interval,
        config.assembly_budget(),
        cb,
    )
    .await?;

    info!("Looking for FASTA output in history...");
    let found = poll::poll_for_dataset_with_ext(
        api,
        history_id,
        &config.fasta_extensions,
        None,
        config.poll.output_interval,
        config.poll.assembly_output_timeout,
        cb,
    )
    .await;

    let dataset = match found {
        Ok(ds) => ds,
        Err(GalaxyError::Timeout { secs, .. }) => {
            let contents = api.history_contents(history_id).await?;
            warn!("Timed out waiting for FASTA. History contents:");
            let listing: Vec<String> = contents
                .iter()
                .map(|ds| format!(" - {}", ds.summary()))
                .collect();
            for line in &listing {
                warn!("{}", line);
            }
            return Err(GalaxyError::OutputNotFound {
                history_id: history_id.to_string(),
                secs,
                contents: listing.join("\n"),
            });
        }
        Err(e) => return Err(e),
    };
    stage_complete(cb, Stage::Poll);
    info!("Found FASTA dataset: {} {}", dataset.id, dataset.name());
    Ok(dataset)
}

async fn run_conversion(
    api: &dyn GalaxyApi,
    config: &AssemblyConfig,
    server_tools: &[ToolSummary],
    datasets: &HashMap<String, String>,
    history_id: &str,
) -> Result<Produced, GalaxyError> {
    let cb = config.progress_callback.as_ref();

    let Some(converter) = tools::find_tool_by_keywords(server_tools, &config.converter_keywords)
    else {
        if !config.local_fallback {
            return Err(GalaxyError::NoConverterFound {
                keywords: config.converter_keywords.join(", "),
            });
        }
        warn!("No conversion tool on this server; converting locally");
        stage_start(cb, Stage::Download);
        let counts = convert::convert_local(&config.reads, &config.output_path).await?;
        stage_complete(cb, Stage::Download);
        return Ok(Produced::Local(RunMode::LocalConversion { counts }));
    };
    info!("Selected conversion tool: {}", converter.id);

    let r1_name = basename(config.reads.r1());
    let r1_id = datasets
        .get(&r1_name)
        .ok_or_else(|| GalaxyError::DatasetMissing {
            file: r1_name.clone(),
            history_id: history_id.to_string(),
        })?;

    stage_start(cb, Stage::RunJob);
    info!("Launching conversion tool...");
    let run = api
        .run_tool(history_id, &converter.id, &conversion_inputs(r1_id))
        .await?;
    debug!("Tool run response: {:?}", run);
    stage_complete(cb, Stage::RunJob);

    stage_start(cb, Stage::Poll);
    info!("Waiting for conversion to finish...");
    poll::wait_for_history_ready(
        api,
        history_id,
        "waiting for the conversion to finish",
        config.poll.conversion_interval,
        config.conversion_budget(),
        cb,
    )
    .await?;
    let dataset = poll::poll_for_dataset_with_ext(
        api,
        history_id,
        &config.fasta_extensions,
        None,
        config.poll.output_interval,
        config.poll.conversion_output_timeout,
        cb,
    )
    .await?;
    stage_complete(cb, Stage::Poll);
    info!("Found FASTA dataset: {} {}", dataset.id, dataset.name());

    Ok(Produced::Dataset(
        RunMode::ServerConversion {
            tool_id: converter.id.clone(),
        },
        dataset,
    ))
}

async fn download(
    api: &dyn GalaxyApi,
    config: &AssemblyConfig,
    dataset: &HistoryItem,
) -> Result<u64, GalaxyError> {
    let cb = config.progress_callback.as_ref();
    let ext = match dataset.ext() {
        "" => "fasta",
        e => e,
    };

    stage_start(cb, Stage::Download);
    info!("Downloading FASTA to {}", config.output_path.display());
    let bytes = api
        .download_dataset(&dataset.id, ext, &config.output_path)
        .await?;
    if bytes == 0 {
        return Err(GalaxyError::EmptyOutput {
            dataset_id: dataset.id.clone(),
            path: config.output_path.clone(),
        });
    }
    stage_complete(cb, Stage::Download);
    Ok(bytes)
}

fn stage_start(cb: Option<&ProgressCallback>, stage: Stage) {
    if let Some(cb) = cb {
        cb.on_stage_start(stage);
    }
}

fn stage_complete(cb: Option<&ProgressCallback>, stage: Stage) {
    if let Some(cb) = cb {
        cb.on_stage_complete(stage);
    }
}
