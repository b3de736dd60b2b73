//! Pagination driver
//!
//! ```text
//! RUNNING -> FETCHING -> VALIDATING -> ACCUMULATING -> [CHECKPOINTING] -> FETCHING ...
//!                |                          |
//!                |                          +-> DONE (max_results reached)
//!                +-> DONE (empty page)
//!                +-> FATAL_STOPPED (retry budget exhausted, emergency checkpoint written)
//! ```
//!
//! `next_offset` is advanced only after every record of a batch has been merged.

use std::fmt;
use std::path::PathBuf;

use crate::config::ExtractionConfig;
use crate::core::PipelineState;
use crate::error::{Error, Result};
use crate::extraction::checkpoint::CheckpointManager;
use crate::extraction::fetcher::{BatchFetcher, FetchError, FetchOutcome, SparqlTransport};
use crate::extraction::plan::ExtractionPlan;
use crate::extraction::record::RawRecord;
use crate::extraction::validator::validate;
use crate::tabular;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverPhase {
    Running,
    Fetching,
    Validating,
    Accumulating,
    Checkpointing,
    Done,
    FatalStopped,
}

impl fmt::Display for DriverPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DriverPhase::Running => "running",
            DriverPhase::Fetching => "fetching",
            DriverPhase::Validating => "validating",
            DriverPhase::Accumulating => "accumulating",
            DriverPhase::Checkpointing => "checkpointing",
            DriverPhase::Done => "done",
            DriverPhase::FatalStopped => "fatal_stopped",
        };
        f.write_str(name)
    }
}

/// Counters and outputs of a finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Non-empty batches merged
    pub batches: u64,
    pub records_fetched: u64,
    /// Records rejected by validation or by the plan's merge rule
    pub records_invalid: u64,
    pub records_merged: u64,
    pub nodes: usize,
    pub edges: usize,
    pub next_offset: u64,
    /// Manifests of the periodic checkpoints written during the run
    pub checkpoints: Vec<PathBuf>,
    /// Final tables written to the output directory
    pub outputs: Vec<PathBuf>,
}

pub struct PaginationDriver<T, P> {
    fetcher: BatchFetcher<T>,
    plan: P,
    config: ExtractionConfig,
    checkpoints: Option<CheckpointManager>,
    state: PipelineState,
    phase: DriverPhase,
    summary: RunSummary,
    /// Progress count at the last checkpoint (or at start-up)
    checkpointed_at: u64,
}

impl<T: SparqlTransport, P: ExtractionPlan> PaginationDriver<T, P> {
    /// Validate the configuration and build the initial state, restoring it from a
    /// checkpoint when `config.resume` is set.
    pub fn new(fetcher: BatchFetcher<T>, plan: P, config: ExtractionConfig) -> Result<Self> {
        config.validate()?;
        fetcher.policy().validate()?;

        let checkpoints =
            config.checkpoint_dir.as_ref().map(|dir| CheckpointManager::new(dir.clone())).transpose()?;

        let state = match (config.resume, checkpoints.as_ref()) {
            (Some(point), Some(manager)) => {
                let tag = manager.resolve(point)?;
                let state = manager.load(tag, plan.edge_strategy())?;
                tracing::info!(
                    plan = plan.name(),
                    tag,
                    next_offset = state.next_offset,
                    "resuming from checkpoint"
                );
                state
            }
            _ => PipelineState::new(plan.edge_strategy()),
        };
        let checkpointed_at = plan.progress(&state);

        Ok(Self {
            fetcher,
            plan,
            config,
            checkpoints,
            state,
            phase: DriverPhase::Running,
            summary: RunSummary::default(),
            checkpointed_at,
        })
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    pub fn into_state(self) -> PipelineState {
        self.state
    }

    pub fn phase(&self) -> DriverPhase {
        self.phase
    }

    pub fn plan(&self) -> &P {
        &self.plan
    }

    /// Page through the result set until an empty page, the `max_results` bound, or a
    /// fatal fetch failure.
    ///
    /// On a fatal failure an emergency checkpoint of everything merged so far is written
    /// (when a checkpoint directory is configured) before [`Error::FatalFetch`] is returned.
    pub async fn run(&mut self) -> Result<RunSummary> {
        self.phase = DriverPhase::Running;
        let batch_size = self.config.batch_size;
        tracing::info!(
            plan = self.plan.name(),
            batch_size,
            start_offset = self.state.next_offset,
            "extraction started"
        );

        loop {
            let offset = self.state.next_offset;

            self.phase = DriverPhase::Fetching;
            let fetched = self.fetcher.fetch(self.plan.query(), batch_size, offset).await;
            let records = match fetched {
                Ok(FetchOutcome::Batch(records)) => records,
                Ok(FetchOutcome::TerminalEmpty) => {
                    tracing::info!(plan = self.plan.name(), offset, "result set exhausted");
                    return self.finish();
                }
                Err(err) => return Err(self.fatal_stop(offset, err)),
            };

            self.merge_batch(offset, &records);
            self.state.next_offset = offset + batch_size;
            self.summary.batches += 1;

            tracing::info!(
                plan = self.plan.name(),
                offset,
                fetched = records.len(),
                nodes = self.state.node_count(),
                edges = self.state.edge_count(),
                "batch merged"
            );

            if let Some(max) = self.config.max_results {
                if self.summary.records_merged >= max {
                    tracing::info!(max_results = max, merged = self.summary.records_merged, "result bound reached");
                    return self.finish();
                }
            }

            if self.checkpoint_due() {
                self.phase = DriverPhase::Checkpointing;
                self.periodic_checkpoint()?;
            }
        }
    }

    fn merge_batch(&mut self, offset: u64, records: &[RawRecord]) {
        self.summary.records_fetched += records.len() as u64;

        self.phase = DriverPhase::Validating;
        let schema = self.plan.schema();
        let mut valid = Vec::with_capacity(records.len());
        for (index, record) in records.iter().enumerate() {
            match validate(record, schema) {
                Ok(record) => valid.push(record),
                Err(err) => {
                    self.summary.records_invalid += 1;
                    tracing::warn!(offset, index, error = %err, "skipping invalid record");
                }
            }
        }

        self.phase = DriverPhase::Accumulating;
        for (index, record) in valid.iter().enumerate() {
            match self.plan.merge(record, &mut self.state) {
                Ok(()) => self.summary.records_merged += 1,
                Err(err) => {
                    self.summary.records_invalid += 1;
                    tracing::warn!(offset, index, error = %err, "skipping unmergeable record");
                }
            }
        }
    }

    /// A checkpoint is due whenever progress has crossed a multiple of the frequency since
    /// the last one. Landing exactly on a multiple counts.
    fn checkpoint_due(&self) -> bool {
        let Some(every) = self.config.checkpoint_frequency else {
            return false;
        };
        let progress = self.plan.progress(&self.state);
        progress > 0 && progress / every > self.checkpointed_at / every
    }

    fn periodic_checkpoint(&mut self) -> Result<()> {
        let Some(manager) = self.checkpoints.as_ref() else {
            return Ok(());
        };
        let tag = self.plan.progress(&self.state);
        let location = manager.save(&self.state, tag)?;
        self.checkpointed_at = tag;
        self.summary.checkpoints.push(location.manifest);
        Ok(())
    }

    /// Write the emergency checkpoint and build the error that ends the run.
    fn fatal_stop(&mut self, offset: u64, err: FetchError) -> Error {
        self.phase = DriverPhase::FatalStopped;
        let (attempts, source) = match err {
            FetchError::Exhausted { attempts, last } => (attempts, *last),
            other => (1, other),
        };
        tracing::error!(offset, attempts, error = %source, "fetch failed permanently");

        let checkpoint = match self.checkpoints.as_ref() {
            Some(manager) => {
                let tag = self.plan.progress(&self.state);
                match manager.save(&self.state, tag) {
                    Ok(location) => Some(location.manifest),
                    Err(save_err) => {
                        tracing::error!(error = %save_err, "emergency checkpoint failed");
                        None
                    }
                }
            }
            None => {
                tracing::warn!("no checkpoint directory configured; accumulated state is not persisted");
                None
            }
        };

        Error::FatalFetch { offset, attempts, checkpoint, source }
    }

    fn finish(&mut self) -> Result<RunSummary> {
        self.phase = DriverPhase::Done;

        if let Some(dir) = self.config.output_dir.clone() {
            let files = self.plan.output_files();
            if let Some(name) = files.nodes {
                let path = dir.join(name);
                let rows = tabular::write_nodes(&path, self.state.nodes.iter())?;
                tracing::info!(rows, path = %path.display(), "node table written");
                self.summary.outputs.push(path);
            }
            if let Some(name) = files.edges {
                let path = dir.join(name);
                let rows = tabular::write_edges(&path, self.state.edges.iter())?;
                tracing::info!(rows, path = %path.display(), "edge table written");
                self.summary.outputs.push(path);
            }
        }

        self.summary.nodes = self.state.node_count();
        self.summary.edges = self.state.edge_count();
        self.summary.next_offset = self.state.next_offset;

        tracing::info!(
            plan = self.plan.name(),
            batches = self.summary.batches,
            invalid = self.summary.records_invalid,
            nodes = self.summary.nodes,
            edges = self.summary.edges,
            "extraction complete"
        );
        Ok(self.summary.clone())
    }
}
