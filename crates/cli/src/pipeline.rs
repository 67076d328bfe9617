use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use triage_engine::{
    AggregateState, ClassificationOrchestrator, ResultAggregator, RunOptions, ScanOptions,
    TriggerCount, TOP_TRIGGERS,
};
use triage_triggers::TriggerSet;

use crate::materialize::{MaterializationWriter, MaterializeReport};
use crate::report::{self, IndexOptions, INDEX_FILE};

/// Everything one classification run needs
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub triggers: Arc<TriggerSet>,
    pub scan: ScanOptions,
    pub run: RunOptions,
    pub json_reports: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TypeSummary {
    pub key: String,
    pub name: String,
    pub count: usize,
    pub folders: Vec<String>,
}

/// Machine-readable result of a run (`--json`)
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub input: PathBuf,
    pub output: PathBuf,
    pub folders_scanned: usize,
    pub failed_tasks: usize,
    pub problematic_dialogs: usize,
    pub type_assignments: usize,
    pub types: Vec<TypeSummary>,
    pub top_triggers: Vec<TriggerCount>,
    pub materialized: MaterializeReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<PathBuf>,
}

impl RunSummary {
    fn new(
        config: &PipelineConfig,
        state: &AggregateState,
        materialized: MaterializeReport,
        index: Option<PathBuf>,
    ) -> Self {
        let types = state
            .ranked_types()
            .into_iter()
            .map(|ranked| TypeSummary {
                name: config.triggers.display_name(&ranked.key).to_string(),
                folders: state
                    .folder_names_of(&ranked.key)
                    .into_iter()
                    .map(str::to_string)
                    .collect(),
                count: ranked.count,
                key: ranked.key,
            })
            .collect();

        Self {
            input: config.input.clone(),
            output: config.output.clone(),
            folders_scanned: state.folders_scanned(),
            failed_tasks: state.failed_tasks(),
            problematic_dialogs: state.total_dialogs(),
            type_assignments: state.total_assignments(),
            types,
            top_triggers: state.top_triggers(TOP_TRIGGERS),
            materialized,
            index,
        }
    }
}

/// Classify, aggregate, materialize and index one input root.
///
/// Enumerating the input root and creating output directories are fatal;
/// everything after aggregation only logs its failures.
pub async fn run_pipeline(config: &PipelineConfig) -> Result<(AggregateState, RunSummary)> {
    fs::create_dir_all(&config.output).with_context(|| {
        format!(
            "Failed to create output directory {}",
            config.output.display()
        )
    })?;

    let orchestrator = ClassificationOrchestrator::new(
        Arc::clone(&config.triggers),
        config.scan.clone(),
        config.run,
    );
    let stream = orchestrator
        .run(&config.input)
        .await
        .with_context(|| format!("Failed to list dialog folders in {}", config.input.display()))?;
    let state = ResultAggregator::new()
        .consume(stream)
        .await
        .context("Classification dispatcher failed")?;

    let writer = MaterializationWriter::new(&config.input, &config.output, &config.triggers)
        .with_json_reports(config.json_reports);
    writer.prepare(&state)?;
    let materialized = writer.write(&state);

    let index_path = config.output.join(INDEX_FILE);
    let index = report::render_index(
        &state,
        &config.triggers,
        &IndexOptions {
            output_root: &config.output,
            client_prefixes: &config.scan.client_prefixes,
            json_reports: config.json_reports,
        },
    );
    let index = match fs::write(&index_path, index) {
        Ok(()) => {
            log::info!("Index written to {}", index_path.display());
            Some(index_path)
        }
        Err(err) => {
            log::error!("Failed to write {}: {err}", index_path.display());
            None
        }
    };

    let summary = RunSummary::new(config, &state, materialized, index);
    Ok((state, summary))
}
