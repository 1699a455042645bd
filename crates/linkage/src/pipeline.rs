use std::collections::HashMap;

use crate::cascade::{resolve_cascade, JoinStrategy};
use crate::config::{LinkConfig, StageConfig};
use crate::error::LinkageError;
use crate::fuzzy::resolve_fuzzy;
use crate::merge::{merge_stage, MergePlan};
use crate::model::{LinkInput, LinkMeta, LinkReport, LinkResult, MatchOutcome, RunSummary, StageSummary, Table};
use crate::progress::ProgressReporter;
use crate::summary::{compute_breakdown, compute_distinct, compute_stage_summary};

/// Output of one stage: the extended table plus one outcome per primary row.
#[derive(Debug, Clone)]
pub struct StageOutput {
    pub table: Table,
    pub outcomes: Vec<MatchOutcome>,
    pub summary: StageSummary,
}

/// Output of a whole pipeline run. `outcomes` and `summaries` are per stage.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub table: Table,
    pub outcomes: Vec<Vec<MatchOutcome>>,
    pub summaries: Vec<StageSummary>,
}

/// Ordered stages chained over a primary table.
///
/// Each stage sees the previous stage's output as its primary table, so later
/// strategies may key on columns merged earlier (e.g. `SR_ISIN`).
#[derive(Debug, Clone)]
pub struct Pipeline {
    stages: Vec<StageConfig>,
    progress_every: usize,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipeline {
    pub fn new() -> Self {
        Self {
            stages: Vec::new(),
            progress_every: 1000,
        }
    }

    pub fn from_config(config: &LinkConfig) -> Self {
        config
            .stages
            .iter()
            .cloned()
            .fold(Self::new(), Pipeline::stage)
            .progress_every(config.report.progress_every)
    }

    pub fn stage(mut self, stage: StageConfig) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn progress_every(mut self, every: usize) -> Self {
        self.progress_every = every.max(1);
        self
    }

    pub fn stages(&self) -> &[StageConfig] {
        &self.stages
    }

    /// Run every stage in order. `sources` maps source names to secondary tables.
    pub fn run(
        &self,
        primary: Table,
        sources: &HashMap<String, Table>,
        reporter: &mut dyn ProgressReporter,
    ) -> Result<PipelineOutput, LinkageError> {
        let mut current = primary;
        let mut outcomes = Vec::with_capacity(self.stages.len());
        let mut summaries = Vec::with_capacity(self.stages.len());

        for stage in &self.stages {
            let secondary = sources
                .get(&stage.source)
                .ok_or_else(|| LinkageError::MissingTable(stage.source.clone()))?;
            let output = run_stage(stage, &current, secondary, self.progress_every, reporter)?;
            current = output.table;
            outcomes.push(output.outcomes);
            summaries.push(output.summary);
        }

        Ok(PipelineOutput {
            table: current,
            outcomes,
            summaries,
        })
    }
}

/// normalize → dedup secondary → exact cascade → fuzzy fallback → merge.
pub fn run_stage(
    stage: &StageConfig,
    primary: &Table,
    secondary: &Table,
    progress_every: usize,
    reporter: &mut dyn ProgressReporter,
) -> Result<StageOutput, LinkageError> {
    log::info!(
        "stage '{}': linking {} row(s) against '{}' ({} row(s))",
        stage.name,
        primary.len(),
        stage.source,
        secondary.len()
    );

    let strategies: Vec<JoinStrategy> = stage
        .strategies
        .iter()
        .map(|s| JoinStrategy::from_config(s, secondary))
        .collect();
    for strategy in &strategies {
        log::debug!(
            "stage '{}': strategy '{}' has {} distinct key(s)",
            stage.name,
            strategy.id,
            strategy.lookup.len()
        );
    }

    let mut outcomes = resolve_cascade(&stage.name, primary, &strategies, progress_every, reporter);

    if let Some(ref fuzzy) = stage.fuzzy {
        outcomes = resolve_fuzzy(
            &stage.name,
            primary,
            outcomes,
            fuzzy,
            secondary,
            progress_every,
            reporter,
        );
    }

    let plan = MergePlan::new(&stage.prefix, &stage.columns, secondary, stage.provenance);
    let table = merge_stage(&stage.name, primary, &outcomes, secondary, &plan)?;

    let ids: Vec<String> = stage.strategies.iter().map(|s| s.id.clone()).collect();
    let summary = compute_stage_summary(&stage.name, &stage.source, &ids, &outcomes);
    log::info!(
        "stage '{}': {} exact, {} fuzzy, {} unmatched",
        stage.name,
        summary.exact_matched(),
        summary.fuzzy_matched,
        summary.unmatched
    );
    reporter.on_stage_complete(&summary);

    Ok(StageOutput {
        table,
        outcomes,
        summary,
    })
}

/// Run the configured pipeline and build the report.
pub fn run(
    config: &LinkConfig,
    input: LinkInput,
    reporter: &mut dyn ProgressReporter,
) -> Result<LinkResult, LinkageError> {
    let LinkInput { primary, sources } = input;
    let output = Pipeline::from_config(config).run(primary, &sources, reporter)?;

    let summary = RunSummary {
        total_rows: output.table.len(),
        total_columns: output.table.columns.len(),
        stages: output.summaries,
        breakdown: compute_breakdown(&output.table, &config.report.breakdown),
        distinct: compute_distinct(&output.table, &config.report.distinct),
    };

    Ok(LinkResult {
        outcomes: output.outcomes,
        table: output.table,
        report: LinkReport {
            meta: LinkMeta {
                config_name: config.name.clone(),
                engine_version: env!("CARGO_PKG_VERSION").to_string(),
                run_at: chrono::Utc::now().to_rfc3339(),
            },
            summary,
        },
    })
}
