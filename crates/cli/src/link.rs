//! `refmerge run` / `refmerge validate`: config-driven reference table linkage.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use refmerge_linkage::csv_table::{decode_bytes, load_csv_table, select_output_columns, write_csv_table};
use refmerge_linkage::model::{LinkReport, StageSummary};
use refmerge_linkage::progress::ProgressEvent;
use refmerge_linkage::{LinkConfig, LinkInput, LinkageError, NoopReporter, ProgressReporter, Table};

use crate::exit_codes::{
    link_exit_code, EXIT_LINK_INVALID_CONFIG, EXIT_LINK_OUTPUT, EXIT_USAGE,
};
use crate::CliError;

fn link_err(code: u8, msg: impl Into<String>) -> CliError {
    CliError { code, message: msg.into(), hint: None }
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Progress lines on stderr, one per checkpoint.
struct StderrReporter;

impl ProgressReporter for StderrReporter {
    fn on_progress(&mut self, event: &ProgressEvent<'_>) {
        eprintln!(
            "  {} [{}] {}/{}",
            event.stage, event.phase, event.processed, event.total
        );
    }

    fn on_stage_complete(&mut self, summary: &StageSummary) {
        eprintln!(
            "  {}: {}/{} matched ({:.1}%)",
            summary.stage,
            summary.matched(),
            summary.total_rows,
            summary.matched_pct
        );
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn load_config(config_path: &Path) -> Result<LinkConfig, CliError> {
    let config_str = std::fs::read_to_string(config_path).map_err(|e| {
        link_err(
            EXIT_LINK_INVALID_CONFIG,
            format!("cannot read config {}: {e}", config_path.display()),
        )
    })?;
    LinkConfig::from_toml(&config_str).map_err(|e| link_err(link_exit_code(&e), e.to_string()))
}

fn read_table(name: &str, path: &Path) -> Result<Table, LinkageError> {
    let bytes = std::fs::read(path)
        .map_err(|e| LinkageError::Io(format!("cannot read {}: {e}", path.display())))?;
    load_csv_table(name, &decode_bytes(&bytes))
}

fn load_table(name: &str, path: &Path) -> Result<Table, CliError> {
    let table = read_table(name, path).map_err(|e| link_err(link_exit_code(&e), e.to_string()))?;
    log::info!("loaded '{name}': {} rows, {} columns", table.len(), table.columns.len());
    Ok(table)
}

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = load_config(&config_path)?;
    let strategies: usize = config.stages.iter().map(|s| s.strategies.len()).sum();
    eprintln!(
        "config ok: '{}': {} stage(s), {} exact strategies, sources: {}",
        config.name,
        config.stages.len(),
        strategies,
        config.source_order().join(", "),
    );
    Ok(())
}

pub fn cmd_run(
    config_path: PathBuf,
    output: Option<PathBuf>,
    report_file: Option<PathBuf>,
    json_output: bool,
    quiet: bool,
) -> Result<(), CliError> {
    let config = load_config(&config_path)?;

    // Relative paths resolve against the config file's directory
    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));

    let output_path = match (output, &config.output.file) {
        (Some(path), _) => path,
        (None, Some(file)) => base_dir.join(file),
        (None, None) => {
            return Err(CliError {
                code: EXIT_USAGE,
                message: "no output file".into(),
                hint: Some("pass --output or set [output] file in the config".into()),
            })
        }
    };

    let primary = load_table("primary", &base_dir.join(&config.primary.file))?;
    let mut sources: HashMap<String, Table> = HashMap::new();
    for name in config.source_order() {
        let Some(source) = config.sources.get(name) else {
            continue;
        };
        let table = load_table(name, &base_dir.join(&source.file))?;
        sources.insert(name.to_string(), table);
    }

    let input = LinkInput { primary, sources };
    let mut reporter: Box<dyn ProgressReporter> = if quiet {
        Box::new(NoopReporter)
    } else {
        Box::new(StderrReporter)
    };
    let result = refmerge_linkage::run(&config, input, reporter.as_mut())
        .map_err(|e| link_err(link_exit_code(&e), e.to_string()))?;

    // Output table
    let columns = select_output_columns(&result.table, &config.output.columns, &config.output.exclude);
    let csv_str = write_csv_table(&result.table, &columns, &config.output.missing)
        .map_err(|e| link_err(EXIT_LINK_OUTPUT, e.to_string()))?;
    std::fs::write(&output_path, csv_str).map_err(|e| {
        link_err(EXIT_LINK_OUTPUT, format!("cannot write {}: {e}", output_path.display()))
    })?;
    eprintln!("wrote {} ({} rows, {} columns)", output_path.display(), result.table.len(), columns.len());

    // Report
    if json_output || report_file.is_some() {
        let json_str = serde_json::to_string_pretty(&result.report)
            .map_err(|e| link_err(EXIT_LINK_OUTPUT, format!("JSON serialization error: {e}")))?;
        if let Some(ref path) = report_file {
            std::fs::write(path, &json_str).map_err(|e| {
                link_err(EXIT_LINK_OUTPUT, format!("cannot write report: {e}"))
            })?;
            eprintln!("wrote {}", path.display());
        }
        if json_output {
            println!("{json_str}");
        }
    }

    print_summary(&result.report);
    Ok(())
}

/// Human summary to stderr.
fn print_summary(report: &LinkReport) {
    let s = &report.summary;
    eprintln!(
        "{}: {} rows, {} columns",
        report.meta.config_name, s.total_rows, s.total_columns
    );

    for stage in &s.stages {
        eprintln!("stage '{}' (source '{}'):", stage.stage, stage.source);
        for count in &stage.exact {
            eprintln!("  {:<24} {}", count.strategy, count.matched);
        }
        if let Some(mean) = stage.mean_fuzzy_score {
            eprintln!("  {:<24} {} (mean score {:.3})", "fuzzy", stage.fuzzy_matched, mean);
        }
        eprintln!("  {:<24} {}", "unmatched", stage.unmatched);
        eprintln!("  matched {:.1}%", stage.matched_pct);
    }

    for (column, counts) in &s.breakdown {
        eprintln!("breakdown of {column}:");
        for (value, count) in counts {
            eprintln!("  {value}: {count}");
        }
    }

    for (column, count) in &s.distinct {
        eprintln!("distinct {column}: {count}");
    }
}
