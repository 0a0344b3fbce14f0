use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context as _, Result, anyhow};
use comfy_table::Table;
use tracing::info;

use squirrel_actions::{Catalog, ParamSpec, Params};
use squirrel_ingest::FsLoader;
use squirrel_pipeline::{
    Controller, ReplayMode, ReplayOptions, ReplayReport, parse_reorder_request,
};

use crate::cli::{AddArgs, InitArgs, LogAction, LogArgs, RunArgs};
use crate::summary::{apply_table_style, header_cell};

/// Name of the pipeline log inside a project directory.
pub const LOG_FILE: &str = "pipeline.sq";

fn log_path(project: &Path) -> PathBuf {
    project.join(LOG_FILE)
}

fn open_project(project: &Path) -> Result<Controller> {
    Controller::open(&log_path(project))
        .with_context(|| format!("open project {}", project.display()))
}

pub fn run_init(args: &InitArgs) -> Result<()> {
    let path = log_path(&args.project);
    Controller::init(&path).with_context(|| format!("initialize {}", path.display()))?;
    println!("Initialized pipeline log at {}", path.display());
    Ok(())
}

pub fn run_replay(args: &RunArgs) -> Result<ReplayReport> {
    let controller = open_project(&args.project)?;
    let loader = FsLoader::new(&args.project);
    let options = ReplayOptions {
        mode: if args.strict {
            ReplayMode::Strict
        } else {
            ReplayMode::Lenient
        },
        deadline: args
            .timeout_secs
            .map(|secs| Instant::now() + Duration::from_secs(secs)),
    };
    let start = Instant::now();
    let report = controller
        .replay(options, Some(&loader))
        .context("replay pipeline")?;
    info!(
        entries = report.outcomes.len(),
        failures = report.failure_count(),
        duration_ms = start.elapsed().as_millis(),
        "replay complete"
    );
    Ok(report)
}

pub fn run_log(args: &LogArgs) -> Result<()> {
    let controller = open_project(&args.project)?;
    match &args.action {
        LogAction::List => {
            let entries = controller.entries()?;
            if entries.is_empty() {
                println!("Pipeline log has no entries.");
                return Ok(());
            }
            let mut table = Table::new();
            table.set_header(vec![
                header_cell("Id"),
                header_cell("Action"),
                header_cell("Statement"),
            ]);
            apply_table_style(&mut table);
            for entry in entries {
                table.add_row(vec![entry.id.to_string(), entry.label, entry.text]);
            }
            println!("{table}");
        }
        LogAction::Add(add) => {
            let (label, snippet) = build_snippet(add)?;
            controller.add(&snippet)?;
            println!("Added: {label}");
        }
        LogAction::Rm { id } => {
            controller.delete(*id)?;
            println!("Deleted entry {id}");
        }
        LogAction::Mv { order } => {
            let order = parse_reorder_request(order)?;
            controller.reorder(&order)?;
            println!("Reordered {} entries", order.len());
        }
        LogAction::Edit { id, text } => {
            controller.edit(*id, text)?;
            println!("Edited entry {id}");
        }
    }
    Ok(())
}

pub fn run_kinds() -> Result<()> {
    let catalog = Catalog::builtin();
    let mut table = Table::new();
    table.set_header(vec![header_cell("Kind"), header_cell("Parameters")]);
    apply_table_style(&mut table);
    for def in catalog.defs() {
        let params: Vec<String> = def.params.iter().map(param_summary).collect();
        table.add_row(vec![def.name.to_string(), params.join(", ")]);
    }
    println!("{table}");
    Ok(())
}

/// Instantiate a catalog action from `--kind`/`--param` flags and render
/// its loggable snippet.
fn build_snippet(add: &AddArgs) -> Result<(String, String)> {
    let mut params = Params::new();
    for raw in &add.params {
        let (name, value) = raw
            .split_once('=')
            .ok_or_else(|| anyhow!("malformed --param {raw:?}, expected name=value"))?;
        params.set(name, value);
    }
    let action = Catalog::builtin().instantiate(&add.kind, params)?;
    let label = action.describe();
    let snippet = action.snippet()?;
    Ok((label, snippet))
}

fn param_summary(spec: &ParamSpec) -> String {
    let mut text = spec.name.to_string();
    if !spec.allowed.is_empty() {
        text.push_str(&format!(" ({})", spec.allowed.join("|")));
    }
    if let Some(default) = spec.default {
        text.push_str(&format!(" = {default}"));
    }
    if spec.required {
        text
    } else {
        format!("[{text}]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use squirrel_pipeline::EntryStatus;

    fn add_args(kind: &str, pairs: &[(&str, &str)]) -> AddArgs {
        AddArgs {
            kind: kind.to_string(),
            params: pairs.iter().map(|(k, v)| format!("{k}={v}")).collect(),
        }
    }

    #[test]
    fn test_build_snippet_rejects_malformed_param() {
        let args = AddArgs {
            kind: "AddColumn".to_string(),
            params: vec!["table_name".to_string()],
        };
        assert!(build_snippet(&args).is_err());
    }

    #[test]
    fn test_build_snippet_reports_unknown_kind() {
        let args = add_args("TimeTravel", &[]);
        let err = build_snippet(&args).unwrap_err();
        assert!(err.to_string().contains("TimeTravel"));
    }

    #[test]
    fn test_init_then_add_then_run() {
        let dir = tempfile::tempdir().unwrap();
        let project = dir.path().join("demo");
        std::fs::create_dir(&project).unwrap();
        std::fs::write(project.join("data.csv"), "v\n2\n1\n").unwrap();

        run_init(&InitArgs {
            project: project.clone(),
        })
        .unwrap();

        let controller = open_project(&project).unwrap();
        let (_, snippet) = build_snippet(&add_args(
            "CreateTable",
            &[
                ("table_name", "T"),
                ("source_type", "data_source"),
                ("source_path", "data.csv"),
            ],
        ))
        .unwrap();
        controller.add(&snippet).unwrap();

        let report = run_replay(&RunArgs {
            project,
            strict: false,
            timeout_secs: None,
            stats: false,
            json: false,
        })
        .unwrap();
        assert_eq!(report.outcomes.len(), 1);
        assert_eq!(report.outcomes[0].status, EntryStatus::Applied);
        assert_eq!(report.tables["T"].n_rows(), 2);
    }

    #[test]
    fn test_param_summary_marks_optional_and_choices() {
        let spec = ParamSpec::select("how", "How", &["inner", "outer"]).with_default("inner");
        assert_eq!(param_summary(&spec), "[how (inner|outer) = inner]");
        assert_eq!(param_summary(&ParamSpec::required("n", "N")), "n");
    }
}
