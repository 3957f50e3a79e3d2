//! intentsys - intent-to-system architecture synthesis
//!
//! ## Commands
//!
//! - `analyze`: decompose an intent into goals, constraints, actors, metrics
//! - `generate`: design an architecture from a saved analysis
//! - `simulate`: run failure analysis over a saved architecture
//! - `optimize`: rework a saved architecture for one or more objectives
//! - `explain`: justify the decision rules of a saved architecture
//! - `run`: the whole pipeline, writing `report.json` and `report.md`
//! - `graph`: print a saved report's graph as Mermaid (no oracle call)
//!
//! Single-stage commands read and write the same report JSON, so stages can
//! be chained by hand: `analyze -o a.json`, then `generate --from a.json`.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use intentsys_core::{
    finalize, graph, read_report_json, render_report_md, FailureRecord, ObjectiveSet, Pipeline,
    ReportExport, Stage, Step, SystemReport,
};
use intentsys_oracle::config::DEFAULT_TIMEOUT_SECS;
use intentsys_oracle::{
    GeminiOracle, OracleClient, OracleConfig, RetryPolicy, DEFAULT_ENDPOINT, DEFAULT_MODEL,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "intentsys")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(
    about = "Turn a natural-language intent into an explainable system architecture",
    long_about = None
)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(flatten)]
    oracle: OracleArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct OracleArgs {
    /// Base URL of the generateContent API
    #[arg(long, global = true, env = "INTENTSYS_ORACLE_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Model name
    #[arg(long, global = true, env = "INTENTSYS_ORACLE_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// API key for the oracle
    #[arg(long, global = true, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Deadline per oracle call in seconds, retries included
    #[arg(long, global = true, env = "INTENTSYS_ORACLE_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout_secs: u64,

    /// Retries after a transient oracle failure
    #[arg(long, global = true, env = "INTENTSYS_ORACLE_MAX_RETRIES", default_value_t = 3)]
    max_retries: u32,
}

#[derive(Args)]
struct IntentArgs {
    /// Intent text
    intent: Option<String>,

    /// Read the intent from a file instead
    #[arg(long, conflicts_with = "intent")]
    intent_file: Option<PathBuf>,
}

impl IntentArgs {
    fn read(&self) -> Result<String> {
        match (&self.intent, &self.intent_file) {
            (Some(text), _) => Ok(text.clone()),
            (None, Some(path)) => {
                std::fs::read_to_string(path).with_context(|| format!("read {:?}", path))
            }
            (None, None) => Err(anyhow!("give an intent or --intent-file")),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Decompose an intent into goals, constraints, actors and metrics
    Analyze {
        #[command(flatten)]
        intent: IntentArgs,

        /// Write the report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Design an architecture from a report holding an analysis
    Generate {
        /// Report produced by `analyze`
        #[arg(long)]
        from: PathBuf,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Simulate failures of a report's architecture
    Simulate {
        #[arg(long)]
        from: PathBuf,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Optimize a report's architecture
    Optimize {
        #[arg(long)]
        from: PathBuf,

        /// Objective or combination, e.g. `speed` or `cost+resilience`
        #[arg(long, default_value = "resilience")]
        objective: ObjectiveSet,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Explain the decision rules of a report's architecture
    Explain {
        #[arg(long)]
        from: PathBuf,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run every stage and write report.json and report.md
    Run {
        #[command(flatten)]
        intent: IntentArgs,

        #[arg(long, default_value = "resilience")]
        objective: ObjectiveSet,

        /// Directory for the report files
        #[arg(long, default_value = "intentsys-out")]
        out_dir: PathBuf,
    },

    /// Print the graph of a saved report as a Mermaid flowchart
    Graph {
        #[arg(long)]
        from: PathBuf,

        /// Use the optimized architecture's graph
        #[arg(long)]
        optimized: bool,
    },
}

/// Report JSON as written to disk or stdout.
#[derive(Serialize)]
struct Envelope<'a> {
    generated_at: DateTime<Utc>,
    oracle: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    run_id: Option<&'a str>,
    #[serde(flatten)]
    report: &'a ReportExport,
    #[serde(skip_serializing_if = "Option::is_none")]
    failure: Option<FailureRecord>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    intentsys_core::init_tracing(cli.json, level);

    match cli.command {
        Commands::Analyze { intent, output } => {
            let pipeline = build_pipeline(&cli.oracle)?;
            let step = Step::Analyze {
                intent: intent.read()?,
            };
            cmd_stage(&pipeline, step, SystemReport::new(), output.as_deref()).await
        }
        Commands::Generate { from, output } => {
            let pipeline = build_pipeline(&cli.oracle)?;
            cmd_stage(&pipeline, Step::Generate, read_report_json(&from)?, output.as_deref()).await
        }
        Commands::Simulate { from, output } => {
            let pipeline = build_pipeline(&cli.oracle)?;
            cmd_stage(&pipeline, Step::Simulate, read_report_json(&from)?, output.as_deref()).await
        }
        Commands::Optimize {
            from,
            objective,
            output,
        } => {
            let pipeline = build_pipeline(&cli.oracle)?;
            let step = Step::Optimize {
                objectives: objective,
            };
            cmd_stage(&pipeline, step, read_report_json(&from)?, output.as_deref()).await
        }
        Commands::Explain { from, output } => {
            let pipeline = build_pipeline(&cli.oracle)?;
            cmd_stage(&pipeline, Step::Explain, read_report_json(&from)?, output.as_deref()).await
        }
        Commands::Run {
            intent,
            objective,
            out_dir,
        } => {
            let pipeline = build_pipeline(&cli.oracle)?;
            cmd_run(&pipeline, &intent.read()?, &objective, &out_dir).await
        }
        Commands::Graph { from, optimized } => cmd_graph(&from, optimized),
    }
}

fn build_pipeline(args: &OracleArgs) -> Result<Pipeline> {
    let mut config = OracleConfig::new(&args.endpoint, &args.model)
        .with_timeout_secs(args.timeout_secs)
        .with_retry(RetryPolicy {
            max_retries: args.max_retries,
            ..RetryPolicy::default()
        });
    if let Some(key) = &args.api_key {
        config = config.with_api_key(key);
    }

    let oracle = GeminiOracle::new(config.clone()).context("Failed to configure oracle")?;
    info!(endpoint = %config.endpoint, model = %config.model_id(), "oracle configured");
    Ok(Pipeline::new(OracleClient::from_config(
        Arc::new(oracle),
        &config,
    )))
}

async fn cmd_stage(
    pipeline: &Pipeline,
    step: Step,
    report: SystemReport,
    output: Option<&Path>,
) -> Result<()> {
    match pipeline.run(&step, report).await {
        Ok(outcome) => {
            for warning in &outcome.warnings {
                eprintln!("warning: {}", warning);
            }
            let export = finalize(&outcome.report);
            let envelope = Envelope {
                generated_at: Utc::now(),
                oracle: pipeline.client().oracle_name(),
                run_id: None,
                report: &export,
                failure: None,
            };
            emit(&envelope, output)?;
            println!(
                "{} completed with {} warning(s)",
                outcome.stage.title(),
                outcome.warnings.len()
            );
            Ok(())
        }
        Err(failure) => {
            let record = FailureRecord::new(failure.stage, &failure.error);
            eprintln!("{}", serde_json::to_string_pretty(&record)?);
            Err(failure.into())
        }
    }
}

async fn cmd_run(
    pipeline: &Pipeline,
    intent: &str,
    objectives: &ObjectiveSet,
    out_dir: &Path,
) -> Result<()> {
    let run = pipeline.run_all(intent, objectives).await;

    std::fs::create_dir_all(out_dir).with_context(|| format!("create {:?}", out_dir))?;
    let export = run.export();
    let envelope = Envelope {
        generated_at: Utc::now(),
        oracle: pipeline.client().oracle_name(),
        run_id: Some(run.run_id.as_str()),
        report: &export,
        failure: run.failure_record(),
    };
    let json_path = out_dir.join("report.json");
    emit(&envelope, Some(&json_path))?;

    let mut md = render_report_md(&export);
    if let Some(record) = &envelope.failure {
        md.push_str(&format!(
            "\n## Halted\n- stage: {}\n- error: {} ({})\n",
            record.stage, record.message, record.kind
        ));
    }
    let md_path = out_dir.join("report.md");
    std::fs::write(&md_path, md).with_context(|| format!("write {:?}", md_path))?;

    println!("Run {}", run.run_id);
    for stage in Stage::ALL {
        let mark = if run.report.has_completed(stage) { "✓" } else { "·" };
        println!("  {} {}", mark, stage.title());
    }
    println!("Report: {}", json_path.display());

    match run.halted {
        None => Ok(()),
        Some((stage, error)) => Err(anyhow!("pipeline halted at {}: {}", stage, error)),
    }
}

fn cmd_graph(from: &Path, optimized: bool) -> Result<()> {
    println!("{}", graph_mermaid(&read_report_json(from)?, optimized)?);
    Ok(())
}

/// Mermaid for a saved report, rebuilding the graph when only the
/// architecture was saved.
fn graph_mermaid(report: &SystemReport, optimized: bool) -> Result<String> {
    let (saved, arch, stage) = if optimized {
        (
            report.optimized_graph.as_ref(),
            report.optimization.as_ref().map(|o| &o.optimized_architecture),
            Stage::Optimize,
        )
    } else {
        (report.graph.as_ref(), report.architecture.as_ref(), Stage::Generate)
    };

    if let Some(graph) = saved {
        return Ok(graph.to_mermaid());
    }
    let arch = arch.ok_or_else(|| anyhow!("report holds no architecture to draw"))?;
    let repaired = graph::repair(arch.clone(), stage);
    for warning in &repaired.warnings {
        eprintln!("warning: {}", warning);
    }
    Ok(graph::build(&repaired.architecture)?.to_mermaid())
}

fn emit(envelope: &Envelope<'_>, output: Option<&Path>) -> Result<()> {
    let content = serde_json::to_string_pretty(envelope).context("serialize report")?;
    match output {
        Some(path) => {
            std::fs::write(path, content).with_context(|| format!("write {:?}", path))?;
            info!(path = %path.display(), "report written");
        }
        None => println!("{}", content),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use intentsys_core::Objective;
    use intentsys_oracle::fakes::StageRoutedOracle;
    use std::time::Duration;

    const ANALYZE: &str =
        r#"{"goals": ["serve pages"], "constraints": [], "actors": ["visitor"], "success_metrics": []}"#;
    const GENERATE: &str = r#"{
        "modules": [
            {"id": "web", "name": "Web", "responsibility": "render", "inputs": [], "outputs": ["html"]},
            {"id": "db", "name": "Database", "responsibility": "store", "inputs": [], "outputs": []}
        ],
        "data_flow": [{"source": "web", "target": "db", "label": "queries"}],
        "decision_rules": [{"condition": "cache miss", "action": "query db", "confidence": 80, "risk_level": "LOW"}]
    }"#;
    const SIMULATE: &str = r#"{"best_case": "ok", "worst_case": "down", "failure_points": [], "overall_risk": "LOW"}"#;
    const OPTIMIZE: &str = r#"{"objective": "SPEED", "optimized_architecture": {
        "modules": [{"id": "web", "name": "Web", "responsibility": "render and cache", "inputs": [], "outputs": []}],
        "data_flow": [], "decision_rules": []}, "tradeoffs": ["stale pages"]}"#;
    const EXPLAIN: &str = r#"{"entries": [{"decision": "R1", "justification": "cheap", "confidence": 70, "risk_level": "LOW"}]}"#;

    fn pipeline(oracle: StageRoutedOracle) -> Pipeline {
        Pipeline::new(OracleClient::new(
            Arc::new(oracle),
            RetryPolicy::none(),
            Duration::from_secs(5),
        ))
    }

    fn full_oracle() -> StageRoutedOracle {
        StageRoutedOracle::new()
            .route(Stage::Analyze.marker(), ANALYZE)
            .route(Stage::Generate.marker(), GENERATE)
            .route(Stage::Simulate.marker(), SIMULATE)
            .route(Stage::Optimize.marker(), OPTIMIZE)
            .route(Stage::Explain.marker(), EXPLAIN)
    }

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn objective_combinations_parse() {
        let cli = Cli::try_parse_from([
            "intentsys",
            "optimize",
            "--from",
            "r.json",
            "--objective",
            "speed+cost",
        ])
        .unwrap();
        match cli.command {
            Commands::Optimize { objective, .. } => {
                assert!(objective.contains(Objective::Speed));
                assert!(objective.contains(Objective::Cost));
            }
            _ => panic!("expected optimize"),
        }
        assert!(Cli::try_parse_from(["intentsys", "run", "x", "--objective", "magic"]).is_err());
    }

    #[tokio::test]
    async fn stages_chain_through_report_files() {
        let dir = tempfile::tempdir().unwrap();
        let analyzed = dir.path().join("analyzed.json");
        let generated = dir.path().join("generated.json");
        let pipeline = pipeline(full_oracle());

        let step = Step::Analyze {
            intent: "a small website".to_string(),
        };
        cmd_stage(&pipeline, step, SystemReport::new(), Some(&analyzed))
            .await
            .unwrap();
        let report = read_report_json(&analyzed).unwrap();
        cmd_stage(&pipeline, Step::Generate, report, Some(&generated))
            .await
            .unwrap();

        let report = read_report_json(&generated).unwrap();
        assert!(report.intent.is_some());
        assert_eq!(report.graph.as_ref().unwrap().nodes.len(), 2);

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&generated).unwrap()).unwrap();
        assert!(raw.get("generated_at").is_some());
        assert_eq!(raw["oracle"], "stage-routed");

        let mermaid = graph_mermaid(&report, false).unwrap();
        assert!(mermaid.contains("n0 -->|\"queries\"| n1"));
    }

    #[tokio::test]
    async fn rerunning_a_stage_fails() {
        let dir = tempfile::tempdir().unwrap();
        let report = SystemReport::new().with_intent(Default::default());
        let err = cmd_stage(
            &pipeline(full_oracle()),
            Step::Analyze {
                intent: "again".to_string(),
            },
            report,
            Some(&dir.path().join("out.json")),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("already completed"));
        assert!(!dir.path().join("out.json").exists());
    }

    #[tokio::test]
    async fn run_writes_json_and_markdown() {
        let dir = tempfile::tempdir().unwrap();
        let objectives = ObjectiveSet::single(Objective::Speed);
        cmd_run(&pipeline(full_oracle()), "a small website", &objectives, dir.path())
            .await
            .unwrap();

        let report = read_report_json(&dir.path().join("report.json")).unwrap();
        assert_eq!(report.completed_stages(), Stage::ALL.to_vec());
        let md = std::fs::read_to_string(dir.path().join("report.md")).unwrap();
        assert!(md.contains("# System Report"));
        assert!(md.contains("```mermaid"));
        assert!(!md.contains("## Halted"));
    }

    #[tokio::test]
    async fn halted_run_still_writes_partial_report() {
        let dir = tempfile::tempdir().unwrap();
        let oracle = StageRoutedOracle::new()
            .route(Stage::Analyze.marker(), ANALYZE)
            .route(Stage::Generate.marker(), "no json here");
        let objectives = ObjectiveSet::single(Objective::Cost);

        let err = cmd_run(&pipeline(oracle), "a small website", &objectives, dir.path())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("GENERATE"));

        let raw: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(dir.path().join("report.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(raw["failure"]["kind"], "NormalizationError");
        assert_eq!(raw["failure"]["raw_response"], "no json here");
        assert!(raw.get("intent").is_some());
        assert!(raw.get("architecture").is_none());

        let md = std::fs::read_to_string(dir.path().join("report.md")).unwrap();
        assert!(md.contains("## Halted"));
    }

    #[test]
    fn graph_is_rebuilt_when_only_architecture_was_saved() {
        let arch = intentsys_core::normalize::<intentsys_core::SystemArchitecture>(GENERATE)
            .unwrap()
            .value;
        let report = SystemReport::new().with_architecture(arch);
        let mermaid = graph_mermaid(&report, false).unwrap();
        assert!(mermaid.contains("n1[\"Database<br/>db\"]"));
        assert!(graph_mermaid(&report, true).is_err());
    }
}
