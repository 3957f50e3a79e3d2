//! intentsys core library
//!
//! Turns a natural-language intent into a typed, explainable architecture
//! report by chaining validated oracle calls: prompt compilation, response
//! normalization, graph building and report aggregation.

pub mod domain;
pub mod graph;
pub mod normalize;
pub mod obs;
pub mod pipeline;
pub mod prompt;
pub mod report;
pub mod telemetry;

pub use domain::{
    ArchitectureModule, CompilationError, Confidence, DataFlowEdge, DecisionRule, Explanation,
    ExplanationEntry, FailurePoint, FailureSimulation, GraphEdge, GraphIntegrityError,
    GraphModel, GraphNode, IntentAnalysis, NormalizationError, Objective, ObjectiveSet,
    OptimizationResult, Result, RiskLevel, Stage, StageError, SystemArchitecture, Warning,
};

pub use normalize::{normalize, Normalized, Schema};

pub use obs::{
    emit_edge_dropped, emit_field_recovered, emit_pipeline_finished, emit_stage_completed,
    emit_stage_failed, emit_stage_started, stage_span,
};

pub use pipeline::{FailureRecord, Pipeline, PipelineRun, StageFailure, StageOutcome, Step};

pub use prompt::{compile, PromptInput};

pub use report::{
    finalize, read_report_json, render_report_md, write_report_json, write_report_md,
    ReportExport, SystemReport, REPORT_SCHEMA_VERSION,
};

pub use telemetry::init_tracing;
