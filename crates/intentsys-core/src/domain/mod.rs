//! Domain models for intentsys.
//!
//! Canonical definitions for the typed records each stage produces:
//! - `IntentAnalysis`: goals, constraints, actors, metrics
//! - `SystemArchitecture`: modules, data-flow edges, decision rules
//! - `FailureSimulation`, `OptimizationResult`, `Explanation`
//! - `GraphModel`: derived visualization view

pub mod architecture;
pub mod error;
pub mod explanation;
pub mod graph;
pub mod intent;
pub mod optimization;
pub mod risk;
pub mod simulation;
pub mod stage;
pub mod warning;

// Re-export main types and errors
pub use architecture::{ArchitectureModule, DataFlowEdge, DecisionRule, SystemArchitecture};
pub use error::{CompilationError, GraphIntegrityError, NormalizationError, Result, StageError};
pub use explanation::{Explanation, ExplanationEntry};
pub use graph::{GraphEdge, GraphModel, GraphNode};
pub use intent::IntentAnalysis;
pub use optimization::{Objective, ObjectiveSet, OptimizationResult};
pub use risk::{Confidence, RiskLevel};
pub use simulation::{FailurePoint, FailureSimulation};
pub use stage::Stage;
pub use warning::Warning;
