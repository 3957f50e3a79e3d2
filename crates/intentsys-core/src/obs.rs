//! Structured observability hooks for pipeline stage lifecycle events.
//!
//! This module provides:
//! - Stage-scoped tracing spans via [`stage_span`]
//! - Emission functions for stage start, completion, failure and the
//!   per-field recoveries the normalizer applies
//!
//! Prompts and raw responses are never logged in clear; only their
//! SHA-256 digest and length. Verbosity follows `RUST_LOG`.

use crate::domain::{Stage, StageError, Warning};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

/// Span tagging everything a stage logs with the run id and stage.
///
/// Attach with `tracing::Instrument` so it is entered on every poll:
///
/// ```ignore
/// pipeline.run(&step, report).instrument(stage_span(&run_id, step.stage())).await
/// ```
pub fn stage_span(run_id: &str, stage: Stage) -> tracing::Span {
    tracing::info_span!("intentsys.stage", run_id = %run_id, stage = %stage)
}

/// Hex SHA-256 of `text`.
pub fn digest(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

pub fn emit_stage_started(stage: Stage, prompt_digest: &str, prompt_len: usize) {
    info!(
        event = "stage.started",
        stage = %stage,
        prompt_sha256 = %prompt_digest,
        prompt_len = prompt_len,
    );
}

pub fn emit_stage_completed(stage: Stage, duration_ms: u64, warnings: usize) {
    info!(
        event = "stage.completed",
        stage = %stage,
        duration_ms = duration_ms,
        warnings = warnings,
    );
}

/// Failure at warn level, with the error class and, for normalization
/// failures, a digest of the rejected response.
pub fn emit_stage_failed(stage: Stage, error: &StageError) {
    let raw_digest = error.raw_response().map(digest);
    warn!(
        event = "stage.failed",
        stage = %stage,
        kind = error.kind(),
        error = %error,
        raw_sha256 = raw_digest.as_deref().unwrap_or(""),
    );
}

pub fn emit_field_recovered(warning: &Warning) {
    warn!(
        event = "normalize.field_recovered",
        stage = %warning.stage,
        field = %warning.field,
        detail = %warning.message,
    );
}

pub fn emit_edge_dropped(edge_index: usize, source: &str, target: &str, reason: &str) {
    warn!(
        event = "graph.edge_dropped",
        edge_index = edge_index,
        from = %source,
        to = %target,
        reason = %reason,
    );
}

pub fn emit_pipeline_finished(run_id: &str, completed: usize, halted_at: Option<Stage>) {
    let halted_at = halted_at.map(|s| s.name()).unwrap_or("-");
    info!(
        event = "pipeline.finished",
        run_id = %run_id,
        completed = completed,
        halted_at = halted_at,
    );
}
