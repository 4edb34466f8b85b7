//! Observability scope and structured lifecycle events.
//!
//! This module provides:
//! - [`ObservabilityScope`]: the sink components report errors, warnings and
//!   notes to; it remembers whether any error was reported
//! - A run-scoped tracing span via [`run_span`]
//! - Emission functions for key lifecycle events
//!
//! Events are emitted through `tracing` (filter with `RUST_LOG`).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::domain::diagnostic::SourceLocation;

/// Level of an observed event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservedLevel {
    Error,
    Warning,
    Info,
}

/// One event reported to the scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedEvent {
    pub level: ObservedLevel,
    pub message: String,
    pub location: Option<SourceLocation>,
}

/// Sink for user-facing errors, warnings and notes.
///
/// Shared by reference (usually behind an `Arc`) between every component of a
/// run. Emission is safe from concurrent tasks.
#[derive(Debug, Default)]
pub struct ObservabilityScope {
    errors_reported: AtomicBool,
    events: Mutex<Vec<ObservedEvent>>,
}

impl ObservabilityScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&self, level: ObservedLevel, message: impl Into<String>, location: Option<SourceLocation>) {
        let message = message.into();
        let at = location.as_ref().map(ToString::to_string);
        match level {
            ObservedLevel::Error => {
                self.errors_reported.store(true, Ordering::SeqCst);
                error!(location = at.as_deref(), "{message}");
            }
            ObservedLevel::Warning => warn!(location = at.as_deref(), "{message}"),
            ObservedLevel::Info => info!(location = at.as_deref(), "{message}"),
        }
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(ObservedEvent {
                level,
                message,
                location,
            });
    }

    pub fn emit_error(&self, message: impl Into<String>) {
        self.emit(ObservedLevel::Error, message, None);
    }

    pub fn emit_warning(&self, message: impl Into<String>) {
        self.emit(ObservedLevel::Warning, message, None);
    }

    pub fn emit_info(&self, message: impl Into<String>) {
        self.emit(ObservedLevel::Info, message, None);
    }

    /// Whether any error-level event has been emitted.
    pub fn errors_reported(&self) -> bool {
        self.errors_reported.load(Ordering::SeqCst)
    }

    /// Snapshot of every event emitted so far.
    pub fn events(&self) -> Vec<ObservedEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Messages emitted at `level`.
    pub fn messages(&self, level: ObservedLevel) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|e| e.level == level)
            .map(|e| e.message)
            .collect()
    }
}

/// Run-scoped tracing span tagged with the baseline treeish.
///
/// Attach it with [`tracing::Instrument::instrument`]; it must not be entered
/// across an `.await`.
///
/// # Example
///
/// ```ignore
/// engine.run(&options).instrument(run_span("main")).await
/// ```
pub fn run_span(baseline: &str) -> tracing::Span {
    tracing::info_span!("apidiff.run", baseline = %baseline)
}

/// Emit event: run started against a resolved baseline revision.
pub fn emit_run_started(treeish: &str, revision: &str, modules: usize) {
    info!(event = "run.started", treeish = %treeish, revision = %revision, modules = modules);
}

/// Emit event: baseline digests are in place.
pub fn emit_baseline_materialized(dir: &str, dumped: usize, generation_failures: usize) {
    info!(
        event = "baseline.materialized",
        dir = %dir,
        dumped = dumped,
        generation_failures = generation_failures,
    );
}

/// Emit event: one module comparison finished.
pub fn emit_module_compared(module: &str, breaking_changes: usize, duration_ms: u64) {
    info!(
        event = "module.compared",
        module = %module,
        breaking_changes = breaking_changes,
        duration_ms = duration_ms,
    );
}

/// Emit event: gate evaluation completed.
pub fn emit_gate_evaluated(passed: bool, violations: usize) {
    info!(event = "gate.evaluated", passed = passed, violations = violations);
}
