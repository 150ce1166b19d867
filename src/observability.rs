use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{info, warn};

/// Transition engine counters
#[derive(Debug, Default)]
pub struct TransitionMetrics {
    pub created: AtomicU64,
    pub completed: AtomicU64,
    pub guard_rejections: AtomicU64,
    pub double_pending_rejections: AtomicU64,
    pub task_assignment_failures: AtomicU64,
}

impl TransitionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_created(&self) {
        self.created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_completed(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_guard_rejection(&self) {
        self.guard_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_double_pending(&self) {
        self.double_pending_rejections.fetch_add(1, Ordering::Relaxed);
        warn!("Transition rejected: another transition is still pending");
    }

    pub fn record_task_assignment_failure(&self) {
        self.task_assignment_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_stats(&self) -> TransitionStats {
        TransitionStats {
            created: self.created.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            guard_rejections: self.guard_rejections.load(Ordering::Relaxed),
            double_pending_rejections: self.double_pending_rejections.load(Ordering::Relaxed),
            task_assignment_failures: self.task_assignment_failures.load(Ordering::Relaxed),
        }
    }

    pub fn log_stats(&self) {
        let stats = self.get_stats();
        info!(
            "Transition metrics: created={}, completed={}, guard_rejections={}, double_pending={}, task_failures={}",
            stats.created,
            stats.completed,
            stats.guard_rejections,
            stats.double_pending_rejections,
            stats.task_assignment_failures
        );
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionStats {
    pub created: u64,
    pub completed: u64,
    pub guard_rejections: u64,
    pub double_pending_rejections: u64,
    pub task_assignment_failures: u64,
}

/// Global metrics instance
static TRANSITION_METRICS: std::sync::LazyLock<TransitionMetrics> =
    std::sync::LazyLock::new(TransitionMetrics::new);

pub fn transition_metrics() -> &'static TransitionMetrics {
    &TRANSITION_METRICS
}

/// Create correlated spans for a workflow operation
pub fn create_workflow_span(workflow: &str, correlation_id: &str) -> tracing::Span {
    tracing::info_span!(
        "workflow",
        workflow.name = workflow,
        correlation.id = correlation_id,
        otel.kind = "internal"
    )
}

/// Time an operation and log its duration
pub struct OperationTimer {
    operation: String,
    start: Instant,
}

impl OperationTimer {
    pub fn new(operation: &str) -> Self {
        Self {
            operation: operation.to_string(),
            start: Instant::now(),
        }
    }

    pub fn finish(self) {
        let duration = self.start.elapsed();
        info!(
            operation = %self.operation,
            duration_ms = duration.as_millis(),
            "Operation completed"
        );
    }
}
