//! Tracing instrumentation for engine and job lifecycle events.
//!
//! Span constructors and record helpers used by the engine's load and bind
//! passes and by [`JobStatus`](crate::JobStatus) transitions. Everything
//! here is plain `tracing`; subscribers are the embedding application's
//! concern.

use std::future::Future;
use tracing::instrument::Instrumented;
use tracing::{info_span, Instrument, Span};

use crate::job::JobState;
use crate::registry::Capability;

/// Span covering the engine's adaptor load pass.
#[must_use]
pub fn engine_load_span() -> Span {
    info_span!("skipper.load")
}

/// Span covering one binding resolution.
///
/// `scheme` is the URL scheme for job binding and the context type for
/// context binding.
#[must_use]
pub fn bind_span(capability: Capability, scheme: &str) -> Span {
    info_span!(
        "skipper.bind",
        capability = %capability,
        scheme = scheme,
    )
}

/// Span covering one job operation (`run`, `cancel`, ...).
#[must_use]
pub fn job_op_span(op: &str, job_id: Option<&str>) -> Span {
    info_span!(
        "skipper.job",
        op = op,
        job_id = job_id.unwrap_or("-"),
    )
}

/// Attach a binding-resolution span to `future`.
///
/// Spans must be attached to async work with `Instrument`; holding an
/// entered guard across an await point corrupts the trace when the task
/// migrates between executor threads.
pub fn instrument_bind<F: Future>(
    capability: Capability,
    scheme: &str,
    future: F,
) -> Instrumented<F> {
    future.instrument(bind_span(capability, scheme))
}

/// Attach a job-operation span to `future`.
pub fn instrument_job_op<F: Future>(
    op: &str,
    job_id: Option<&str>,
    future: F,
) -> Instrumented<F> {
    future.instrument(job_op_span(op, job_id))
}

/// Record a lifecycle transition of a job.
pub fn record_state_change(job_id: &str, from: JobState, to: JobState) {
    tracing::debug!(
        job_id = job_id,
        from = %from,
        to = %to,
        "job state changed"
    );
}
