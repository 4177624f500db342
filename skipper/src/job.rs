use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::cpi::JobCpi;
use crate::description::JobDescription;
use crate::error::{Error, Result};
use crate::telemetry;

/// Lifecycle states of a job.
///
/// `Done`, `Canceled` and `Failed` are terminal; no transition leaves a
/// terminal state.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum JobState {
    /// Created, not yet submitted.
    New,
    /// Submitted and executing on the backend.
    Running,
    /// Execution paused; only reachable on backends that support it.
    Suspended,
    /// Finished on its own; `exit_code` is set.
    Done,
    /// Terminated on request.
    Canceled,
    /// Submission or execution failed.
    Failed,
}

impl JobState {
    /// Whether no further transition can occur.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Done | JobState::Canceled | JobState::Failed)
    }

    /// String form used in log fields and error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::New => "New",
            JobState::Running => "Running",
            JobState::Suspended => "Suspended",
            JobState::Done => "Done",
            JobState::Canceled => "Canceled",
            JobState::Failed => "Failed",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Consistent snapshot of a job's observable status.
///
/// Invariants upheld by [`JobStatus`]: `exit_code` is set if and only if the
/// state is `Done`; `execution_hosts` is non-empty only once the job has
/// passed through `Running`; `created ≤ started ≤ finished` where defined.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JobInfo {
    /// Backend-assigned identifier; set when the job starts running.
    pub id: Option<String>,
    /// Current lifecycle state.
    pub state: JobState,
    /// Exit code, set exactly when `state == Done`.
    pub exit_code: Option<i32>,
    /// Hosts the job executes on, populated at `Running`.
    pub execution_hosts: Vec<String>,
    /// When the handle was created.
    pub created: Option<DateTime<Utc>>,
    /// When the backend accepted the submission.
    pub started: Option<DateTime<Utc>>,
    /// When a terminal state was reached.
    pub finished: Option<DateTime<Utc>>,
}

impl JobInfo {
    fn new() -> Self {
        Self {
            id: None,
            state: JobState::New,
            exit_code: None,
            execution_hosts: Vec::new(),
            created: Some(Utc::now()),
            started: None,
            finished: None,
        }
    }
}

/// Canonical, shared job status.
///
/// One `JobStatus` is created per job and shared between the API-level
/// [`Job`] handle and the backend adaptor, which is its sole mutator. The
/// snapshot lives in a `watch` channel: readers always observe a fully
/// updated [`JobInfo`], and [`JobStatus::wait_terminal`] is a subscribe
/// rather than a poll loop.
pub struct JobStatus {
    tx: watch::Sender<JobInfo>,
}

impl JobStatus {
    /// Create a status in state `New` with `created` set to now.
    pub fn new() -> Self {
        Self {
            tx: watch::Sender::new(JobInfo::new()),
        }
    }

    /// Atomic snapshot of the current status.
    pub fn snapshot(&self) -> JobInfo {
        self.tx.borrow().clone()
    }

    /// The current lifecycle state.
    pub fn state(&self) -> JobState {
        self.tx.borrow().state
    }

    /// Subscribe to status updates.
    pub fn subscribe(&self) -> watch::Receiver<JobInfo> {
        self.tx.subscribe()
    }

    /// Apply a mutation atomically with respect to readers.
    pub fn update(&self, apply: impl FnOnce(&mut JobInfo)) {
        self.tx.send_modify(apply);
    }

    /// Record a successful submission: `Running`, id, hosts, `started`.
    pub fn mark_running(&self, id: impl Into<String>, execution_hosts: Vec<String>) {
        let id = id.into();
        self.update(|info| {
            if info.state.is_terminal() {
                return;
            }
            telemetry::record_state_change(&id, info.state, JobState::Running);
            info.id = Some(id.clone());
            info.state = JobState::Running;
            info.execution_hosts = execution_hosts;
            info.started = Some(Utc::now());
        });
    }

    /// Record natural completion with the given exit code.
    pub fn mark_done(&self, exit_code: i32) {
        self.finish(JobState::Done, Some(exit_code));
    }

    /// Record backend-acknowledged termination.
    pub fn mark_canceled(&self) {
        self.finish(JobState::Canceled, None);
    }

    /// Record an execution or submission failure.
    pub fn mark_failed(&self) {
        self.finish(JobState::Failed, None);
    }

    /// Record a transition to `Suspended`.
    pub fn mark_suspended(&self) {
        self.update(|info| {
            if info.state == JobState::Running {
                telemetry::record_state_change(
                    info.id.as_deref().unwrap_or("-"),
                    info.state,
                    JobState::Suspended,
                );
                info.state = JobState::Suspended;
            }
        });
    }

    /// Record a transition back to `Running`.
    pub fn mark_resumed(&self) {
        self.update(|info| {
            if info.state == JobState::Suspended {
                telemetry::record_state_change(
                    info.id.as_deref().unwrap_or("-"),
                    info.state,
                    JobState::Running,
                );
                info.state = JobState::Running;
            }
        });
    }

    fn finish(&self, state: JobState, exit_code: Option<i32>) {
        self.update(|info| {
            if info.state.is_terminal() {
                return;
            }
            telemetry::record_state_change(info.id.as_deref().unwrap_or("-"), info.state, state);
            info.state = state;
            info.exit_code = exit_code;
            info.finished = Some(Utc::now());
        });
    }

    /// Await a terminal state.
    ///
    /// `None` blocks until the job finishes; `Some(Duration::ZERO)` checks
    /// once without blocking; a positive bound returns `Ok(false)` when it
    /// elapses first. A `false` return leaves the job untouched.
    pub async fn wait_terminal(&self, timeout: Option<Duration>) -> Result<bool> {
        if self.state().is_terminal() {
            return Ok(true);
        }
        let mut rx = self.subscribe();
        match timeout {
            Some(bound) if bound.is_zero() => Ok(self.state().is_terminal()),
            Some(bound) => {
                match tokio::time::timeout(bound, rx.wait_for(|info| info.state.is_terminal()))
                    .await
                {
                    Ok(Ok(_)) => Ok(true),
                    Ok(Err(_)) => Err(Error::no_success("job status channel closed")),
                    Err(_) => Ok(false),
                }
            }
            None => rx
                .wait_for(|info| info.state.is_terminal())
                .await
                .map(|_| true)
                .map_err(|_| Error::no_success("job status channel closed")),
        }
    }
}

impl Default for JobStatus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobStatus")
            .field("info", &self.snapshot())
            .finish()
    }
}

/// Stateful handle to a submitted (or submittable) job.
///
/// The handle enforces the lifecycle state machine and forwards each
/// operation to the bound backend adaptor, which performs the backend
/// action and updates the shared [`JobStatus`]. Handles are cheap to clone;
/// clones observe the same job.
#[derive(Clone)]
pub struct Job {
    description: Arc<JobDescription>,
    status: Arc<JobStatus>,
    cpi: Arc<dyn JobCpi>,
    op_lock: Arc<tokio::sync::Mutex<()>>,
}

impl Job {
    pub(crate) fn new(
        description: JobDescription,
        status: Arc<JobStatus>,
        cpi: Arc<dyn JobCpi>,
    ) -> Self {
        Self {
            description: Arc::new(description),
            status,
            cpi,
            op_lock: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    /// The description this job was created from.
    pub fn description(&self) -> &JobDescription {
        &self.description
    }

    /// Atomic snapshot of the job's status fields. Never blocks.
    pub fn info(&self) -> JobInfo {
        self.status.snapshot()
    }

    /// Current lifecycle state. Never blocks.
    pub fn state(&self) -> JobState {
        self.status.state()
    }

    /// Backend-assigned id, once running.
    pub fn id(&self) -> Option<String> {
        self.status.snapshot().id
    }

    /// Exit code; set exactly when the state is `Done`.
    pub fn exit_code(&self) -> Option<i32> {
        self.status.snapshot().exit_code
    }

    /// Hosts the job executes on; non-empty once `Running` was reached.
    pub fn execution_hosts(&self) -> Vec<String> {
        self.status.snapshot().execution_hosts
    }

    /// When the handle was created.
    pub fn created(&self) -> Option<DateTime<Utc>> {
        self.status.snapshot().created
    }

    /// When the backend accepted the submission.
    pub fn started(&self) -> Option<DateTime<Utc>> {
        self.status.snapshot().started
    }

    /// When a terminal state was reached.
    pub fn finished(&self) -> Option<DateTime<Utc>> {
        self.status.snapshot().finished
    }

    /// Subscribe to status updates, e.g. for a monitoring task.
    pub fn subscribe(&self) -> watch::Receiver<JobInfo> {
        self.status.subscribe()
    }

    /// Submit the job. Valid only from `New`.
    ///
    /// On success the adaptor has moved the job to `Running` and set
    /// `started`. On failure the job is `Failed` and the submission error
    /// is returned. A second `run` fails with `IncorrectState`.
    pub async fn run(&self) -> Result<()> {
        let _guard = self.op_lock.lock().await;
        let state = self.status.state();
        if state != JobState::New {
            return Err(Error::incorrect_state(format!(
                "run is only valid in state New, job is {state}"
            )));
        }
        let id = self.status.snapshot().id;
        match telemetry::instrument_job_op("run", id.as_deref(), self.cpi.run()).await {
            Ok(()) => Ok(()),
            Err(err) => {
                self.status.mark_failed();
                Err(err)
            }
        }
    }

    /// Block until the job reaches a terminal state or `timeout` elapses.
    ///
    /// Valid once `run` has been called. `None` waits indefinitely,
    /// `Some(Duration::ZERO)` polls once. Returns `true` when a terminal
    /// state was reached in time; `false` leaves the job's state untouched.
    pub async fn wait(&self, timeout: Option<Duration>) -> Result<bool> {
        if self.status.state() == JobState::New {
            return Err(Error::incorrect_state("wait requires a prior run"));
        }
        self.cpi.wait(timeout).await
    }

    /// Task-returning variant of [`Job::wait`].
    ///
    /// The returned handle can be aborted to give up waiting; aborting it
    /// does not affect the job.
    pub fn spawn_wait(
        &self,
        timeout: Option<Duration>,
    ) -> tokio::task::JoinHandle<Result<bool>> {
        let job = self.clone();
        tokio::spawn(async move { job.wait(timeout).await })
    }

    /// Request backend termination.
    ///
    /// Idempotent on terminal jobs: cancelling a finished job is a no-op.
    /// The job transitions to `Canceled` only once the backend acknowledges
    /// the termination; an unreachable backend surfaces an operational
    /// error and leaves the state unchanged.
    pub async fn cancel(&self) -> Result<()> {
        let _guard = self.op_lock.lock().await;
        let state = self.status.state();
        if state.is_terminal() {
            return Ok(());
        }
        if state == JobState::New {
            return Err(Error::incorrect_state(
                "cancel requires a prior run; the job was never submitted",
            ));
        }
        let id = self.status.snapshot().id;
        telemetry::instrument_job_op("cancel", id.as_deref(), self.cpi.cancel()).await
    }

    /// Pause execution. Valid only from `Running`.
    ///
    /// Backends without suspension support reject with `Unsupported`
    /// instead of silently ignoring the request.
    pub async fn suspend(&self) -> Result<()> {
        let _guard = self.op_lock.lock().await;
        let state = self.status.state();
        if state != JobState::Running {
            return Err(Error::incorrect_state(format!(
                "suspend is only valid in state Running, job is {state}"
            )));
        }
        self.cpi.suspend().await
    }

    /// Resume execution. Valid only from `Suspended`.
    pub async fn resume(&self) -> Result<()> {
        let _guard = self.op_lock.lock().await;
        let state = self.status.state();
        if state != JobState::Suspended {
            return Err(Error::incorrect_state(format!(
                "resume is only valid in state Suspended, job is {state}"
            )));
        }
        self.cpi.resume().await
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let info = self.status.snapshot();
        f.debug_struct("Job")
            .field("id", &info.id)
            .field("state", &info.state)
            .field("executable", &self.description.executable)
            .finish()
    }
}
