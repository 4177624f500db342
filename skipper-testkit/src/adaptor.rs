use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use skipper::{
    AdaptorDescriptor, AdaptorModule, EndpointUrl, Error, ErrorKind, JobCpi, JobDescription,
    JobServiceCpi, JobServiceFactory, JobStatus, Result, Session,
};

/// Scripted result of a module's registration entry point.
#[derive(Clone)]
pub enum RegisterOutcome {
    /// Register these descriptors.
    Descriptors(Vec<AdaptorDescriptor>),
    /// Self-decline registration.
    Decline,
    /// Fail registration with the given message.
    Fail(String),
}

/// Adaptor module returning a scripted registration outcome.
pub struct StaticModule {
    name: String,
    outcome: RegisterOutcome,
}

impl StaticModule {
    /// Module registering the given descriptors.
    pub fn new(name: impl Into<String>, descriptors: Vec<AdaptorDescriptor>) -> Self {
        Self {
            name: name.into(),
            outcome: RegisterOutcome::Descriptors(descriptors),
        }
    }

    /// Module that declines registration.
    pub fn declining(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            outcome: RegisterOutcome::Decline,
        }
    }

    /// Module whose registration entry point fails.
    pub fn failing(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            outcome: RegisterOutcome::Fail(message.into()),
        }
    }
}

impl AdaptorModule for StaticModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn register(&self) -> Result<Option<Vec<AdaptorDescriptor>>> {
        match &self.outcome {
            RegisterOutcome::Descriptors(descriptors) => Ok(Some(descriptors.clone())),
            RegisterOutcome::Decline => Ok(None),
            RegisterOutcome::Fail(message) => Err(Error::no_success(message.clone())),
        }
    }
}

/// Scripted outcome of a bind attempt.
#[derive(Clone)]
pub enum BindBehavior {
    /// Accept the endpoint and hand out a [`MockJobService`].
    Accept,
    /// Decline the endpoint (`BadParameter`).
    Decline(String),
    /// Fail the bind with a non-decline error.
    Fail(ErrorKind, String),
}

/// Job service factory with a scripted bind outcome.
///
/// Bind attempts are counted so tests can assert scan order and fail-fast
/// behavior.
pub struct MockJobFactory {
    behavior: BindBehavior,
    bind_attempts: AtomicUsize,
    job_runtime: Duration,
    exit_code: i32,
    cancel_fails: bool,
}

impl MockJobFactory {
    /// Factory that accepts every endpoint.
    pub fn accepting() -> Arc<Self> {
        Arc::new(Self {
            behavior: BindBehavior::Accept,
            bind_attempts: AtomicUsize::new(0),
            job_runtime: Duration::ZERO,
            exit_code: 0,
            cancel_fails: false,
        })
    }

    /// Factory that declines every endpoint.
    pub fn declining(reason: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            behavior: BindBehavior::Decline(reason.into()),
            bind_attempts: AtomicUsize::new(0),
            job_runtime: Duration::ZERO,
            exit_code: 0,
            cancel_fails: false,
        })
    }

    /// Factory whose bind fails with a non-decline error.
    pub fn failing(kind: ErrorKind, message: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            behavior: BindBehavior::Fail(kind, message.into()),
            bind_attempts: AtomicUsize::new(0),
            job_runtime: Duration::ZERO,
            exit_code: 0,
            cancel_fails: false,
        })
    }

    /// Accepting factory whose jobs run for `runtime` and exit with
    /// `exit_code`.
    pub fn with_job(runtime: Duration, exit_code: i32) -> Arc<Self> {
        Arc::new(Self {
            behavior: BindBehavior::Accept,
            bind_attempts: AtomicUsize::new(0),
            job_runtime: runtime,
            exit_code,
            cancel_fails: false,
        })
    }

    /// Accepting factory whose jobs reject cancellation with an
    /// operational error, as an unreachable backend would.
    pub fn with_unreachable_cancel(runtime: Duration) -> Arc<Self> {
        Arc::new(Self {
            behavior: BindBehavior::Accept,
            bind_attempts: AtomicUsize::new(0),
            job_runtime: runtime,
            exit_code: 0,
            cancel_fails: true,
        })
    }

    /// How often this factory's bind was attempted.
    pub fn bind_attempts(&self) -> usize {
        self.bind_attempts.load(Ordering::SeqCst)
    }

    /// Wrap this factory in a job descriptor claiming `schemes`.
    pub fn descriptor(
        self: &Arc<Self>,
        name: impl Into<String>,
        schemes: impl IntoIterator<Item = impl Into<String>>,
    ) -> AdaptorDescriptor {
        AdaptorDescriptor::job(name, schemes, Arc::clone(self) as Arc<dyn JobServiceFactory>)
    }
}

#[async_trait]
impl JobServiceFactory for MockJobFactory {
    async fn bind(&self, _url: &EndpointUrl, _session: &Session) -> Result<Arc<dyn JobServiceCpi>> {
        self.bind_attempts.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            BindBehavior::Accept => Ok(Arc::new(MockJobService {
                job_runtime: self.job_runtime,
                exit_code: self.exit_code,
                cancel_fails: self.cancel_fails,
                active: Arc::new(Mutex::new(Vec::new())),
                next_id: AtomicU64::new(1),
            })),
            BindBehavior::Decline(reason) => Err(Error::bad_parameter(reason.clone())),
            BindBehavior::Fail(kind, message) => Err(Error::new(*kind, message.clone())),
        }
    }
}

/// In-memory job service handing out [`MockJob`]s.
pub struct MockJobService {
    job_runtime: Duration,
    exit_code: i32,
    cancel_fails: bool,
    active: Arc<Mutex<Vec<String>>>,
    next_id: AtomicU64,
}

#[async_trait]
impl JobServiceCpi for MockJobService {
    async fn create_job(
        &self,
        _description: JobDescription,
        status: Arc<JobStatus>,
    ) -> Result<Arc<dyn JobCpi>> {
        let id = format!("[mock]-[{}]", self.next_id.fetch_add(1, Ordering::SeqCst));
        Ok(Arc::new(MockJob {
            id,
            status,
            runtime: self.job_runtime,
            exit_code: self.exit_code,
            cancel_fails: self.cancel_fails,
            active: Arc::clone(&self.active),
        }))
    }

    async fn list(&self) -> Result<Vec<String>> {
        Ok(self.active.lock().clone())
    }
}

/// Scripted in-memory job: completes with the configured exit code after
/// the configured runtime, unless canceled first. Supports suspension.
pub struct MockJob {
    id: String,
    status: Arc<JobStatus>,
    runtime: Duration,
    exit_code: i32,
    cancel_fails: bool,
    active: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl JobCpi for MockJob {
    async fn run(&self) -> Result<()> {
        self.status
            .mark_running(self.id.clone(), vec!["mock-host".to_string()]);
        self.active.lock().push(self.id.clone());

        let status = Arc::clone(&self.status);
        let active = Arc::clone(&self.active);
        let id = self.id.clone();
        let runtime = self.runtime;
        let exit_code = self.exit_code;
        tokio::spawn(async move {
            tokio::time::sleep(runtime).await;
            active.lock().retain(|job| job != &id);
            // sticky terminal states make this a no-op after cancel
            status.mark_done(exit_code);
        });
        Ok(())
    }

    async fn wait(&self, timeout: Option<Duration>) -> Result<bool> {
        self.status.wait_terminal(timeout).await
    }

    async fn cancel(&self) -> Result<()> {
        if self.cancel_fails {
            return Err(Error::no_success("mock backend unreachable"));
        }
        self.active.lock().retain(|job| job != &self.id);
        self.status.mark_canceled();
        Ok(())
    }

    async fn suspend(&self) -> Result<()> {
        self.status.mark_suspended();
        Ok(())
    }

    async fn resume(&self) -> Result<()> {
        self.status.mark_resumed();
        Ok(())
    }
}
