//! Adaptor-facing interfaces (the capability provider interface).
//!
//! Backend adaptors implement these traits; API-level objects ([`Job`],
//! [`JobService`], [`Session`]) forward their operations through them. The
//! factories are what the dispatch engine invokes while scanning bind
//! candidates: a factory that cannot handle the target declines with a
//! `BadParameter` error, anything else is treated as an operational failure
//! and aborts the scan.
//!
//! [`Job`]: crate::Job
//! [`JobService`]: crate::JobService
//! [`Session`]: crate::Session

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::description::JobDescription;
use crate::error::{Error, Result};
use crate::job::JobStatus;
use crate::session::{Context, Session};
use crate::url::EndpointUrl;

/// Backend implementation of a single job.
///
/// The implementor is the sole mutator of the [`JobStatus`] it was created
/// with; state checks have already been performed by the [`Job`] handle
/// when these methods are invoked.
///
/// [`Job`]: crate::Job
#[async_trait]
pub trait JobCpi: Send + Sync {
    /// Submit the job to the backend. On success the status is `Running`
    /// with id, hosts and `started` recorded.
    async fn run(&self) -> Result<()>;

    /// Await a terminal state, by polling the backend or subscribing to
    /// the shared status. Semantics of `timeout` match [`Job::wait`].
    ///
    /// [`Job::wait`]: crate::Job::wait
    async fn wait(&self, timeout: Option<Duration>) -> Result<bool>;

    /// Terminate the job on the backend and mark the status `Canceled`
    /// once the backend has acknowledged.
    async fn cancel(&self) -> Result<()>;

    /// Pause execution. Backends without suspension keep the default.
    async fn suspend(&self) -> Result<()> {
        Err(Error::unsupported(
            "this backend does not support suspending jobs",
        ))
    }

    /// Resume execution. Backends without suspension keep the default.
    async fn resume(&self) -> Result<()> {
        Err(Error::unsupported(
            "this backend does not support resuming jobs",
        ))
    }
}

/// Backend implementation of a job service bound to one endpoint.
#[async_trait]
pub trait JobServiceCpi: Send + Sync {
    /// Create the backend side of a job. The passed `status` is the
    /// canonical status the adaptor must keep updated.
    async fn create_job(
        &self,
        description: JobDescription,
        status: Arc<JobStatus>,
    ) -> Result<Arc<dyn JobCpi>>;

    /// Ids of jobs currently visible at this endpoint.
    async fn list(&self) -> Result<Vec<String>>;
}

/// Backend implementation of context initialization.
///
/// Implementations follow the attach-or-nothing contract: on success
/// exactly one derived context has been attached to the session, on failure
/// the session is untouched.
#[async_trait]
pub trait ContextCpi: Send + Sync {
    /// Acquire the derived credential and attach the resulting context.
    async fn initialize(&self, session: &Session) -> Result<()>;
}

/// Factory binding a job service adaptor to an endpoint.
#[async_trait]
pub trait JobServiceFactory: Send + Sync {
    /// Validate the endpoint and produce a bound service.
    ///
    /// Decline with `BadParameter` when this adaptor cannot handle the
    /// endpoint; the engine then advances to the next candidate.
    async fn bind(&self, url: &EndpointUrl, session: &Session) -> Result<Arc<dyn JobServiceCpi>>;
}

/// Factory binding a context adaptor to a context.
#[async_trait]
pub trait ContextFactory: Send + Sync {
    /// Validate the context type and produce a bound initializer.
    ///
    /// Decline with `BadParameter` when the context's type is not handled
    /// by this adaptor.
    async fn bind(&self, context: &Context, session: &Session) -> Result<Arc<dyn ContextCpi>>;
}
