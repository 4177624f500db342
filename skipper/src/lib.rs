//! Skipper - uniform job submission across heterogeneous execution backends.
//!
//! A foundational crate providing one job-submission and job-lifecycle API
//! over interchangeable backends: local process launch, SSH-driven remote
//! hosts, batch schedulers, grid middleware. Client code describes a job
//! once; the engine picks the backend adaptor that understands the target
//! endpoint's URL scheme at runtime.
//!
//! # Core Concepts
//!
//! - **Engine**: The [`Engine`] owns the adaptor registry. It is built by
//!   an explicit load pass over [`AdaptorModule`] registration entry
//!   points and resolves `(capability, scheme)` pairs to live adaptor
//!   instances by scanning candidates in registration order.
//!
//! - **Job Service**: A [`JobService`] is the job factory bound to one
//!   endpoint. It creates [`Job`] handles from [`JobDescription`] values
//!   and lists the jobs visible at its endpoint.
//!
//! - **Job**: The stateful handle around the lifecycle state machine
//!   `New → Running → {Suspended ⇄ Running} → {Done | Canceled | Failed}`.
//!   Operations are forwarded to the bound adaptor, which updates the
//!   canonical [`JobStatus`].
//!
//! - **Session & Context**: A [`Session`] holds security [`Context`]s.
//!   Context adaptors initialize contexts through an external
//!   [`CredentialProvider`] and attach the derived credential context.
//!
//! - **Adaptors**: Backend implementations of the [`cpi`] traits,
//!   registered through descriptors. The built-in `fork`/`local` adaptor
//!   runs jobs as child processes.
//!
//! # Example
//!
//! ```ignore
//! use skipper::{Engine, JobDescription, Session};
//!
//! let session = Session::new();
//! let service = Engine::shared()
//!     .job_service("fork://localhost", &session)
//!     .await?;
//!
//! let job = service
//!     .create_job(JobDescription::new("/bin/sleep").arg("5"))
//!     .await?;
//! job.run().await?;
//! job.wait(Some(std::time::Duration::from_secs(10))).await?;
//! assert_eq!(job.exit_code(), Some(0));
//! ```

/// Built-in backend adaptors and the default module set.
pub mod adaptors;

/// Engine configuration: per-module enable flags.
pub mod config;

/// Adaptor-facing capability provider interfaces and bind factories.
pub mod cpi;

/// External credential provider contract and the `myproxy-logon` backend.
pub mod credential;

/// Job description value object.
pub mod description;

/// The dispatch engine: adaptor loading and binding.
pub mod engine;

/// Structured error values and the crate-wide error taxonomy.
pub mod error;

/// Job lifecycle: states, status snapshots, and the job handle.
pub mod job;

/// Adaptor descriptors, registration entry points, and the
/// `(capability, scheme)` index.
pub mod registry;

/// The endpoint-bound job factory.
pub mod service;

/// Sessions and security contexts.
pub mod session;

/// Tracing spans and record helpers.
pub mod telemetry;

/// Endpoint URL parsing.
pub mod url;

pub use config::{AdaptorConfig, EngineConfig};
pub use cpi::{ContextCpi, ContextFactory, JobCpi, JobServiceCpi, JobServiceFactory};
pub use credential::{CredentialOutcome, CredentialProvider, CredentialRequest, MyProxyLogon};
pub use description::JobDescription;
pub use engine::{Engine, SkipReason, SkippedAdaptor};
pub use error::{Error, ErrorKind, Result};
pub use job::{Job, JobInfo, JobState, JobStatus};
pub use registry::{
    AdaptorDescriptor, AdaptorFactory, AdaptorModule, Capability, Registry, RegistryEntry,
};
pub use service::JobService;
pub use session::{Context, Session};
pub use url::EndpointUrl;
