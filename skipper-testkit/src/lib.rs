//! Test doubles for skipper: scripted adaptor modules, an in-memory job
//! backend, and a recording credential provider.
//!
//! Everything here is deterministic and in-process so engine binding,
//! lifecycle, and context-initialization behavior can be exercised without
//! touching real backends.

mod adaptor;
mod provider;

pub use adaptor::{
    BindBehavior, MockJob, MockJobFactory, MockJobService, RegisterOutcome, StaticModule,
};
pub use provider::{MockCredentialProvider, ProviderBehavior};
