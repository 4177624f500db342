use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::sync::OnceLock;

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::registry::{
    AdaptorFactory, AdaptorModule, Capability, Registry, RegistryEntry,
};
use crate::service::JobService;
use crate::session::{Context, Session};
use crate::telemetry;
use crate::url::EndpointUrl;

/// Why a descriptor (or whole module) was excluded during the load pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum SkipReason {
    /// Disabled through the engine configuration.
    Disabled,
    /// The module declined registration itself.
    Declined,
    /// The module's registration entry point returned an error.
    Failed,
}

/// Record of an adaptor excluded from the registry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SkippedAdaptor {
    /// The owning module's name.
    pub module: String,
    /// The individual adaptor, when the skip is descriptor-scoped.
    pub adaptor: Option<String>,
    /// Why it was skipped.
    pub reason: SkipReason,
}

/// The dispatch engine: owns the adaptor registry and binds API objects to
/// backend adaptors.
///
/// An engine is an ordinary constructible value — tests build as many
/// independently configured instances as they need — with one lazily
/// created process-default instance behind [`Engine::shared`] for
/// convenience call sites. After [`Engine::load`] returns, the engine is
/// read-only and safe to share across threads.
pub struct Engine {
    registry: Registry,
    skipped: Vec<SkippedAdaptor>,
}

impl Engine {
    /// Build an engine by invoking each module's registration entry point.
    ///
    /// Loading is fault tolerant: a module that declines, is disabled via
    /// `config`, or fails during registration is logged and recorded in
    /// [`Engine::skipped`], and the load pass continues. The engine stays
    /// usable with a partial registry.
    pub fn load(config: &EngineConfig, modules: &[Arc<dyn AdaptorModule>]) -> Self {
        let span = telemetry::engine_load_span();
        let _enter = span.enter();

        let mut registry = Registry::default();
        let mut skipped = Vec::new();

        for module in modules {
            let module_name = module.name();
            let descriptors = match module.register() {
                Ok(Some(descriptors)) if !descriptors.is_empty() => descriptors,
                Ok(_) => {
                    tracing::info!(module = module_name, "adaptor module declined registration");
                    skipped.push(SkippedAdaptor {
                        module: module_name.to_string(),
                        adaptor: None,
                        reason: SkipReason::Declined,
                    });
                    continue;
                }
                Err(err) => {
                    tracing::warn!(
                        module = module_name,
                        error = %err,
                        "adaptor module failed to register"
                    );
                    skipped.push(SkippedAdaptor {
                        module: module_name.to_string(),
                        adaptor: None,
                        reason: SkipReason::Failed,
                    });
                    continue;
                }
            };

            for descriptor in descriptors {
                if !config.adaptor_enabled(module_name) {
                    tracing::info!(
                        module = module_name,
                        adaptor = descriptor.name(),
                        "adaptor disabled by configuration"
                    );
                    skipped.push(SkippedAdaptor {
                        module: module_name.to_string(),
                        adaptor: Some(descriptor.name().to_string()),
                        reason: SkipReason::Disabled,
                    });
                    continue;
                }
                tracing::info!(
                    module = module_name,
                    adaptor = descriptor.name(),
                    capability = %descriptor.capability(),
                    schemes = ?descriptor.schemes(),
                    "adaptor registered"
                );
                registry.insert(descriptor);
            }
        }

        Self { registry, skipped }
    }

    /// Build an engine with the default configuration and the built-in
    /// adaptor modules.
    pub fn with_defaults() -> Self {
        Self::load(&EngineConfig::default(), &crate::adaptors::default_modules())
    }

    /// The process-default engine, created on first use.
    pub fn shared() -> &'static Engine {
        static SHARED: OnceLock<Engine> = OnceLock::new();
        SHARED.get_or_init(Engine::with_defaults)
    }

    /// Read-only view of the full registry index, for diagnostics.
    pub fn list_loaded(&self) -> Vec<RegistryEntry> {
        self.registry.entries()
    }

    /// Adaptors excluded during the load pass, with the reason.
    pub fn skipped(&self) -> &[SkippedAdaptor] {
        &self.skipped
    }

    /// Resolve a job service for the given endpoint URL.
    ///
    /// Candidates registered for `(job, scheme)` are tried in registration
    /// order. A candidate that declines (its own validation found the
    /// endpoint not applicable) is skipped; the first candidate that fails
    /// with any other error aborts the scan and that error is returned.
    /// When no candidate accepts, the resolution fails with `NotFound`.
    pub async fn job_service(&self, url: &str, session: &Session) -> Result<JobService> {
        let url = EndpointUrl::parse(url)?;
        let scan = async {
            let candidates = self.registry.candidates(Capability::Job, url.scheme());
            if candidates.is_empty() {
                return Err(Error::not_found(format!(
                    "no job adaptor registered for scheme '{}'",
                    url.scheme()
                )));
            }

            for descriptor in candidates {
                let AdaptorFactory::Job(factory) = descriptor.factory() else {
                    continue;
                };
                match factory.bind(&url, session).await {
                    Ok(cpi) => {
                        tracing::debug!(adaptor = descriptor.name(), url = %url, "bound job service");
                        return Ok(JobService::new(url.clone(), cpi));
                    }
                    Err(err) if err.is_decline() => {
                        tracing::debug!(
                            adaptor = descriptor.name(),
                            url = %url,
                            reason = %err,
                            "adaptor declined endpoint"
                        );
                    }
                    Err(err) => return Err(err),
                }
            }

            Err(Error::not_found(format!(
                "no job adaptor accepted endpoint '{url}'"
            )))
        };
        telemetry::instrument_bind(Capability::Job, url.scheme(), scan).await
    }

    /// Initialize a context and attach the result to `session`.
    ///
    /// The context's type selects candidates among `(context, type)`
    /// registrations, with the same decline/fail-fast scan as job binding.
    /// The bound adaptor performs the credential acquisition and attaches
    /// the derived context; on any failure the session is left untouched.
    pub async fn initialize_context(&self, session: &Session, context: Context) -> Result<()> {
        let scan = async {
            let candidates = self
                .registry
                .candidates(Capability::Context, context.context_type());
            if candidates.is_empty() {
                return Err(Error::not_found(format!(
                    "no context adaptor registered for type '{}'",
                    context.context_type()
                )));
            }

            for descriptor in candidates {
                let AdaptorFactory::Context(factory) = descriptor.factory() else {
                    continue;
                };
                match factory.bind(&context, session).await {
                    Ok(cpi) => {
                        tracing::debug!(
                            adaptor = descriptor.name(),
                            context_type = context.context_type(),
                            "bound context adaptor"
                        );
                        return cpi.initialize(session).await;
                    }
                    Err(err) if err.is_decline() => {
                        tracing::debug!(
                            adaptor = descriptor.name(),
                            context_type = context.context_type(),
                            reason = %err,
                            "context adaptor declined"
                        );
                    }
                    Err(err) => return Err(err),
                }
            }

            Err(Error::not_found(format!(
                "no context adaptor accepted type '{}'",
                context.context_type()
            )))
        };
        telemetry::instrument_bind(Capability::Context, context.context_type(), scan).await
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("registry", &self.registry)
            .field("skipped", &self.skipped)
            .finish()
    }
}
