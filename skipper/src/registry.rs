use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::cpi::{ContextFactory, JobServiceFactory};
use crate::error::Result;

/// A category of backend functionality an adaptor can implement.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum Capability {
    /// Job submission and lifecycle management.
    Job,
    /// Security context initialization.
    Context,
    /// File staging between endpoints.
    FileTransfer,
}

impl Capability {
    /// String form used in log fields and error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Job => "job",
            Capability::Context => "context",
            Capability::FileTransfer => "file-transfer",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capability-specific factory carried by a descriptor.
#[derive(Clone)]
pub enum AdaptorFactory {
    /// Produces bound job services.
    Job(Arc<dyn JobServiceFactory>),
    /// Produces bound context initializers.
    Context(Arc<dyn ContextFactory>),
}

impl fmt::Debug for AdaptorFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdaptorFactory::Job(_) => f.write_str("AdaptorFactory::Job"),
            AdaptorFactory::Context(_) => f.write_str("AdaptorFactory::Context"),
        }
    }
}

/// Registration metadata for one adaptor: the capability it implements,
/// the schemes it claims, and the factory that instantiates it.
///
/// Immutable once handed to the engine's load pass.
#[derive(Clone, Debug)]
pub struct AdaptorDescriptor {
    name: String,
    capability: Capability,
    schemes: Vec<String>,
    factory: AdaptorFactory,
}

impl AdaptorDescriptor {
    /// Descriptor for a job adaptor claiming the given URL schemes.
    pub fn job(
        name: impl Into<String>,
        schemes: impl IntoIterator<Item = impl Into<String>>,
        factory: Arc<dyn JobServiceFactory>,
    ) -> Self {
        Self {
            name: name.into(),
            capability: Capability::Job,
            schemes: schemes.into_iter().map(Into::into).collect(),
            factory: AdaptorFactory::Job(factory),
        }
    }

    /// Descriptor for a context adaptor claiming the given context types.
    pub fn context(
        name: impl Into<String>,
        types: impl IntoIterator<Item = impl Into<String>>,
        factory: Arc<dyn ContextFactory>,
    ) -> Self {
        Self {
            name: name.into(),
            capability: Capability::Context,
            schemes: types.into_iter().map(Into::into).collect(),
            factory: AdaptorFactory::Context(factory),
        }
    }

    /// The adaptor's name, for diagnostics.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The capability this adaptor implements.
    pub fn capability(&self) -> Capability {
        self.capability
    }

    /// The schemes (or context types) this adaptor claims.
    pub fn schemes(&self) -> &[String] {
        &self.schemes
    }

    /// The factory to instantiate the adaptor through.
    pub fn factory(&self) -> &AdaptorFactory {
        &self.factory
    }
}

/// Registration entry point implemented by every backend module.
///
/// Registration is invoked explicitly by [`Engine::load`]; there is no
/// dynamic module resolution.
///
/// [`Engine::load`]: crate::Engine::load
pub trait AdaptorModule: Send + Sync {
    /// Stable module identifier; scopes the `enabled` configuration flag
    /// and load-time log lines.
    fn name(&self) -> &str;

    /// Return the descriptors this module provides.
    ///
    /// `Ok(None)` (or an empty list) declines registration, e.g. when the
    /// module determined it cannot run on this platform. An `Err` is
    /// logged and the module skipped; it never aborts the load pass.
    fn register(&self) -> Result<Option<Vec<AdaptorDescriptor>>>;
}

/// One row of the registry's diagnostic listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RegistryEntry {
    /// Capability of this bucket.
    pub capability: Capability,
    /// Scheme (or context type) of this bucket.
    pub scheme: String,
    /// Adaptor names, in registration (= binding) order.
    pub adaptors: Vec<String>,
}

/// Index of adaptor descriptors by `(capability, scheme)`.
///
/// Registration order is preserved per bucket: the first registered
/// descriptor is the first binding candidate. The registry is built during
/// the engine's load pass and read-only afterwards, so concurrent lookups
/// need no synchronization.
#[derive(Default)]
pub struct Registry {
    index: HashMap<Capability, HashMap<String, Vec<Arc<AdaptorDescriptor>>>>,
}

impl Registry {
    /// Append a descriptor to the bucket of each scheme it claims.
    /// Scheme keys are lowercased; lookups are case-insensitive.
    pub fn insert(&mut self, descriptor: AdaptorDescriptor) {
        let descriptor = Arc::new(descriptor);
        let by_scheme = self.index.entry(descriptor.capability()).or_default();
        for scheme in descriptor.schemes() {
            by_scheme
                .entry(scheme.to_ascii_lowercase())
                .or_default()
                .push(Arc::clone(&descriptor));
        }
    }

    /// Ordered binding candidates for a `(capability, scheme)` pair.
    pub fn candidates(&self, capability: Capability, scheme: &str) -> &[Arc<AdaptorDescriptor>] {
        self.index
            .get(&capability)
            .and_then(|by_scheme| by_scheme.get(&scheme.to_ascii_lowercase()))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Total number of (capability, scheme, descriptor) registrations.
    pub fn len(&self) -> usize {
        self.index
            .values()
            .flat_map(HashMap::values)
            .map(Vec::len)
            .sum()
    }

    /// Whether the registry holds no descriptors.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Full diagnostic listing, sorted by capability and scheme for stable
    /// output; adaptor order inside each entry is registration order.
    pub fn entries(&self) -> Vec<RegistryEntry> {
        let mut entries: Vec<RegistryEntry> = self
            .index
            .iter()
            .flat_map(|(capability, by_scheme)| {
                by_scheme.iter().map(|(scheme, descriptors)| RegistryEntry {
                    capability: *capability,
                    scheme: scheme.clone(),
                    adaptors: descriptors.iter().map(|d| d.name().to_string()).collect(),
                })
            })
            .collect();
        entries.sort_by(|a, b| {
            (a.capability.as_str(), &a.scheme).cmp(&(b.capability.as_str(), &b.scheme))
        });
        entries
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("entries", &self.entries())
            .finish()
    }
}
