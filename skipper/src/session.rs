use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Security attributes used to authenticate adaptor operations.
///
/// A context's `type` selects which context adaptor initializes it; the
/// remaining attributes are inputs to (or, for `user_proxy`, outputs of)
/// that initialization.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Context {
    context_type: String,
    server: Option<String>,
    user_id: Option<String>,
    user_pass: Option<String>,
    life_time: Option<u32>,
    user_proxy: Option<PathBuf>,
}

impl Context {
    /// Create a context of the given type.
    pub fn new(context_type: impl Into<String>) -> Self {
        Self {
            context_type: context_type.into(),
            server: None,
            user_id: None,
            user_pass: None,
            life_time: None,
            user_proxy: None,
        }
    }

    /// Set the authentication server, as `host` or `host:port`.
    pub fn with_server(mut self, server: impl Into<String>) -> Self {
        self.server = Some(server.into());
        self
    }

    /// Set the user name presented to the authentication server.
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Set the password presented to the authentication server.
    pub fn with_user_pass(mut self, user_pass: impl Into<String>) -> Self {
        self.user_pass = Some(user_pass.into());
        self
    }

    /// Set the requested credential lifetime, in hours.
    pub fn with_life_time(mut self, hours: u32) -> Self {
        self.life_time = Some(hours);
        self
    }

    /// Set the path of a derived credential.
    pub fn with_user_proxy(mut self, path: impl Into<PathBuf>) -> Self {
        self.user_proxy = Some(path.into());
        self
    }

    /// The context type string.
    pub fn context_type(&self) -> &str {
        &self.context_type
    }

    /// Case-insensitive type check, as context adaptors must apply it.
    pub fn has_type(&self, context_type: &str) -> bool {
        self.context_type.eq_ignore_ascii_case(context_type)
    }

    /// The authentication server, when set.
    pub fn server(&self) -> Option<&str> {
        self.server.as_deref()
    }

    /// The user name, when set.
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// The password, when set.
    pub fn user_pass(&self) -> Option<&str> {
        self.user_pass.as_deref()
    }

    /// The requested lifetime in hours, when set.
    pub fn life_time(&self) -> Option<u32> {
        self.life_time
    }

    /// The derived credential path, when one has been produced.
    pub fn user_proxy(&self) -> Option<&PathBuf> {
        self.user_proxy.as_ref()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("context_type", &self.context_type)
            .field("server", &self.server)
            .field("user_id", &self.user_id)
            .field("user_pass", &self.user_pass.as_ref().map(|_| "<redacted>"))
            .field("life_time", &self.life_time)
            .field("user_proxy", &self.user_proxy)
            .finish()
    }
}

/// Holder of zero-or-more security contexts.
///
/// Sessions are cheap handles; clones share the same context list. Adaptors
/// read the attached contexts at initialization time and context adaptors
/// attach derived contexts through [`Session::attach`].
#[derive(Clone, Default)]
pub struct Session {
    contexts: Arc<RwLock<Vec<Context>>>,
}

impl Session {
    /// Create an empty session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a context without initializing it.
    ///
    /// Initialization through the matching context adaptor is driven by
    /// [`Engine::initialize_context`](crate::Engine::initialize_context).
    pub fn attach(&self, context: Context) {
        self.contexts.write().push(context);
    }

    /// Snapshot of the attached contexts.
    pub fn contexts(&self) -> Vec<Context> {
        self.contexts.read().clone()
    }

    /// Number of attached contexts.
    pub fn len(&self) -> usize {
        self.contexts.read().len()
    }

    /// Whether the session holds no contexts.
    pub fn is_empty(&self) -> bool {
        self.contexts.read().is_empty()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("contexts", &self.len())
            .finish()
    }
}
