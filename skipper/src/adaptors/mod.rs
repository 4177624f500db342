//! Built-in backend adaptors.
//!
//! Each adaptor lives in its own module and exposes an
//! [`AdaptorModule`](crate::AdaptorModule) whose registration entry point
//! is invoked by [`Engine::load`](crate::Engine::load).

pub mod local;
pub mod myproxy;

use std::sync::Arc;

use crate::registry::AdaptorModule;

pub use local::LocalJobModule;
pub use myproxy::MyProxyModule;

/// The adaptor modules loaded into [`Engine::with_defaults`](crate::Engine::with_defaults).
pub fn default_modules() -> Vec<Arc<dyn AdaptorModule>> {
    vec![
        Arc::new(LocalJobModule::new()),
        Arc::new(MyProxyModule::new()),
    ]
}
