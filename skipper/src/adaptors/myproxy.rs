//! MyProxy context adaptor.
//!
//! Initializes contexts of type `myproxy`: fetches an X.509 proxy through
//! a [`CredentialProvider`] and attaches a derived `X509` context carrying
//! the proxy location to the session. Proxy files live in a private store
//! directory created on demand.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

use crate::cpi::{ContextCpi, ContextFactory};
use crate::credential::{CredentialProvider, CredentialRequest, MyProxyLogon};
use crate::error::{Error, Result};
use crate::registry::{AdaptorDescriptor, AdaptorModule};
use crate::session::{Context, Session};

const MODULE_NAME: &str = "skipper.adaptor.myproxy";
const CONTEXT_TYPE: &str = "myproxy";

/// Registration entry point for the MyProxy context adaptor.
pub struct MyProxyModule {
    provider: Arc<dyn CredentialProvider>,
    store: Option<PathBuf>,
}

impl MyProxyModule {
    /// Module backed by the real `myproxy-logon` tool.
    pub fn new() -> Self {
        Self::with_provider(Arc::new(MyProxyLogon::new()))
    }

    /// Module backed by a caller-supplied provider, e.g. a test double.
    pub fn with_provider(provider: Arc<dyn CredentialProvider>) -> Self {
        Self {
            provider,
            store: None,
        }
    }

    /// Override the proxy store directory (default `$HOME/.skipper/proxies`).
    pub fn with_store(mut self, store: impl Into<PathBuf>) -> Self {
        self.store = Some(store.into());
        self
    }
}

impl Default for MyProxyModule {
    fn default() -> Self {
        Self::new()
    }
}

impl AdaptorModule for MyProxyModule {
    fn name(&self) -> &str {
        MODULE_NAME
    }

    fn register(&self) -> Result<Option<Vec<AdaptorDescriptor>>> {
        Ok(Some(vec![AdaptorDescriptor::context(
            "myproxy-context",
            [CONTEXT_TYPE],
            Arc::new(MyProxyFactory {
                provider: Arc::clone(&self.provider),
                store: self.store.clone(),
            }),
        )]))
    }
}

struct MyProxyFactory {
    provider: Arc<dyn CredentialProvider>,
    store: Option<PathBuf>,
}

#[async_trait]
impl ContextFactory for MyProxyFactory {
    async fn bind(&self, context: &Context, _session: &Session) -> Result<Arc<dyn ContextCpi>> {
        if !context.has_type(CONTEXT_TYPE) {
            return Err(Error::bad_parameter(format!(
                "the myproxy context adaptor only handles myproxy contexts, not '{}'",
                context.context_type()
            )));
        }
        Ok(Arc::new(MyProxyContext {
            context: context.clone(),
            provider: Arc::clone(&self.provider),
            store: self.store.clone(),
        }))
    }
}

struct MyProxyContext {
    context: Context,
    provider: Arc<dyn CredentialProvider>,
    store: Option<PathBuf>,
}

#[async_trait]
impl ContextCpi for MyProxyContext {
    async fn initialize(&self, session: &Session) -> Result<()> {
        let store = match &self.store {
            Some(store) => store.clone(),
            None => default_proxy_store()?,
        };
        tokio::fs::create_dir_all(&store).await.map_err(|err| {
            Error::no_success(format!(
                "could not create proxy store '{}'",
                store.display()
            ))
            .with_cause(err)
        })?;
        let destination = store.join(format!("myproxy_{}.x509", Uuid::new_v4()));

        let (server, port) = split_server(self.context.server())?;
        let request = CredentialRequest {
            server,
            port,
            user_id: self.context.user_id().map(str::to_string),
            user_pass: self.context.user_pass().map(str::to_string),
            life_time: self.context.life_time(),
            destination: destination.clone(),
        };

        let outcome = self.provider.acquire(&request).await?;
        if !outcome.succeeded {
            return Err(Error::no_success(format!(
                "could not fetch myproxy credential: {}",
                outcome.diagnostic.trim()
            )));
        }
        tracing::info!(proxy = %destination.display(), "myproxy credential received");

        let mut derived = Context::new("X509").with_user_proxy(destination);
        if let Some(life_time) = self.context.life_time() {
            derived = derived.with_life_time(life_time);
        }
        session.attach(derived);
        Ok(())
    }
}

fn default_proxy_store() -> Result<PathBuf> {
    let home = std::env::var_os("HOME")
        .ok_or_else(|| Error::no_success("HOME is not set; cannot locate the proxy store"))?;
    Ok(PathBuf::from(home).join(".skipper").join("proxies"))
}

/// Split a `host[:port]` server attribute into its parts.
fn split_server(server: Option<&str>) -> Result<(Option<String>, Option<u16>)> {
    let Some(server) = server else {
        return Ok((None, None));
    };
    match server.split_once(':') {
        Some((host, port)) => {
            let port = port.parse::<u16>().map_err(|err| {
                Error::bad_parameter(format!("invalid myproxy server port in '{server}'"))
                    .with_cause(err)
            })?;
            Ok((Some(host.to_string()), Some(port)))
        }
        None => Ok((Some(server.to_string()), None)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn server_attribute_splits_into_host_and_port() {
        assert_eq!(split_server(None).unwrap(), (None, None));
        assert_eq!(
            split_server(Some("myproxy.example.org")).unwrap(),
            (Some("myproxy.example.org".to_string()), None)
        );
        assert_eq!(
            split_server(Some("myproxy.example.org:7512")).unwrap(),
            (Some("myproxy.example.org".to_string()), Some(7512))
        );
    }

    #[test]
    fn junk_port_is_a_bad_parameter() {
        let err = split_server(Some("host:seven")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadParameter);
    }
}
