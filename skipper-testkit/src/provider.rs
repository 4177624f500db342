use async_trait::async_trait;
use parking_lot::Mutex;

use skipper::{CredentialOutcome, CredentialProvider, CredentialRequest, Error, Result};

/// Scripted behavior of a [`MockCredentialProvider`].
#[derive(Clone)]
pub enum ProviderBehavior {
    /// Report success and write a placeholder credential file.
    Succeed,
    /// Report failure with the given diagnostic output.
    Reject(String),
    /// Fail to invoke the mechanism at all (operational error).
    Unavailable(String),
}

/// Credential provider double that records every request it receives.
pub struct MockCredentialProvider {
    behavior: ProviderBehavior,
    requests: Mutex<Vec<CredentialRequest>>,
}

impl MockCredentialProvider {
    /// Provider with the given scripted behavior.
    pub fn new(behavior: ProviderBehavior) -> Self {
        Self {
            behavior,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// The requests received so far, in order.
    pub fn requests(&self) -> Vec<CredentialRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl CredentialProvider for MockCredentialProvider {
    async fn acquire(&self, request: &CredentialRequest) -> Result<CredentialOutcome> {
        self.requests.lock().push(request.clone());
        match &self.behavior {
            ProviderBehavior::Succeed => {
                tokio::fs::write(&request.destination, b"mock credential")
                    .await
                    .map_err(|err| {
                        Error::no_success("could not write mock credential").with_cause(err)
                    })?;
                Ok(CredentialOutcome {
                    succeeded: true,
                    output: format!(
                        "A credential has been received for user {} in {}.",
                        request.user_id.as_deref().unwrap_or("unknown"),
                        request.destination.display()
                    ),
                    diagnostic: String::new(),
                })
            }
            ProviderBehavior::Reject(diagnostic) => Ok(CredentialOutcome {
                succeeded: false,
                output: String::new(),
                diagnostic: diagnostic.clone(),
            }),
            ProviderBehavior::Unavailable(message) => Err(Error::no_success(message.clone())),
        }
    }
}
