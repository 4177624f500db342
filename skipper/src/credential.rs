//! External credential acquisition.
//!
//! Context adaptors do not talk to authentication tools directly; they go
//! through [`CredentialProvider`], which returns a structured outcome
//! instead of raising on tool failure. The process-backed implementation
//! passes every value as a discrete argument — attribute values never end
//! up inside an interpolated shell string.

use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::error::{Error, Result};

/// Inputs to one credential acquisition.
#[derive(Clone)]
pub struct CredentialRequest {
    /// Authentication server host.
    pub server: Option<String>,
    /// Authentication server port.
    pub port: Option<u16>,
    /// User name presented to the server.
    pub user_id: Option<String>,
    /// Password, delivered to the tool on stdin.
    pub user_pass: Option<String>,
    /// Requested credential lifetime, in hours.
    pub life_time: Option<u32>,
    /// Where the derived credential must be written.
    pub destination: PathBuf,
}

impl CredentialRequest {
    /// Create a request writing the credential to `destination`.
    pub fn new(destination: impl Into<PathBuf>) -> Self {
        Self {
            server: None,
            port: None,
            user_id: None,
            user_pass: None,
            life_time: None,
            destination: destination.into(),
        }
    }
}

impl fmt::Debug for CredentialRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialRequest")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("user_id", &self.user_id)
            .field("user_pass", &self.user_pass.as_ref().map(|_| "<redacted>"))
            .field("life_time", &self.life_time)
            .field("destination", &self.destination)
            .finish()
    }
}

/// Result of one credential acquisition.
///
/// An unsuccessful acquisition is an ordinary outcome, not an `Err`:
/// `Err` is reserved for failures to invoke the mechanism at all (missing
/// tool, broken pipe).
#[derive(Clone, Debug)]
pub struct CredentialOutcome {
    /// Whether the mechanism reported success.
    pub succeeded: bool,
    /// The mechanism's regular output.
    pub output: String,
    /// Diagnostic output, surfaced to operators on failure.
    pub diagnostic: String,
}

/// An external mechanism that derives credentials.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Invoke the mechanism. Side-effecting: on success the credential has
    /// been written to `request.destination`.
    async fn acquire(&self, request: &CredentialRequest) -> Result<CredentialOutcome>;
}

/// Credential provider shelling out to `myproxy-logon`.
///
/// All request attributes are passed as separate arguments; the password
/// goes to the child's stdin (`--stdin_pass`), never onto the command line.
pub struct MyProxyLogon {
    command: String,
}

impl MyProxyLogon {
    /// Provider invoking `myproxy-logon` from `PATH`.
    pub fn new() -> Self {
        Self {
            command: "myproxy-logon".to_string(),
        }
    }

    /// Override the tool path, e.g. for tests.
    pub fn with_command(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl Default for MyProxyLogon {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CredentialProvider for MyProxyLogon {
    async fn acquire(&self, request: &CredentialRequest) -> Result<CredentialOutcome> {
        let mut command = Command::new(&self.command);
        command.arg("--stdin_pass");
        if let Some(server) = &request.server {
            command.arg("--pshost").arg(server);
        }
        if let Some(port) = request.port {
            command.arg("--psport").arg(port.to_string());
        }
        if let Some(user_id) = &request.user_id {
            command.arg("--username").arg(user_id);
        }
        if let Some(life_time) = request.life_time {
            command.arg("--proxy_lifetime").arg(life_time.to_string());
        }
        command.arg("--out").arg(&request.destination);
        command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = command.spawn().map_err(|err| {
            Error::no_success(format!("could not launch '{}'", self.command)).with_cause(err)
        })?;

        if let Some(mut stdin) = child.stdin.take() {
            if let Some(pass) = &request.user_pass {
                stdin.write_all(pass.as_bytes()).await.map_err(|err| {
                    Error::no_success("could not deliver password to credential tool")
                        .with_cause(err)
                })?;
            }
            // dropping stdin closes the pipe so the tool does not hang
        }

        let output = child.wait_with_output().await.map_err(|err| {
            Error::no_success(format!("'{}' did not run to completion", self.command))
                .with_cause(err)
        })?;

        Ok(CredentialOutcome {
            succeeded: output.status.success(),
            output: String::from_utf8_lossy(&output.stdout).into_owned(),
            diagnostic: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_debug_redacts_password() {
        let mut request = CredentialRequest::new("/tmp/proxy.x509");
        request.user_pass = Some("hunter2".to_string());
        let rendered = format!("{request:?}");
        assert!(!rendered.contains("hunter2"));
    }

    #[tokio::test]
    async fn missing_tool_is_an_operational_error() {
        let provider = MyProxyLogon::with_command("/nonexistent/myproxy-logon");
        let err = provider
            .acquire(&CredentialRequest::new("/tmp/proxy.x509"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::NoSuccess);
    }

    #[tokio::test]
    async fn failing_tool_yields_unsuccessful_outcome() {
        // `false` ignores the arguments and exits nonzero; stand-in for a
        // myproxy server rejecting the request.
        let provider = MyProxyLogon::with_command("false");
        let outcome = provider
            .acquire(&CredentialRequest::new("/tmp/proxy.x509"))
            .await
            .unwrap();
        assert!(!outcome.succeeded);
    }
}
