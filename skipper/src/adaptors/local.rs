//! Local job adaptor: runs jobs as child processes of this process.
//!
//! Claims the `fork` and `local` schemes. Submission spawns the executable
//! through `tokio::process`; a reaper task owns the child and feeds exit
//! and cancellation outcomes into the shared [`JobStatus`], so `wait` is a
//! status subscribe rather than a backend poll. Suspension is not
//! supported and rejected explicitly.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tokio::sync::{watch, Notify};

use crate::cpi::{JobCpi, JobServiceCpi, JobServiceFactory};
use crate::description::JobDescription;
use crate::error::{Error, Result};
use crate::job::JobStatus;
use crate::registry::{AdaptorDescriptor, AdaptorModule};
use crate::session::Session;
use crate::url::EndpointUrl;

const MODULE_NAME: &str = "skipper.adaptor.local";

/// Registration entry point for the local job adaptor.
pub struct LocalJobModule;

impl LocalJobModule {
    /// Create the module.
    pub fn new() -> Self {
        Self
    }
}

impl Default for LocalJobModule {
    fn default() -> Self {
        Self::new()
    }
}

impl AdaptorModule for LocalJobModule {
    fn name(&self) -> &str {
        MODULE_NAME
    }

    fn register(&self) -> Result<Option<Vec<AdaptorDescriptor>>> {
        Ok(Some(vec![AdaptorDescriptor::job(
            "local-job-service",
            ["fork", "local"],
            Arc::new(LocalJobFactory),
        )]))
    }
}

struct LocalJobFactory;

#[async_trait]
impl JobServiceFactory for LocalJobFactory {
    async fn bind(&self, url: &EndpointUrl, _session: &Session) -> Result<Arc<dyn JobServiceCpi>> {
        match url.host() {
            None | Some("localhost") | Some("127.0.0.1") => {}
            Some(host) => {
                return Err(Error::bad_parameter(format!(
                    "the local job adaptor only handles the local host, not '{host}'"
                )));
            }
        }
        Ok(Arc::new(LocalJobService {
            endpoint: url.clone(),
            active: Arc::new(Mutex::new(Vec::new())),
        }))
    }
}

struct LocalJobService {
    endpoint: EndpointUrl,
    active: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl JobServiceCpi for LocalJobService {
    async fn create_job(
        &self,
        description: JobDescription,
        status: Arc<JobStatus>,
    ) -> Result<Arc<dyn JobCpi>> {
        Ok(Arc::new(LocalJob {
            description,
            status,
            endpoint: self.endpoint.clone(),
            active: Arc::clone(&self.active),
            cancel: Arc::new(Notify::new()),
            kill_error: Arc::new(watch::Sender::new(None)),
        }))
    }

    async fn list(&self) -> Result<Vec<String>> {
        Ok(self.active.lock().clone())
    }
}

struct LocalJob {
    description: JobDescription,
    status: Arc<JobStatus>,
    endpoint: EndpointUrl,
    active: Arc<Mutex<Vec<String>>>,
    cancel: Arc<Notify>,
    kill_error: Arc<watch::Sender<Option<String>>>,
}

impl LocalJob {
    fn build_command(&self) -> Result<Command> {
        let mut command = Command::new(&self.description.executable);
        command.args(&self.description.arguments);
        command.envs(&self.description.environment);
        if let Some(dir) = &self.description.working_directory {
            command.current_dir(dir);
        }
        command.stdin(Stdio::null());
        command.stdout(redirect_target(self.description.output.as_deref())?);
        command.stderr(redirect_target(self.description.error.as_deref())?);
        command.kill_on_drop(true);
        Ok(command)
    }
}

fn redirect_target(path: Option<&std::path::Path>) -> Result<Stdio> {
    match path {
        Some(path) => {
            let file = std::fs::File::create(path).map_err(|err| {
                Error::no_success(format!(
                    "could not create redirection target '{}'",
                    path.display()
                ))
                .with_cause(err)
            })?;
            Ok(Stdio::from(file))
        }
        None => Ok(Stdio::null()),
    }
}

#[async_trait]
impl JobCpi for LocalJob {
    async fn run(&self) -> Result<()> {
        let mut child = self.build_command()?.spawn().map_err(|err| {
            Error::no_success(format!(
                "could not execute '{}'",
                self.description.executable
            ))
            .with_cause(err)
        })?;

        let native_id = child
            .id()
            .map(|pid| pid.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        let id = format!("[{}]-[{}]", self.endpoint, native_id);

        self.status.mark_running(id.clone(), vec!["localhost".to_string()]);
        self.active.lock().push(id.clone());

        let status = Arc::clone(&self.status);
        let cancel = Arc::clone(&self.cancel);
        let kill_error = Arc::clone(&self.kill_error);
        let active = Arc::clone(&self.active);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    exit = child.wait() => {
                        active.lock().retain(|job| job != &id);
                        match exit {
                            Ok(exit_status) => match exit_status.code() {
                                Some(code) => status.mark_done(code),
                                None => {
                                    // killed by a signal from outside this handle
                                    tracing::warn!(
                                        exit = %exit_status,
                                        "local job terminated by signal"
                                    );
                                    status.mark_failed();
                                }
                            },
                            Err(err) => {
                                tracing::warn!(error = %err, "waiting on local job failed");
                                status.mark_failed();
                            }
                        }
                        break;
                    }
                    _ = cancel.notified() => {
                        match child.kill().await {
                            Ok(()) => {
                                active.lock().retain(|job| job != &id);
                                status.mark_canceled();
                                break;
                            }
                            Err(err) => {
                                // the child may still be alive; report the
                                // failure to the canceller and keep reaping
                                tracing::warn!(error = %err, "could not kill local job");
                                let _ = kill_error.send(Some(err.to_string()));
                            }
                        }
                    }
                }
            }
        });

        Ok(())
    }

    async fn wait(&self, timeout: Option<Duration>) -> Result<bool> {
        self.status.wait_terminal(timeout).await
    }

    async fn cancel(&self) -> Result<()> {
        let mut kill_errors = self.kill_error.subscribe();
        self.cancel.notify_one();
        await_cancel_ack(&self.status, &mut kill_errors).await
    }
}

/// Wait for the reaper to acknowledge a termination request: success once
/// the status turns terminal, an operational error when the kill attempt
/// failed (the job stays in its current state).
async fn await_cancel_ack(
    status: &JobStatus,
    kill_errors: &mut watch::Receiver<Option<String>>,
) -> Result<()> {
    tokio::select! {
        reached = status.wait_terminal(None) => {
            reached?;
            Ok(())
        }
        changed = kill_errors.changed() => {
            changed.map_err(|_| Error::no_success("local job reaper went away"))?;
            let detail = kill_errors.borrow().clone().unwrap_or_default();
            Err(Error::no_success(format!(
                "could not terminate local job: {detail}"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::job::JobState;

    #[tokio::test]
    async fn failed_kill_surfaces_an_error_and_keeps_the_job_running() {
        let status = JobStatus::new();
        status.mark_running("id", vec!["localhost".into()]);
        let kill_error = watch::Sender::new(None);
        let mut rx = kill_error.subscribe();
        kill_error
            .send(Some("Operation not permitted".to_string()))
            .unwrap();

        let err = await_cancel_ack(&status, &mut rx).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoSuccess);
        assert!(err.message().contains("Operation not permitted"));
        assert_eq!(status.state(), JobState::Running);
    }

    #[tokio::test]
    async fn acknowledged_kill_resolves_as_success() {
        let status = JobStatus::new();
        status.mark_running("id", vec!["localhost".into()]);
        let kill_error = watch::Sender::new(None);
        let mut rx = kill_error.subscribe();
        status.mark_canceled();

        await_cancel_ack(&status, &mut rx).await.unwrap();
        assert_eq!(status.state(), JobState::Canceled);
    }
}
