use std::fmt;
use std::sync::Arc;

use crate::cpi::JobServiceCpi;
use crate::description::JobDescription;
use crate::error::Result;
use crate::job::{Job, JobStatus};
use crate::url::EndpointUrl;

/// Job factory bound to one endpoint.
///
/// Produced by [`Engine::job_service`](crate::Engine::job_service) once an
/// adaptor has accepted the endpoint; all operations are forwarded to that
/// adaptor.
pub struct JobService {
    url: EndpointUrl,
    cpi: Arc<dyn JobServiceCpi>,
}

impl JobService {
    pub(crate) fn new(url: EndpointUrl, cpi: Arc<dyn JobServiceCpi>) -> Self {
        Self { url, cpi }
    }

    /// The endpoint this service is bound to.
    pub fn url(&self) -> &EndpointUrl {
        &self.url
    }

    /// Create a job from a description. The returned job is in state `New`;
    /// nothing has been submitted yet.
    pub async fn create_job(&self, description: JobDescription) -> Result<Job> {
        description.validate()?;
        let status = Arc::new(JobStatus::new());
        let cpi = self
            .cpi
            .create_job(description.clone(), Arc::clone(&status))
            .await?;
        Ok(Job::new(description, status, cpi))
    }

    /// Ids of jobs currently visible at this endpoint.
    pub async fn list(&self) -> Result<Vec<String>> {
        self.cpi.list().await
    }
}

impl fmt::Debug for JobService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobService")
            .field("url", &self.url.to_string())
            .finish()
    }
}
