use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::{Error, Result};

/// Describes what to run, independent of any backend.
///
/// A description is a plain value object; it becomes immutable once handed
/// to [`JobService::create_job`](crate::JobService::create_job). Beyond the
/// executable, every field is interpreted (or ignored) by the adaptor the
/// service is bound to — `queue` and `project` mean nothing to a local
/// backend but select the batch queue and allocation on a scheduler.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct JobDescription {
    /// Path of the executable to run. The only required field.
    pub executable: String,
    /// Ordered command-line arguments.
    #[serde(default)]
    pub arguments: Vec<String>,
    /// Environment variables set for the job.
    #[serde(default)]
    pub environment: HashMap<String, String>,
    /// Human-readable job name, passed through to backends that display one.
    #[serde(default)]
    pub name: Option<String>,
    /// Directory the job runs in.
    #[serde(default)]
    pub working_directory: Option<PathBuf>,
    /// Target queue on queue-based backends.
    #[serde(default)]
    pub queue: Option<String>,
    /// Project or allocation the job is billed to.
    #[serde(default)]
    pub project: Option<String>,
    /// Number of CPUs requested. Must be positive when set.
    #[serde(default)]
    pub total_cpu_count: Option<u32>,
    /// Wall-clock limit in minutes. Must be positive when set.
    #[serde(default)]
    pub wall_time_limit: Option<u32>,
    /// Redirection target for standard output.
    #[serde(default)]
    pub output: Option<PathBuf>,
    /// Redirection target for standard error.
    #[serde(default)]
    pub error: Option<PathBuf>,
}

impl JobDescription {
    /// Create a description for the given executable.
    pub fn new(executable: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
            ..Self::default()
        }
    }

    /// Append a command-line argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.arguments.push(arg.into());
        self
    }

    /// Replace the argument list.
    pub fn with_arguments(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.arguments = args.into_iter().map(Into::into).collect();
        self
    }

    /// Set an environment variable.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }

    /// Set the job name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the working directory.
    pub fn with_working_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_directory = Some(dir.into());
        self
    }

    /// Set the target queue.
    pub fn with_queue(mut self, queue: impl Into<String>) -> Self {
        self.queue = Some(queue.into());
        self
    }

    /// Set the project / allocation.
    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    /// Set the requested CPU count.
    pub fn with_total_cpu_count(mut self, count: u32) -> Self {
        self.total_cpu_count = Some(count);
        self
    }

    /// Set the wall-clock limit in minutes.
    pub fn with_wall_time_limit(mut self, minutes: u32) -> Self {
        self.wall_time_limit = Some(minutes);
        self
    }

    /// Redirect standard output to the given path.
    pub fn with_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = Some(path.into());
        self
    }

    /// Redirect standard error to the given path.
    pub fn with_error(mut self, path: impl Into<PathBuf>) -> Self {
        self.error = Some(path.into());
        self
    }

    /// Check the few constraints the core imposes; everything else is
    /// adaptor-interpreted.
    pub fn validate(&self) -> Result<()> {
        if self.executable.is_empty() {
            return Err(Error::bad_parameter("job description has no executable"));
        }
        if self.total_cpu_count == Some(0) {
            return Err(Error::bad_parameter("total_cpu_count must be positive"));
        }
        if self.wall_time_limit == Some(0) {
            return Err(Error::bad_parameter("wall_time_limit must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn builder_collects_fields() {
        let jd = JobDescription::new("/bin/sleep")
            .arg("60")
            .env("RUNTIME", "60")
            .with_name("testjob")
            .with_queue("batch")
            .with_project("TG-XXXYYYYZZZ")
            .with_total_cpu_count(12)
            .with_wall_time_limit(2)
            .with_working_directory("/tmp")
            .with_output("job.stdout")
            .with_error("job.stderr");

        assert_eq!(jd.executable, "/bin/sleep");
        assert_eq!(jd.arguments, vec!["60"]);
        assert_eq!(jd.environment.get("RUNTIME").map(String::as_str), Some("60"));
        assert_eq!(jd.queue.as_deref(), Some("batch"));
        assert_eq!(jd.total_cpu_count, Some(12));
        assert_eq!(jd.wall_time_limit, Some(2));
        assert!(jd.validate().is_ok());
    }

    #[test]
    fn empty_executable_is_rejected() {
        let err = JobDescription::default().validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadParameter);
    }

    #[test]
    fn zero_counts_are_rejected() {
        let err = JobDescription::new("/bin/true")
            .with_total_cpu_count(0)
            .validate()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadParameter);

        let err = JobDescription::new("/bin/true")
            .with_wall_time_limit(0)
            .validate()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadParameter);
    }

    #[test]
    fn serde_round_trip() {
        let jd = JobDescription::new("/bin/echo").arg("hello").with_queue("debug");
        let json = serde_json::to_string(&jd).unwrap();
        let parsed: JobDescription = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, jd);
    }
}
