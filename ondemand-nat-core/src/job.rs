//! Trigger payloads and external job reporting
//!
//! A synchronous "request on demand" may come from a deployment pipeline that
//! waits on a job id. The reconciler never talks to the pipeline itself; the
//! caller runs the request and hands the outcome to [`report_outcome`], which
//! notifies a [`JobReporter`] and passes the original result through.

use async_trait::async_trait;
use log::{error, info};
use serde::Deserialize;

use crate::error::NatResult;
use crate::network::NetworkError;

/// The external job a request belongs to
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JobDescriptor {
    pub id: String,
}

/// Opaque trigger payload; only the optional pipeline job is interpreted
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TriggerEvent {
    #[serde(rename = "CodePipeline.job", default)]
    pub job: Option<JobDescriptor>,
}

impl TriggerEvent {
    /// Parse a payload; blank input is an empty event
    pub fn from_json(payload: &str) -> NatResult<Self> {
        if payload.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(payload)?)
    }
}

/// Receives success/failure notifications for external jobs
#[async_trait]
pub trait JobReporter: Send + Sync {
    async fn report_success(&self, job_id: &str) -> Result<(), NetworkError>;

    async fn report_failure(&self, job_id: &str, message: &str) -> Result<(), NetworkError>;
}

/// Report `result` against `job` (if any) and hand the result back
///
/// On failure the job is marked failed with the error's message and the
/// original error is returned, so the invocation itself still fails. A
/// reporter error while reporting success is returned; while reporting a
/// failure it is only logged.
pub async fn report_outcome<T>(
    reporter: &dyn JobReporter,
    job: Option<&JobDescriptor>,
    result: NatResult<T>,
) -> NatResult<T> {
    let Some(job) = job else {
        return result;
    };

    match result {
        Ok(value) => {
            reporter.report_success(&job.id).await?;
            info!("Reported success for job {}", job.id);
            Ok(value)
        }
        Err(e) => {
            let message = e.to_string();
            if let Err(report_err) = reporter.report_failure(&job.id, &message).await {
                error!("Failed to report failure for job {}: {}", job.id, report_err);
            } else {
                info!("Reported failure for job {}: {}", job.id, message);
            }
            Err(e)
        }
    }
}
