//! CodePipeline job reporter

use async_trait::async_trait;
use aws_sdk_codepipeline::Client as CodePipelineClient;
use aws_sdk_codepipeline::error::DisplayErrorContext;
use aws_sdk_codepipeline::types::{FailureDetails, FailureType};

use ondemand_nat_core::job::JobReporter;
use ondemand_nat_core::network::{NetworkError, NetworkErrorKind};

/// CodePipeline rejects failure messages longer than this
const MAX_FAILURE_MESSAGE: usize = 5000;

fn pipeline_error<E: std::fmt::Display>(operation: &'static str, err: E) -> NetworkError {
    NetworkError::new(NetworkErrorKind::Other, err.to_string()).for_operation(operation)
}

/// Truncate on a char boundary so the API accepts the message
fn clamp_message(message: &str) -> &str {
    if message.len() <= MAX_FAILURE_MESSAGE {
        return message;
    }
    let mut end = MAX_FAILURE_MESSAGE;
    while !message.is_char_boundary(end) {
        end -= 1;
    }
    &message[..end]
}

/// Reports job results back to CodePipeline
pub struct CodePipelineReporter {
    client: CodePipelineClient,
}

impl CodePipelineReporter {
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            client: CodePipelineClient::new(config),
        }
    }
}

#[async_trait]
impl JobReporter for CodePipelineReporter {
    async fn report_success(&self, job_id: &str) -> Result<(), NetworkError> {
        self.client
            .put_job_success_result()
            .job_id(job_id)
            .send()
            .await
            .map_err(|e| pipeline_error("put_job_success_result", DisplayErrorContext(&e)))?;
        Ok(())
    }

    async fn report_failure(&self, job_id: &str, message: &str) -> Result<(), NetworkError> {
        let details = FailureDetails::builder()
            .r#type(FailureType::JobFailed)
            .message(clamp_message(message))
            .build()
            .map_err(|e| pipeline_error("put_job_failure_result", e))?;

        self.client
            .put_job_failure_result()
            .job_id(job_id)
            .failure_details(details)
            .send()
            .await
            .map_err(|e| pipeline_error("put_job_failure_result", DisplayErrorContext(&e)))?;
        Ok(())
    }
}
