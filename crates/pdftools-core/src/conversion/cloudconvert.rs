//! CloudConvert job API
//!
//! A job is three tasks: an upload import, the conversion, and an export
//! that yields a download URL. The file is uploaded to the form the import
//! task hands back.

use super::{
    api_key_from_env, check_response, ConversionConfig, ConversionJob, ConversionProvider,
    ConversionRequest, JobStatus,
};
use crate::error::{Result, ToolboxError};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::debug;

const IMPORT_TASK: &str = "import-my-file";
const CONVERT_TASK: &str = "convert-my-file";
const EXPORT_TASK: &str = "export-my-file";

#[derive(Debug, Deserialize)]
struct JobEnvelope {
    data: JobData,
}

#[derive(Debug, Deserialize)]
struct JobData {
    id: String,
    status: String,
    #[serde(default)]
    tasks: Vec<TaskData>,
}

#[derive(Debug, Deserialize)]
struct TaskData {
    name: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    result: Option<TaskResult>,
}

#[derive(Debug, Deserialize)]
struct TaskResult {
    #[serde(default)]
    form: Option<UploadForm>,
    #[serde(default)]
    files: Vec<ResultFile>,
}

#[derive(Debug, Deserialize)]
struct UploadForm {
    url: String,
    #[serde(default)]
    parameters: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct ResultFile {
    url: String,
}

impl JobData {
    fn task(&self, name: &str) -> Option<&TaskData> {
        self.tasks.iter().find(|t| t.name == name)
    }

    fn export_url(&self) -> Option<String> {
        self.task(EXPORT_TASK)?
            .result
            .as_ref()?
            .files
            .first()
            .map(|f| f.url.clone())
    }

    fn error_message(&self) -> Option<String> {
        self.tasks
            .iter()
            .find(|t| t.status == "error")
            .and_then(|t| t.message.clone())
    }

    fn into_job(self) -> ConversionJob {
        let status = JobStatus::from_provider(&self.status);
        ConversionJob {
            result_locator: match status {
                JobStatus::Finished => self.export_url(),
                _ => None,
            },
            message: match status {
                JobStatus::Error => self.error_message(),
                _ => None,
            },
            status,
            id: self.id,
        }
    }
}

pub struct CloudConvertProvider {
    client: reqwest::Client,
    config: ConversionConfig,
    api_key: String,
}

impl CloudConvertProvider {
    pub fn new(config: ConversionConfig, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
            api_key: api_key.into(),
        }
    }

    /// Provider keyed from the environment; fails when the key is missing
    pub fn from_env(config: ConversionConfig) -> Result<Self> {
        Ok(Self::new(config, api_key_from_env()?))
    }

    fn job_payload(&self, request: &ConversionRequest) -> Value {
        json!({
            "tasks": {
                IMPORT_TASK: {
                    "operation": "import/upload"
                },
                CONVERT_TASK: {
                    "operation": "convert",
                    "input": IMPORT_TASK,
                    "input_format": request.input_format(),
                    "output_format": "pdf",
                    "engine": self.config.engine,
                    "engine_version": "latest",
                    "page_orientation": self.config.page_orientation,
                    "fit_to_page_width": self.config.fit_to_page_width,
                },
                EXPORT_TASK: {
                    "operation": "export/url",
                    "input": CONVERT_TASK
                }
            }
        })
    }

    async fn upload(&self, form: UploadForm, request: &ConversionRequest) -> Result<()> {
        let mut multipart = Form::new();
        for (key, value) in form.parameters {
            let text = match value {
                Value::String(s) => s,
                other => other.to_string(),
            };
            multipart = multipart.text(key, text);
        }
        let file = Part::bytes(request.bytes.clone()).file_name(request.file_name.clone());
        multipart = multipart.part("file", file);

        let response = self.client.post(&form.url).multipart(multipart).send().await?;
        check_response("File upload", response).await?;
        Ok(())
    }
}

#[async_trait]
impl ConversionProvider for CloudConvertProvider {
    async fn submit(&self, request: &ConversionRequest) -> Result<ConversionJob> {
        let response = self
            .client
            .post(format!("{}/jobs", self.config.api_base))
            .bearer_auth(&self.api_key)
            .json(&self.job_payload(request))
            .send()
            .await?;
        let envelope: JobEnvelope = check_response("Job creation", response).await?.json().await?;
        let mut job = envelope.data;
        debug!("Created job {} with {} tasks", job.id, job.tasks.len());

        let form = job
            .tasks
            .iter_mut()
            .find(|t| t.name == IMPORT_TASK)
            .and_then(|t| t.result.as_mut())
            .and_then(|r| r.form.take())
            .ok_or_else(|| {
                ToolboxError::UpstreamRequestFailed("Job has no upload form".into())
            })?;
        self.upload(form, request).await?;

        // Whatever the job said at creation, the upload has only just landed
        Ok(ConversionJob::pending(job.id))
    }

    async fn poll(&self, job: &ConversionJob) -> Result<ConversionJob> {
        let response = self
            .client
            .get(format!("{}/jobs/{}", self.config.api_base, job.id))
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        let envelope: JobEnvelope = check_response("Job status", response).await?.json().await?;
        Ok(envelope.data.into_job())
    }

    async fn fetch(&self, locator: &str) -> Result<Vec<u8>> {
        let response = self.client.get(locator).send().await?;
        let bytes = check_response("Result download", response).await?.bytes().await?;
        Ok(bytes.to_vec())
    }
}
