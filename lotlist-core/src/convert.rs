//! XLS to CSV conversion through the CloudConvert v2 API
//!
//! A job is three tasks: `import-1` (upload), `task-1` (convert) and
//! `export-1` (export URL). The job is polled until it finishes, fails, or
//! the configured deadline passes.
//!
//! Global invariants enforced:
//! - The API key is supplied at construction, never read from globals
//! - Waiting is bounded by `timeout`

use crate::config::CloudConvertSettings;
use crate::fetch::download_to;
use anyhow::{Context, Result};
use reqwest::blocking::{multipart, Client};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

const IMPORT_TASK: &str = "import-1";
const EXPORT_TASK: &str = "export-1";

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

/// A CloudConvert job as returned by the API
#[derive(Debug, Clone, Deserialize)]
pub struct Job {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Task {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub result: Option<TaskResult>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskResult {
    #[serde(default)]
    pub form: Option<UploadForm>,
    #[serde(default)]
    pub files: Vec<ExportFile>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadForm {
    pub url: String,
    #[serde(default)]
    pub parameters: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExportFile {
    #[serde(default)]
    pub filename: Option<String>,
    pub url: String,
}

/// Lifecycle state of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Finished,
    Failed,
}

impl Job {
    pub fn state(&self) -> JobState {
        match self.status.as_str() {
            "finished" => JobState::Finished,
            "error" => JobState::Failed,
            _ => JobState::Pending,
        }
    }

    pub fn task(&self, name: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.name == name)
    }

    /// Message describing why the job failed
    pub fn failure_message(&self) -> String {
        self.tasks
            .iter()
            .find(|t| t.status == "error")
            .map(|t| {
                format!(
                    "task {} failed: {}",
                    t.name,
                    t.message.as_deref().unwrap_or("no message")
                )
            })
            .unwrap_or_else(|| format!("job {} failed", self.id))
    }

    /// URL of the first exported file
    pub fn export_url(&self) -> Result<&str> {
        let task = self
            .task(EXPORT_TASK)
            .with_context(|| format!("job {} has no {} task", self.id, EXPORT_TASK))?;
        task.result
            .as_ref()
            .and_then(|r| r.files.first())
            .map(|f| f.url.as_str())
            .with_context(|| format!("task {} produced no files", EXPORT_TASK))
    }
}

/// JSON body creating an xls to csv job
pub fn job_payload() -> serde_json::Value {
    serde_json::json!({
        "tasks": {
            "import-1": {
                "operation": "import/upload"
            },
            "task-1": {
                "operation": "convert",
                "input": "import-1",
                "input_format": "xls",
                "output_format": "csv",
                "engine": "libreoffice"
            },
            "export-1": {
                "operation": "export/url",
                "input": "task-1"
            }
        }
    })
}

/// Destination of the converted file: the source path with a `.csv` extension
pub fn csv_path_for(xls_path: &Path) -> PathBuf {
    xls_path.with_extension("csv")
}

fn form_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// CloudConvert client
pub struct CloudConvert {
    client: Client,
    api_url: String,
    api_key: String,
    poll_interval: Duration,
    timeout: Duration,
}

impl CloudConvert {
    pub fn new(client: Client, settings: &CloudConvertSettings) -> Result<Self> {
        let api_key = settings
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .with_context(|| {
                format!(
                    "no CloudConvert API key configured (set cloudconvert.api_key or ${})",
                    crate::config::API_KEY_ENV
                )
            })?;

        Ok(CloudConvert {
            client,
            api_url: settings.api_url.trim_end_matches('/').to_string(),
            api_key,
            poll_interval: settings.poll_interval,
            timeout: settings.timeout,
        })
    }

    fn get_job(&self, id: &str) -> Result<Job> {
        let url = format!("{}/jobs/{}", self.api_url, id);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .with_context(|| format!("failed to fetch job {}", id))?;
        parse_response(response)
    }

    fn get_task(&self, id: &str) -> Result<Task> {
        let url = format!("{}/tasks/{}", self.api_url, id);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .with_context(|| format!("failed to fetch task {}", id))?;
        parse_response(response)
    }

    fn create_job(&self) -> Result<Job> {
        let url = format!("{}/jobs", self.api_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&job_payload())
            .send()
            .context("failed to create CloudConvert job")?;
        parse_response(response).context("failed to create CloudConvert job")
    }

    fn upload(&self, form: &UploadForm, file: &Path) -> Result<()> {
        let mut multipart = multipart::Form::new();
        for (key, value) in &form.parameters {
            multipart = multipart.text(key.clone(), form_value(value));
        }
        // The storage backend expects the file part last
        let multipart = multipart
            .file("file", file)
            .with_context(|| format!("failed to read {}", file.display()))?;

        let response = self
            .client
            .post(&form.url)
            .multipart(multipart)
            .send()
            .context("failed to upload manifest")?;
        if !response.status().is_success() {
            anyhow::bail!("manifest upload returned {}", response.status());
        }
        Ok(())
    }

    /// Poll a job until it leaves the pending state, reporting each status
    fn wait(&self, id: &str, on_status: &mut dyn FnMut(&str)) -> Result<Job> {
        let started = Instant::now();
        loop {
            let job = self.get_job(id)?;
            on_status(&job.status);
            match job.state() {
                JobState::Finished => return Ok(job),
                JobState::Failed => anyhow::bail!("conversion failed: {}", job.failure_message()),
                JobState::Pending => {}
            }
            if started.elapsed() >= self.timeout {
                anyhow::bail!(
                    "conversion job {} did not finish within {}s (last status: {})",
                    id,
                    self.timeout.as_secs(),
                    job.status
                );
            }
            std::thread::sleep(self.poll_interval);
        }
    }

    /// Convert an `.xls` file to `.csv` next to it, returning the new path
    pub fn convert_xls_to_csv(
        &self,
        xls_path: &Path,
        on_status: &mut dyn FnMut(&str),
    ) -> Result<PathBuf> {
        let job = self.create_job()?;
        tracing::debug!(job = %job.id, "conversion job created");

        let import_id = job
            .task(IMPORT_TASK)
            .map(|t| t.id.clone())
            .with_context(|| format!("job {} has no {} task", job.id, IMPORT_TASK))?;
        let import_task = self.get_task(&import_id)?;
        let form = import_task
            .result
            .and_then(|r| r.form)
            .with_context(|| format!("task {} has no upload form", IMPORT_TASK))?;

        self.upload(&form, xls_path)?;
        tracing::debug!(job = %job.id, "manifest uploaded");

        let finished = self.wait(&job.id, on_status)?;
        let csv_path = csv_path_for(xls_path);
        download_to(&self.client, finished.export_url()?, &csv_path)
            .context("failed to download converted manifest")?;

        tracing::debug!(path = %csv_path.display(), "conversion complete");
        Ok(csv_path)
    }
}

fn parse_response<T: serde::de::DeserializeOwned>(
    response: reqwest::blocking::Response,
) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        anyhow::bail!("CloudConvert returned {}: {}", status, body.trim());
    }
    let envelope: Envelope<T> = response
        .json()
        .context("failed to decode CloudConvert response")?;
    Ok(envelope.data)
}
