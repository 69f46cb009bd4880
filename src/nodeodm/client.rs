use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder, Response};
use tokio::io::AsyncWriteExt;

use super::error::{NodeOdmError, Operation};
use super::gateway::JobGateway;
use super::types::{AckResponse, BatchFile, InitResponse, OptionsEncoding, TaskInfo};
use crate::config::OdmConfig;
use crate::task::{JobId, TaskOptions};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Applied to calls without a large body. Uploads and downloads only get the connect timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// HTTP client for a single NodeODM instance.
#[derive(Debug, Clone)]
pub struct NodeOdmClient {
    client: Client,
    base_url: String,
    token: Option<String>,
    encoding: OptionsEncoding,
}

impl NodeOdmClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .expect("failed to build HTTP client");
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
            encoding: OptionsEncoding::default(),
        }
    }

    pub fn from_config(config: &OdmConfig) -> Self {
        Self::new(config.engine_url.clone())
            .with_token(config.token.clone())
            .with_options_encoding(config.options_encoding)
    }

    /// Access token sent as the `token` query parameter on every call.
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.is_empty());
        self
    }

    pub fn with_options_encoding(mut self, encoding: OptionsEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => builder.query(&[("token", token.as_str())]),
            None => builder,
        }
    }

    fn init_payload(
        &self,
        builder: RequestBuilder,
        name: &str,
        options: &TaskOptions,
    ) -> Result<RequestBuilder, NodeOdmError> {
        match self.encoding {
            OptionsEncoding::Json => {
                let json = serde_json::to_string(options).map_err(|e| NodeOdmError::Decode {
                    operation: Operation::Create,
                    message: e.to_string(),
                })?;
                let part = Part::text(json)
                    .mime_str("application/json")
                    .map_err(|source| NodeOdmError::Transport {
                        operation: Operation::Create,
                        source,
                    })?;
                let form = Form::new().text("name", name.to_string()).part("options", part);
                Ok(builder.multipart(form))
            }
            OptionsEncoding::Form => {
                let mut fields = vec![("name".to_string(), name.to_string())];
                fields.extend(options.iter().map(|o| (o.name.clone(), o.value_string())));
                Ok(builder.form(&fields))
            }
        }
    }
}

#[async_trait]
impl JobGateway for NodeOdmClient {
    async fn create_task(&self, name: &str, options: &TaskOptions) -> Result<JobId, NodeOdmError> {
        let operation = Operation::Create;
        let builder = self
            .request(Method::POST, "/task/new/init")
            .timeout(REQUEST_TIMEOUT);
        let builder = self.init_payload(builder, name, options)?;

        let response = send(builder, operation).await?;
        let (status, body) = read_text(response, operation).await?;
        let parsed: InitResponse =
            serde_json::from_str(&body).map_err(|e| NodeOdmError::Decode {
                operation,
                message: e.to_string(),
            })?;

        match parsed {
            InitResponse {
                error: Some(error), ..
            } => Err(NodeOdmError::Remote {
                operation,
                status,
                body: error,
            }),
            InitResponse {
                uuid: Some(uuid), ..
            } if !uuid.is_empty() => Ok(JobId::new(uuid)),
            _ => Err(NodeOdmError::Decode {
                operation,
                message: format!("no uuid in response: {body}"),
            }),
        }
    }

    async fn upload_batch(&self, job_id: &JobId, files: Vec<BatchFile>) -> Result<(), NodeOdmError> {
        let form = files.into_iter().fold(Form::new(), |form, f| {
            form.part(
                "images",
                Part::stream_with_length(f.file, f.len).file_name(f.name),
            )
        });

        let builder = self
            .request(Method::POST, &format!("/task/new/upload/{job_id}"))
            .multipart(form);
        let response = send(builder, Operation::Upload).await?;
        check_ack(response, Operation::Upload).await
    }

    async fn commit_task(&self, job_id: &JobId) -> Result<(), NodeOdmError> {
        let builder = self
            .request(Method::POST, &format!("/task/new/commit/{job_id}"))
            .timeout(REQUEST_TIMEOUT);
        let response = send(builder, Operation::Commit).await?;
        check_ack(response, Operation::Commit).await
    }

    async fn task_info(&self, job_id: &JobId) -> Result<TaskInfo, NodeOdmError> {
        let operation = Operation::Info;
        let builder = self
            .request(Method::GET, &format!("/task/{job_id}/info"))
            .timeout(REQUEST_TIMEOUT);
        let response = send(builder, operation).await?;
        let (status, body) = read_text(response, operation).await?;
        reject_engine_error(operation, status, &body)?;
        serde_json::from_str(&body).map_err(|e| NodeOdmError::Decode {
            operation,
            message: e.to_string(),
        })
    }

    async fn download_assets(
        &self,
        job_id: &JobId,
        destination: &Path,
    ) -> Result<u64, NodeOdmError> {
        let operation = Operation::Download;
        let builder = self.request(Method::GET, &format!("/task/{job_id}/download/all.zip"));
        let mut response = send(builder, operation).await?;

        // NodeODM answers 200 with a JSON error when the archive is not ready.
        if is_json(&response) {
            let (status, body) = read_text(response, operation).await?;
            reject_engine_error(operation, status, &body)?;
            return Err(NodeOdmError::Decode {
                operation,
                message: format!("expected an archive, got JSON: {body}"),
            });
        }

        let io_err = |source: std::io::Error| NodeOdmError::Io { operation, source };
        let mut file = tokio::fs::File::create(destination).await.map_err(io_err)?;
        let mut written = 0u64;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|source| NodeOdmError::Transport { operation, source })?
        {
            file.write_all(&chunk).await.map_err(io_err)?;
            written += chunk.len() as u64;
        }
        file.flush().await.map_err(io_err)?;
        Ok(written)
    }

    async fn remove_task(&self, job_id: &JobId) -> Result<(), NodeOdmError> {
        let builder = self
            .request(Method::POST, "/task/remove")
            .timeout(REQUEST_TIMEOUT)
            .form(&[("uuid", job_id.as_str())]);
        let response = send(builder, Operation::Remove).await?;
        check_ack(response, Operation::Remove).await
    }
}

async fn send(builder: RequestBuilder, operation: Operation) -> Result<Response, NodeOdmError> {
    let response = builder
        .send()
        .await
        .map_err(|source| NodeOdmError::Transport { operation, source })?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        return Err(NodeOdmError::Remote {
            operation,
            status: status.as_u16(),
            body,
        });
    }
    Ok(response)
}

async fn read_text(response: Response, operation: Operation) -> Result<(u16, String), NodeOdmError> {
    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .map_err(|source| NodeOdmError::Transport { operation, source })?;
    Ok((status, body))
}

/// Success responses may still carry `{"error": ...}` or `{"success": false}`.
fn reject_engine_error(operation: Operation, status: u16, body: &str) -> Result<(), NodeOdmError> {
    let Ok(ack) = serde_json::from_str::<AckResponse>(body) else {
        return Ok(());
    };
    if let Some(error) = ack.error {
        return Err(NodeOdmError::Remote {
            operation,
            status,
            body: error,
        });
    }
    if ack.success == Some(false) {
        return Err(NodeOdmError::Remote {
            operation,
            status,
            body: body.to_string(),
        });
    }
    Ok(())
}

async fn check_ack(response: Response, operation: Operation) -> Result<(), NodeOdmError> {
    let (status, body) = read_text(response, operation).await?;
    reject_engine_error(operation, status, &body)
}

fn is_json(response: &Response) -> bool {
    response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"))
}
