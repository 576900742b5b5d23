use std::future::Future;
use std::time::Duration;

use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use url::Url;

use crate::config::ServiceConfig;
use crate::error::AnalysisError;
use crate::session::file::SelectedFile;

use super::parse::{parse_analysis_response, summarize_error_body};
use super::types::AnalysisResult;

const CLIENT_USER_AGENT: &str = concat!("chemviz/", env!("CARGO_PKG_VERSION"));

/// The remote service that turns an uploaded dataset into statistics.
///
/// One call is one attempt; implementations never retry.
pub trait AnalysisService {
    fn analyze(
        &self,
        file: &SelectedFile,
    ) -> impl Future<Output = Result<AnalysisResult, AnalysisError>> + Send;
}

#[derive(Debug, Clone)]
pub struct HttpAnalysisClient {
    client: Client,
    endpoint: Url,
}

impl HttpAnalysisClient {
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self, AnalysisError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AnalysisError::Transport(e.to_string()))?;
        Ok(Self { client, endpoint })
    }

    pub fn from_config(config: &ServiceConfig) -> Result<Self, AnalysisError> {
        Self::new(config.endpoint.clone(), config.timeout)
    }

    async fn post_file(&self, file: &SelectedFile) -> Result<AnalysisResult, AnalysisError> {
        let part = Part::bytes(file.bytes().to_vec())
            .file_name(file.name().to_string())
            .mime_str(file.mime_type())
            .map_err(|e| AnalysisError::Transport(format!("invalid content type: {e}")))?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(self.endpoint.clone())
            .header(USER_AGENT, CLIENT_USER_AGENT)
            .header(ACCEPT, "application/json")
            .multipart(form)
            .send()
            .await
            .map_err(|e| AnalysisError::Transport(describe_transport_error(&e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AnalysisError::Transport(format!("response interrupted: {e}")))?;

        if !status.is_success() {
            return Err(AnalysisError::Service {
                status: status.as_u16(),
                message: summarize_error_body(&body),
            });
        }
        parse_analysis_response(&body)
    }
}

fn describe_transport_error(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        "the request timed out".to_string()
    } else if err.is_connect() {
        "connection failed; is the analysis service running?".to_string()
    } else {
        err.to_string()
    }
}

impl AnalysisService for HttpAnalysisClient {
    async fn analyze(&self, file: &SelectedFile) -> Result<AnalysisResult, AnalysisError> {
        tracing::info!(
            endpoint = %self.endpoint,
            file = file.name(),
            bytes = file.len(),
            sha256 = %file.sha256(),
            "uploading dataset for analysis"
        );
        let outcome = self.post_file(file).await;
        match &outcome {
            Ok(result) => tracing::info!(
                records = result.record_count,
                quantities = result.summary_stats.len(),
                "analysis completed"
            ),
            Err(err) => tracing::warn!(kind = err.kind(), error = %err, "analysis failed"),
        }
        outcome
    }
}
