use std::collections::HashMap;
use std::path::{Path, PathBuf};
use lazy_static::lazy_static;
use log::debug;
use reqwest::header::AUTHORIZATION;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::time::Duration;
use uuid::Uuid;
use crate::config::defs::PipelineError;
use crate::services::{ExtendedReportParams, KbaseServices, ReadFiles, ReportInfo};
use crate::utils::report::AssemblyMetadata;

lazy_static! {
    static ref CLIENT: reqwest::Client = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(20))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new());
}


#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Vec<Value>>,
    #[serde(default)]
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl RpcError {
    fn describe(&self) -> String {
        let mut parts = Vec::new();
        if let Some(name) = &self.name {
            parts.push(name.clone());
        }
        if let Some(message) = &self.message {
            parts.push(message.clone());
        }
        if let Some(trace) = &self.error {
            parts.push(trace.clone());
        }
        if parts.is_empty() {
            "unknown error".to_string()
        } else {
            parts.join(": ")
        }
    }
}

#[derive(Debug, Deserialize)]
struct FastaResult {
    path: PathBuf,
}

#[derive(Debug, Deserialize)]
struct UnpackResult {
    file_path: PathBuf,
}

#[derive(Debug, Deserialize)]
struct DownloadReadsResult {
    files: HashMap<String, DownloadedLibrary>,
}

#[derive(Debug, Deserialize)]
struct DownloadedLibrary {
    files: ReadFiles,
}

#[derive(Debug, Deserialize)]
struct GetObjectsResult {
    data: Vec<ObjectData>,
}

#[derive(Debug, Deserialize)]
struct ObjectData {
    data: AssemblyMetadata,
}


/// JSON-RPC 1.1 client for the SDK callback server.
#[derive(Debug, Clone)]
pub struct CallbackClient {
    url: String,
    token: Option<String>,
}

impl CallbackClient {
    pub fn new(url: impl Into<String>, token: Option<String>) -> Self {
        CallbackClient { url: url.into(), token }
    }

    async fn call<P: Serialize, R: DeserializeOwned>(&self, method: &str, params: &P) -> Result<R, PipelineError> {
        let service_err = |message: String| PipelineError::ServiceError {
            method: method.to_string(),
            message,
        };

        let body = json!({
            "method": method,
            "params": [params],
            "version": "1.1",
            "id": Uuid::new_v4().to_string(),
        });
        debug!("Calling {} at {}", method, self.url);

        let mut request = CLIENT.post(&self.url).json(&body);
        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, token);
        }
        let response = request
            .send()
            .await
            .map_err(|e| service_err(format!("request failed: {}", e)))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| service_err(format!("failed to read response: {}", e)))?;

        // The callback server reports method errors with a 500 and a JSON error body.
        let envelope: RpcResponse = serde_json::from_str(&text)
            .map_err(|e| service_err(format!("HTTP {}: unparseable response ({}): {}", status, e, text)))?;
        if let Some(error) = envelope.error {
            return Err(service_err(error.describe()));
        }
        let first = envelope
            .result
            .and_then(|results| results.into_iter().next())
            .ok_or_else(|| service_err(format!("HTTP {}: empty result", status)))?;
        serde_json::from_value(first).map_err(|e| service_err(format!("unexpected result shape: {}", e)))
    }
}

impl KbaseServices for CallbackClient {
    async fn get_assembly_as_fasta(&self, assembly_ref: &str) -> Result<PathBuf, PipelineError> {
        let result: FastaResult = self
            .call("AssemblyUtil.get_assembly_as_fasta", &json!({ "ref": assembly_ref }))
            .await?;
        Ok(result.path)
    }

    async fn unpack_file(&self, file_path: &Path) -> Result<PathBuf, PipelineError> {
        let result: UnpackResult = self
            .call("DataFileUtil.unpack_file", &json!({ "file_path": file_path }))
            .await?;
        Ok(result.file_path)
    }

    async fn download_reads(&self, reads_refs: &[String]) -> Result<HashMap<String, ReadFiles>, PipelineError> {
        let result: DownloadReadsResult = self
            .call(
                "ReadsUtils.download_reads",
                &json!({ "read_libraries": reads_refs, "interleaved": "false" }),
            )
            .await?;
        Ok(result
            .files
            .into_iter()
            .map(|(reads_ref, library)| (reads_ref, library.files))
            .collect())
    }

    async fn get_assembly_metadata(&self, assembly_ref: &str) -> Result<AssemblyMetadata, PipelineError> {
        let result: GetObjectsResult = self
            .call("DataFileUtil.get_objects", &json!({ "object_refs": [assembly_ref] }))
            .await?;
        result
            .data
            .into_iter()
            .next()
            .map(|object| object.data)
            .ok_or_else(|| PipelineError::ServiceError {
                method: "DataFileUtil.get_objects".to_string(),
                message: format!("no object returned for {}", assembly_ref),
            })
    }

    async fn create_extended_report(&self, params: &ExtendedReportParams) -> Result<ReportInfo, PipelineError> {
        self.call("KBaseReport.create_extended_report", params).await
    }
}
