//! Platform services the pipeline depends on: assembly and reads retrieval,
//! object metadata and report publishing.
pub mod client;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use crate::config::defs::PipelineError;
use crate::utils::report::{AssemblyMetadata, FileLink};

pub use client::CallbackClient;


/// Local files of one downloaded reads library.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ReadFiles {
    pub fwd: PathBuf,
    #[serde(default)]
    pub rev: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CreatedObject {
    #[serde(rename = "ref")]
    pub object_ref: String,
    pub description: String,
}

/// Parameters for `KBaseReport.create_extended_report`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtendedReportParams {
    pub message: String,
    pub workspace_name: String,
    pub objects_created: Vec<CreatedObject>,
    pub file_links: Vec<FileLink>,
    pub html_links: Vec<FileLink>,
    pub direct_html_link_index: usize,
    pub html_window_height: u32,
    pub report_object_name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ReportInfo {
    pub name: String,
    #[serde(rename = "ref")]
    pub report_ref: String,
}


#[allow(async_fn_in_trait)]
pub trait KbaseServices {
    /// Fetches the assembly as a local FASTA file.
    async fn get_assembly_as_fasta(&self, assembly_ref: &str) -> Result<PathBuf, PipelineError>;

    /// Unpacks a compressed or archived file, returning the unpacked path.
    async fn unpack_file(&self, file_path: &Path) -> Result<PathBuf, PipelineError>;

    /// Downloads all libraries in one call, non-interleaved. Keyed by reads ref.
    async fn download_reads(&self, reads_refs: &[String]) -> Result<HashMap<String, ReadFiles>, PipelineError>;

    async fn get_assembly_metadata(&self, assembly_ref: &str) -> Result<AssemblyMetadata, PipelineError>;

    async fn create_extended_report(&self, params: &ExtendedReportParams) -> Result<ReportInfo, PipelineError>;
}
