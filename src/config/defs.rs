use std::path::PathBuf;
use std::collections::HashMap;
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use crate::cli::Arguments;

// External software
pub const FIXAME_TAG: &str = "FixAME.py";
pub const DEFAULT_FIXAME_PATH: &str = "/kb/deployment/bin/FixAME/FixAME.py";

// Static Filenames
pub const FIXAME_RESULT_TSV: &str = "fixame_result.tsv";
pub const FIXAME_REPORT_TSV: &str = "fixame_report.tsv";
pub const READS_LIST_FILE: &str = "reads_list_file.txt";
pub const HTML_REPORT_FILE: &str = "report.html";

// Static Parameters
pub const FIXAME_MODE: u8 = 1;
pub const PERCENT_DECIMALS: i32 = 5;
pub const REPORT_OBJECT_PREFIX: &str = "kb_fixame_report_";
pub const HTML_WINDOW_HEIGHT: u32 = 266;
pub const OVERVIEW_MARKER: &str = "<p>Overview_Content</p>";

pub const RESULT_TSV_DESCRIPTION: &str = "File(s) generated by FixAME App";
pub const REPORT_TSV_DESCRIPTION: &str = "Report generated by FixAME App";
pub const HTML_REPORT_DESCRIPTION: &str = "HTML summary report for FixAMEApp";

// Module status
pub const VERSION: &str = "0.0.1";
pub const GIT_URL: &str = "https://github.com/rohansachdeva/kb_fixame.git";
pub const GIT_COMMIT_HASH: &str = "7f05631c3bd75fd9a02f1688344aa4ce634169ad";

/// Misassembly categories reported by FixAME, in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ErrorCategory {
    LocalAssemblyError,
    Palindrome,
    DirectRepeat,
    PotentialCircular,
    HighVariability,
}

impl ErrorCategory {
    pub const ALL: [ErrorCategory; 5] = [
        ErrorCategory::LocalAssemblyError,
        ErrorCategory::Palindrome,
        ErrorCategory::DirectRepeat,
        ErrorCategory::PotentialCircular,
        ErrorCategory::HighVariability,
    ];

    /// Categories summed into the total error basepairs.
    pub const COUNTED_AS_ERROR: [ErrorCategory; 3] = [
        ErrorCategory::LocalAssemblyError,
        ErrorCategory::Palindrome,
        ErrorCategory::DirectRepeat,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            ErrorCategory::LocalAssemblyError => "local_assembly_error",
            ErrorCategory::Palindrome => "palindrome",
            ErrorCategory::DirectRepeat => "direct_repeat",
            ErrorCategory::PotentialCircular => "potential_circular",
            ErrorCategory::HighVariability => "high_variability",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        ErrorCategory::ALL.into_iter().find(|c| c.key() == key)
    }
}

lazy_static! {
    pub static ref CATEGORY_LABELS: HashMap<ErrorCategory, &'static str> = {
        let mut m = HashMap::new();
        m.insert(ErrorCategory::LocalAssemblyError, "Total Local Assembly Error Basepairs");
        m.insert(ErrorCategory::Palindrome, "Total Palindromic Sequence Length");
        m.insert(ErrorCategory::DirectRepeat, "Total Direct Repeat Sequence Length");
        m.insert(ErrorCategory::PotentialCircular, "Total Potentially Circular Sequence Length");
        m.insert(ErrorCategory::HighVariability, "Total High Variability Basepairs");
        m
    };
}


#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("\"{0}\" parameter is required, but missing")]
    MissingRequiredParameter(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to execute {tool}: {error}")]
    ToolExecution { tool: String, error: String },

    #[error("Error running command:\n{command}\nExit Code: {}\nOutput:\n{output}", exit_code_text(.exit_code))]
    SubprocessFailure {
        command: String,
        exit_code: Option<i32>,
        output: String,
    },

    #[error("Expected output missing: {}", .path.display())]
    MissingExpectedOutput { path: PathBuf },

    #[error("Malformed line {line_number} in {}: {line:?}", .path.display())]
    MalformedReportLine {
        path: PathBuf,
        line_number: usize,
        line: String,
    },

    #[error("Category '{category}' missing from {}", .path.display())]
    MissingCategoryKey { path: PathBuf, category: String },

    #[error("Total contig length of assembly {assembly_ref} is zero; cannot compute percent error")]
    DivisionByZeroGuard { assembly_ref: String },

    #[error("{method} failed: {message}")]
    ServiceError { method: String, message: String },

    #[error("I/O error: {0}")]
    IOError(String),
}

fn exit_code_text(code: &Option<i32>) -> String {
    code.map(|c| c.to_string())
        .unwrap_or_else(|| "terminated by signal".to_string())
}


/// Job input as supplied by the platform. Every field is optional here so that
/// absence can be reported as `MissingRequiredParameter` rather than a parse error.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FixameParams {
    pub assembly_ref: Option<String>,
    pub workspace_name: Option<String>,
    pub reads_list: Option<Vec<String>>,
    pub min_contig_length: Option<u64>,
}

/// Validated, trimmed and immutable parameters for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunParameters {
    pub assembly_ref: String,
    pub workspace_name: String,
    pub reads_refs: Vec<String>,
    pub min_contig_length: Option<u64>,
}

impl FixameParams {
    /// Merges CLI overrides onto the params file contents.
    pub fn with_overrides(mut self, args: &Arguments) -> Self {
        if let Some(assembly_ref) = &args.assembly_ref {
            self.assembly_ref = Some(assembly_ref.clone());
        }
        if let Some(workspace_name) = &args.workspace_name {
            self.workspace_name = Some(workspace_name.clone());
        }
        if let Some(reads_list) = &args.reads_list {
            self.reads_list = Some(reads_list.clone());
        }
        if let Some(min_contig_length) = args.min_contig_length {
            self.min_contig_length = Some(min_contig_length);
        }
        self
    }

    /// Checks required fields and trims surrounding whitespace.
    ///
    /// Empty strings and an empty reads list count as missing. A `min_contig_length`
    /// of zero is treated as unset so the tool's own default applies.
    pub fn validate(&self) -> Result<RunParameters, PipelineError> {
        let assembly_ref = required_str(&self.assembly_ref, "assembly_ref")?;
        let workspace_name = required_str(&self.workspace_name, "workspace_name")?;

        let reads_refs: Vec<String> = self
            .reads_list
            .as_ref()
            .map(|refs| {
                refs.iter()
                    .map(|r| r.trim().to_string())
                    .filter(|r| !r.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        if reads_refs.is_empty() {
            return Err(PipelineError::MissingRequiredParameter("reads_list".to_string()));
        }

        Ok(RunParameters {
            assembly_ref,
            workspace_name,
            reads_refs,
            min_contig_length: self.min_contig_length.filter(|&len| len > 0),
        })
    }
}

fn required_str(value: &Option<String>, name: &str) -> Result<String, PipelineError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(PipelineError::MissingRequiredParameter(name.to_string())),
    }
}

/// Response handed back to the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixameOutput {
    pub result_directory: PathBuf,
    pub report_name: String,
    pub report_ref: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModuleStatus {
    pub state: String,
    pub message: String,
    pub version: String,
    pub git_url: String,
    pub git_commit_hash: String,
}


pub struct RunConfig {
    pub cwd: PathBuf,
    pub scratch: PathBuf,
    pub tool_path: PathBuf,
    pub callback_url: Option<String>,
    pub auth_token: Option<String>,
    pub threads: usize,
    pub args: Arguments,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(assembly: Option<&str>, ws: Option<&str>, reads: Option<Vec<&str>>) -> FixameParams {
        FixameParams {
            assembly_ref: assembly.map(String::from),
            workspace_name: ws.map(String::from),
            reads_list: reads.map(|r| r.into_iter().map(String::from).collect()),
            min_contig_length: None,
        }
    }

    #[test]
    fn test_validate_missing_each_required_field() {
        let cases = [
            (params(None, Some("ws"), Some(vec!["1/2/3"])), "assembly_ref"),
            (params(Some("1/2/3"), None, Some(vec!["1/2/3"])), "workspace_name"),
            (params(Some("1/2/3"), Some("ws"), None), "reads_list"),
        ];
        for (p, field) in cases {
            match p.validate() {
                Err(PipelineError::MissingRequiredParameter(name)) => assert_eq!(name, field),
                other => panic!("expected missing {}, got {:?}", field, other),
            }
        }
    }

    #[test]
    fn test_validate_trims_and_drops_zero_length() {
        let mut p = params(Some("  1/2/3 "), Some("\tmy_ws\n"), Some(vec![" 4/5/6 ", "7/8/9"]));
        p.min_contig_length = Some(0);
        let run = p.validate().unwrap();
        assert_eq!(run.assembly_ref, "1/2/3");
        assert_eq!(run.workspace_name, "my_ws");
        assert_eq!(run.reads_refs, vec!["4/5/6", "7/8/9"]);
        assert_eq!(run.min_contig_length, None);
    }

    #[test]
    fn test_validate_blank_values_are_missing() {
        let p = params(Some("   "), Some("ws"), Some(vec!["1/2/3"]));
        assert!(matches!(p.validate(), Err(PipelineError::MissingRequiredParameter(_))));
        let p = params(Some("1/2/3"), Some("ws"), Some(vec![" "]));
        assert!(matches!(p.validate(), Err(PipelineError::MissingRequiredParameter(_))));
    }

    #[test]
    fn test_params_deserialize_from_job_input() {
        let json = r#"{"assembly_ref": "1/2/3", "workspace_name": "ws", "reads_list": ["4/5/6"], "min_contig_length": 500}"#;
        let p: FixameParams = serde_json::from_str(json).unwrap();
        let run = p.validate().unwrap();
        assert_eq!(run.min_contig_length, Some(500));
    }

    #[test]
    fn test_category_keys() {
        for category in ErrorCategory::ALL {
            assert_eq!(ErrorCategory::from_key(category.key()), Some(category));
            assert!(CATEGORY_LABELS.contains_key(&category));
        }
        assert_eq!(ErrorCategory::from_key("chimera"), None);
    }
}
