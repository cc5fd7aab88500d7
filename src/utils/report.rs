// FixAME report parsing, overview figures and HTML rendering
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use crate::config::defs::{
    ErrorCategory, PipelineError, CATEGORY_LABELS, FIXAME_REPORT_TSV, FIXAME_RESULT_TSV,
    HTML_REPORT_DESCRIPTION, HTML_REPORT_FILE, OVERVIEW_MARKER, PERCENT_DECIMALS,
    REPORT_TSV_DESCRIPTION, RESULT_TSV_DESCRIPTION,
};
use crate::utils::file::{expected_output, file_name_string, unique_dir};

pub const REPORT_TEMPLATE: &str = include_str!("../templates/report_template.html");


/// Basepair counts for every misassembly category.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorCategoryCounts {
    counts: BTreeMap<ErrorCategory, u64>,
}

impl ErrorCategoryCounts {
    pub fn get(&self, category: ErrorCategory) -> u64 {
        self.counts.get(&category).copied().unwrap_or(0)
    }

    pub fn total_error_bp(&self) -> u64 {
        ErrorCategory::COUNTED_AS_ERROR
            .iter()
            .map(|c| self.get(*c))
            .sum()
    }
}


/// Contig count and per-contig lengths of the input assembly.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AssemblyMetadata {
    pub num_contigs: u64,
    #[serde(default)]
    pub contigs: BTreeMap<String, ContigInfo>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ContigInfo {
    pub length: u64,
}

impl AssemblyMetadata {
    pub fn total_contig_length(&self) -> u64 {
        self.contigs.values().map(|c| c.length).sum()
    }
}


#[derive(Debug, Clone, PartialEq)]
pub struct OverviewSummary {
    pub input_contig_count: u64,
    pub total_contig_length: u64,
    pub per_category: ErrorCategoryCounts,
    pub total_error_bp: u64,
    pub percent_error_bp: f64,
}

impl OverviewSummary {
    /// Combines assembly metadata with parsed category counts.
    ///
    /// `potential_circular` and `high_variability` are reported but left out of
    /// `total_error_bp`.
    pub fn compute(
        assembly_ref: &str,
        metadata: &AssemblyMetadata,
        per_category: ErrorCategoryCounts,
    ) -> Result<Self, PipelineError> {
        let total_contig_length = metadata.total_contig_length();
        if total_contig_length == 0 {
            return Err(PipelineError::DivisionByZeroGuard {
                assembly_ref: assembly_ref.to_string(),
            });
        }
        let total_error_bp = per_category.total_error_bp();
        let percent_error_bp = round_to(
            total_error_bp as f64 / total_contig_length as f64 * 100.0,
            PERCENT_DECIMALS,
        );
        Ok(OverviewSummary {
            input_contig_count: metadata.num_contigs,
            total_contig_length,
            per_category,
            total_error_bp,
            percent_error_bp,
        })
    }

    pub fn to_html(&self) -> String {
        let mut content = String::new();
        content.push_str(&format!("<p>Total Input Sequences: {}</p>", self.input_contig_count));
        content.push_str(&format!("<p>Total Input Sequence Length: {}</p>", self.total_contig_length));
        for category in ErrorCategory::ALL {
            content.push_str(&format!(
                "<p>{}: {}</p>",
                CATEGORY_LABELS[&category],
                self.per_category.get(category)
            ));
        }
        content.push_str(&format!("<p>Total Error Basepairs: {}</p>", self.total_error_bp));
        content.push_str(&format!("<p>Total Percent Error Basepairs: {}</p>", self.percent_error_bp));
        content
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}


/// Parses the FixAME report TSV: a header line, then `category<TAB>count` rows.
///
/// Blank lines are skipped. Unknown categories are logged and ignored; a repeated
/// category keeps its last value.
///
/// # Arguments
///
/// * `path` - Path to fixame_report.tsv.
///
/// # Returns
/// ErrorCategoryCounts holding every category.
pub fn parse_report_tsv(path: &Path) -> Result<ErrorCategoryCounts, PipelineError> {
    let content = fs::read_to_string(path)
        .map_err(|e| PipelineError::IOError(format!("Failed to read {}: {}", path.display(), e)))?;
    parse_report_str(&content, path)
}

fn parse_report_str(content: &str, path: &Path) -> Result<ErrorCategoryCounts, PipelineError> {
    let mut counts = BTreeMap::new();

    for (idx, raw_line) in content.lines().enumerate().skip(1) {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }
        let malformed = || PipelineError::MalformedReportLine {
            path: path.to_path_buf(),
            line_number: idx + 1,
            line: raw_line.to_string(),
        };

        let fields: Vec<&str> = line.split('\t').collect();
        let [name, count] = fields.as_slice() else {
            return Err(malformed());
        };
        let count: u64 = count.trim().parse().map_err(|_| malformed())?;

        match ErrorCategory::from_key(name.trim()) {
            Some(category) => {
                if counts.insert(category, count).is_some() {
                    warn!("Category '{}' repeated in {}; keeping the last value", name, path.display());
                }
            }
            None => debug!("Ignoring unknown category '{}' in {}", name, path.display()),
        }
    }

    for category in ErrorCategory::ALL {
        if !counts.contains_key(&category) {
            return Err(PipelineError::MissingCategoryKey {
                path: path.to_path_buf(),
                category: category.key().to_string(),
            });
        }
    }
    Ok(ErrorCategoryCounts { counts })
}


/// Downloadable file entry in a platform report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileLink {
    pub path: PathBuf,
    pub name: String,
    pub label: String,
    pub description: String,
}

impl FileLink {
    pub fn new(path: PathBuf, description: &str) -> Self {
        let name = file_name_string(&path);
        FileLink {
            path,
            label: name.clone(),
            name,
            description: description.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportPayload {
    pub file_links: Vec<FileLink>,
    pub html_links: Vec<FileLink>,
    pub message: String,
    pub created_object_refs: Vec<String>,
    pub overview: OverviewSummary,
}


/// Substitutes the overview fragment into the template and writes
/// `report.html` into a new unique directory under `scratch`.
pub fn write_html_report(scratch: &Path, overview: &OverviewSummary) -> Result<PathBuf, PipelineError> {
    info!("Start generating html report");
    if !REPORT_TEMPLATE.contains(OVERVIEW_MARKER) {
        return Err(PipelineError::InvalidConfig(format!(
            "Report template lacks the {} marker",
            OVERVIEW_MARKER
        )));
    }
    let html = REPORT_TEMPLATE.replacen(OVERVIEW_MARKER, &overview.to_html(), 1);

    let output_directory = unique_dir(scratch)?;
    let report_path = output_directory.join(HTML_REPORT_FILE);
    fs::write(&report_path, html)
        .map_err(|e| PipelineError::IOError(format!("Failed to write {}: {}", report_path.display(), e)))?;
    Ok(report_path)
}


/// Locates FixAME outputs in `result_dir`, builds the overview from them and
/// `metadata`, and renders the HTML summary.
///
/// # Arguments
///
/// * `result_dir` - Directory FixAME ran in.
/// * `scratch` - Base directory for the rendered report.
/// * `assembly_ref` - Assembly the run was made on, for error context.
/// * `metadata` - Contig count and lengths of that assembly.
///
/// # Returns
/// ReportPayload with two TSV links and one HTML link.
pub fn aggregate(
    result_dir: &Path,
    scratch: &Path,
    assembly_ref: &str,
    metadata: &AssemblyMetadata,
) -> Result<ReportPayload, PipelineError> {
    info!("Start packing result files");
    let result_file = expected_output(result_dir, FIXAME_RESULT_TSV)?;
    let report_file = expected_output(result_dir, FIXAME_REPORT_TSV)?;

    let per_category = parse_report_tsv(&report_file)?;
    let overview = OverviewSummary::compute(assembly_ref, metadata, per_category)?;
    debug!("Overview: {:?}", overview);

    let html_path = write_html_report(scratch, &overview)?;

    Ok(ReportPayload {
        file_links: vec![
            FileLink::new(result_file, RESULT_TSV_DESCRIPTION),
            FileLink::new(report_file, REPORT_TSV_DESCRIPTION),
        ],
        html_links: vec![FileLink::new(html_path, HTML_REPORT_DESCRIPTION)],
        message: String::new(),
        created_object_refs: Vec::new(),
        overview,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const REPORT: &str = "error_type\tbp\n\
        local_assembly_error\t10\n\
        palindrome\t5\n\
        direct_repeat\t3\n\
        potential_circular\t2\n\
        high_variability\t1\n";

    fn metadata(lengths: &[u64]) -> AssemblyMetadata {
        AssemblyMetadata {
            num_contigs: lengths.len() as u64,
            contigs: lengths
                .iter()
                .enumerate()
                .map(|(i, &length)| (format!("contig_{}", i), ContigInfo { length }))
                .collect(),
        }
    }

    #[test]
    fn test_overview_totals() {
        let counts = parse_report_str(REPORT, Path::new("fixame_report.tsv")).unwrap();
        assert_eq!(counts.get(ErrorCategory::HighVariability), 1);
        let overview = OverviewSummary::compute("1/2/3", &metadata(&[600, 400]), counts).unwrap();
        assert_eq!(overview.input_contig_count, 2);
        assert_eq!(overview.total_contig_length, 1000);
        assert_eq!(overview.total_error_bp, 18);
        assert_eq!(overview.percent_error_bp, 1.8);
    }

    #[test]
    fn test_percent_rounds_to_five_places() {
        let counts = parse_report_str(REPORT, Path::new("r.tsv")).unwrap();
        let overview = OverviewSummary::compute("1/2/3", &metadata(&[7]), counts).unwrap();
        // 18 / 7 * 100 = 257.142857...
        assert_eq!(overview.percent_error_bp, 257.14286);
    }

    #[test]
    fn test_missing_category() {
        let report = REPORT.replace("high_variability\t1\n", "");
        match parse_report_str(&report, Path::new("r.tsv")) {
            Err(PipelineError::MissingCategoryKey { category, .. }) => assert_eq!(category, "high_variability"),
            other => panic!("expected MissingCategoryKey, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_lines() {
        for bad in ["palindrome\t5\textra", "palindrome 5", "palindrome\tfive", "palindrome\t-5"] {
            let report = REPORT.replace("palindrome\t5", bad);
            match parse_report_str(&report, Path::new("r.tsv")) {
                Err(PipelineError::MalformedReportLine { line_number, line, .. }) => {
                    assert_eq!(line_number, 3);
                    assert_eq!(line, bad);
                }
                other => panic!("expected MalformedReportLine for {:?}, got {:?}", bad, other),
            }
        }
    }

    #[test]
    fn test_header_only_is_missing_category() {
        assert!(matches!(
            parse_report_str("error_type\tbp\n", Path::new("r.tsv")),
            Err(PipelineError::MissingCategoryKey { .. })
        ));
    }

    #[test]
    fn test_zero_length_assembly() {
        let counts = parse_report_str(REPORT, Path::new("r.tsv")).unwrap();
        assert!(matches!(
            OverviewSummary::compute("1/2/3", &metadata(&[]), counts),
            Err(PipelineError::DivisionByZeroGuard { .. })
        ));
    }

    #[test]
    fn test_html_fragment() {
        let counts = parse_report_str(REPORT, Path::new("r.tsv")).unwrap();
        let html = OverviewSummary::compute("1/2/3", &metadata(&[1000]), counts).unwrap().to_html();
        assert!(html.starts_with("<p>Total Input Sequences: 1</p><p>Total Input Sequence Length: 1000</p>"));
        assert!(html.contains("<p>Total Potentially Circular Sequence Length: 2</p>"));
        assert!(html.ends_with("<p>Total Error Basepairs: 18</p><p>Total Percent Error Basepairs: 1.8</p>"));
    }

    #[test]
    fn test_aggregate_missing_report() {
        let result_dir = tempdir().unwrap();
        let scratch = tempdir().unwrap();
        fs::write(result_dir.path().join(FIXAME_RESULT_TSV), "contig\tstart\n").unwrap();
        match aggregate(result_dir.path(), scratch.path(), "1/2/3", &metadata(&[1000])) {
            Err(PipelineError::MissingExpectedOutput { path }) => {
                assert_eq!(path, result_dir.path().join(FIXAME_REPORT_TSV));
            }
            other => panic!("expected MissingExpectedOutput, got {:?}", other),
        }
    }

    #[test]
    fn test_aggregate_builds_links() {
        let result_dir = tempdir().unwrap();
        let scratch = tempdir().unwrap();
        fs::write(result_dir.path().join(FIXAME_RESULT_TSV), "contig\tstart\n").unwrap();
        fs::write(result_dir.path().join(FIXAME_REPORT_TSV), REPORT).unwrap();

        let payload = aggregate(result_dir.path(), scratch.path(), "1/2/3", &metadata(&[1000])).unwrap();
        let names: Vec<&str> = payload.file_links.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec![FIXAME_RESULT_TSV, FIXAME_REPORT_TSV]);
        assert_eq!(payload.file_links[0].description, RESULT_TSV_DESCRIPTION);

        let html_link = &payload.html_links[0];
        assert_eq!(html_link.name, HTML_REPORT_FILE);
        assert!(html_link.path.starts_with(scratch.path()));
        let html = fs::read_to_string(&html_link.path).unwrap();
        assert!(!html.contains(OVERVIEW_MARKER));
        assert!(html.contains("<p>Total Error Basepairs: 18</p>"));
    }
}
