use std::path::{Path, PathBuf};
use std::sync::Arc;
use log::{debug, info};
use uuid::Uuid;
use crate::config::defs::{
    FixameOutput, FixameParams, PipelineError, RunConfig, RunParameters, HTML_WINDOW_HEIGHT,
    READS_LIST_FILE, REPORT_OBJECT_PREFIX,
};
use crate::services::{ExtendedReportParams, KbaseServices, ReportInfo};
use crate::utils::command::{build_command, StagedInputs};
use crate::utils::file::{is_archived, list_dir_names, unique_dir, write_path_list};
use crate::utils::process::run_command;
use crate::utils::report::{aggregate, ReportPayload};


/// Fetches the assembly FASTA and unpacks it when it arrives archived.
///
/// # Arguments
///
/// * `services` - Platform services.
/// * `assembly_ref` - Assembly object reference.
///
/// # Returns
/// Local path of the contig FASTA.
pub async fn stage_assembly<S: KbaseServices>(services: &S, assembly_ref: &str) -> Result<PathBuf, PipelineError> {
    let contig_file = services.get_assembly_as_fasta(assembly_ref).await?;
    let archived = is_archived(&contig_file)
        .map_err(|e| PipelineError::IOError(format!("Failed to inspect {}: {}", contig_file.display(), e)))?;
    if archived {
        debug!("Unpacking {}", contig_file.display());
        return services.unpack_file(&contig_file).await;
    }
    Ok(contig_file)
}


/// Downloads every reads library in one call and writes their local paths to
/// `<scratch>/<uuid>/reads_list_file.txt`, forward before reverse, in input order.
///
/// # Arguments
///
/// * `services` - Platform services.
/// * `scratch` - Base scratch directory.
/// * `reads_refs` - Reads object references.
///
/// # Returns
/// Path of the reads list file.
pub async fn stage_reads<S: KbaseServices>(services: &S, scratch: &Path, reads_refs: &[String]) -> Result<PathBuf, PipelineError> {
    info!("Processing reads object list: {:?}", reads_refs);
    let downloaded = services.download_reads(reads_refs).await?;

    let mut read_paths = Vec::new();
    for reads_ref in reads_refs {
        let files = downloaded.get(reads_ref).ok_or_else(|| PipelineError::ServiceError {
            method: "ReadsUtils.download_reads".to_string(),
            message: format!("no files returned for {}", reads_ref),
        })?;
        read_paths.push(files.fwd.clone());
        if let Some(rev) = &files.rev {
            read_paths.push(rev.clone());
        }
    }

    let result_file = unique_dir(scratch)?.join(READS_LIST_FILE);
    info!("Saving reads file path(s) to: {}", result_file.display());
    write_path_list(&result_file, &read_paths)?;
    Ok(result_file)
}


async fn generate_report<S: KbaseServices>(
    services: &S,
    params: &RunParameters,
    payload: ReportPayload,
) -> Result<ReportInfo, PipelineError> {
    info!("Generating report");
    let report_params = ExtendedReportParams {
        message: payload.message,
        workspace_name: params.workspace_name.clone(),
        objects_created: Vec::new(),
        file_links: payload.file_links,
        html_links: payload.html_links,
        direct_html_link_index: 0,
        html_window_height: HTML_WINDOW_HEIGHT,
        report_object_name: format!("{}{}", REPORT_OBJECT_PREFIX, Uuid::new_v4()),
    };
    let report = services.create_extended_report(&report_params).await?;
    info!("Created report {} ({})", report.name, report.report_ref);
    Ok(report)
}


/// Runs FixAME on one assembly and publishes the summary report.
///
/// # Arguments
///
/// * `config` - RunConfig struct from main.
/// * `params` - Job input; validated before any I/O.
/// * `services` - Platform services.
///
/// # Returns
/// FixameOutput with the result directory and the report name/ref.
pub async fn run<S: KbaseServices>(
    config: Arc<RunConfig>,
    params: &FixameParams,
    services: &S,
) -> Result<FixameOutput, PipelineError> {
    info!(
        "Running FixAME with params:\n{}",
        serde_json::to_string_pretty(params).unwrap_or_else(|_| format!("{:?}", params))
    );

    info!("Validating FixAME params");
    let run_params = params.validate()?;

    let contig_file_path = stage_assembly(services, &run_params.assembly_ref).await?;
    info!("Contig file: {}", contig_file_path.display());
    let reads_list_file = stage_reads(services, &config.scratch, &run_params.reads_refs).await?;

    let staged = StagedInputs {
        contig_file_path,
        reads_list_file: Some(reads_list_file),
    };

    let result_directory = unique_dir(&config.scratch)?;
    let invocation = build_command(&config.tool_path, &staged, &run_params, config.threads)?;
    run_command(&invocation, &result_directory).await?;

    info!("Saved result files to: {}", result_directory.display());
    info!("Generated files:\n{}", list_dir_names(&result_directory)?.join("\n"));

    let metadata = services.get_assembly_metadata(&run_params.assembly_ref).await?;
    let payload = aggregate(&result_directory, &config.scratch, &run_params.assembly_ref, &metadata)?;
    let report = generate_report(services, &run_params, payload).await?;

    Ok(FixameOutput {
        result_directory,
        report_name: report.name,
        report_ref: report.report_ref,
    })
}
