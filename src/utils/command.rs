/// Functions and structs for working with creating command-line arguments

use std::fmt;
use std::path::{Path, PathBuf};
use crate::config::defs::{PipelineError, RunParameters, FIXAME_TAG};


/// Local files produced by the staging step.
#[derive(Debug, Clone, PartialEq)]
pub struct StagedInputs {
    pub contig_file_path: PathBuf,
    pub reads_list_file: Option<PathBuf>,
}

/// A fully materialized external command.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl ToolInvocation {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        ToolInvocation { program: program.into(), args }
    }

    /// True when `flag` is immediately followed by `value`.
    pub fn has_flag_value(&self, flag: &str, value: &str) -> bool {
        self.args.windows(2).any(|w| w[0] == flag && w[1] == value)
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.args.iter().any(|a| a == flag)
    }
}

impl fmt::Display for ToolInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}


pub mod fixame {
    use std::path::Path;
    use log::{debug, warn};
    use crate::config::defs::{PipelineError, RunParameters, FIXAME_MODE, FIXAME_REPORT_TSV, FIXAME_RESULT_TSV};
    use crate::utils::command::StagedInputs;
    use crate::utils::file::read_path_list;

    /// Forward and reverse read paths, only when the list holds exactly two entries.
    pub fn paired_reads(reads_list_file: &Path) -> Result<Option<(String, String)>, PipelineError> {
        let entries = read_path_list(reads_list_file)?;
        debug!("Reads list entries: {:?}", entries);
        match entries.as_slice() {
            [fwd, rev] => Ok(Some((
                fwd.to_string_lossy().into_owned(),
                rev.to_string_lossy().into_owned(),
            ))),
            _ => {
                warn!(
                    "Reads list {} has {} entries; FixAME needs exactly a forward/reverse pair, running without reads",
                    reads_list_file.display(),
                    entries.len()
                );
                Ok(None)
            }
        }
    }

    pub fn arg_generator(staged: &StagedInputs, params: &RunParameters, threads: usize) -> Result<Vec<String>, PipelineError> {
        let mut args_vec: Vec<String> = Vec::new();
        args_vec.push("-i".to_string());
        args_vec.push(staged.contig_file_path.to_string_lossy().into_owned());

        if let Some(reads_list_file) = &staged.reads_list_file {
            if let Some((fwd, rev)) = paired_reads(reads_list_file)? {
                args_vec.push("-f".to_string());
                args_vec.push(fwd);
                args_vec.push("-r".to_string());
                args_vec.push(rev);
            }
        }

        if let Some(min_contig_length) = params.min_contig_length {
            args_vec.push("-l".to_string());
            args_vec.push(min_contig_length.to_string());
        }

        args_vec.push("-o".to_string());
        args_vec.push(FIXAME_RESULT_TSV.to_string());
        args_vec.push("-e".to_string());
        args_vec.push(FIXAME_REPORT_TSV.to_string());
        args_vec.push("-m".to_string());
        args_vec.push(FIXAME_MODE.to_string());
        args_vec.push("-t".to_string());
        args_vec.push(threads.to_string());
        Ok(args_vec)
    }
}


/// Builds the FixAME invocation from staged inputs and run parameters.
///
/// # Arguments
///
/// * `tool_path` - Location of FixAME.py.
/// * `staged` - Contig FASTA and optional reads list file.
/// * `params` - Validated run parameters.
/// * `threads` - Worker thread count for `-t`.
///
/// # Returns
/// ToolInvocation
pub fn build_command(
    tool_path: &Path,
    staged: &StagedInputs,
    params: &RunParameters,
    threads: usize,
) -> Result<ToolInvocation, PipelineError> {
    if tool_path.as_os_str().is_empty() {
        return Err(PipelineError::InvalidConfig(format!("Empty path for {}", FIXAME_TAG)));
    }
    let args = fixame::arg_generator(staged, params, threads)?;
    let invocation = ToolInvocation::new(tool_path, args);
    log::info!("Generated {} command: {}", FIXAME_TAG, invocation);
    Ok(invocation)
}
