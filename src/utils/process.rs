// src/utils/process.rs: running external tools to completion
use std::path::Path;
use std::process::Stdio;
use log::{debug, info};
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use crate::config::defs::PipelineError;
use crate::utils::command::ToolInvocation;


#[derive(Debug, Clone, PartialEq)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub combined_output: String,
}


/// Runs `invocation` inside `working_dir` and waits for it to exit.
///
/// The working directory is set on the child only; the parent's current
/// directory is never touched. No timeout is applied.
///
/// # Arguments
///
/// * `invocation` - Program and arguments.
/// * `working_dir` - Directory the child runs in.
///
/// # Returns
/// CommandOutput with stdout followed by stderr, or `SubprocessFailure` on a
/// non-zero exit.
pub async fn run_command(invocation: &ToolInvocation, working_dir: &Path) -> Result<CommandOutput, PipelineError> {
    let command_text = invocation.to_string();
    info!("Start executing command:\n{}", command_text);
    debug!("Working directory: {}", working_dir.display());

    let tool = invocation.program.to_string_lossy().into_owned();
    let mut child = Command::new(&invocation.program)
        .args(&invocation.args)
        .current_dir(working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| PipelineError::ToolExecution {
            tool: tool.clone(),
            error: format!("Failed to spawn: {}", e),
        })?;

    let mut stdout = child.stdout.take().ok_or_else(|| PipelineError::ToolExecution {
        tool: tool.clone(),
        error: "Failed to get stdout".to_string(),
    })?;
    let mut stderr = child.stderr.take().ok_or_else(|| PipelineError::ToolExecution {
        tool: tool.clone(),
        error: "Failed to get stderr".to_string(),
    })?;

    let mut out_buf = Vec::new();
    let mut err_buf = Vec::new();
    let (status, out_read, err_read) = tokio::join!(
        child.wait(),
        stdout.read_to_end(&mut out_buf),
        stderr.read_to_end(&mut err_buf),
    );
    let io_err = |e: std::io::Error| PipelineError::ToolExecution {
        tool: tool.clone(),
        error: e.to_string(),
    };
    out_read.map_err(io_err)?;
    err_read.map_err(io_err)?;
    let status = status.map_err(io_err)?;

    out_buf.extend_from_slice(&err_buf);
    let combined_output = String::from_utf8_lossy(&out_buf).into_owned();

    match status.code() {
        Some(0) => {
            info!("Executed command:\n{}\nExit Code: 0\nOutput:\n{}", command_text, combined_output);
            Ok(CommandOutput { exit_code: 0, combined_output })
        }
        exit_code => Err(PipelineError::SubprocessFailure {
            command: command_text,
            exit_code,
            output: combined_output,
        }),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sh(script: &str) -> ToolInvocation {
        ToolInvocation::new("sh", vec!["-c".to_string(), script.to_string()])
    }

    #[tokio::test]
    async fn test_success_captures_output() {
        let dir = tempdir().unwrap();
        let out = run_command(&sh("echo hello; echo oops >&2"), dir.path()).await.unwrap();
        assert_eq!(out.exit_code, 0);
        assert_eq!(out.combined_output, "hello\noops\n");
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_failure() {
        let dir = tempdir().unwrap();
        match run_command(&sh("echo boom; exit 3"), dir.path()).await {
            Err(PipelineError::SubprocessFailure { command, exit_code, output }) => {
                assert_eq!(exit_code, Some(3));
                assert!(output.contains("boom"));
                assert!(command.starts_with("sh -c"));
            }
            other => panic!("expected SubprocessFailure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_runs_in_working_dir_without_moving_parent() {
        let dir = tempdir().unwrap();
        let before = std::env::current_dir().unwrap();
        run_command(&sh("touch marker.txt"), dir.path()).await.unwrap();
        assert!(dir.path().join("marker.txt").is_file());
        assert_eq!(std::env::current_dir().unwrap(), before);

        let _ = run_command(&sh("exit 1"), dir.path()).await;
        assert_eq!(std::env::current_dir().unwrap(), before);
    }

    #[tokio::test]
    async fn test_missing_program() {
        let dir = tempdir().unwrap();
        let invocation = ToolInvocation::new("/nonexistent/FixAME.py", vec![]);
        assert!(matches!(
            run_command(&invocation, dir.path()).await,
            Err(PipelineError::ToolExecution { .. })
        ));
    }
}
