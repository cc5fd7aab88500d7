use std::time::Instant;
use std::{env, fs};
use std::path::PathBuf;
use std::sync::Arc;
use std::io::Write;

use anyhow::{anyhow, Context, Result};
use log::{LevelFilter, debug, info, error};
use env_logger::Builder;
use fixame_pipelines::cli::parse;
use fixame_pipelines::config::defs::{FixameOutput, FixameParams, PipelineError, RunConfig, DEFAULT_FIXAME_PATH};
use fixame_pipelines::services::CallbackClient;
use fixame_pipelines::utils::system::{detect_ram, detect_threads, resolve_scratch_dir};
use fixame_pipelines::pipelines::{fixame, status};


#[tokio::main]
async fn main() -> Result<()> {
    let run_start = Instant::now();

    let args = parse();

    let log_level = if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    Builder::new()
        .filter_level(log_level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {}: {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .init();

    let dir = env::current_dir()?;
    debug!("The current directory is {:?}", dir);

    let module = args.module.clone();
    if module == "status" {
        write_json(&args.out_file, &status::status())?;
        return Ok(());
    }

    let threads = detect_threads(args.threads);
    match detect_ram() {
        Ok((total_ram, available_ram)) => debug!(
            "Available RAM: ~{} GiB of ~{} GiB; FixAME threads: {}",
            available_ram / 1_073_741_824,
            total_ram / 1_073_741_824,
            threads
        ),
        Err(e) => debug!("RAM detection failed: {}", e),
    }

    let scratch = resolve_scratch_dir(args.scratch.as_deref(), &dir);
    fs::create_dir_all(&scratch)
        .with_context(|| format!("Failed to create scratch dir {}", scratch.display()))?;
    info!("The scratch directory is {:?}", scratch);

    let params = load_params(args.params_file.as_deref())?.with_overrides(&args);
    let tool_path = PathBuf::from(args.tool_path.clone().unwrap_or_else(|| DEFAULT_FIXAME_PATH.to_string()));
    let run_config = Arc::new(RunConfig {
        cwd: dir,
        scratch,
        tool_path,
        callback_url: args.callback_url.clone(),
        auth_token: args.token.clone(),
        threads,
        args,
    });

    let result = match module.as_str() {
        "fixame" => fixame_run(run_config.clone(), &params).await,
        _ => Err(PipelineError::InvalidConfig(format!("Invalid module: {}", module))),
    };

    match result {
        Ok(output) => {
            write_json(&run_config.args.out_file, &output)?;
            info!("Run complete: {} milliseconds.", run_start.elapsed().as_millis());
            Ok(())
        }
        Err(e) => {
            error!("Pipeline failed: {} at {} milliseconds.", e, run_start.elapsed().as_millis());
            std::process::exit(1);
        }
    }
}


async fn fixame_run(run_config: Arc<RunConfig>, params: &FixameParams) -> Result<FixameOutput, PipelineError> {
    params.validate()?;
    let callback_url = run_config
        .callback_url
        .clone()
        .ok_or_else(|| PipelineError::InvalidConfig("SDK_CALLBACK_URL is not set".to_string()))?;
    let services = CallbackClient::new(callback_url, run_config.auth_token.clone());
    fixame::run(run_config, params, &services).await
}


/// Reads the JSON job input, or starts from empty params when none is given.
///
/// # Arguments
/// * `path` - Optional path to the params file.
///
/// # Returns
/// FixameParams, not yet validated.
fn load_params(path: Option<&str>) -> Result<FixameParams> {
    match path {
        Some(p) => {
            let text = fs::read_to_string(p).with_context(|| format!("Failed to read params file {}", p))?;
            serde_json::from_str(&text).map_err(|e| anyhow!("Invalid params file {}: {}", p, e))
        }
        None => Ok(FixameParams::default()),
    }
}


fn write_json<T: serde::Serialize>(out_file: &Option<String>, value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value)?;
    match out_file {
        Some(path) => fs::write(path, text).with_context(|| format!("Failed to write {}", path))?,
        None => println!("{}", text),
    }
    Ok(())
}
