// src/utils/system.rs: System functions

use std::path::PathBuf;

use sysinfo::{MemoryRefreshKind, RefreshKind, System};
use anyhow::{anyhow, Result};


/// Determines the worker thread count handed to FixAME.
///
/// # Arguments
///
/// * `args_threads` - Optional user override.
///
/// # Returns
///
/// usize number of threads, never zero
pub fn detect_threads(args_threads: Option<usize>) -> usize {
    match args_threads {
        Some(threads) if threads > 0 => threads,
        _ => num_cpus::get().max(1),
    }
}


/// Finds the amount of total and available RAM
///
/// # Returns
///
/// Result<u64, u64> total ram, available ram
pub fn detect_ram() -> Result<(u64, u64)> {
    let refresh_kind = RefreshKind::nothing().with_memory(MemoryRefreshKind::everything());
    let mut system = System::new_with_specifics(refresh_kind);
    system.refresh_memory();
    let total_ram = system.total_memory();
    let available_ram = system.available_memory();

    if total_ram == 0 {
        return Err(anyhow!("Failed to detect valid RAM values"));
    }

    Ok((total_ram, available_ram))
}


/// Resolves the scratch directory. Relative paths are anchored at `cwd`; with no
/// path given, the standard temp dir is used.
///
/// # Arguments
///
/// * `scratch` - Optional user-supplied path.
/// * `cwd` - The current working directory.
///
/// # Returns
/// PathBuf: absolute scratch dir.
pub fn resolve_scratch_dir(scratch: Option<&str>, cwd: &PathBuf) -> PathBuf {
    match scratch {
        Some(dir) => {
            let path = PathBuf::from(dir);
            if path.is_absolute() {
                path
            } else {
                cwd.join(path)
            }
        }
        None => std::env::temp_dir(),
    }
}
