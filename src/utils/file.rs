use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use log::debug;
use uuid::Uuid;
use crate::config::defs::PipelineError;

const ARCHIVE_EXTS: &[&'static str] = &["gz", "gzip", "bz2", "zip", "tar", "tgz"];


/// Creates `<base>/<uuid4>` and returns it. Names are unique per call so
/// concurrent runs sharing a scratch area never collide.
pub fn unique_dir(base: &Path) -> Result<PathBuf, PipelineError> {
    let dir = base.join(Uuid::new_v4().to_string());
    mkdir_p(&dir)?;
    Ok(dir)
}

pub fn mkdir_p(path: &Path) -> Result<(), PipelineError> {
    fs::create_dir_all(path)
        .map_err(|e| PipelineError::IOError(format!("Failed to create {}: {}", path.display(), e)))
}


pub fn is_gzipped(path: &Path) -> io::Result<bool> {
    let mut file = File::open(path)?;
    let mut buffer = [0u8; 2];
    match file.read_exact(&mut buffer) {
        Ok(()) => Ok(buffer == [0x1F, 0x8B]), // Gzip magic bytes
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e),
    }
}

/// True when the file looks compressed or archived, by magic bytes or extension.
pub fn is_archived(path: &Path) -> io::Result<bool> {
    let by_ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ARCHIVE_EXTS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false);
    if by_ext {
        return Ok(true);
    }
    is_gzipped(path)
}


/// Writes one path per line.
pub fn write_path_list(path: &Path, entries: &[PathBuf]) -> Result<(), PipelineError> {
    let io_err = |e: io::Error| PipelineError::IOError(format!("Failed to write {}: {}", path.display(), e));
    let mut writer = BufWriter::new(File::create(path).map_err(io_err)?);
    for entry in entries {
        writeln!(writer, "{}", entry.display()).map_err(io_err)?;
    }
    writer.flush().map_err(io_err)?;
    Ok(())
}

/// Reads a path-per-line file back, dropping blank lines and surrounding whitespace.
pub fn read_path_list(path: &Path) -> Result<Vec<PathBuf>, PipelineError> {
    let io_err = |e: io::Error| PipelineError::IOError(format!("Failed to read {}: {}", path.display(), e));
    let reader = BufReader::new(File::open(path).map_err(io_err)?);
    let mut entries = Vec::new();
    for line in reader.lines() {
        let line = line.map_err(io_err)?;
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            entries.push(PathBuf::from(trimmed));
        }
    }
    Ok(entries)
}


/// Resolves `dir/file_name` and fails with `MissingExpectedOutput` when it is not a file.
pub fn expected_output(dir: &Path, file_name: &str) -> Result<PathBuf, PipelineError> {
    let path = dir.join(file_name);
    if path.is_file() {
        debug!("Found expected output {}", path.display());
        Ok(path)
    } else {
        Err(PipelineError::MissingExpectedOutput { path })
    }
}

/// File names directly under `dir`, sorted.
pub fn list_dir_names(dir: &Path) -> Result<Vec<String>, PipelineError> {
    let entries = fs::read_dir(dir)
        .map_err(|e| PipelineError::IOError(format!("Failed to list {}: {}", dir.display(), e)))?;
    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    Ok(names)
}

pub fn file_name_string(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_path_list_round_trip() -> Result<(), PipelineError> {
        let dir = tempdir().map_err(|e| PipelineError::IOError(e.to_string()))?;
        let list = dir.path().join("reads_list_file.txt");
        let paths = vec![
            PathBuf::from("/a/lib1_fwd.fq"),
            PathBuf::from("/a/lib1_rev.fq"),
            PathBuf::from("/b/lib2.fq"),
        ];
        write_path_list(&list, &paths)?;
        assert_eq!(read_path_list(&list)?, paths);
        Ok(())
    }

    #[test]
    fn test_unique_dirs_differ() {
        let base = tempdir().unwrap();
        let a = unique_dir(base.path()).unwrap();
        let b = unique_dir(base.path()).unwrap();
        assert_ne!(a, b);
        assert!(a.is_dir() && b.is_dir());
    }

    #[test]
    fn test_is_archived() -> io::Result<()> {
        let dir = tempdir()?;
        let plain = dir.path().join("contigs.fa");
        fs::write(&plain, ">c1\nACGT\n")?;
        assert!(!is_archived(&plain)?);

        let gz_magic = dir.path().join("contigs");
        fs::write(&gz_magic, [0x1F, 0x8B, 0x08, 0x00])?;
        assert!(is_archived(&gz_magic)?);

        let by_ext = dir.path().join("contigs.fa.gz");
        fs::write(&by_ext, b"not really")?;
        assert!(is_archived(&by_ext)?);

        let empty = dir.path().join("empty.fa");
        fs::write(&empty, b"")?;
        assert!(!is_archived(&empty)?);
        Ok(())
    }

    #[test]
    fn test_expected_output_missing() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("fixame_result.tsv"), "x").unwrap();
        assert!(expected_output(dir.path(), "fixame_result.tsv").is_ok());
        match expected_output(dir.path(), "fixame_report.tsv") {
            Err(PipelineError::MissingExpectedOutput { path }) => {
                assert_eq!(path, dir.path().join("fixame_report.tsv"));
            }
            other => panic!("expected MissingExpectedOutput, got {:?}", other),
        }
    }
}
