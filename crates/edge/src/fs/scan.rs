//! Breadth-first directory enumeration with basename exclusion.

use glob::Pattern;
use rayon::prelude::*;
use std::collections::VecDeque;
use std::io;
use std::path::{Path, PathBuf};
use std::{fs, fmt};

/// What went wrong while scanning (non-fatal; we keep going).
#[derive(Debug)]
pub struct ScanError {
    pub path: PathBuf,
    pub error: io::Error,
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.error)
    }
}

#[derive(Debug, Default)]
pub struct ScanReport {
    pub entries_seen: usize,
    pub errors: Vec<ScanError>,
}

fn is_excluded(name: &str, exclude: &[Pattern]) -> bool {
    exclude.iter().any(|pattern| pattern.matches(name))
}

/// Enumerate regular files under `root`, breadth-first.
///
/// Entries whose basename matches any pattern in `exclude` are skipped;
/// matching directories are pruned entirely. Symlinks are followed;
/// cyclic trees are the caller's problem. A file root degrades to a
/// single-element list, still subject to exclusion. Unreadable entries
/// are recorded in the report, not fatal.
///
/// Emitted paths are canonical and absolute; canonicalisation of the
/// collected candidates runs in parallel.
pub fn list_files(root: &Path, exclude: &[Pattern]) -> io::Result<(Vec<PathBuf>, ScanReport)> {
    let mut report = ScanReport::default();

    let metadata = fs::metadata(root)?;
    if !metadata.is_dir() {
        let name = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if is_excluded(&name, exclude) {
            return Ok((Vec::new(), report));
        }
        return Ok((vec![fs::canonicalize(root)?], report));
    }

    let mut pending = VecDeque::from([root.to_path_buf()]);
    let mut candidates = Vec::new();

    while let Some(dir) = pending.pop_front() {
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(error) => {
                report.errors.push(ScanError { path: dir, error });
                continue;
            }
        };

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(error) => {
                    report.errors.push(ScanError {
                        path: dir.clone(),
                        error,
                    });
                    continue;
                }
            };

            report.entries_seen += 1;

            if is_excluded(&entry.file_name().to_string_lossy(), exclude) {
                continue;
            }

            let path = entry.path();
            // fs::metadata follows symlinks; a dangling link lands in
            // the error list instead of the file list.
            match fs::metadata(&path) {
                Ok(md) if md.is_dir() => pending.push_back(path),
                Ok(md) if md.is_file() => candidates.push(path),
                Ok(_) => {}
                Err(error) => report.errors.push(ScanError { path, error }),
            }
        }
    }

    let resolved: Vec<Result<PathBuf, ScanError>> = candidates
        .into_par_iter()
        .map(|path| {
            fs::canonicalize(&path).map_err(|error| ScanError { path, error })
        })
        .collect();

    let mut files = Vec::with_capacity(resolved.len());
    for item in resolved {
        match item {
            Ok(path) => files.push(path),
            Err(error) => report.errors.push(error),
        }
    }

    Ok((files, report))
}
