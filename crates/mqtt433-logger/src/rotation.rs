//! Numbered backups of log files.
//!
//! Generation 0 is the live file, generation `i` is `<path>.<i>`. Rotating
//! copies every generation one step outward, highest first, so the live file
//! ends up in `.1` and the oldest backup in `.<max_files>`. Copies that fail,
//! usually because a generation does not exist yet, are skipped.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

/// Default number of backups kept per file.
pub const MAX_FILES: usize = 8;

/// Outcome of one rotation, by source generation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RotationReport {
    /// Generations copied outward, in copy order.
    pub copied: Vec<usize>,
    /// Generations that could not be copied.
    pub skipped: Vec<usize>,
    /// Whether the live file was removed afterwards.
    pub reset: bool,
}

/// Rotates numbered backups of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogRotator {
    max_files: usize,
}

impl Default for LogRotator {
    fn default() -> Self {
        Self::new(MAX_FILES)
    }
}

impl LogRotator {
    pub fn new(max_files: usize) -> Self {
        Self { max_files }
    }

    pub fn max_files(&self) -> usize {
        self.max_files
    }

    /// Copy generation `i` to `i + 1` for `i` from `max_files - 1` down to 0.
    pub fn rotate(&self, path: &Path) -> RotationReport {
        let mut report = RotationReport::default();

        for generation in (0..self.max_files).rev() {
            let source = generation_path(path, generation);
            let target = generation_path(path, generation + 1);
            match fs::copy(&source, &target) {
                Ok(_) => {
                    debug!("Copied {} to {}", source.display(), target.display());
                    report.copied.push(generation);
                }
                Err(e) => {
                    if e.kind() != io::ErrorKind::NotFound {
                        warn!("Cannot copy {}: {}", source.display(), e);
                    }
                    report.skipped.push(generation);
                }
            }
        }
        report
    }

    /// Rotate an existing file, then remove it so the next run starts empty.
    /// A missing file is left alone.
    pub fn rotate_and_reset(&self, path: &Path) -> RotationReport {
        if !path.exists() {
            return RotationReport::default();
        }

        let mut report = self.rotate(path);
        match fs::remove_file(path) {
            Ok(()) => report.reset = true,
            Err(e) => warn!("Cannot remove {}: {}", path.display(), e),
        }
        report
    }
}

/// Path of backup generation `generation`; 0 is the file itself.
pub fn generation_path(path: &Path, generation: usize) -> PathBuf {
    if generation == 0 {
        return path.to_path_buf();
    }
    let mut name = path.as_os_str().to_os_string();
    name.push(format!(".{}", generation));
    PathBuf::from(name)
}
