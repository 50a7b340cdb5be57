//! Stdout capture into per-job output files.
//!
//! Concurrent jobs may target the same resolved path (many generator runs
//! appending rows to one attribute table), so every write goes through a
//! per-path async mutex. The first touch of a path during a program run
//! truncates the file and, when the job declares a header command, writes
//! that command's stdout as the first line; later touches append.
//!
//! First-touch state is program-wide: it survives section barriers, so a
//! file headed in section one is appended to -- not re-truncated -- by
//! section two.

use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use sweeprun_types::job::StdoutSpec;

/// Per-path write serialization plus the headed-this-run marker.
#[derive(Default)]
struct FileState {
    initialized: bool,
}

/// Serializes writes to stdout-redirect targets and emits each file's header
/// exactly once per program run.
#[derive(Default)]
pub struct OutputWriter {
    files: Mutex<HashMap<PathBuf, Arc<Mutex<FileState>>>>,
}

impl OutputWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one job's captured stdout to its redirect target.
    ///
    /// Holds the path's lock for the whole header-plus-append sequence, so
    /// output from concurrent jobs never interleaves within a file and the
    /// header cannot be written twice.
    pub async fn append(&self, spec: &StdoutSpec, body: &[u8]) -> io::Result<()> {
        let state = {
            let mut files = self.files.lock().await;
            Arc::clone(files.entry(spec.path.clone()).or_default())
        };
        let mut state = state.lock().await;

        if !state.initialized {
            if let Some(parent) = spec.path.parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await?;
                }
            }
            let mut file = tokio::fs::File::create(&spec.path).await?;
            if let Some(header_command) = &spec.header_command {
                let header = run_header_command(header_command).await?;
                file.write_all(&header).await?;
                if !header.is_empty() && !header.ends_with(b"\n") {
                    file.write_all(b"\n").await?;
                }
            }
            file.write_all(body).await?;
            file.flush().await?;
            state.initialized = true;
            return Ok(());
        }

        let mut file = tokio::fs::OpenOptions::new()
            .append(true)
            .open(&spec.path)
            .await?;
        file.write_all(body).await?;
        file.flush().await?;
        Ok(())
    }

    /// Whether a path has been touched this run (test hook).
    #[cfg(test)]
    async fn touched(&self, path: &std::path::Path) -> bool {
        self.files.lock().await.contains_key(path)
    }
}

/// Run the header command and capture its stdout.
async fn run_header_command(command: &str) -> io::Result<Vec<u8>> {
    let output = tokio::process::Command::new("sh")
        .arg("-c")
        .arg(command)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .output()
        .await?;
    if !output.status.success() {
        return Err(io::Error::other(format!(
            "header command '{}' exited with {}",
            command, output.status
        )));
    }
    Ok(output.stdout)
}
