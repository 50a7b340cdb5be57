//! Job descriptors and run reports.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

// ---------------------------------------------------------------------------
// Descriptors
// ---------------------------------------------------------------------------

/// Stdout redirection target for a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StdoutSpec {
    /// File the job's captured stdout is appended to.
    pub path: PathBuf,
    /// Command whose stdout becomes the file's first line, run once per
    /// target file per program run.
    pub header_command: Option<String>,
}

/// A fully resolved, ready-to-run shell job.
///
/// All templates have been substituted; the descriptor is immutable and
/// consumed exactly once by the executor. Nothing is persisted beyond log
/// output and whatever files the command itself writes.
#[derive(Debug, Clone, Serialize)]
pub struct JobDescriptor {
    /// Resolved job name (for logs; duplicates across a run are fine).
    pub name: String,
    /// Resolved shell command, run via `sh -c`.
    pub command: String,
    /// Section label the job was registered under.
    pub section: String,
    /// Group label the job was registered under.
    pub group: String,
    /// If set and a file exists at this path at drain time, the job is
    /// skipped without invoking the command. Existence is the whole check:
    /// a stale file with the right name passes it.
    pub creates_file: Option<PathBuf>,
    /// Stdout redirection, if the job's output is being collected.
    pub stdout: Option<StdoutSpec>,
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Terminal state of a job after a drain.
///
/// A job passes through `Pending -> {Skipped | Running -> {Succeeded |
/// Failed}}`; only terminal states are reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobOutcome {
    /// The declared output file already existed; the command never ran.
    Skipped,
    /// The command exited with status zero.
    Succeeded,
    /// The command exited non-zero, could not be started, or its output
    /// could not be written.
    Failed { reason: String },
}

impl JobOutcome {
    /// Whether this outcome counts against the overall run status.
    pub fn is_failed(&self) -> bool {
        matches!(self, JobOutcome::Failed { .. })
    }
}

impl fmt::Display for JobOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobOutcome::Skipped => write!(f, "skipped"),
            JobOutcome::Succeeded => write!(f, "succeeded"),
            JobOutcome::Failed { reason } => write!(f, "failed: {}", reason),
        }
    }
}

/// Outcome of one descriptor, in enqueue order within the report.
#[derive(Debug, Clone, Serialize)]
pub struct JobResult {
    pub name: String,
    pub command: String,
    pub outcome: JobOutcome,
    /// Wall-clock duration of the invocation; zero for skipped jobs.
    pub duration_ms: u64,
}

// ---------------------------------------------------------------------------
// Run report
// ---------------------------------------------------------------------------

/// Aggregate result of one `run()` barrier.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    /// Descriptors drained, including skipped ones.
    pub total: usize,
    pub skipped: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Per-job outcomes in enqueue order.
    pub jobs: Vec<JobResult>,
}

impl RunReport {
    /// Whether any job in this drain ended `Failed`.
    pub fn any_failed(&self) -> bool {
        self.failed > 0
    }

    /// The failed jobs, for the "N of M failed, see list" summary.
    pub fn failures(&self) -> impl Iterator<Item = &JobResult> {
        self.jobs.iter().filter(|j| j.outcome.is_failed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(name: &str, outcome: JobOutcome) -> JobResult {
        JobResult {
            name: name.to_string(),
            command: format!("echo {name}"),
            outcome,
            duration_ms: 0,
        }
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(JobOutcome::Skipped.to_string(), "skipped");
        assert_eq!(JobOutcome::Succeeded.to_string(), "succeeded");
        let failed = JobOutcome::Failed {
            reason: "exited with status 2".to_string(),
        };
        assert_eq!(failed.to_string(), "failed: exited with status 2");
    }

    #[test]
    fn test_report_failures() {
        let report = RunReport {
            total: 3,
            skipped: 1,
            succeeded: 1,
            failed: 1,
            jobs: vec![
                result("a", JobOutcome::Skipped),
                result("b", JobOutcome::Succeeded),
                result(
                    "c",
                    JobOutcome::Failed {
                        reason: "exited with status 1".to_string(),
                    },
                ),
            ],
        };
        assert!(report.any_failed());
        let failures: Vec<_> = report.failures().map(|j| j.name.as_str()).collect();
        assert_eq!(failures, vec!["c"]);
    }

    #[test]
    fn test_empty_report_is_clean() {
        let report = RunReport::default();
        assert!(!report.any_failed());
        assert_eq!(report.total, 0);
    }
}
