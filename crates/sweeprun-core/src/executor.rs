//! The drain barrier: skip checks, the fixed worker pool, and per-job
//! process invocation.
//!
//! Each descriptor moves `Pending -> {Skipped | Running -> {Succeeded |
//! Failed}}`. The skip check (declared output file exists) runs once per
//! job, sequentially, before any worker starts. Workers then pull runnable
//! jobs from a shared deque in enqueue order; completion order across
//! workers carries no guarantee. A failed job never cancels its siblings,
//! and no per-job timeout is imposed -- a hung command occupies one worker
//! slot until it exits.

use std::collections::VecDeque;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Mutex;
use tokio::task::JoinSet;

use sweeprun_types::job::{JobDescriptor, JobOutcome, JobResult, RunReport};

use crate::output::OutputWriter;

/// Drain one section's queue to completion.
///
/// Blocks until every job reaches a terminal state, then reports the
/// aggregate. Execution failures are data in the report, never an `Err`.
pub async fn drain(
    jobs: Vec<JobDescriptor>,
    parallelism: usize,
    writer: Arc<OutputWriter>,
) -> RunReport {
    let total = jobs.len();
    let mut slots: Vec<Option<JobResult>> = Vec::with_capacity(total);
    slots.resize_with(total, || None);

    // Phase 1: memoization check, in enqueue order, before anything runs.
    let mut runnable: VecDeque<(usize, JobDescriptor)> = VecDeque::new();
    for (idx, job) in jobs.into_iter().enumerate() {
        if let Some(path) = &job.creates_file {
            if path.exists() {
                tracing::info!(job = %job.name, path = %path.display(), "output exists, skipping");
                slots[idx] = Some(JobResult {
                    name: job.name,
                    command: job.command,
                    outcome: JobOutcome::Skipped,
                    duration_ms: 0,
                });
                continue;
            }
        }
        runnable.push_back((idx, job));
    }

    // Phase 2: fixed pool of workers pulling from the shared deque.
    let queue = Arc::new(Mutex::new(runnable));
    let workers = parallelism.max(1).min(queue.lock().await.len().max(1));
    let mut pool = JoinSet::new();
    for _ in 0..workers {
        let queue = Arc::clone(&queue);
        let writer = Arc::clone(&writer);
        pool.spawn(async move {
            let mut results = Vec::new();
            loop {
                let next = queue.lock().await.pop_front();
                let Some((idx, job)) = next else {
                    break;
                };
                results.push((idx, run_job(&job, &writer).await));
            }
            results
        });
    }
    while let Some(joined) = pool.join_next().await {
        match joined {
            Ok(results) => {
                for (idx, result) in results {
                    slots[idx] = Some(result);
                }
            }
            Err(e) => {
                // A worker panic would lose its results; surface it loudly
                // rather than under-reporting the drain.
                tracing::error!(error = %e, "worker task failed");
            }
        }
    }

    let mut report = RunReport {
        total,
        ..RunReport::default()
    };
    for slot in slots {
        let Some(result) = slot else { continue };
        match &result.outcome {
            JobOutcome::Skipped => report.skipped += 1,
            JobOutcome::Succeeded => report.succeeded += 1,
            JobOutcome::Failed { .. } => report.failed += 1,
        }
        report.jobs.push(result);
    }

    if report.failed > 0 {
        tracing::warn!(
            failed = report.failed,
            total = report.total,
            "drain finished with failures"
        );
        for job in report.failures() {
            tracing::warn!(job = %job.name, command = %job.command, outcome = %job.outcome, "job failed");
        }
    } else {
        tracing::info!(
            total = report.total,
            skipped = report.skipped,
            succeeded = report.succeeded,
            "drain complete"
        );
    }

    report
}

/// Run one job to a terminal state.
async fn run_job(job: &JobDescriptor, writer: &OutputWriter) -> JobResult {
    tracing::debug!(job = %job.name, command = %job.command, "starting job");
    let start = Instant::now();
    let outcome = invoke(job, writer).await;
    let duration_ms = start.elapsed().as_millis() as u64;
    tracing::debug!(job = %job.name, outcome = %outcome, duration_ms, "job finished");

    JobResult {
        name: job.name.clone(),
        command: job.command.clone(),
        outcome,
        duration_ms,
    }
}

/// Invoke the job's command and, on success, hand its captured stdout to the
/// output writer.
async fn invoke(job: &JobDescriptor, writer: &OutputWriter) -> JobOutcome {
    let mut command = tokio::process::Command::new("sh");
    command
        .arg("-c")
        .arg(&job.command)
        .stdin(Stdio::null())
        .stderr(Stdio::inherit());
    // Capture stdout only when it is being collected; otherwise let it flow
    // through to the parent's.
    if job.stdout.is_some() {
        command.stdout(Stdio::piped());
    } else {
        command.stdout(Stdio::inherit());
    }

    let child = match command.spawn() {
        Ok(child) => child,
        Err(e) => {
            return JobOutcome::Failed {
                reason: format!("failed to start: {e}"),
            };
        }
    };

    let output = match child.wait_with_output().await {
        Ok(output) => output,
        Err(e) => {
            return JobOutcome::Failed {
                reason: format!("failed to wait for process: {e}"),
            };
        }
    };

    if !output.status.success() {
        return JobOutcome::Failed {
            reason: match output.status.code() {
                Some(code) => format!("exited with status {code}"),
                None => "terminated by signal".to_string(),
            },
        };
    }

    if let Some(spec) = &job.stdout {
        if let Err(e) = writer.append(spec, &output.stdout).await {
            return JobOutcome::Failed {
                reason: format!("writing {}: {e}", spec.path.display()),
            };
        }
    }

    JobOutcome::Succeeded
}

#[cfg(test)]
mod tests {
    use super::*;
    use sweeprun_types::job::StdoutSpec;

    fn job(name: &str, command: &str) -> JobDescriptor {
        JobDescriptor {
            name: name.to_string(),
            command: command.to_string(),
            section: "test".to_string(),
            group: "test".to_string(),
            creates_file: None,
            stdout: None,
        }
    }

    #[tokio::test]
    async fn echo_jobs_succeed() {
        let jobs = vec![job("a", "true"), job("b", "echo hello")];
        let report = drain(jobs, 2, Arc::new(OutputWriter::new())).await;
        assert_eq!(report.total, 2);
        assert_eq!(report.succeeded, 2);
        assert!(!report.any_failed());
    }

    #[tokio::test]
    async fn failure_does_not_stop_siblings() {
        let dir = tempfile::tempdir().unwrap();
        let after = dir.path().join("after");
        let jobs = vec![
            job("ok-before", "true"),
            job("bad", "exit 2"),
            job("ok-after", &format!("touch {}", after.display())),
        ];
        let report = drain(jobs, 1, Arc::new(OutputWriter::new())).await;

        assert_eq!(report.failed, 1);
        assert_eq!(report.succeeded, 2);
        assert!(report.any_failed());
        assert!(after.exists(), "later jobs must still run");

        let failure = report.failures().next().unwrap();
        assert_eq!(failure.name, "bad");
        assert_eq!(
            failure.outcome,
            JobOutcome::Failed {
                reason: "exited with status 2".to_string()
            }
        );
    }

    #[tokio::test]
    async fn existing_output_skips_without_invoking() {
        let dir = tempfile::tempdir().unwrap();
        let existing = dir.path().join("graphs/g1");
        std::fs::create_dir_all(existing.parent().unwrap()).unwrap();
        std::fs::write(&existing, "").unwrap();

        // The command would drop a marker; its absence proves the command
        // never ran.
        let marker = dir.path().join("invoked");
        let mut skip_job = job("cached", &format!("touch {}", marker.display()));
        skip_job.creates_file = Some(existing.clone());

        let mut fresh_job = job("fresh", "true");
        fresh_job.creates_file = Some(dir.path().join("graphs/g2"));

        let report = drain(vec![skip_job, fresh_job], 2, Arc::new(OutputWriter::new())).await;
        assert_eq!(report.skipped, 1);
        assert_eq!(report.succeeded, 1);
        assert!(!marker.exists(), "skipped job must never be invoked");
        assert_eq!(report.jobs[0].outcome, JobOutcome::Skipped);
    }

    #[tokio::test]
    async fn stdout_capture_appends_to_target() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out/stats.csv");
        let spec = StdoutSpec {
            path: target.clone(),
            header_command: Some("echo nodes,edges".to_string()),
        };

        let mut a = job("a", "echo 1,2");
        a.stdout = Some(spec.clone());
        let mut b = job("b", "echo 3,4");
        b.stdout = Some(spec);

        let report = drain(vec![a, b], 2, Arc::new(OutputWriter::new())).await;
        assert_eq!(report.succeeded, 2);

        let content = std::fs::read_to_string(&target).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "nodes,edges", "header must be first, exactly once");
        assert!(lines.contains(&"1,2"));
        assert!(lines.contains(&"3,4"));
    }

    #[tokio::test]
    async fn failed_job_stdout_is_not_appended() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("partial.csv");
        let spec = StdoutSpec {
            path: target.clone(),
            header_command: None,
        };

        let mut ok = job("ok", "echo good");
        ok.stdout = Some(spec.clone());
        let mut bad = job("bad", "echo partial; exit 1");
        bad.stdout = Some(spec);

        let report = drain(vec![ok, bad], 1, Arc::new(OutputWriter::new())).await;
        assert_eq!(report.failed, 1);

        let content = std::fs::read_to_string(&target).unwrap();
        assert_eq!(content, "good\n");
    }

    #[tokio::test]
    async fn missing_executable_is_a_failure_not_a_panic() {
        let report = drain(
            vec![job("ghost", "/definitely/not/a/real/binary-xyz")],
            1,
            Arc::new(OutputWriter::new()),
        )
        .await;
        assert_eq!(report.failed, 1);
        let failure = report.failures().next().unwrap();
        assert!(matches!(failure.outcome, JobOutcome::Failed { .. }));
    }

    #[tokio::test]
    async fn bounded_pool_completes_more_jobs_than_workers() {
        let jobs: Vec<_> = (0..12).map(|i| job(&format!("j{i}"), "true")).collect();
        let report = drain(jobs, 3, Arc::new(OutputWriter::new())).await;
        assert_eq!(report.total, 12);
        assert_eq!(report.succeeded, 12);
        // Results stay in enqueue order regardless of completion order.
        let names: Vec<_> = report.jobs.iter().map(|j| j.name.as_str()).collect();
        assert_eq!(names, (0..12).map(|i| format!("j{i}")).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn empty_drain_is_clean() {
        let report = drain(Vec::new(), 4, Arc::new(OutputWriter::new())).await;
        assert_eq!(report.total, 0);
        assert!(!report.any_failed());
    }
}
