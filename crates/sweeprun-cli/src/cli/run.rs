//! `sweeprun run`: execute a manifest section by section.

use std::path::Path;

use anyhow::Context;
use serde::Serialize;

use sweeprun_core::{JobSpec, Runner};
use sweeprun_types::job::RunReport;
use sweeprun_types::manifest::Manifest;

/// What `run` hands back to `main` for the exit status.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub skipped: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub any_failed: bool,
    /// Per-section reports in execution order.
    pub sections: Vec<SectionReport>,
}

#[derive(Debug, Serialize)]
pub struct SectionReport {
    pub label: String,
    #[serde(flatten)]
    pub report: RunReport,
}

/// Execute every section of the manifest, one drain barrier per section.
pub async fn run_manifest(
    path: &Path,
    cores_override: Option<usize>,
    json: bool,
) -> anyhow::Result<RunSummary> {
    let manifest = Manifest::load(path)
        .with_context(|| format!("loading manifest {}", path.display()))?;
    let cores = cores_override.unwrap_or(manifest.cores);

    let mut runner = Runner::new(cores);
    let mut sections = Vec::with_capacity(manifest.sections.len());

    for section in &manifest.sections {
        runner.section(&section.label);
        for group in &section.groups {
            runner.group(&group.label);
            for job in &group.jobs {
                let spec = JobSpec::from_manifest(job)
                    .with_context(|| format!("job '{}' in group '{}'", job.name, group.label))?;
                runner
                    .add(spec)
                    .with_context(|| format!("job '{}' in group '{}'", job.name, group.label))?;
            }
        }

        // The barrier: section N+1's skip checks see the files section N
        // just produced.
        let report = runner.run().await;
        if !json {
            println!(
                "{}: {} jobs, {} skipped, {} succeeded, {} failed",
                section.label, report.total, report.skipped, report.succeeded, report.failed
            );
            for failure in report.failures() {
                println!("  failed: {} ({})", failure.name, failure.command);
            }
        }
        sections.push(SectionReport {
            label: section.label.clone(),
            report,
        });
    }

    let summary = RunSummary {
        total: sections.iter().map(|s| s.report.total).sum(),
        skipped: sections.iter().map(|s| s.report.skipped).sum(),
        succeeded: sections.iter().map(|s| s.report.succeeded).sum(),
        failed: sections.iter().map(|s| s.report.failed).sum(),
        any_failed: runner.any_failed(),
        sections,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }

    Ok(summary)
}
