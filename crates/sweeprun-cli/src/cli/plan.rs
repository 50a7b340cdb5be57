//! `sweeprun plan`: expand a manifest without executing anything.
//!
//! Useful before a long sweep: shows every concrete command the manifest
//! expands to and which jobs the existence check would skip right now.

use std::path::Path;

use anyhow::Context;
use serde::Serialize;

use sweeprun_core::{JobSpec, Runner};
use sweeprun_types::manifest::Manifest;

/// One expanded job, annotated with what a drain would do with it today.
#[derive(Debug, Serialize)]
pub struct PlannedJob {
    pub section: String,
    pub group: String,
    pub name: String,
    pub command: String,
    /// True when the declared output file already exists.
    pub would_skip: bool,
}

/// Expand every section of the manifest into planned jobs.
pub fn collect(manifest: &Manifest) -> anyhow::Result<Vec<PlannedJob>> {
    // Parallelism is irrelevant here; nothing executes.
    let mut runner = Runner::new(1);
    let mut planned = Vec::new();

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
        for descriptor in runner.take_pending() {
            let would_skip = descriptor
                .creates_file
                .as_deref()
                .is_some_and(|p| p.exists());
            planned.push(PlannedJob {
                section: descriptor.section,
                group: descriptor.group,
                name: descriptor.name,
                command: descriptor.command,
                would_skip,
            });
        }
    }

    Ok(planned)
}

/// Load, expand, and print the plan.
pub fn plan_manifest(path: &Path, json: bool) -> anyhow::Result<()> {
    let manifest =
        Manifest::load(path).with_context(|| format!("loading manifest {}", path.display()))?;
    let planned = collect(&manifest)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&planned)?);
        return Ok(());
    }

    let mut current_section = None;
    for job in &planned {
        if current_section != Some(&job.section) {
            println!("{}", job.section);
            current_section = Some(&job.section);
        }
        let mark = if job.would_skip { "skip" } else { "run " };
        println!("  [{}] {} :: {}", mark, job.name, job.command);
    }
    println!(
        "{} jobs, {} would be skipped",
        planned.len(),
        planned.iter().filter(|j| j.would_skip).count()
    );

    Ok(())
}
