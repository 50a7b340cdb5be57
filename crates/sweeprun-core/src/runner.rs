//! The coordinator: registration, sections, groups, and the drain barrier.
//!
//! A [`Runner`] owns the pending-job queue explicitly -- registration and
//! drains go through the one value, there is no module-wide state. Grid
//! expansion and template resolution happen inside [`Runner::add`], so every
//! configuration error surfaces synchronously from the registration call,
//! before anything executes.

use std::path::PathBuf;
use std::sync::Arc;

use sweeprun_types::binding::Binding;
use sweeprun_types::error::ConfigError;
use sweeprun_types::job::{JobDescriptor, RunReport, StdoutSpec};
use sweeprun_types::manifest::JobManifest;

use crate::executor;
use crate::grid;
use crate::output::OutputWriter;
use crate::param::{CombinationFilter, ParameterSpec};
use crate::resolver;

// ---------------------------------------------------------------------------
// JobSpec
// ---------------------------------------------------------------------------

/// Everything one registration carries: templates, parameter axes, and
/// output directives.
pub struct JobSpec {
    name: String,
    command: String,
    params: ParameterSpec,
    creates_file: Option<String>,
    stdout_file: Option<String>,
    header_command: Option<String>,
    filter: Option<CombinationFilter>,
}

impl JobSpec {
    /// A registration with a name template and a shell-command template.
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            params: ParameterSpec::new(),
            creates_file: None,
            stdout_file: None,
            header_command: None,
            filter: None,
        }
    }

    /// Attach the parameter axes.
    pub fn params(mut self, params: ParameterSpec) -> Self {
        self.params = params;
        self
    }

    /// Skip each expanded job when a file already exists at this (template)
    /// path. Existence is the whole check -- no content or parameter hash --
    /// so stale output with the right name counts as done.
    pub fn creates_file(mut self, path: impl Into<String>) -> Self {
        self.creates_file = Some(path.into());
        self
    }

    /// Append each job's captured stdout to this (template) path.
    pub fn stdout_file(mut self, path: impl Into<String>) -> Self {
        self.stdout_file = Some(path.into());
        self
    }

    /// Command whose stdout becomes the stdout file's first line, run once
    /// per target file per program run.
    pub fn header_command(mut self, command: impl Into<String>) -> Self {
        self.header_command = Some(command.into());
        self
    }

    /// Keep only bindings the predicate accepts. The predicate sees the
    /// fully resolved binding, derived values included.
    pub fn combinations_filter<F>(mut self, f: F) -> Self
    where
        F: Fn(&Binding) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(f));
        self
    }

    /// Build a registration from a manifest entry. Closures cannot be
    /// expressed in TOML, so manifest jobs carry no derivations or filters.
    pub fn from_manifest(job: &JobManifest) -> Result<Self, ConfigError> {
        let mut spec = JobSpec::new(&job.name, &job.command)
            .params(ParameterSpec::from_toml_table(&job.params)?);
        if let Some(path) = &job.creates_file {
            spec = spec.creates_file(path);
        }
        if let Some(path) = &job.stdout_file {
            spec = spec.stdout_file(path);
        }
        if let Some(command) = &job.header_command {
            spec = spec.header_command(command);
        }
        Ok(spec)
    }
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

/// The sweep coordinator.
///
/// Worker-pool size is fixed at construction and honored by every drain.
/// Typical shape, mirroring how an experiment script drives it:
///
/// ```no_run
/// # use sweeprun_core::{Runner, JobSpec, ParameterSpec};
/// # async fn demo() -> Result<(), sweeprun_types::error::ConfigError> {
/// let mut runner = Runner::new(3);
/// runner.section("[1/2] generate");
/// runner.group("generate");
/// runner.add(
///     JobSpec::new("girg", "bin/girg -n [[n]] --seed [[seed]] [[file]]")
///         .params(
///             ParameterSpec::new()
///                 .one_of("n", [12500, 25000])
///                 .one_of("seed", [64, 321])
///                 .fixed("name", "girg_n=[[n]]_seed=[[seed]]")
///                 .fixed("file", "graphs/[[name]]"),
///         )
///         .creates_file("graphs/[[name]]"),
/// )?;
/// let _report = runner.run().await;
/// # Ok(())
/// # }
/// ```
pub struct Runner {
    parallelism: usize,
    section: String,
    group: String,
    pending: Vec<JobDescriptor>,
    writer: Arc<OutputWriter>,
    any_failed: bool,
}

impl Runner {
    /// A runner with a fixed worker-pool size (clamped to at least 1).
    pub fn new(parallelism: usize) -> Self {
        Self {
            parallelism: parallelism.max(1),
            section: String::new(),
            group: String::new(),
            pending: Vec::new(),
            writer: Arc::new(OutputWriter::new()),
            any_failed: false,
        }
    }

    /// Start a new ordered phase. Jobs registered afterwards belong to it;
    /// the caller drains each section with [`Runner::run`] before starting
    /// the next, which is what gives sections their strict ordering.
    pub fn section(&mut self, label: &str) {
        tracing::info!(section = label, "section");
        self.section = label.to_string();
        self.group.clear();
    }

    /// Start a new named sub-phase within the current section. Groups only
    /// order enqueue position -- their jobs share one queue and may
    /// interleave during execution.
    pub fn group(&mut self, label: &str) {
        tracing::debug!(group = label, "group");
        self.group = label.to_string();
    }

    /// Register one parameterized job template.
    ///
    /// Expands the grid and resolves every template immediately; the
    /// descriptors join the queue in binding-emission order. Returns how
    /// many jobs were queued (zero is fine: an empty axis or an all-reject
    /// filter is not an error).
    pub fn add(&mut self, spec: JobSpec) -> Result<usize, ConfigError> {
        let bindings = grid::expand(&spec.params, spec.filter.as_ref())?;
        let mut queued = 0;
        for binding in &bindings {
            let descriptor = self.build_descriptor(&spec, binding)?;
            tracing::debug!(job = %descriptor.name, binding = %binding, "queued");
            self.pending.push(descriptor);
            queued += 1;
        }
        Ok(queued)
    }

    fn build_descriptor(
        &self,
        spec: &JobSpec,
        binding: &Binding,
    ) -> Result<JobDescriptor, ConfigError> {
        let name = resolver::resolve(&spec.name, binding)?;
        let command = resolver::resolve(&spec.command, binding)?;
        let creates_file = spec
            .creates_file
            .as_deref()
            .map(|t| resolver::resolve(t, binding).map(PathBuf::from))
            .transpose()?;
        let stdout = spec
            .stdout_file
            .as_deref()
            .map(|t| -> Result<StdoutSpec, ConfigError> {
                Ok(StdoutSpec {
                    path: PathBuf::from(resolver::resolve(t, binding)?),
                    // The header command may reference parameters too.
                    header_command: spec
                        .header_command
                        .as_deref()
                        .map(|h| resolver::resolve(h, binding))
                        .transpose()?,
                })
            })
            .transpose()?;

        Ok(JobDescriptor {
            name,
            command,
            section: self.section.clone(),
            group: self.group.clone(),
            creates_file,
            stdout,
        })
    }

    /// Jobs queued since the last drain, in enqueue order.
    pub fn pending(&self) -> &[JobDescriptor] {
        &self.pending
    }

    /// Take the queued jobs without executing them (dry-run support). The
    /// queue is left empty, exactly as a drain leaves it.
    pub fn take_pending(&mut self) -> Vec<JobDescriptor> {
        std::mem::take(&mut self.pending)
    }

    /// Drain every queued job to a terminal state, then clear the queue.
    ///
    /// This is the synchronization barrier between sections: it returns only
    /// once all queued jobs are terminal, so jobs registered afterwards see
    /// the filesystem state this drain produced.
    pub async fn run(&mut self) -> RunReport {
        let jobs = self.take_pending();
        let report = executor::drain(jobs, self.parallelism, Arc::clone(&self.writer)).await;
        if report.any_failed() {
            self.any_failed = true;
        }
        report
    }

    /// Whether any job across all drains so far ended `Failed`. Drives the
    /// process exit status.
    pub fn any_failed(&self) -> bool {
        self.any_failed
    }
}
