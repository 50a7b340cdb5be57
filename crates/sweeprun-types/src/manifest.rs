//! Declarative experiment manifests.
//!
//! A manifest is the TOML form of a sweep: ordered sections containing
//! ordered groups containing parameterized job templates. Parsing runs
//! structural validation, so a loaded manifest is guaranteed well-formed;
//! template resolution and grid expansion happen later, at registration.
//!
//! ```toml
//! cores = 3
//!
//! [[section]]
//! label = "[1/2] generate"
//!
//! [[section.group]]
//! label = "generate"
//!
//! [[section.group.job]]
//! name = "girg"
//! command = "bin/girg -n [[n]] --seed [[seed]] [[file]]"
//! stdout_file = "out/attributes/[[name]].csv"
//!
//! [section.group.job.params]
//! n = [12500, 25000]
//! seed = [64, 321]
//! name = "girg_n=[[n]]_seed=[[seed]]"
//! file = "graphs/[[name]]"
//! ```
//!
//! Parameter table values: a scalar becomes a fixed parameter, an array
//! becomes a cartesian axis. Derivation closures and combination filters
//! cannot be written in TOML; they exist only on the library API.

use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Manifest types
// ---------------------------------------------------------------------------

/// A whole experiment: worker-pool size plus ordered sections.
#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    /// Worker-pool size, fixed for the whole run.
    #[serde(default = "default_cores")]
    pub cores: usize,
    /// Sections in execution order; each is one `run()` barrier.
    #[serde(default, rename = "section")]
    pub sections: Vec<SectionManifest>,
}

fn default_cores() -> usize {
    1
}

/// One ordered phase; all of its jobs drain before the next section starts.
#[derive(Debug, Clone, Deserialize)]
pub struct SectionManifest {
    pub label: String,
    #[serde(default, rename = "group")]
    pub groups: Vec<GroupManifest>,
}

/// A named sub-phase; groups order enqueue position within their section.
#[derive(Debug, Clone, Deserialize)]
pub struct GroupManifest {
    pub label: String,
    #[serde(default, rename = "job")]
    pub jobs: Vec<JobManifest>,
}

/// One job registration: templates plus the parameter table.
#[derive(Debug, Clone, Deserialize)]
pub struct JobManifest {
    /// Name template (may reference parameters).
    pub name: String,
    /// Shell command template.
    pub command: String,
    /// Parameter table in declaration order: scalars are fixed values,
    /// arrays are cartesian axes. Values may themselves be template strings.
    #[serde(default)]
    pub params: toml::Table,
    /// Skip the job when a file exists at this (template) path.
    #[serde(default)]
    pub creates_file: Option<String>,
    /// Append the job's stdout to this (template) path.
    #[serde(default)]
    pub stdout_file: Option<String>,
    /// Command whose stdout becomes the stdout file's header line.
    #[serde(default)]
    pub header_command: Option<String>,
}

// ---------------------------------------------------------------------------
// Parsing and validation
// ---------------------------------------------------------------------------

impl Manifest {
    /// Parse a manifest from TOML text and validate it structurally.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let manifest: Manifest =
            toml::from_str(text).map_err(|e| ConfigError::Manifest(e.to_string()))?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Load and validate a manifest file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Structural constraints:
    /// - `cores` >= 1
    /// - section and group labels are non-empty
    /// - every job has a non-empty name and command
    /// - `header_command` only appears together with `stdout_file`
    fn validate(&self) -> Result<(), ConfigError> {
        if self.cores < 1 {
            return Err(ConfigError::Manifest("cores must be >= 1".to_string()));
        }
        for section in &self.sections {
            if section.label.is_empty() {
                return Err(ConfigError::Manifest(
                    "section label must not be empty".to_string(),
                ));
            }
            for group in &section.groups {
                if group.label.is_empty() {
                    return Err(ConfigError::Manifest(format!(
                        "section '{}' has a group with an empty label",
                        section.label
                    )));
                }
                for job in &group.jobs {
                    if job.name.is_empty() || job.command.is_empty() {
                        return Err(ConfigError::Manifest(format!(
                            "group '{}' has a job with an empty name or command",
                            group.label
                        )));
                    }
                    if job.header_command.is_some() && job.stdout_file.is_none() {
                        return Err(ConfigError::Manifest(format!(
                            "job '{}' sets header_command without stdout_file",
                            job.name
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
cores = 3

[[section]]
label = "[1/2] generate"

[[section.group]]
label = "generate"

[[section.group.job]]
name = "girg"
command = "bin/girg -n [[n]] --seed [[seed]] [[file]]"
stdout_file = "out/girg_attributes/[[name]].csv"

[section.group.job.params]
n = [12500, 25000]
seed = [64, 321]
name = "girg_n=[[n]]_seed=[[seed]]"
file = "graphs/[[name]]"

[[section]]
label = "[2/2] stats"

[[section.group]]
label = "stats"

[[section.group.job]]
name = "basic_stats"
command = "bin/stats graphs/[[graph]] --no-header"
stdout_file = "out/stats/[[graph]].csv"
header_command = "bin/stats --only-header"

[section.group.job.params]
graph = ["a", "b"]
"#;

    #[test]
    fn test_parse_sample() {
        let m = Manifest::from_toml_str(SAMPLE).expect("should parse");
        assert_eq!(m.cores, 3);
        assert_eq!(m.sections.len(), 2);
        assert_eq!(m.sections[0].groups[0].jobs.len(), 1);

        let job = &m.sections[0].groups[0].jobs[0];
        assert_eq!(job.name, "girg");
        assert!(job.stdout_file.is_some());
        assert!(job.creates_file.is_none());

        // Parameter declaration order survives parsing; the grid expander
        // depends on it.
        let keys: Vec<_> = job.params.keys().cloned().collect();
        assert_eq!(keys, vec!["n", "seed", "name", "file"]);
    }

    #[test]
    fn test_cores_defaults_to_one() {
        let m = Manifest::from_toml_str("").expect("empty manifest is valid");
        assert_eq!(m.cores, 1);
        assert!(m.sections.is_empty());
    }

    #[test]
    fn test_rejects_zero_cores() {
        let err = Manifest::from_toml_str("cores = 0").unwrap_err();
        assert!(err.to_string().contains("cores"));
    }

    #[test]
    fn test_rejects_header_without_stdout_file() {
        let text = r#"
[[section]]
label = "s"

[[section.group]]
label = "g"

[[section.group.job]]
name = "j"
command = "true"
header_command = "echo header"
"#;
        let err = Manifest::from_toml_str(text).unwrap_err();
        assert!(err.to_string().contains("header_command"));
    }

    #[test]
    fn test_rejects_empty_command() {
        let text = r#"
[[section]]
label = "s"

[[section.group]]
label = "g"

[[section.group.job]]
name = "j"
command = ""
"#;
        let err = Manifest::from_toml_str(text).unwrap_err();
        assert!(err.to_string().contains("empty name or command"));
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let err = Manifest::load(Path::new("/nonexistent/sweep.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
