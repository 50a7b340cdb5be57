use thiserror::Error;

/// Errors raised while a sweep is being configured.
///
/// Everything in this enum is fatal and synchronous: it surfaces from the
/// registration or manifest-loading call, before any job has been started.
/// Failures of the jobs themselves are not errors -- they are recorded as
/// [`JobOutcome::Failed`](crate::job::JobOutcome::Failed) in the run report.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A `[[name]]` reference that no parameter in the binding resolves.
    #[error("unresolved placeholder(s) {names} in '{template}'")]
    UnknownPlaceholder { template: String, names: String },

    /// Substitution kept introducing new placeholders without converging.
    #[error(
        "placeholder resolution of '{template}' did not converge after {passes} passes \
         (cyclic parameter reference?)"
    )]
    CyclicPlaceholder { template: String, passes: usize },

    /// A derivation asked for a parameter that is not resolved at that point
    /// in the binding -- either unknown, or a derived parameter declared later.
    #[error("parameter '{0}' is not resolved at this point in the binding")]
    MissingParameter(String),

    /// The same parameter name was declared twice in one spec.
    #[error("duplicate parameter '{0}'")]
    DuplicateParameter(String),

    /// A value in a scalar position was not a string, number, or boolean.
    #[error("parameter '{name}' has a non-scalar value: {value}")]
    MalformedValue { name: String, value: String },

    /// The TOML manifest failed to parse or violated a structural constraint.
    #[error("manifest error: {0}")]
    Manifest(String),

    /// Filesystem failure while loading configuration.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_placeholder_display() {
        let err = ConfigError::UnknownPlaceholder {
            template: "echo [[x]]".to_string(),
            names: "x".to_string(),
        };
        assert_eq!(err.to_string(), "unresolved placeholder(s) x in 'echo [[x]]'");
    }

    #[test]
    fn test_missing_parameter_display() {
        let err = ConfigError::MissingParameter("bucket".to_string());
        assert!(err.to_string().contains("'bucket'"));
    }
}
