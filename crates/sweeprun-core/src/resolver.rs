//! Placeholder resolution: `[[name]]` substitution against a binding.
//!
//! Substitution repeats in passes because a bound value may itself contain
//! placeholder patterns -- a `name` parameter assembled from other parameters
//! and then referenced by a `file` parameter is the common case. Iteration is
//! bounded; non-convergence is a fatal configuration error, never a silently
//! malformed command. Substitution is purely textual: no shell quoting is
//! applied, parameter values are assumed shell-safe by construction.

use sweeprun_types::binding::{Binding, scalar_to_string};
use sweeprun_types::error::ConfigError;

const OPEN: &str = "[[";
const CLOSE: &str = "]]";

/// Substitution passes before a still-unresolved template is declared cyclic.
/// Real sweeps nest two or three levels deep; ten is comfortably past any
/// legitimate configuration.
const MAX_PASSES: usize = 10;

/// Resolve every `[[name]]` occurrence in `template` against `binding`,
/// iterating to a fixed point.
///
/// Returns the input unchanged (idempotently) when it contains no
/// placeholder. Fails with [`ConfigError::UnknownPlaceholder`] when a
/// referenced name is not in the binding, and with
/// [`ConfigError::CyclicPlaceholder`] when substitution keeps producing new
/// placeholders past the pass bound.
pub fn resolve(template: &str, binding: &Binding) -> Result<String, ConfigError> {
    let mut current = template.to_string();

    for _ in 0..MAX_PASSES {
        let names = placeholder_names(&current);
        if names.is_empty() {
            return Ok(current);
        }

        let unknown: Vec<&str> = names
            .iter()
            .copied()
            .filter(|n| binding.get(n).is_none())
            .collect();
        if !unknown.is_empty() {
            return Err(ConfigError::UnknownPlaceholder {
                template: template.to_string(),
                names: unknown.join(", "),
            });
        }

        current = substitute_pass(&current, binding);
    }

    if placeholder_names(&current).is_empty() {
        Ok(current)
    } else {
        Err(ConfigError::CyclicPlaceholder {
            template: template.to_string(),
            passes: MAX_PASSES,
        })
    }
}

/// The distinct placeholder names present in `text`, in first-seen order.
///
/// An opening delimiter without a matching close is literal text, not a
/// placeholder.
fn placeholder_names(text: &str) -> Vec<&str> {
    let mut names = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find(OPEN) {
        let after = &rest[start + OPEN.len()..];
        let Some(end) = after.find(CLOSE) else {
            break;
        };
        let name = &after[..end];
        if !names.contains(&name) {
            names.push(name);
        }
        rest = &after[end + CLOSE.len()..];
    }
    names
}

/// One substitution pass: splice every placeholder's bound value in place.
/// Spliced values are not rescanned within the pass, so each pass peels
/// exactly one level of nesting.
fn substitute_pass(text: &str, binding: &Binding) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find(OPEN) {
        let after = &rest[start + OPEN.len()..];
        let Some(end) = after.find(CLOSE) else {
            break;
        };
        out.push_str(&rest[..start]);
        let name = &after[..end];
        match binding.get(name) {
            Some(value) => out.push_str(&scalar_to_string(value)),
            // Unknown names were rejected before the pass; keep the literal
            // to stay total.
            None => {
                out.push_str(OPEN);
                out.push_str(name);
                out.push_str(CLOSE);
            }
        }
        rest = &after[end + CLOSE.len()..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn binding(pairs: &[(&str, serde_json::Value)]) -> Binding {
        let mut b = Binding::new();
        for (name, value) in pairs {
            b.push(*name, value.clone());
        }
        b
    }

    #[test]
    fn test_single_pass_substitution() {
        let b = binding(&[("n", json!(1)), ("seed", json!(10))]);
        let resolved = resolve("echo n=[[n]] seed=[[seed]]", &b).unwrap();
        assert_eq!(resolved, "echo n=1 seed=10");
    }

    #[test]
    fn test_nested_values_resolve_to_fixed_point() {
        // `file` references `name`, which references the axis parameters --
        // the shape every generated-graph job uses.
        let b = binding(&[
            ("n", json!(12500)),
            ("seed", json!(64)),
            ("name", json!("girg_n=[[n]]_seed=[[seed]]")),
            ("file", json!("graphs/[[name]]")),
        ]);
        let resolved = resolve("bin/girg -n [[n]] [[file]]", &b).unwrap();
        assert_eq!(resolved, "bin/girg -n 12500 graphs/girg_n=12500_seed=64");
    }

    #[test]
    fn test_idempotent_on_plain_strings() {
        let b = binding(&[("n", json!(1))]);
        assert_eq!(resolve("no placeholders here", &b).unwrap(), "no placeholders here");
        assert_eq!(resolve("", &b).unwrap(), "");
    }

    #[test]
    fn test_unknown_placeholder_is_fatal() {
        let b = binding(&[("n", json!(1))]);
        let err = resolve("echo [[n]] [[mystery]]", &b).unwrap_err();
        match err {
            ConfigError::UnknownPlaceholder { names, .. } => assert_eq!(names, "mystery"),
            other => panic!("expected UnknownPlaceholder, got {other}"),
        }
    }

    #[test]
    fn test_unknown_placeholder_inside_value_is_fatal() {
        // The reference only appears after one substitution pass.
        let b = binding(&[("file", json!("graphs/[[name]]"))]);
        let err = resolve("cat [[file]]", &b).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownPlaceholder { .. }));
    }

    #[test]
    fn test_cyclic_reference_is_fatal() {
        let b = binding(&[("a", json!("[[b]]")), ("b", json!("[[a]]"))]);
        let err = resolve("[[a]]", &b).unwrap_err();
        assert!(matches!(err, ConfigError::CyclicPlaceholder { .. }));
    }

    #[test]
    fn test_unterminated_delimiter_is_literal() {
        let b = binding(&[("n", json!(1))]);
        assert_eq!(resolve("echo [[n]] [[oops", &b).unwrap(), "echo 1 [[oops");
    }

    #[test]
    fn test_adjacent_placeholders() {
        let b = binding(&[("a", json!("x")), ("b", json!("y"))]);
        assert_eq!(resolve("[[a]][[b]]", &b).unwrap(), "xy");
    }
}
