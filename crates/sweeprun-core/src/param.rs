//! Parameter declarations for one job registration.
//!
//! Every parameter contributes values to the grid in one of three ways:
//! a fixed scalar, an ordered list (cartesian axis), or a derivation
//! evaluated against the partially resolved binding. Declaration order is
//! significant -- it drives cartesian iteration order and the derived
//! evaluation pass.

use std::fmt;

use serde_json::Value;
use sweeprun_types::binding::{Binding, is_scalar};
use sweeprun_types::error::ConfigError;

/// A derivation: computes a scalar from the parameters resolved so far.
///
/// Reach other parameters through [`Binding::require`]; a miss surfaces as a
/// derivation-ordering error from the grid expander.
pub type DerivedFn = Box<dyn Fn(&Binding) -> Result<Value, ConfigError> + Send + Sync>;

/// Predicate deciding whether a fully resolved binding is kept.
pub type CombinationFilter = Box<dyn Fn(&Binding) -> bool + Send + Sync>;

/// How a single parameter contributes values to the grid.
pub enum ParamValue {
    /// One scalar; behaves as a singleton axis. The scalar may itself be a
    /// template string referencing other parameters.
    Fixed(Value),
    /// An ordered cartesian axis. An empty list collapses the whole grid to
    /// zero bindings.
    OneOf(Vec<Value>),
    /// Computed from the binding after all plain parameters are placed.
    Derived(DerivedFn),
}

impl fmt::Debug for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Fixed(v) => f.debug_tuple("Fixed").field(v).finish(),
            ParamValue::OneOf(vs) => f.debug_tuple("OneOf").field(vs).finish(),
            ParamValue::Derived(_) => f.write_str("Derived(..)"),
        }
    }
}

/// Ordered parameter declarations for one registration.
#[derive(Debug, Default)]
pub struct ParameterSpec {
    entries: Vec<(String, ParamValue)>,
}

impl ParameterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a fixed scalar parameter.
    pub fn fixed(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.entries.push((name.into(), ParamValue::Fixed(value.into())));
        self
    }

    /// Declare a cartesian axis.
    pub fn one_of<V>(mut self, name: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self
    where
        V: Into<Value>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.entries.push((name.into(), ParamValue::OneOf(values)));
        self
    }

    /// Declare a derived parameter.
    pub fn derived<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Binding) -> Result<Value, ConfigError> + Send + Sync + 'static,
    {
        self.entries
            .push((name.into(), ParamValue::Derived(Box::new(f))));
        self
    }

    /// Declarations in order.
    pub fn entries(&self) -> &[(String, ParamValue)] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Reject duplicate names and non-scalar values in scalar positions.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (i, (name, value)) in self.entries.iter().enumerate() {
            if self.entries[..i].iter().any(|(n, _)| n == name) {
                return Err(ConfigError::DuplicateParameter(name.clone()));
            }
            match value {
                ParamValue::Fixed(v) => check_scalar(name, v)?,
                ParamValue::OneOf(vs) => {
                    for v in vs {
                        check_scalar(name, v)?;
                    }
                }
                ParamValue::Derived(_) => {}
            }
        }
        Ok(())
    }

    /// Build a spec from a manifest parameter table: scalars become `Fixed`,
    /// arrays become `OneOf`. Declaration order is the table's order.
    pub fn from_toml_table(table: &toml::Table) -> Result<Self, ConfigError> {
        let mut spec = Self::new();
        for (name, value) in table {
            let param = match value {
                toml::Value::Array(items) => {
                    let mut values = Vec::with_capacity(items.len());
                    for item in items {
                        values.push(toml_scalar(name, item)?);
                    }
                    ParamValue::OneOf(values)
                }
                other => ParamValue::Fixed(toml_scalar(name, other)?),
            };
            spec.entries.push((name.clone(), param));
        }
        spec.validate()?;
        Ok(spec)
    }
}

fn check_scalar(name: &str, value: &Value) -> Result<(), ConfigError> {
    if is_scalar(value) {
        Ok(())
    } else {
        Err(ConfigError::MalformedValue {
            name: name.to_string(),
            value: value.to_string(),
        })
    }
}

/// Convert a TOML scalar to its JSON counterpart.
fn toml_scalar(name: &str, value: &toml::Value) -> Result<Value, ConfigError> {
    match value {
        toml::Value::String(s) => Ok(Value::String(s.clone())),
        toml::Value::Integer(i) => Ok(Value::from(*i)),
        toml::Value::Float(f) => Ok(Value::from(*f)),
        toml::Value::Boolean(b) => Ok(Value::Bool(*b)),
        other => Err(ConfigError::MalformedValue {
            name: name.to_string(),
            value: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder_keeps_declaration_order() {
        let spec = ParameterSpec::new()
            .one_of("n", [12500, 25000])
            .fixed("deg", 15)
            .derived("name", |b| {
                let n = b.require("n")?;
                Ok(json!(format!("girg_n={n}")))
            });
        let names: Vec<_> = spec.entries().iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["n", "deg", "name"]);
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_duplicate_names() {
        let spec = ParameterSpec::new().fixed("n", 1).fixed("n", 2);
        let err = spec.validate().unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateParameter(ref n) if n == "n"));
    }

    #[test]
    fn test_validate_rejects_non_scalar_values() {
        let spec = ParameterSpec::new().fixed("bad", json!({"nested": true}));
        let err = spec.validate().unwrap_err();
        assert!(matches!(err, ConfigError::MalformedValue { ref name, .. } if name == "bad"));
    }

    #[test]
    fn test_from_toml_table() {
        let table: toml::Table = toml::from_str(
            r#"
n = [12500, 25000]
deg = 15
ple = 2.2
name = "girg_n=[[n]]"
"#,
        )
        .unwrap();
        let spec = ParameterSpec::from_toml_table(&table).unwrap();
        let names: Vec<_> = spec.entries().iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["n", "deg", "ple", "name"]);

        match &spec.entries()[0].1 {
            ParamValue::OneOf(vs) => assert_eq!(vs, &vec![json!(12500), json!(25000)]),
            other => panic!("expected OneOf, got {other:?}"),
        }
        match &spec.entries()[2].1 {
            ParamValue::Fixed(v) => assert_eq!(v, &json!(2.2)),
            other => panic!("expected Fixed, got {other:?}"),
        }
    }

    #[test]
    fn test_from_toml_table_rejects_nested_tables() {
        let table: toml::Table = toml::from_str("bad = { x = 1 }").unwrap();
        let err = ParameterSpec::from_toml_table(&table).unwrap_err();
        assert!(matches!(err, ConfigError::MalformedValue { .. }));
    }
}
