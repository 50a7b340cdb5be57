//! Grid expansion: from a parameter spec to the ordered sequence of bindings.
//!
//! Expansion is sequential and synchronous; it runs inside the registration
//! call, so every configuration error surfaces before any job is queued.

use serde_json::Value;
use sweeprun_types::binding::Binding;
use sweeprun_types::error::ConfigError;

use crate::param::{CombinationFilter, ParamValue, ParameterSpec};

/// Expand a spec into bindings.
///
/// 1. Plain parameters (fixed scalars and lists) form the cartesian product,
///    iterated in declaration order with the rightmost-declared list varying
///    fastest. A scalar behaves as a singleton axis; an empty list yields
///    zero bindings for the whole grid (not an error).
/// 2. For each product tuple, derived parameters are evaluated in
///    declaration order against the partial binding. A derivation reaching
///    for a parameter that is not resolved yet fails the whole expansion.
/// 3. The combination filter, if any, sees the completed binding (derived
///    values included) and decides whether it is kept.
pub fn expand(
    spec: &ParameterSpec,
    filter: Option<&CombinationFilter>,
) -> Result<Vec<Binding>, ConfigError> {
    spec.validate()?;

    let entries = spec.entries();

    // Plain axes in declaration order; every entry keeps its position so the
    // finished binding reads in declaration order too.
    let mut axes: Vec<(usize, &[Value])> = Vec::new();
    for (pos, (_, value)) in entries.iter().enumerate() {
        match value {
            ParamValue::Fixed(v) => axes.push((pos, std::slice::from_ref(v))),
            ParamValue::OneOf(vs) => axes.push((pos, vs.as_slice())),
            ParamValue::Derived(_) => {}
        }
    }

    if axes.iter().any(|(_, vs)| vs.is_empty()) {
        return Ok(Vec::new());
    }

    let total: usize = axes.iter().map(|(_, vs)| vs.len()).product();
    let mut bindings = Vec::with_capacity(total);

    for tuple in 0..total {
        // Decompose the tuple index so the rightmost axis varies fastest.
        let mut slots: Vec<Option<Value>> = vec![None; entries.len()];
        let mut rem = tuple;
        for (pos, values) in axes.iter().rev() {
            slots[*pos] = Some(values[rem % values.len()].clone());
            rem /= values.len();
        }

        // Derived pass, declaration order; each sees everything placed so far.
        for (pos, (_, value)) in entries.iter().enumerate() {
            if let ParamValue::Derived(f) = value {
                let partial = partial_binding(entries, &slots);
                slots[pos] = Some(f(&partial)?);
            }
        }

        let binding = partial_binding(entries, &slots);
        if let Some(f) = filter {
            if !f(&binding) {
                continue;
            }
        }
        bindings.push(binding);
    }

    Ok(bindings)
}

/// Binding over the filled slots, in declaration order.
fn partial_binding(entries: &[(String, ParamValue)], slots: &[Option<Value>]) -> Binding {
    let mut binding = Binding::new();
    for ((name, _), slot) in entries.iter().zip(slots) {
        if let Some(value) = slot {
            binding.push(name.clone(), value.clone());
        }
    }
    binding
}
