use std::collections::HashMap;

use serde_json::Value;

use crate::error::ConfigError;

/// One expanded permutation of a sweep spec: the flat `KEY=VALUE` overrides
/// to fold into a round's environment/dynamic-config tables before
/// resolving it (§4.8 `SweepSpec`, via `EnvTable::apply_overlay`).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RoundOverlay {
    pub values: HashMap<String, String>,
}

/// A nested config object whose array-valued leaves define the Cartesian
/// product of per-round permutations (§6, §4.8); scalar leaves pass
/// through unchanged into every permutation. Leaves are addressed by their
/// own key regardless of nesting depth — the grouping in the sweep file is
/// for the author's organization, not part of the override key itself,
/// since every leaf ultimately names a flat `EnvTable`/`DynamicConfig` key.
#[derive(Clone, Debug)]
pub struct SweepSpec {
    permutations: Vec<RoundOverlay>,
}

impl SweepSpec {
    pub fn parse_json(text: &str) -> Result<SweepSpec, ConfigError> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| ConfigError::MalformedStrategyConfig("<sweep>".to_string(), e.to_string()))?;
        let obj = value.as_object().ok_or(ConfigError::SweepSpecNotAnObject)?;

        let mut dims: Vec<(String, Vec<String>)> = Vec::new();
        let mut scalars: HashMap<String, String> = HashMap::new();
        collect_leaves(obj, &mut dims, &mut scalars);

        let mut permutations = vec![RoundOverlay { values: scalars }];
        for (key, values) in dims {
            let mut next = Vec::with_capacity(permutations.len() * values.len());
            for perm in &permutations {
                for v in &values {
                    let mut values = perm.values.clone();
                    values.insert(key.clone(), v.clone());
                    next.push(RoundOverlay { values });
                }
            }
            permutations = next;
        }
        Ok(SweepSpec { permutations })
    }

    /// Every permutation this spec expands to, in a fixed deterministic
    /// order (§8 "Reproducibility": identical config must reproduce
    /// identical results, which requires a stable enumeration order here).
    pub fn permutations(&self) -> &[RoundOverlay] {
        &self.permutations
    }
}

fn collect_leaves(obj: &serde_json::Map<String, Value>, dims: &mut Vec<(String, Vec<String>)>, scalars: &mut HashMap<String, String>) {
    for (key, value) in obj {
        match value {
            Value::Object(nested) => collect_leaves(nested, dims, scalars),
            Value::Array(items) => {
                let values = items.iter().map(scalar_to_string).collect();
                dims.push((key.clone(), values));
            }
            other => {
                scalars.insert(key.clone(), scalar_to_string(other));
            }
        }
    }
}

fn scalar_to_string(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn expands_cartesian_product_of_array_leaves() {
        let spec = SweepSpec::parse_json(
            r#"{"dynamic": {"SEED": [1, 2], "PING": [50, 100]}, "round": {"SIM_ROUNDS": "10"}}"#,
        )
        .unwrap();
        assert_eq!(spec.permutations().len(), 4);
        for perm in spec.permutations() {
            assert_eq!(perm.values.get("SIM_ROUNDS").unwrap(), "10");
            assert!(perm.values.contains_key("SEED"));
            assert!(perm.values.contains_key("PING"));
        }
    }

    #[test]
    fn scalar_only_spec_yields_one_permutation() {
        let spec = SweepSpec::parse_json(r#"{"round": {"SEED": 42}}"#).unwrap();
        assert_eq!(spec.permutations().len(), 1);
        assert_eq!(spec.permutations()[0].values.get("SEED").unwrap(), "42");
    }

    #[test]
    fn non_object_root_is_rejected() {
        assert!(SweepSpec::parse_json("[1, 2, 3]").is_err());
    }
}
