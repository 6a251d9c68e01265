use std::fmt;

use indexmap::IndexMap;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use crate::state::StateDef;

/// A workflow definition document.
///
/// `states` keeps the declaration order of the source document; generators
/// emit states in that order. A state name given twice is rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDef {
  /// Name of the state execution starts at.
  pub root: String,
  #[serde(deserialize_with = "unique_states")]
  pub states: IndexMap<String, StateDef>,
}

impl WorkflowDef {
  /// Parse a definition from JSON text.
  pub fn from_json(text: &str) -> serde_json::Result<Self> {
    serde_json::from_str(text)
  }
}

fn unique_states<'de, D>(deserializer: D) -> Result<IndexMap<String, StateDef>, D::Error>
where
  D: Deserializer<'de>,
{
  struct StatesVisitor;

  impl<'de> Visitor<'de> for StatesVisitor {
    type Value = IndexMap<String, StateDef>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
      f.write_str("a map of state names to state definitions")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
      let mut states = IndexMap::with_capacity(access.size_hint().unwrap_or(0));
      while let Some((name, state)) = access.next_entry::<String, StateDef>()? {
        if states.contains_key(&name) {
          return Err(serde::de::Error::custom(format!("duplicate state `{}`", name)));
        }
        states.insert(name, state);
      }
      Ok(states)
    }
  }

  deserializer.deserialize_map(StatesVisitor)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_states_keep_declaration_order() {
    let def = WorkflowDef::from_json(
      r#"{
        "root": "zeta",
        "states": {
          "zeta": {"type": "task", "func_name": "f", "next": "alpha"},
          "alpha": {"type": "task", "func_name": "g"},
          "mid": {"type": "task", "func_name": "h"}
        }
      }"#,
    )
    .unwrap();

    let names: Vec<&str> = def.states.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["zeta", "alpha", "mid"]);
  }

  #[test]
  fn test_missing_root_field_is_rejected() {
    let result = WorkflowDef::from_json(r#"{"states": {}}"#);
    assert!(result.is_err());
  }

  #[test]
  fn test_duplicate_state_name_is_rejected() {
    let err = WorkflowDef::from_json(
      r#"{
        "root": "a",
        "states": {
          "a": {"type": "task", "func_name": "f"},
          "a": {"type": "task", "func_name": "g"}
        }
      }"#,
    )
    .unwrap_err();

    assert!(err.to_string().contains("duplicate state `a`"));
  }
}
