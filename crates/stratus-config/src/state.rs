use serde::{Deserialize, Serialize};

/// A state as written in the definition document.
///
/// The `type` tag selects the variant. Tags outside `task`, `switch` and
/// `map` deserialize to [`StateDef::Unknown`] so the parser can report which
/// state carried it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StateDef {
  Task {
    func_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    next: Option<String>,
  },
  Switch {
    cases: Vec<CaseDef>,
    default: String,
  },
  Map {
    func_name: String,
    /// Path of the array inside the payload.
    array: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    common_params: Option<CommonParams>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    next: Option<String>,
  },
  #[serde(other)]
  Unknown,
}

/// One branch condition of a switch state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseDef {
  /// Path into the payload, e.g. `.count` or `.stats.total`.
  #[serde(rename = "var")]
  pub variable: String,
  #[serde(rename = "op")]
  pub operator: Operator,
  /// Literal compared against. Numbers compare numerically, strings lexically.
  #[serde(rename = "val")]
  pub value: serde_json::Value,
  #[serde(rename = "next")]
  pub target: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
  #[serde(rename = "<")]
  Less,
  #[serde(rename = "<=")]
  LessOrEqual,
  #[serde(rename = "==")]
  Equal,
  #[serde(rename = ">=")]
  GreaterOrEqual,
  #[serde(rename = ">")]
  Greater,
}

/// Payload fields broadcast to every map iteration.
///
/// Accepted either as a comma-separated string (`"a,b"`) or a list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommonParams {
  List(Vec<String>),
  Joined(String),
}

impl CommonParams {
  /// The parameter names, trimmed, with empty entries dropped.
  pub fn names(&self) -> Vec<String> {
    let raw: Vec<&str> = match self {
      CommonParams::List(list) => list.iter().map(String::as_str).collect(),
      CommonParams::Joined(joined) => joined.split(',').collect(),
    };
    raw
      .into_iter()
      .map(str::trim)
      .filter(|name| !name.is_empty())
      .map(str::to_string)
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_task_without_next() {
    let state: StateDef =
      serde_json::from_value(serde_json::json!({"type": "task", "func_name": "resize"})).unwrap();
    assert_eq!(
      state,
      StateDef::Task {
        func_name: "resize".to_string(),
        next: None,
      }
    );
  }

  #[test]
  fn test_switch_case_fields() {
    let state: StateDef = serde_json::from_value(serde_json::json!({
      "type": "switch",
      "cases": [{"var": ".n", "op": "<=", "val": 5, "next": "small"}],
      "default": "large"
    }))
    .unwrap();

    match state {
      StateDef::Switch { cases, default } => {
        assert_eq!(default, "large");
        assert_eq!(cases[0].operator, Operator::LessOrEqual);
        assert_eq!(cases[0].value, serde_json::json!(5));
        assert_eq!(cases[0].target, "small");
      }
      other => panic!("expected switch, got {:?}", other),
    }
  }

  #[test]
  fn test_unrecognized_type_tag() {
    let state: StateDef =
      serde_json::from_value(serde_json::json!({"type": "wait", "seconds": 3})).unwrap();
    assert_eq!(state, StateDef::Unknown);
  }

  #[test]
  fn test_common_params_forms() {
    let joined = CommonParams::Joined("width, height,".to_string());
    assert_eq!(joined.names(), vec!["width", "height"]);

    let list: CommonParams = serde_json::from_value(serde_json::json!(["a", "b"])).unwrap();
    assert_eq!(list.names(), vec!["a", "b"]);
  }
}
