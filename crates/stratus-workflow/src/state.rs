use serde::{Deserialize, Serialize};
use stratus_config::Operator;

use crate::path;

/// A named node of the workflow graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct State {
  pub name: String,
  pub kind: StateKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StateKind {
  Task(Task),
  Switch(Switch),
  Map(Map),
  Parallel(Parallel),
  Loop(Loop),
}

/// Invokes one function and replaces the payload with its output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
  /// Logical function name, resolved against a resource map when encoding.
  pub func_name: String,
  pub next: Option<String>,
}

/// Routes to the target of the first matching case, or to `default`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Switch {
  pub cases: Vec<Case>,
  pub default: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Case {
  pub variable: String,
  pub operator: Operator,
  pub value: serde_json::Value,
  pub target: String,
}

/// Applies a function to every element of an array in the payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Map {
  pub func_name: String,
  pub array: String,
  /// Payload fields copied next to each element. Empty means the element
  /// alone is the iteration payload.
  pub common_params: Vec<String>,
  pub next: Option<String>,
}

/// Runs two single-state branches side by side and merges their outputs
/// keyed by branch name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parallel {
  pub branches: Vec<State>,
  pub next: Option<String>,
}

/// Calls a function once per array element, one at a time, keeping the
/// payload untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loop {
  pub func_name: String,
  pub array: String,
  pub next: Option<String>,
}

impl State {
  pub fn task(name: impl Into<String>, func_name: impl Into<String>, next: Option<&str>) -> Self {
    Self {
      name: name.into(),
      kind: StateKind::Task(Task {
        func_name: func_name.into(),
        next: next.map(str::to_string),
      }),
    }
  }

  pub fn map(
    name: impl Into<String>,
    func_name: impl Into<String>,
    array: impl Into<String>,
    common_params: Vec<String>,
    next: Option<&str>,
  ) -> Self {
    Self {
      name: name.into(),
      kind: StateKind::Map(Map {
        func_name: func_name.into(),
        array: array.into(),
        common_params,
        next: next.map(str::to_string),
      }),
    }
  }

  pub fn parallel(name: impl Into<String>, branches: Vec<State>, next: Option<&str>) -> Self {
    Self {
      name: name.into(),
      kind: StateKind::Parallel(Parallel {
        branches,
        next: next.map(str::to_string),
      }),
    }
  }

  pub fn looped(
    name: impl Into<String>,
    func_name: impl Into<String>,
    array: impl Into<String>,
    next: Option<&str>,
  ) -> Self {
    Self {
      name: name.into(),
      kind: StateKind::Loop(Loop {
        func_name: func_name.into(),
        array: array.into(),
        next: next.map(str::to_string),
      }),
    }
  }

  pub fn switch(name: impl Into<String>, cases: Vec<Case>, default: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      kind: StateKind::Switch(Switch {
        cases,
        default: default.into(),
      }),
    }
  }

  /// Lowercase variant name, as used in definition documents and logs.
  pub fn type_name(&self) -> &'static str {
    match self.kind {
      StateKind::Task(_) => "task",
      StateKind::Switch(_) => "switch",
      StateKind::Map(_) => "map",
      StateKind::Parallel(_) => "parallel",
      StateKind::Loop(_) => "loop",
    }
  }

  /// Names of the states control can move to after this one, within the
  /// same graph. Branches of a parallel state live in their own scope and
  /// are not included.
  pub fn successors(&self) -> Vec<&str> {
    match &self.kind {
      StateKind::Task(Task { next, .. })
      | StateKind::Map(Map { next, .. })
      | StateKind::Parallel(Parallel { next, .. })
      | StateKind::Loop(Loop { next, .. }) => next.iter().map(String::as_str).collect(),
      StateKind::Switch(switch) => {
        let mut targets: Vec<&str> = Vec::with_capacity(switch.cases.len() + 1);
        for case in &switch.cases {
          if !targets.contains(&case.target.as_str()) {
            targets.push(&case.target);
          }
        }
        if !targets.contains(&switch.default.as_str()) {
          targets.push(&switch.default);
        }
        targets
      }
    }
  }

  /// Whether control ends after this state.
  pub fn is_terminal(&self) -> bool {
    self.successors().is_empty()
  }
}

impl Case {
  pub fn new(
    variable: impl Into<String>,
    operator: Operator,
    value: serde_json::Value,
    target: impl Into<String>,
  ) -> Self {
    Self {
      variable: variable.into(),
      operator,
      value,
      target: target.into(),
    }
  }

  /// Evaluate this case against a payload.
  ///
  /// Numeric literals compare numerically and string literals lexically. A
  /// missing variable or a value of a different kind never matches.
  pub fn matches(&self, payload: &serde_json::Value) -> bool {
    let Some(actual) = path::lookup(payload, &self.variable) else {
      return false;
    };

    match (&self.value, actual) {
      (serde_json::Value::Number(expected), serde_json::Value::Number(actual)) => {
        match (actual.as_f64(), expected.as_f64()) {
          (Some(a), Some(e)) => compare(self.operator, &a, &e),
          _ => false,
        }
      }
      (serde_json::Value::String(expected), serde_json::Value::String(actual)) => {
        compare(self.operator, actual.as_str(), expected.as_str())
      }
      _ => false,
    }
  }
}

impl Switch {
  /// Target chosen for `payload`: the first matching case in declaration
  /// order, otherwise the default.
  pub fn route(&self, payload: &serde_json::Value) -> &str {
    self
      .cases
      .iter()
      .find(|case| case.matches(payload))
      .map(|case| case.target.as_str())
      .unwrap_or(&self.default)
  }
}

impl Loop {
  /// The map this loop degrades to before its concurrency and output are
  /// overridden.
  pub fn as_map(&self) -> Map {
    Map {
      func_name: self.func_name.clone(),
      array: self.array.clone(),
      common_params: Vec::new(),
      next: self.next.clone(),
    }
  }
}

fn compare<T: PartialOrd + ?Sized>(operator: Operator, actual: &T, expected: &T) -> bool {
  match operator {
    Operator::Less => actual < expected,
    Operator::LessOrEqual => actual <= expected,
    Operator::Equal => actual == expected,
    Operator::GreaterOrEqual => actual >= expected,
    Operator::Greater => actual > expected,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn routing_switch() -> Switch {
    Switch {
      cases: vec![
        Case::new(".n", Operator::Less, json!(5), "A"),
        Case::new(".n", Operator::Equal, json!(5), "B"),
      ],
      default: "C".to_string(),
    }
  }

  #[test]
  fn test_switch_routes_first_match() {
    let switch = routing_switch();

    assert_eq!(switch.route(&json!({"n": 3})), "A");
    assert_eq!(switch.route(&json!({"n": 5})), "B");
    assert_eq!(switch.route(&json!({"n": 9})), "C");
  }

  #[test]
  fn test_switch_order_is_significant() {
    let switch = Switch {
      cases: vec![
        Case::new(".n", Operator::LessOrEqual, json!(10), "first"),
        Case::new(".n", Operator::Less, json!(5), "second"),
      ],
      default: "none".to_string(),
    };

    assert_eq!(switch.route(&json!({"n": 1})), "first");
  }

  #[test]
  fn test_string_case_compares_lexically() {
    let case = Case::new(".mode", Operator::Equal, json!("fast"), "fast_path");
    assert!(case.matches(&json!({"mode": "fast"})));
    assert!(!case.matches(&json!({"mode": "slow"})));

    let ordered = Case::new(".name", Operator::Less, json!("m"), "early");
    assert!(ordered.matches(&json!({"name": "apple"})));
  }

  #[test]
  fn test_mismatched_kinds_never_match() {
    let case = Case::new(".n", Operator::Equal, json!(5), "A");
    assert!(!case.matches(&json!({"n": "5"})));
    assert!(!case.matches(&json!({})));
  }

  #[test]
  fn test_switch_successors_deduplicated() {
    let state = State::switch(
      "check",
      vec![
        Case::new(".a", Operator::Equal, json!(1), "x"),
        Case::new(".b", Operator::Equal, json!(2), "x"),
      ],
      "y",
    );

    assert_eq!(state.successors(), vec!["x", "y"]);
    assert!(!state.is_terminal());
  }

  #[test]
  fn test_loop_as_map_drops_common_params() {
    let state = Loop {
      func_name: "upload".to_string(),
      array: "files".to_string(),
      next: Some("done".to_string()),
    };

    let map = state.as_map();
    assert!(map.common_params.is_empty());
    assert_eq!(map.next.as_deref(), Some("done"));
  }
}
