//! Typed model of the generated document.

use indexmap::IndexMap;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use stratus_workflow::Operator;

use crate::error::GenerateError;

/// Parameter templates; keys ending in `.$` are paths, others literals.
pub type Parameters = IndexMap<String, serde_json::Value>;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct StateMachine {
  pub comment: String,
  pub start_at: String,
  pub states: IndexMap<String, WireState>,
}

/// A nested state machine: a map iterator or a parallel branch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Pipeline {
  pub start_at: String,
  pub states: IndexMap<String, WireState>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "Type")]
pub enum WireState {
  Task(TaskState),
  Choice(ChoiceState),
  Map(MapState),
  Parallel(ParallelState),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TaskState {
  pub resource: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub parameters: Option<Parameters>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub result_path: Option<String>,
  #[serde(flatten)]
  pub transition: Transition,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ChoiceState {
  pub choices: Vec<ChoiceRule>,
  pub default: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ChoiceRule {
  pub variable: String,
  #[serde(flatten)]
  pub comparison: Comparison,
  pub next: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct MapState {
  pub items_path: String,
  pub parameters: Parameters,
  pub iterator: Pipeline,
  pub result_path: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub max_concurrency: Option<u32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub result_selector: Option<Parameters>,
  #[serde(flatten)]
  pub transition: Transition,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ParallelState {
  pub branches: Vec<Pipeline>,
  pub result_selector: Parameters,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub result_path: Option<String>,
  #[serde(flatten)]
  pub transition: Transition,
}

/// Where control goes after a state: `{"Next": name}` or `{"End": true}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
  Next(String),
  End,
}

impl Transition {
  pub fn from_next(next: Option<&str>) -> Self {
    match next {
      Some(name) => Transition::Next(name.to_string()),
      None => Transition::End,
    }
  }
}

impl Serialize for Transition {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(1))?;
    match self {
      Transition::Next(name) => map.serialize_entry("Next", name)?,
      Transition::End => map.serialize_entry("End", &true)?,
    }
    map.end()
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonKind {
  Numeric,
  String,
}

/// A typed comparison, rendered as a single `"<Kind><Op>": literal` entry,
/// e.g. `"NumericLessThan": 5`.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
  pub kind: ComparisonKind,
  pub operator: Operator,
  pub value: serde_json::Value,
}

impl Comparison {
  pub fn key(&self) -> String {
    let kind = match self.kind {
      ComparisonKind::Numeric => "Numeric",
      ComparisonKind::String => "String",
    };
    let operator = match self.operator {
      Operator::Less => "LessThan",
      Operator::LessOrEqual => "LessThanEquals",
      Operator::Equal => "Equals",
      Operator::GreaterOrEqual => "GreaterThanEquals",
      Operator::Greater => "GreaterThan",
    };
    format!("{}{}", kind, operator)
  }
}

impl Serialize for Comparison {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(1))?;
    map.serialize_entry(&self.key(), &self.value)?;
    map.end()
  }
}

impl WireState {
  /// Point this state's output at `path`. Choice states have no output
  /// and return `false`.
  pub fn set_result_path(&mut self, path: String) -> bool {
    match self {
      WireState::Task(task) => task.result_path = Some(path),
      WireState::Map(map) => map.result_path = path,
      WireState::Parallel(parallel) => parallel.result_path = Some(path),
      WireState::Choice(_) => return false,
    }
    true
  }

  /// Replace the transition. Choice states route by their rules and return
  /// `false`.
  pub fn set_transition(&mut self, transition: Transition) -> bool {
    match self {
      WireState::Task(task) => task.transition = transition,
      WireState::Map(map) => map.transition = transition,
      WireState::Parallel(parallel) => parallel.transition = transition,
      WireState::Choice(_) => return false,
    }
    true
  }
}

/// An encoded state together with its name, before it is placed into a
/// document.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
  pub name: String,
  pub state: WireState,
}

impl Fragment {
  pub fn new(name: impl Into<String>, state: WireState) -> Self {
    Self {
      name: name.into(),
      state,
    }
  }
}

/// Index fragments by name, keeping their order.
pub(crate) fn index_by_name(
  fragments: Vec<Fragment>,
) -> Result<IndexMap<String, WireState>, GenerateError> {
  let mut states = IndexMap::with_capacity(fragments.len());
  for fragment in fragments {
    if states.contains_key(&fragment.name) {
      return Err(GenerateError::DuplicateState(fragment.name));
    }
    states.insert(fragment.name, fragment.state);
  }
  Ok(states)
}
