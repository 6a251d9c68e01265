use indexmap::IndexMap;
use serde_json::json;
use stratus_config::ResourceMap;
use stratus_workflow::path::under;
use stratus_workflow::{Case, Loop, Map, Parallel, Switch, Task, Workflow};
use uuid::Uuid;

use super::wire::{
  ChoiceRule, ChoiceState, Comparison, ComparisonKind, Fragment, MapState, Parameters,
  ParallelState, Pipeline, StateMachine, TaskState, Transition, WireState, index_by_name,
};
use crate::error::GenerateError;
use crate::generator::Generator;

const PAYLOAD: &str = "$.payload";
const REQUEST_ID: &str = "$.request_id";
const MAP_ITEM: &str = "$$.Map.Item.Value";
const DEFAULT_COMMENT: &str = "stratus auto-generated benchmark";

/// Generator for Step Functions state machines.
#[derive(Debug, Clone)]
pub struct StepFunctionsGenerator {
  comment: String,
}

impl Default for StepFunctionsGenerator {
  fn default() -> Self {
    Self::new()
  }
}

impl StepFunctionsGenerator {
  pub fn new() -> Self {
    Self {
      comment: DEFAULT_COMMENT.to_string(),
    }
  }

  pub fn with_comment(comment: impl Into<String>) -> Self {
    Self {
      comment: comment.into(),
    }
  }

  fn map_state(
    &self,
    name: &str,
    map: &Map,
    inner_name: String,
    resources: &ResourceMap,
  ) -> Result<MapState, GenerateError> {
    let resource = resolve(name, &map.func_name, resources)?;
    let array_path = under(PAYLOAD, &map.array);

    let mut parameters = Parameters::new();
    parameters.insert("request_id.$".to_string(), json!(REQUEST_ID));
    if map.common_params.is_empty() {
      parameters.insert("payload.$".to_string(), json!(MAP_ITEM));
    } else {
      let mut entries = serde_json::Map::new();
      entries.insert("array_element.$".to_string(), json!(MAP_ITEM));
      for param in &map.common_params {
        entries.insert(format!("{}.$", param), json!(under(PAYLOAD, param)));
      }
      parameters.insert("payload".to_string(), serde_json::Value::Object(entries));
    }

    let mut iterator_states = IndexMap::new();
    iterator_states.insert(
      inner_name.clone(),
      WireState::Task(TaskState {
        resource,
        parameters: None,
        result_path: None,
        transition: Transition::End,
      }),
    );

    Ok(MapState {
      items_path: array_path.clone(),
      parameters,
      iterator: Pipeline {
        start_at: inner_name,
        states: iterator_states,
      },
      result_path: array_path,
      max_concurrency: None,
      result_selector: None,
      transition: Transition::from_next(map.next.as_deref()),
    })
  }
}

impl Generator for StepFunctionsGenerator {
  type Fragment = Fragment;
  type Document = StateMachine;

  fn encode_task(
    &self,
    name: &str,
    task: &Task,
    resources: &ResourceMap,
  ) -> Result<Vec<Fragment>, GenerateError> {
    let resource = resolve(name, &task.func_name, resources)?;

    let mut parameters = Parameters::new();
    parameters.insert("request_id.$".to_string(), json!(REQUEST_ID));
    parameters.insert("payload.$".to_string(), json!(PAYLOAD));

    Ok(vec![Fragment::new(
      name,
      WireState::Task(TaskState {
        resource,
        parameters: Some(parameters),
        result_path: Some(PAYLOAD.to_string()),
        transition: Transition::from_next(task.next.as_deref()),
      }),
    )])
  }

  fn encode_switch(
    &self,
    name: &str,
    switch: &Switch,
    _resources: &ResourceMap,
  ) -> Result<Vec<Fragment>, GenerateError> {
    let choices = switch
      .cases
      .iter()
      .map(|case| encode_case(name, case))
      .collect::<Result<Vec<_>, _>>()?;

    Ok(vec![Fragment::new(
      name,
      WireState::Choice(ChoiceState {
        choices,
        default: switch.default.clone(),
      }),
    )])
  }

  fn encode_map(
    &self,
    name: &str,
    map: &Map,
    resources: &ResourceMap,
  ) -> Result<Vec<Fragment>, GenerateError> {
    let inner_name = format!("func_{}", synthesized_id("map", name));
    let state = self.map_state(name, map, inner_name, resources)?;
    Ok(vec![Fragment::new(name, WireState::Map(state))])
  }

  fn encode_parallel(
    &self,
    name: &str,
    parallel: &Parallel,
    resources: &ResourceMap,
  ) -> Result<Vec<Fragment>, GenerateError> {
    // Routing metadata is taken from the first branch only.
    if parallel.branches.len() != 2 {
      return Err(GenerateError::BranchCount {
        state: name.to_string(),
        found: parallel.branches.len(),
      });
    }

    // Branch outputs are merged by name.
    if parallel.branches[0].name == parallel.branches[1].name {
      return Err(GenerateError::DuplicateState(parallel.branches[1].name.clone()));
    }

    let mut branches = Vec::with_capacity(2);
    let mut merged = serde_json::Map::new();

    for (index, branch) in parallel.branches.iter().enumerate() {
      let invalid = || GenerateError::InvalidBranch {
        state: name.to_string(),
        branch: branch.name.clone(),
      };

      let mut fragments = self.encode_state(branch, resources)?;
      if fragments.len() != 1 {
        return Err(invalid());
      }
      let fragment = &mut fragments[0];
      if !fragment.state.set_result_path(format!("$.{}", branch.name))
        || !fragment.state.set_transition(Transition::End)
      {
        return Err(invalid());
      }

      merged.insert(
        format!("{}.$", branch.name),
        json!(format!("$[{}].{}", index, branch.name)),
      );
      branches.push(Pipeline {
        start_at: branch.name.clone(),
        states: index_by_name(fragments)?,
      });
    }

    let mut result_selector = Parameters::new();
    result_selector.insert("payload".to_string(), serde_json::Value::Object(merged));
    result_selector.insert("request_id.$".to_string(), json!("$[0].request_id"));

    Ok(vec![Fragment::new(
      name,
      WireState::Parallel(ParallelState {
        branches,
        result_selector,
        result_path: None,
        transition: Transition::from_next(parallel.next.as_deref()),
      }),
    )])
  }

  fn encode_loop(
    &self,
    name: &str,
    looped: &Loop,
    resources: &ResourceMap,
  ) -> Result<Vec<Fragment>, GenerateError> {
    let inner_name = format!("func_{}", synthesized_id("loop", name));
    let mut state = self.map_state(name, &looped.as_map(), inner_name, resources)?;

    state.max_concurrency = Some(1);
    state.result_selector = Some(Parameters::new());
    state.result_path = format!("$.{}", synthesized_id("loop-output", name));

    Ok(vec![Fragment::new(name, WireState::Map(state))])
  }

  fn postprocess(
    &self,
    workflow: &Workflow,
    fragments: Vec<Fragment>,
  ) -> Result<StateMachine, GenerateError> {
    Ok(StateMachine {
      comment: self.comment.clone(),
      start_at: workflow.root_name().to_string(),
      states: index_by_name(fragments)?,
    })
  }
}

fn resolve(state: &str, func_name: &str, resources: &ResourceMap) -> Result<String, GenerateError> {
  resources
    .resolve(func_name)
    .map(str::to_string)
    .ok_or_else(|| GenerateError::UnresolvedFunction {
      state: state.to_string(),
      func_name: func_name.to_string(),
    })
}

fn encode_case(state: &str, case: &Case) -> Result<ChoiceRule, GenerateError> {
  let kind = match &case.value {
    serde_json::Value::Number(_) => ComparisonKind::Numeric,
    serde_json::Value::String(_) => ComparisonKind::String,
    other => {
      return Err(GenerateError::UnsupportedLiteral {
        state: state.to_string(),
        value: other.clone(),
      });
    }
  };

  Ok(ChoiceRule {
    variable: under(PAYLOAD, &case.variable),
    comparison: Comparison {
      kind,
      operator: case.operator,
      value: case.value.clone(),
    },
    next: case.target.clone(),
  })
}

/// Short identifier derived from the state name, stable across runs.
fn synthesized_id(purpose: &str, state: &str) -> String {
  let id = Uuid::new_v5(&Uuid::NAMESPACE_OID, format!("{}/{}", purpose, state).as_bytes());
  id.simple().to_string()[..8].to_string()
}
