use indexmap::IndexMap;
use stratus_config::{StateDef, WorkflowDef};
use tracing::debug;

use crate::error::DefinitionError;
use crate::graph::Graph;
use crate::state::{Case, Map, State, StateKind, Switch, Task};

/// A parsed workflow: the states in declaration order and the name of the
/// root state.
///
/// A `Workflow` is never modified after construction; generators only read
/// it.
#[derive(Debug, Clone, PartialEq)]
pub struct Workflow {
  root: String,
  states: IndexMap<String, State>,
}

impl Workflow {
  /// Build a workflow from states constructed in code.
  ///
  /// Fails if two states share a name or `root` is not among them.
  pub fn new(
    root: impl Into<String>,
    states: impl IntoIterator<Item = State>,
  ) -> Result<Self, DefinitionError> {
    let root = root.into();
    let mut indexed = IndexMap::new();
    for state in states {
      if indexed.contains_key(&state.name) {
        return Err(DefinitionError::DuplicateState(state.name));
      }
      indexed.insert(state.name.clone(), state);
    }

    if !indexed.contains_key(&root) {
      return Err(DefinitionError::MissingRoot { root });
    }

    Ok(Self {
      root,
      states: indexed,
    })
  }

  /// Parse a definition document.
  ///
  /// Dispatches on each state's `type`. Successor and case targets are not
  /// checked here.
  pub fn parse(def: WorkflowDef) -> Result<Self, DefinitionError> {
    let mut states = Vec::with_capacity(def.states.len());
    for (name, state_def) in def.states {
      let kind = parse_state(&name, state_def)?;
      states.push(State { name, kind });
    }

    let workflow = Self::new(def.root, states)?;
    debug!(
      root = %workflow.root,
      states = workflow.states.len(),
      "parsed workflow definition"
    );
    Ok(workflow)
  }

  /// Parse a definition document from JSON text.
  pub fn from_json(text: &str) -> Result<Self, DefinitionError> {
    let def = WorkflowDef::from_json(text)?;
    Self::parse(def)
  }

  pub fn root(&self) -> &State {
    &self.states[&self.root]
  }

  pub fn root_name(&self) -> &str {
    &self.root
  }

  /// States in declaration order.
  pub fn states(&self) -> impl Iterator<Item = &State> {
    self.states.values()
  }

  pub fn get(&self, name: &str) -> Option<&State> {
    self.states.get(name)
  }

  pub fn contains(&self, name: &str) -> bool {
    self.states.contains_key(name)
  }

  pub fn len(&self) -> usize {
    self.states.len()
  }

  pub fn is_empty(&self) -> bool {
    self.states.is_empty()
  }

  /// Build the graph structure for traversal and reference checks.
  pub fn graph(&self) -> Graph {
    Graph::new(&self.states)
  }
}

fn parse_state(name: &str, def: StateDef) -> Result<StateKind, DefinitionError> {
  let kind = match def {
    StateDef::Task { func_name, next } => {
      require(name, "func_name", &func_name)?;
      StateKind::Task(Task { func_name, next })
    }
    StateDef::Switch { cases, default } => {
      let cases = cases
        .into_iter()
        .map(|case| Case {
          variable: case.variable,
          operator: case.operator,
          value: case.value,
          target: case.target,
        })
        .collect();
      StateKind::Switch(Switch { cases, default })
    }
    StateDef::Map {
      func_name,
      array,
      common_params,
      next,
    } => {
      require(name, "func_name", &func_name)?;
      require(name, "array", &array)?;
      StateKind::Map(Map {
        func_name,
        array,
        common_params: common_params.map(|p| p.names()).unwrap_or_default(),
        next,
      })
    }
    StateDef::Unknown => {
      return Err(DefinitionError::UnknownStateType {
        state: name.to_string(),
      });
    }
  };
  Ok(kind)
}

fn require(state: &str, field: &str, value: &str) -> Result<(), DefinitionError> {
  if value.trim().is_empty() {
    return Err(DefinitionError::InvalidState {
      state: state.to_string(),
      message: format!("'{}' must not be empty", field),
    });
  }
  Ok(())
}
