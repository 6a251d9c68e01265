use serde::Serialize;
use stratus_config::ResourceMap;
use stratus_workflow::{Loop, Map, Parallel, State, StateKind, Switch, Task, Workflow};
use tracing::{debug, instrument};

use crate::error::GenerateError;

/// A compiler backend from the workflow graph to one provider's document.
///
/// The resource map is passed to every encoding call and never stored, so
/// encoders stay pure: the same state and map always yield the same
/// fragments.
pub trait Generator {
  /// One encoded state, still carrying its name.
  type Fragment;
  /// The finished document.
  type Document: Serialize;

  fn encode_task(
    &self,
    name: &str,
    task: &Task,
    resources: &ResourceMap,
  ) -> Result<Vec<Self::Fragment>, GenerateError>;

  fn encode_switch(
    &self,
    name: &str,
    switch: &Switch,
    resources: &ResourceMap,
  ) -> Result<Vec<Self::Fragment>, GenerateError>;

  fn encode_map(
    &self,
    name: &str,
    map: &Map,
    resources: &ResourceMap,
  ) -> Result<Vec<Self::Fragment>, GenerateError>;

  fn encode_parallel(
    &self,
    name: &str,
    parallel: &Parallel,
    resources: &ResourceMap,
  ) -> Result<Vec<Self::Fragment>, GenerateError>;

  fn encode_loop(
    &self,
    name: &str,
    looped: &Loop,
    resources: &ResourceMap,
  ) -> Result<Vec<Self::Fragment>, GenerateError>;

  /// Arrange the flat fragment list into the document shape.
  fn postprocess(
    &self,
    workflow: &Workflow,
    fragments: Vec<Self::Fragment>,
  ) -> Result<Self::Document, GenerateError>;

  /// Encode a single state.
  fn encode_state(
    &self,
    state: &State,
    resources: &ResourceMap,
  ) -> Result<Vec<Self::Fragment>, GenerateError> {
    match &state.kind {
      StateKind::Task(task) => self.encode_task(&state.name, task, resources),
      StateKind::Switch(switch) => self.encode_switch(&state.name, switch, resources),
      StateKind::Map(map) => self.encode_map(&state.name, map, resources),
      StateKind::Parallel(parallel) => self.encode_parallel(&state.name, parallel, resources),
      StateKind::Loop(looped) => self.encode_loop(&state.name, looped, resources),
    }
  }

  /// Encode every state in declaration order and assemble the document.
  ///
  /// References to missing states are reported here rather than at parse
  /// time.
  #[instrument(name = "generate", skip_all, fields(root = %workflow.root_name()))]
  fn generate(
    &self,
    workflow: &Workflow,
    resources: &ResourceMap,
  ) -> Result<Self::Document, GenerateError> {
    let graph = workflow.graph();
    let mut fragments = Vec::with_capacity(workflow.len());

    for state in workflow.states() {
      if let Some(target) = graph.dangling_from(&state.name).next() {
        return Err(GenerateError::DanglingReference {
          state: state.name.clone(),
          target: target.to_string(),
        });
      }

      let encoded = self.encode_state(state, resources)?;
      debug!(
        state = %state.name,
        kind = state.type_name(),
        fragments = encoded.len(),
        "encoded state"
      );
      fragments.extend(encoded);
    }

    self.postprocess(workflow, fragments)
  }
}

/// Serialize a document as pretty-printed JSON.
pub fn export<D: Serialize>(document: &D) -> Result<String, GenerateError> {
  Ok(serde_json::to_string_pretty(document)?)
}
