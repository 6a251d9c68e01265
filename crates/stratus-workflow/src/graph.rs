use std::collections::{HashMap, HashSet, VecDeque};

use indexmap::IndexMap;

use crate::state::State;

/// Graph structure for traversal and reference analysis.
#[derive(Debug, Clone)]
pub struct Graph {
  /// Adjacency list: state -> successor states, in declaration order.
  adjacency: IndexMap<String, Vec<String>>,
  /// Reverse adjacency: state -> predecessor states.
  reverse_adjacency: HashMap<String, Vec<String>>,
  /// References to states that are not part of the graph: (from, to).
  dangling: Vec<(String, String)>,
}

impl Graph {
  /// Build a graph from the states of a workflow.
  pub fn new(states: &IndexMap<String, State>) -> Self {
    let mut adjacency: IndexMap<String, Vec<String>> = IndexMap::new();
    let mut reverse_adjacency: HashMap<String, Vec<String>> = HashMap::new();
    let mut dangling = Vec::new();

    for name in states.keys() {
      reverse_adjacency.entry(name.clone()).or_default();
    }

    for (name, state) in states {
      let successors: Vec<String> = state.successors().into_iter().map(str::to_string).collect();
      for target in &successors {
        if states.contains_key(target) {
          reverse_adjacency
            .entry(target.clone())
            .or_default()
            .push(name.clone());
        } else {
          dangling.push((name.clone(), target.clone()));
        }
      }
      adjacency.insert(name.clone(), successors);
    }

    Self {
      adjacency,
      reverse_adjacency,
      dangling,
    }
  }

  /// Successors of a state.
  pub fn downstream(&self, name: &str) -> &[String] {
    self
      .adjacency
      .get(name)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  /// Predecessors of a state.
  pub fn upstream(&self, name: &str) -> &[String] {
    self
      .reverse_adjacency
      .get(name)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  /// References to states that do not exist, as (from, to) pairs.
  pub fn dangling(&self) -> &[(String, String)] {
    &self.dangling
  }

  /// Dangling references originating from `name`.
  pub fn dangling_from<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
    self
      .dangling
      .iter()
      .filter(move |(from, _)| from == name)
      .map(|(_, to)| to.as_str())
  }

  /// States that cannot be reached from `root`, in declaration order.
  pub fn unreachable(&self, root: &str) -> Vec<&str> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut queue: VecDeque<&str> = VecDeque::new();
    if self.adjacency.contains_key(root) {
      queue.push_back(root);
      seen.insert(root);
    }

    while let Some(current) = queue.pop_front() {
      for next in self.downstream(current) {
        if self.adjacency.contains_key(next) && seen.insert(next.as_str()) {
          queue.push_back(next);
        }
      }
    }

    self
      .adjacency
      .keys()
      .map(String::as_str)
      .filter(|name| !seen.contains(name))
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::Workflow;

  #[test]
  fn test_graph_adjacency_and_dangling() {
    let workflow = Workflow::new(
      "a",
      vec![
        State::task("a", "f", Some("b")),
        State::task("b", "g", Some("ghost")),
        State::task("orphan", "h", Some("b")),
      ],
    )
    .unwrap();

    let graph = workflow.graph();
    assert_eq!(graph.downstream("a"), &["b".to_string()]);
    assert_eq!(graph.upstream("b").len(), 2);
    assert_eq!(
      graph.dangling(),
      &[("b".to_string(), "ghost".to_string())]
    );
    assert_eq!(graph.dangling_from("b").collect::<Vec<_>>(), vec!["ghost"]);
    assert_eq!(graph.unreachable("a"), vec!["orphan"]);
  }
}
