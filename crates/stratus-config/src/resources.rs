use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Lookup from a logical function name to the identifier of its deployment
/// (an ARN, a function app route, ...).
///
/// Built once before generation and only read afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceMap(HashMap<String, String>);

impl ResourceMap {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert(&mut self, func_name: impl Into<String>, resource_id: impl Into<String>) {
    self.0.insert(func_name.into(), resource_id.into());
  }

  /// Resource identifier for `func_name`, if deployed.
  pub fn resolve(&self, func_name: &str) -> Option<&str> {
    self.0.get(func_name).map(String::as_str)
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }
}

impl<K, V> FromIterator<(K, V)> for ResourceMap
where
  K: Into<String>,
  V: Into<String>,
{
  fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
    Self(
      iter
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect(),
    )
  }
}
