//! Stratus Workflow
//!
//! This crate provides the workflow intermediate representation: a graph of
//! named, typed states parsed from a [`stratus_config::WorkflowDef`].
//!
//! Key differences from `stratus-config`:
//! - State variants are closed and typed (Task, Switch, Map, Parallel, Loop)
//! - The root is guaranteed to name an existing state
//! - The graph is read-only once built
//!
//! Successor and case targets are not checked here. Generators validate them
//! when encoding, so a dangling reference is reported as an encode error.

mod error;
mod graph;
pub mod path;
mod state;
mod workflow;

pub use error::DefinitionError;
pub use graph::Graph;
pub use state::{Case, Loop, Map, Parallel, State, StateKind, Switch, Task};
pub use stratus_config::Operator;
pub use workflow::Workflow;
