//! Stratus Config
//!
//! This crate contains the serializable input documents consumed by stratus.
//! They describe a benchmark workflow before it is parsed into the state graph
//! and compiled for a provider.
//!
//! Documents are loaded from JSON files (via the CLI), or built in code:
//! - [`WorkflowDef`]: the provider-agnostic workflow definition (`root` + `states`)
//! - [`ResourceMap`]: function name to deployed resource identifier
//! - [`InvocationConfig`]: polling intervals, deadlines and scheduler bounds

mod invocation;
mod resources;
mod state;
mod workflow;

pub use invocation::InvocationConfig;
pub use resources::ResourceMap;
pub use state::{CaseDef, CommonParams, Operator, StateDef};
pub use workflow::WorkflowDef;
