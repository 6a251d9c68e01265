//! Step Functions backend.
//!
//! Emits an Amazon States Language document. Every state passes an envelope
//! of the form `{"request_id": ..., "payload": ...}` along the pipeline;
//! functions only ever replace `payload`, so the request id set by the
//! caller reaches the last state unchanged.

mod encoder;
mod wire;

pub use encoder::StepFunctionsGenerator;
pub use wire::{
  ChoiceRule, ChoiceState, Comparison, ComparisonKind, Fragment, MapState, Parameters,
  ParallelState, Pipeline, StateMachine, TaskState, Transition, WireState,
};
