//! Stratus Trigger
//!
//! Bindings between a caller and a deployed function or workflow. Each
//! [`Trigger`] variant reaches its target over a different transport, and
//! every invocation ends in the same [`ExecutionResult`] record.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Scheduler                            │
//! │  - bounded pool of in-flight invocations                    │
//! │  - submit(trigger, payload) → InvocationHandle              │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Trigger                             │
//! │  Library (function call / orchestration start + status poll)│
//! │  HTTP    (POST round trip)                                  │
//! │  Queue   (publish, then poll result queue)                  │
//! │  Storage (upload object, then poll result queue)            │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Transports                            │
//! │  FunctionClient, WorkflowClient, QueueClient, ObjectStorage │
//! │  (provider SDK adapters), reqwest for HTTP                  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Synchronous invocation absorbs transport failures into a failed result so
//! a batch of invocations can finish with partial failures. Waiting is
//! bounded by the configured deadline and can be cancelled.

mod error;
mod http;
mod library;
mod queue;
mod report;
mod result;
mod scheduler;
mod storage;
mod transport;
mod trigger;
mod wait;

pub use error::{TransportError, TriggerError};
pub use http::HttpTrigger;
pub use library::{LibraryTarget, LibraryTrigger};
pub use queue::QueueTrigger;
pub use report::parse_report;
pub use result::{ExecutionResult, ExecutionStats, ExecutionTimes, ProviderTimes};
pub use scheduler::{InvocationHandle, Scheduler};
pub use storage::StorageTrigger;
pub use transport::{
  ExecutionDescription, ExecutionStatus, FunctionClient, FunctionResponse, InvokeContext,
  ObjectStorage, QueueClient, QueueHandle, QueueKind, StartedExecution, Transports,
  WorkflowClient,
};
pub use trigger::{Trigger, TriggerType};
pub use wait::poll_until;
