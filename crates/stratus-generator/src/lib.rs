//! Stratus Generator
//!
//! Compiles a parsed [`stratus_workflow::Workflow`] into the declarative
//! document a provider's orchestration service executes.
//!
//! Every backend implements [`Generator`]: one pure encoding function per
//! state variant, plus a post-processing step that arranges the encoded
//! fragments into the provider's document shape. The provided
//! [`Generator::generate`] walks states in declaration order, checks each
//! state's references, and stops at the first error so no partial document
//! is ever returned.
//!
//! # Usage
//!
//! ```ignore
//! use stratus_generator::{Generator, StepFunctionsGenerator, export};
//!
//! let workflow = Workflow::from_json(&definition)?;
//! let document = StepFunctionsGenerator::new().generate(&workflow, &resources)?;
//! println!("{}", export(&document)?);
//! ```

mod error;
mod generator;
pub mod sfn;

pub use error::GenerateError;
pub use generator::{Generator, export};
pub use sfn::StepFunctionsGenerator;
