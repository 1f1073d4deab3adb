//! stepflow library
//!
//! A framework-agnostic engine for multi-step form wizards: ordered step
//! registration, per-step status, guarded linear or free navigation, and a
//! per-step data store that survives step teardown and resets.

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod registration;
pub mod shell;
pub mod types;

// Re-export main types for convenience
pub use config::{ConfiguredGuard, GuardKind, StepDefinition, StepperConfig};
pub use engine::StepperEngine;
pub use error::{Result, StepperError};
pub use registration::{FnGuard, StepGuard, StepMetadata, StepRegistration, guard_fn};
pub use shell::{ShellOptions, StepAppearance, StepDeclaration, StepperShell};
pub use types::{NavKey, ResetOptions, StepChangeEvent, StepKey, StepStatus};
