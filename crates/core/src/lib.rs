//! stagecraft-core: staged fluent-interface synthesis.
//!
//! Takes explicit goal descriptions (a constructor, method or bean plus its
//! parameters) through a three-pass pipeline and produces the abstract
//! interface graph a code emitter renders.
//!
//! # Public API
//!
//! Key types are re-exported at the crate root for convenience:
//!
//! - [`generate_goal()`] / [`generate_batch()`] -- run the full pipeline
//! - [`GoalDescription`], [`GoalDetails`], [`Parameter`] -- the input model
//! - [`StepOrder`] -- step order (Pass 1 output)
//! - [`VarLifeTable`] -- generics liveness (Pass 2 output)
//! - [`SynthesizedGoal`] -- interface graph (Pass 3 output)
//! - [`BatchReport`] -- per-batch results, failures and findings
//!
//! Individual pass entry functions are also re-exported for selective
//! pipeline execution.

pub mod error;
pub mod generate;
pub mod goal;
pub mod lexer;
pub mod parameter;
pub mod pass1_sequence;
pub mod pass2_varlife;
pub mod pass3_synthesize;
pub mod report;
pub mod types;

// ── Convenience re-exports: key types ────────────────────────────────

pub use error::{GoalError, StructuralError};
pub use goal::{
    Access, GeneratedNames, GoalDescription, GoalDetails, Lifecycle, TargetKind, VariantRequest,
};
pub use parameter::{NullPolicy, Parameter, ParameterRole, PositionHint, Projection};
pub use pass1_sequence::StepOrder;
pub use pass2_varlife::{StepVars, VarLifeTable};
pub use pass3_synthesize::{
    BuilderArtifact, Commit, EntryPoint, FactoryMethod, InterfaceChain, Invocation,
    MethodSignature, MutableContract, Mutation, NullCheck, RecycleSlot, RecyclerHolder,
    SignatureParam, SlotField, StepInput, StepInterface, StepMethod, SynthesizedGoal,
    TerminalContract, UpdateMethod, UpdaterField, Variant,
};
pub use report::{BatchReport, Finding, FindingSeverity, GoalFailure};
pub use types::{TypeRef, TypeVar};

// ── Convenience re-exports: pipeline entry points ────────────────────

pub use generate::{generate_batch, generate_goal};
pub use pass1_sequence::sequence;
pub use pass2_varlife::{analyze, analyze_goal};
pub use pass3_synthesize::{synthesize, synthesize_chain};
