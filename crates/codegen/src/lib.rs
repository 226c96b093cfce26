//! stagecraft-codegen: Rust source emission for synthesized goals.
//!
//! Consumes the abstract graph produced by `stagecraft-core` and renders
//! one Rust module: typestate step structs and a terminal struct per
//! builder, an updater struct per updater, per-thread recycling holders
//! and the entry functions. Generated code calls into
//! `stagecraft-runtime` for collection replacement, presence checks and
//! slot leasing.

mod builder;
mod emit;
pub mod error;
pub mod module;
mod recycler;
mod updater;

pub use error::CodegenError;
pub use module::{generate_rust, render_module, GeneratedModule, RenderedModule, RustConfig};
