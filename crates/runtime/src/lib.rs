//! stagecraft-runtime: support routines for generated staged builders.
//!
//! Generated code calls into this crate for the few operations that are
//! the same for every goal:
//!
//! - [`replace_contents()`] -- clear-and-append for getter-only collections
//! - [`check_present()`] -- absent-value rejection for `Option` arguments
//! - [`lease()`] -- per-thread recycling with a single-in-flight guard

pub mod collection;
pub mod null;
pub mod recycle;

pub use collection::{replace_contents, replace_contents_present, Collection};
pub use null::check_present;
pub use recycle::{lease, take_staged, Lease, Recycler, UsageError};
