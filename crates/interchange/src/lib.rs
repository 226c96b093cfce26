//! stagecraft-interchange: goal description files and configuration.
//!
//! A goal file is JSON listing explicit goal descriptions (target kind,
//! declaring type, parameters and their roles). A `stagecraft.toml`
//! configuration overlays defaults and per-goal overrides. The single
//! entry point [`load_goals()`] turns both into validated
//! [`stagecraft_core::GoalDescription`]s, rejecting malformed goals one
//! at a time.

pub mod config;
pub mod deserialize;
pub mod types;

pub use config::{Config, Defaults, GoalOverride, ParameterOverride};
pub use deserialize::{
    from_interchange, load_goal_file, load_goals, read_json, InterchangeError, LoadedGoals,
};
pub use types::*;
