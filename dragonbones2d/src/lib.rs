//! Pure Rust runtime for DragonBones 5.x exported data (unofficial).
//!
//! This crate is renderer-agnostic. It advances clocks, animation state and
//! the bone/slot solver; drawing the resulting pose is left to integrations.

#![forbid(unsafe_code)]

mod error;
mod geometry;
mod model;
mod runtime;
mod version;

pub use error::*;
pub use geometry::*;
pub use model::*;
pub use runtime::*;
pub use version::*;
