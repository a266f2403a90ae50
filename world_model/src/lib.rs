//! # World Model
//!
//! The world state crate - holds relation facts and entities, and evaluates
//! encounter preconditions against them. This crate is the single source of
//! truth for world facts and knows nothing about the platform protocol.

pub mod adapter;
pub mod entities;
mod error;
pub mod proposition;
pub mod relations;
pub mod sexpr;
pub mod world_state;

pub use adapter::*;
pub use entities::*;
pub use error::*;
pub use proposition::*;
pub use relations::*;
pub use world_state::*;
