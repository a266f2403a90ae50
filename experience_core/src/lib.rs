//! # Experience Core
//!
//! The decision-making side of the experience manager. This crate talks to the
//! platform, feeds world-state changes into `world_model`, and decides after
//! every batch which pre-authored encounter, if any, to trigger next.
//!
//! ## Core Components
//!
//! - **handshake**: Four-phase session establishment with the platform
//! - **channel**: Background receiver feeding a FIFO queue of inbound batches
//! - **selection**: Applies batches to the world and resolves applicable encounters
//! - **transport**: HTTP primitives behind a connectivity probe
//!
//! ## Control Flow
//!
//! Handshake runs once at start-up, then the receiver starts polling and the
//! main loop drains the queue, one batch at a time, into the selection engine.

pub mod catalog;
pub mod channel;
pub mod config;
pub mod connectivity;
pub mod encounter;
pub mod error;
pub mod events;
pub mod handshake;
pub mod manager;
pub mod selection;
pub mod transport;

#[cfg(test)]
mod test_support;

pub use catalog::*;
pub use channel::*;
pub use config::*;
pub use connectivity::*;
pub use encounter::*;
pub use error::*;
pub use events::*;
pub use handshake::*;
pub use manager::*;
pub use selection::*;
pub use transport::*;
