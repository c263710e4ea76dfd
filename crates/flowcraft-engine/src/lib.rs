//! Top-level engine facade.
//!
//! Wires the node registry, validator, scheduler and recorder behind a
//! single `Engine::run`/`cancel`/`find_start_node` surface.

mod config;
mod engine;
mod error;

pub use config::EngineConfig;
pub use engine::Engine;
pub use error::EngineError;
