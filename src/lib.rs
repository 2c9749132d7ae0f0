//! Core of the wavestrip spectrum strip: source session, bar mapping and the
//! drag-driven parameter controller. Hosts drive it through [`Engine`].

pub mod color;
pub mod controller;
pub mod engine;
pub mod error;
pub mod mapping;
pub mod params;
pub mod peak;
pub mod renderer;
pub mod scheduler;
pub mod session;
pub mod settings;
pub mod source;

#[cfg(test)]
mod testing;

pub use engine::{Engine, EngineStatus, Event};
pub use error::{ProviderError, StoreError};
pub use source::SourceId;
