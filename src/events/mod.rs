//! Event types exchanged across systems.
//!
//! Submodules:
//! - [`loading`] – progress notifications emitted by the sprite loader
pub mod loading;
