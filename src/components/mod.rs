//! ECS components for entities.
//!
//! Submodules overview:
//! - [`animation`] – handle linking an entity to a scheduler instance
//! - [`sprite`] – sheet id, frame name and resolved rectangle to draw

pub mod animation;
pub mod sprite;
