//! Sheetanim library.
//!
//! Sprite sheet loading, frame atlas lookups and a frame-based animation
//! scheduler, exposed as ECS components, resources, systems and events for
//! integration tests and for use as a reusable library.

pub mod components;
pub mod events;
pub mod metadata;
pub mod resources;
pub mod systems;
