//! Engine systems.
//!
//! This module groups the ECS systems that advance animations, keep sprites
//! in sync with them, and bridge the background loader.
//!
//! Submodules overview
//! - [`animation`] – tick the animation scheduler and resolve sprite frames
//! - [`loading`] – forward loader progress and publish the finished loader
//! - [`time`] – update simulation time and delta

pub mod animation;
pub mod loading;
pub mod time;
