//! ECS resources made available to systems.
//!
//! This module groups the long-lived data injected into the ECS world and
//! accessed by systems during execution: the sprite sheet cache, the
//! animation clock and its definitions, timing, and configuration. Each
//! submodule documents the semantics and intended usage of its resource(s).
//!
//! Overview
//! - `animationlibrary` – reusable animation definitions grouped by owner
//! - `animationscheduler` – registry and clock of running animation instances
//! - `assetsource` – byte sources the loader fetches sheets from
//! - `loadstate` – background loading bridge and its observable state
//! - `loaderconfig` – INI-backed sheet list and clock settings
//! - `spriteatlas` – frame rectangles, atlases and sheet configuration
//! - `spriteloader` – loads every sheet and serves frame lookups
//! - `worldtime` – simulation time and delta
pub mod animationlibrary;
pub mod animationscheduler;
pub mod assetsource;
pub mod loaderconfig;
pub mod loadstate;
pub mod spriteatlas;
pub mod spriteloader;
pub mod worldtime;
