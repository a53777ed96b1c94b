//! Background sprite loading: observable state and the worker bridge.
//!
//! Use [`start_background_loading`] once during initialization to move a
//! [`SpriteLoader`] onto a worker thread and insert the [`LoadBridge`],
//! [`LoadState`] and `Messages<LoadMessage>` resources. The systems in
//! [`crate::systems::loading`] forward progress into the ECS and insert the
//! loader as a resource once it is done. Call [`abandon_background_loading`]
//! at teardown: the worker is not joined, its pending fetches run to
//! completion on their own and the result is dropped.

use std::thread::JoinHandle;

use bevy_ecs::prelude::*;
use crossbeam_channel::Receiver;
use log::info;

use crate::events::loading::LoadMessage;
use crate::resources::spriteloader::{LoadError, SpriteLoader};

/// Loading state mirrored from the worker for systems that gate on it.
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadState {
    pub is_loading: bool,
    /// Completed sheets as an integer percentage.
    pub progress: u8,
    pub is_ready: bool,
    pub failed: bool,
}

/// Output of the loader worker: the loader itself plus how its preload went.
pub type LoadOutcome = (SpriteLoader, Result<(), LoadError>);

/// Shared bridge between the ECS world and the loader worker thread.
#[derive(Resource)]
pub struct LoadBridge {
    /// Receiver for [`LoadMessage`]s (worker -> ECS).
    pub rx_msg: Receiver<LoadMessage>,
    /// Worker join handle; taken once the worker has finished.
    pub handle: Option<JoinHandle<LoadOutcome>>,
}

/// Spawn the loader worker and register the bridge resources.
pub fn start_background_loading(world: &mut World, mut loader: SpriteLoader) {
    let rx_msg = loader.subscribe();
    let sheets = loader.configs().len();

    let handle = std::thread::spawn(move || {
        let result = loader.preload_all();
        (loader, result)
    });
    info!("Background loading of {} sprite sheet(s) started", sheets);

    world.insert_resource(LoadBridge {
        rx_msg,
        handle: Some(handle),
    });
    world.insert_resource(LoadState {
        is_loading: true,
        ..LoadState::default()
    });
    world.init_resource::<Messages<LoadMessage>>();
}

/// Drop the bridge without waiting for the worker.
pub fn abandon_background_loading(world: &mut World) {
    if let Some(bridge) = world.remove_resource::<LoadBridge>()
        && bridge.handle.is_some()
    {
        info!("Abandoning in-flight sprite loading");
    }
    if let Some(mut state) = world.get_resource_mut::<LoadState>() {
        state.is_loading = false;
    }
}
