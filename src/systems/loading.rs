//! Systems bridging the background sprite loader with the ECS world.
//!
//! - [`poll_load_messages`] drains the worker's channel into
//!   `Messages<LoadMessage>`.
//! - [`update_load_messages`] advances the message queue.
//! - [`apply_load_messages`] mirrors progress into [`LoadState`].
//! - [`finish_background_loading`] joins the worker once it is done and
//!   inserts the [`SpriteLoader`] resource.
//!
//! Run them chained, in this order, once per pulse.

use bevy_ecs::prelude::*;
use log::{error, info, warn};

use crate::events::loading::LoadMessage;
use crate::resources::loadstate::{LoadBridge, LoadState};

/// Non-blockingly forward worker messages into the ECS mailbox.
pub fn poll_load_messages(
    bridge: Option<Res<LoadBridge>>,
    mut writer: MessageWriter<LoadMessage>,
) {
    if let Some(bridge) = bridge {
        writer.write_batch(bridge.rx_msg.try_iter());
    }
}

/// Advance the ECS message queue for [`LoadMessage`].
pub fn update_load_messages(mut msgs: ResMut<Messages<LoadMessage>>) {
    msgs.update();
}

/// Mirror loader progress into [`LoadState`].
///
/// `is_ready` is left to [`finish_background_loading`].
pub fn apply_load_messages(mut reader: MessageReader<LoadMessage>, mut state: ResMut<LoadState>) {
    for msg in reader.read() {
        match msg {
            LoadMessage::Started { .. } => {
                state.is_loading = true;
                state.progress = 0;
                state.failed = false;
            }
            LoadMessage::SheetLoaded { progress, .. } => {
                state.progress = *progress;
            }
            // Ready only flips once the loader resource is in the world.
            LoadMessage::Finished { .. } => {
                state.progress = 100;
            }
            LoadMessage::Failed { id, error } => {
                warn!("Sheet '{}' failed to load: {}", id, error);
                state.is_loading = false;
                state.failed = true;
            }
        }
    }
}

/// Join the worker once it finished and publish the loader.
///
/// On success the [`SpriteLoader`](crate::resources::spriteloader::SpriteLoader)
/// becomes a resource; on failure it is dropped and [`LoadState::failed`] is
/// set, so nothing downstream ever sees a partial cache.
pub fn finish_background_loading(world: &mut World) {
    let finished = world
        .get_resource::<LoadBridge>()
        .and_then(|bridge| bridge.handle.as_ref())
        .is_some_and(|handle| handle.is_finished());
    if !finished {
        return;
    }

    let Some(handle) = world
        .get_resource_mut::<LoadBridge>()
        .and_then(|mut bridge| bridge.handle.take())
    else {
        return;
    };

    let (is_ready, progress) = match handle.join() {
        Ok((loader, Ok(()))) => {
            info!("Sprite loader published ({} sheets)", loader.sheet_ids().len());
            let state = (loader.is_ready(), loader.load_progress());
            world.insert_resource(loader);
            state
        }
        Ok((loader, Err(e))) => {
            error!("Sprite loading failed: {}", e);
            (false, loader.load_progress())
        }
        Err(_) => {
            error!("Sprite loader worker panicked");
            (false, 0)
        }
    };

    let mut state = world.get_resource_or_insert_with(LoadState::default);
    state.is_loading = false;
    state.is_ready = is_ready;
    state.progress = progress;
    state.failed = !is_ready;
}
