//! Animation systems.
//!
//! - [`animation_scheduler_system`] advances the
//!   [`AnimationScheduler`] by the current [`WorldTime`] delta.
//! - [`sync_sprite_frames`] copies each animated entity's current frame name
//!   into its [`Sprite`] and resolves sprite rectangles through the
//!   [`SpriteLoader`] atlas.
//! - [`release_animation_on_remove`] destroys the scheduler instance behind
//!   an [`Animated`] component when the component goes away.
//!
//! # Animation Flow
//!
//! 1. Animation definitions come from the
//!    [`AnimationLibrary`](crate::resources::animationlibrary::AnimationLibrary)
//! 2. [`spawn_animated_sprite`] registers an instance and spawns an entity
//!    with [`Sprite`] + [`Animated`]
//! 3. The scheduler system advances every instance from the shared clock
//! 4. The sync system turns the reported frame name into a sheet rectangle
//!
//! The scheduler and the loader never talk to each other; this module is the
//! only place where a frame name meets its pixel rectangle.

use std::sync::Arc;

use bevy_ecs::observer::On;
use bevy_ecs::prelude::*;
use log::debug;

use crate::components::animation::Animated;
use crate::components::sprite::Sprite;
use crate::resources::animationlibrary::AnimationConfig;
use crate::resources::animationscheduler::{AnimationScheduler, FrameCallback};
use crate::resources::spriteloader::SpriteLoader;
use crate::resources::worldtime::WorldTime;

/// Advance all animation instances by one pulse.
///
/// Contract
/// - Reads [`WorldTime`] for the scaled delta.
/// - Ticks the [`AnimationScheduler`] in milliseconds; a shut-down scheduler
///   ignores the tick.
pub fn animation_scheduler_system(mut scheduler: ResMut<AnimationScheduler>, time: Res<WorldTime>) {
    scheduler.tick(time.delta_ms());
}

/// Keep sprites in step with their animations and resolve frame rectangles.
///
/// Contract
/// - For entities with [`Animated`], copies the instance's sheet id and
///   current frame name into [`Sprite`] when they differ.
/// - Any sprite without a resolved rectangle is looked up in the
///   [`SpriteLoader`], if one is present and ready.
/// - Unknown sheets or frames leave `frame` at `None`.
pub fn sync_sprite_frames(
    mut query: Query<(&mut Sprite, Option<&Animated>)>,
    scheduler: Option<Res<AnimationScheduler>>,
    loader: Option<Res<SpriteLoader>>,
) {
    for (mut sprite, animated) in query.iter_mut() {
        if let (Some(animated), Some(scheduler)) = (animated, scheduler.as_ref()) {
            if let Some(sheet_id) = scheduler.sheet_id(animated.handle)
                && sprite.sheet_id != sheet_id
            {
                sprite.sheet_id = sheet_id.to_string();
                sprite.frame = None;
            }
            if let Some(name) = scheduler.current_frame(animated.handle)
                && sprite.frame_name != name
            {
                sprite.set_frame_name(name);
            }
        }

        if sprite.frame.is_some() {
            continue;
        }
        let Some(loader) = loader.as_ref().filter(|l| l.is_ready()) else {
            continue;
        };
        if let Some(frame) = loader.get_frame(&sprite.sheet_id, &sprite.frame_name) {
            sprite.frame = Some(*frame);
        }
    }
}

/// Observer that frees the scheduler instance of a removed [`Animated`].
///
/// Runs for explicit component removal and for despawns alike.
pub fn release_animation_on_remove(
    trigger: On<Remove, Animated>,
    query: Query<&Animated>,
    mut scheduler: ResMut<AnimationScheduler>,
) {
    let entity = trigger.event().entity;
    if let Ok(animated) = query.get(entity) {
        debug!("Releasing {} of entity {:?}", animated.handle, entity);
        scheduler.destroy(animated.handle);
    }
}

/// Register an animation instance and spawn an entity that displays it.
///
/// The sprite starts on the config's first frame; with `autoplay` the
/// instance is playing right away. `on_frame_change` is handed to the
/// scheduler unchanged.
pub fn spawn_animated_sprite(
    world: &mut World,
    sheet_id: &str,
    config: Arc<AnimationConfig>,
    on_frame_change: Option<FrameCallback>,
    autoplay: bool,
) -> Entity {
    let first_frame = config.frames.first().cloned().unwrap_or_default();
    let handle = {
        let mut scheduler = world.resource_mut::<AnimationScheduler>();
        let handle = scheduler.create_animation(sheet_id, config, on_frame_change);
        if autoplay {
            scheduler.play(handle);
        }
        handle
    };
    world
        .spawn((Sprite::new(sheet_id, first_frame), Animated::new(handle)))
        .id()
}
