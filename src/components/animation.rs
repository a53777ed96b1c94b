use bevy_ecs::prelude::Component;

use crate::resources::animationscheduler::AnimationId;

/// Binds an entity's [`Sprite`](crate::components::sprite::Sprite) to an
/// instance in the [`AnimationScheduler`](crate::resources::animationscheduler::AnimationScheduler).
///
/// Removing the component (or despawning the entity) destroys the instance,
/// see [`release_animation_on_remove`](crate::systems::animation::release_animation_on_remove).
#[derive(Component, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Animated {
    pub handle: AnimationId,
}

impl Animated {
    pub fn new(handle: AnimationId) -> Self {
        Self { handle }
    }
}
